use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::transport::{
    AlternateChannelTransport, Attachment, EmailMessage, EmailTransport, TransportError,
};
use crate::ticket::{DeliveryMethod, TicketView};

/// Where a report can be sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInfo {
    pub client_name: String,
    pub email: String,
    pub phone: String,
    /// Project manager, copied on email deliveries.
    pub manager_email: Option<String>,
}

impl ContactInfo {
    pub fn from_view(view: &TicketView) -> Self {
        Self {
            client_name: view.client.name.clone(),
            email: view.client.email.trim().to_string(),
            phone: view.client.phone.trim().to_string(),
            manager_email: view
                .project
                .as_ref()
                .map(|p| p.manager_email.trim().to_string())
                .filter(|e| !e.is_empty()),
        }
    }
}

/// Everything a channel needs to deliver one report.
#[derive(Debug, Clone)]
pub struct DeliveryParcel {
    pub report_id: i64,
    pub ticket_id: String,
    pub attachment: Attachment,
    pub contact: ContactInfo,
}

/// One way of getting a report to the client.
///
/// The pipeline tries channels in order and stops at the first one that
/// succeeds. Channels that are not applicable to a contact are skipped.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn method(&self) -> DeliveryMethod;

    /// Whether the contact has the details this channel needs.
    fn is_applicable(&self, contact: &ContactInfo) -> bool;

    async fn attempt(&self, parcel: &DeliveryParcel) -> Result<(), TransportError>;

    /// Best-effort work after the report has been recorded as sent through
    /// this channel. Failures are logged by the implementation.
    async fn follow_up(&self, _parcel: &DeliveryParcel) {}
}

pub fn email_subject(ticket_id: &str) -> String {
    format!("Relatório de Atendimento - {}", ticket_id)
}

fn email_body(client_name: &str, ticket_id: &str) -> String {
    format!(
        "Prezado(a) {},\n\n\
         Segue em anexo o Relatório de Atendimento ao Cliente (RAC) referente ao chamado {}.\n\n\
         Agradecemos pela confiança em nossos serviços.\n\n\
         Atenciosamente,\n\
         Equipe de Suporte",
        client_name, ticket_id
    )
}

/// Sends the report to the client's email address.
pub struct EmailChannel {
    transport: Arc<dyn EmailTransport>,
    copy_manager: bool,
}

impl EmailChannel {
    pub fn new(transport: Arc<dyn EmailTransport>) -> Self {
        Self {
            transport,
            copy_manager: false,
        }
    }

    /// Also send a copy to the project manager after delivery.
    pub fn with_manager_copy(mut self, enabled: bool) -> Self {
        self.copy_manager = enabled;
        self
    }

    fn message(parcel: &DeliveryParcel, to: &str, subject: String) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject,
            body: email_body(&parcel.contact.client_name, &parcel.ticket_id),
            attachment: parcel.attachment.clone(),
        }
    }
}

#[async_trait]
impl DeliveryChannel for EmailChannel {
    fn method(&self) -> DeliveryMethod {
        DeliveryMethod::Email
    }

    fn is_applicable(&self, contact: &ContactInfo) -> bool {
        !contact.email.is_empty()
    }

    async fn attempt(&self, parcel: &DeliveryParcel) -> Result<(), TransportError> {
        let subject = email_subject(&parcel.ticket_id);
        let message = Self::message(parcel, &parcel.contact.email, subject);
        self.transport.send(&message).await
    }

    async fn follow_up(&self, parcel: &DeliveryParcel) {
        if !self.copy_manager {
            return;
        }
        let Some(manager) = parcel.contact.manager_email.as_deref() else {
            return;
        };

        let subject = format!("[Cópia] {}", email_subject(&parcel.ticket_id));
        let message = Self::message(parcel, manager, subject);
        match self.transport.send(&message).await {
            Ok(()) => info!(
                ticket_id = %parcel.ticket_id,
                manager,
                "Report copy sent to project manager"
            ),
            Err(e) => warn!(
                ticket_id = %parcel.ticket_id,
                manager,
                error = %e,
                "Failed to send report copy to project manager"
            ),
        }
    }
}

/// Sends the report document to the client's phone over a messaging gateway.
pub struct AlternateChannel {
    transport: Arc<dyn AlternateChannelTransport>,
}

impl AlternateChannel {
    pub fn new(transport: Arc<dyn AlternateChannelTransport>) -> Self {
        Self { transport }
    }
}

/// Keep only the digits of a phone number.
pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

#[async_trait]
impl DeliveryChannel for AlternateChannel {
    fn method(&self) -> DeliveryMethod {
        DeliveryMethod::AlternateChannel
    }

    fn is_applicable(&self, contact: &ContactInfo) -> bool {
        !phone_digits(&contact.phone).is_empty()
    }

    async fn attempt(&self, parcel: &DeliveryParcel) -> Result<(), TransportError> {
        let phone = phone_digits(&parcel.contact.phone);
        self.transport
            .send(&phone, &email_subject(&parcel.ticket_id), &parcel.attachment)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockAlternateTransport, MockEmailTransport};

    fn parcel(contact: ContactInfo) -> DeliveryParcel {
        DeliveryParcel {
            report_id: 1,
            ticket_id: "RAC0001".to_string(),
            attachment: Attachment {
                file_name: "RAC0001.txt".to_string(),
                bytes: b"doc".to_vec(),
            },
            contact,
        }
    }

    #[test]
    fn test_phone_digits() {
        assert_eq!(phone_digits("+55 (11) 97712-3444"), "5511977123444");
        assert_eq!(phone_digits("N/A"), "");
    }

    #[test]
    fn test_contact_from_view() {
        let view = fixtures::ticket_view("RAC0001");
        let contact = ContactInfo::from_view(&view);
        assert_eq!(contact.client_name, view.client.name);
        assert_eq!(contact.email, view.client.email);
        assert_eq!(contact.manager_email.as_deref(), Some("gerente@example.com"));

        let mut view = view;
        view.project = None;
        assert_eq!(ContactInfo::from_view(&view).manager_email, None);
    }

    #[test]
    fn test_applicability() {
        let email = EmailChannel::new(Arc::new(MockEmailTransport::new()));
        let alternate = AlternateChannel::new(Arc::new(MockAlternateTransport::new()));

        let none = ContactInfo::default();
        assert!(!email.is_applicable(&none));
        assert!(!alternate.is_applicable(&none));

        let phone_only = ContactInfo {
            phone: "(11) 5555-0000".to_string(),
            ..Default::default()
        };
        assert!(!email.is_applicable(&phone_only));
        assert!(alternate.is_applicable(&phone_only));
    }

    #[tokio::test]
    async fn test_email_message() {
        let transport = Arc::new(MockEmailTransport::new());
        let channel = EmailChannel::new(transport.clone());
        let contact = ContactInfo {
            client_name: "ACME Ltda".to_string(),
            email: "ti@acme.example".to_string(),
            ..Default::default()
        };

        channel.attempt(&parcel(contact)).await.unwrap();

        let sent = transport.recorded_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ti@acme.example");
        assert_eq!(sent[0].subject, "Relatório de Atendimento - RAC0001");
        assert!(sent[0].body.starts_with("Prezado(a) ACME Ltda,\n\n"));
        assert!(sent[0].body.contains("referente ao chamado RAC0001."));
        assert_eq!(sent[0].attachment.file_name, "RAC0001.txt");
    }

    #[tokio::test]
    async fn test_manager_copy() {
        let transport = Arc::new(MockEmailTransport::new());
        let channel = EmailChannel::new(transport.clone()).with_manager_copy(true);
        let contact = ContactInfo {
            client_name: "ACME Ltda".to_string(),
            email: "ti@acme.example".to_string(),
            manager_email: Some("gerente@example.com".to_string()),
            ..Default::default()
        };

        channel.follow_up(&parcel(contact)).await;

        let sent = transport.recorded_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "gerente@example.com");
        assert_eq!(sent[0].subject, "[Cópia] Relatório de Atendimento - RAC0001");
    }

    #[tokio::test]
    async fn test_manager_copy_disabled() {
        let transport = Arc::new(MockEmailTransport::new());
        let channel = EmailChannel::new(transport.clone());
        let contact = ContactInfo {
            manager_email: Some("gerente@example.com".to_string()),
            ..Default::default()
        };

        channel.follow_up(&parcel(contact)).await;
        assert!(transport.recorded_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_alternate_sends_digits() {
        let transport = Arc::new(MockAlternateTransport::new());
        let channel = AlternateChannel::new(transport.clone());
        let contact = ContactInfo {
            phone: "+55 (11) 97712-3444".to_string(),
            ..Default::default()
        };

        channel.attempt(&parcel(contact)).await.unwrap();

        let sent = transport.recorded_sends().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].phone, "5511977123444");
        assert_eq!(sent[0].caption, "Relatório de Atendimento - RAC0001");
    }
}
