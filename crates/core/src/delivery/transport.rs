//! Network transports used by the delivery channels.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use thiserror::Error;
use tracing::debug;

use crate::config::{EmailRelayConfig, MessagingGatewayConfig};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::ConnectionFailed(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// A file sent along with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn content_type(&self) -> &'static str {
        match self.file_name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("pdf") => "application/pdf",
            Some("txt") => "text/plain; charset=utf-8",
            _ => "application/octet-stream",
        }
    }

    fn part(&self) -> Result<multipart::Part, TransportError> {
        Ok(multipart::Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(self.content_type())?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Attachment,
}

/// Sends email messages.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError>;
}

/// Sends a document to a phone number over a messaging service.
#[async_trait]
pub trait AlternateChannelTransport: Send + Sync {
    /// `phone` holds digits only.
    async fn send(
        &self,
        phone: &str,
        caption: &str,
        attachment: &Attachment,
    ) -> Result<(), TransportError>;
}

fn build_client(timeout: Duration) -> Result<Client, TransportError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TransportError::Other(format!("Failed to create HTTP client: {}", e)))
}

async fn check(response: reqwest::Response) -> Result<(), TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Rejected {
        status: status.as_u16(),
        body,
    })
}

/// Posts messages as multipart forms to an HTTP mail relay.
///
/// Form fields: `from`, `to`, `subject`, `text` and the `attachment` file.
pub struct HttpEmailTransport {
    client: Client,
    config: EmailRelayConfig,
}

impl HttpEmailTransport {
    pub fn new(config: EmailRelayConfig, timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
        })
    }

    fn sender(&self) -> String {
        format!("{} <{}>", self.config.from_name, self.config.from_address)
    }
}

#[async_trait]
impl EmailTransport for HttpEmailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError> {
        let form = multipart::Form::new()
            .text("from", self.sender())
            .text("to", message.to.clone())
            .text("subject", message.subject.clone())
            .text("text", message.body.clone())
            .part("attachment", message.attachment.part()?);

        let mut request = self.client.post(&self.config.url).multipart(form);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request.send().await?;
        check(response).await?;
        debug!(to = %message.to, subject = %message.subject, "Email accepted by relay");
        Ok(())
    }
}

/// Posts documents as multipart forms to a messaging gateway.
///
/// Form fields: `phone`, `caption` and the `document` file.
pub struct HttpMessagingTransport {
    client: Client,
    config: MessagingGatewayConfig,
}

impl HttpMessagingTransport {
    pub fn new(config: MessagingGatewayConfig, timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
        })
    }
}

#[async_trait]
impl AlternateChannelTransport for HttpMessagingTransport {
    async fn send(
        &self,
        phone: &str,
        caption: &str,
        attachment: &Attachment,
    ) -> Result<(), TransportError> {
        let form = multipart::Form::new()
            .text("phone", phone.to_string())
            .text("caption", caption.to_string())
            .part("document", attachment.part()?);

        let mut request = self.client.post(&self.config.url).multipart(form);
        if !self.config.api_token.is_empty() {
            request = request.bearer_auth(&self.config.api_token);
        }

        let response = request.send().await?;
        check(response).await?;
        debug!(phone, "Document accepted by messaging gateway");
        Ok(())
    }
}
