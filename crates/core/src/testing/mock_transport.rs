//! Mock delivery transports for testing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::delivery::{
    AlternateChannelTransport, Attachment, EmailMessage, EmailTransport, TransportError,
};

/// Mock implementation of the EmailTransport trait.
///
/// Successful sends are recorded; failed and timed out ones are not.
#[derive(Debug, Default)]
pub struct MockEmailTransport {
    messages: Arc<RwLock<Vec<EmailMessage>>>,
    fail: Arc<RwLock<bool>>,
    fail_recipients: Arc<RwLock<Vec<String>>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockEmailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all messages sent successfully.
    pub async fn recorded_messages(&self) -> Vec<EmailMessage> {
        self.messages.read().await.clone()
    }

    pub async fn send_count(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Make every send fail.
    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// Make sends to one address fail.
    pub async fn fail_for_recipient(&self, address: &str) {
        self.fail_recipients.write().await.push(address.to_string());
    }

    /// Set the simulated send duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }
}

#[async_trait]
impl EmailTransport for MockEmailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError> {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.fail.read().await || self.fail_recipients.read().await.contains(&message.to) {
            return Err(TransportError::Rejected {
                status: 503,
                body: "mock relay unavailable".to_string(),
            });
        }

        self.messages.write().await.push(message.clone());
        Ok(())
    }
}

/// A document sent through the alternate channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSend {
    pub phone: String,
    pub caption: String,
    pub attachment: Attachment,
}

/// Mock implementation of the AlternateChannelTransport trait.
#[derive(Debug, Default)]
pub struct MockAlternateTransport {
    sends: Arc<RwLock<Vec<RecordedSend>>>,
    fail: Arc<RwLock<bool>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockAlternateTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all documents sent successfully.
    pub async fn recorded_sends(&self) -> Vec<RecordedSend> {
        self.sends.read().await.clone()
    }

    pub async fn send_count(&self) -> usize {
        self.sends.read().await.len()
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }
}

#[async_trait]
impl AlternateChannelTransport for MockAlternateTransport {
    async fn send(
        &self,
        phone: &str,
        caption: &str,
        attachment: &Attachment,
    ) -> Result<(), TransportError> {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.fail.read().await {
            return Err(TransportError::ConnectionFailed(
                "mock gateway unreachable".to_string(),
            ));
        }

        self.sends.write().await.push(RecordedSend {
            phone: phone.to_string(),
            caption: caption.to_string(),
            attachment: attachment.clone(),
        });
        Ok(())
    }
}
