//! Delivery of generated reports to clients.
//!
//! [`DeliveryPipeline`] walks an ordered list of [`DeliveryChannel`]s (email
//! first, then the messaging gateway) and records the first one that
//! succeeds. Adding a channel means pushing another implementation onto the
//! list; the pipeline itself does not change.

mod channel;
mod pipeline;
mod transport;

pub use channel::{
    email_subject, phone_digits, AlternateChannel, ContactInfo, DeliveryChannel, DeliveryParcel,
    EmailChannel,
};
pub use pipeline::{AttemptResult, ChannelAttempt, DeliveryError, DeliveryOutcome, DeliveryPipeline};
pub use transport::{
    AlternateChannelTransport, Attachment, EmailMessage, EmailTransport, HttpEmailTransport,
    HttpMessagingTransport, TransportError,
};
