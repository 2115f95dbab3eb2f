use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

mod mail;
mod storage;

pub use mail::{MailApiClient, MailApiConfig};
pub use storage::{ObjectStoreClient, ObjectStoreConfig};

pub type MailDeliveryFuture<'a> =
    Pin<Box<dyn Future<Output = Result<DeliveryReceipt, DeliveryError>> + Send + 'a>>;

pub type ObjectPutFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>;

#[derive(Debug, Clone)]
pub struct OutboundMail {
    pub subject: String,
    pub body: String,
    pub sender: String,
    pub recipient: String,
}

#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    pub message_id: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery request timed out")]
    Timeout,
    #[error("delivery request failed: {0}")]
    TransportFailure(String),
    #[error("delivery transport returned an invalid payload: {0}")]
    InvalidTransportPayload(String),
}

pub trait MailTransport: Send + Sync {
    fn send<'a>(&'a self, mail: OutboundMail) -> MailDeliveryFuture<'a>;
}

pub trait ObjectStore: Send + Sync {
    fn put_object<'a>(&'a self, key: String, body: String) -> ObjectPutFuture<'a>;
}
