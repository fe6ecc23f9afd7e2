//! Code delivery sinks
//!
//! The service hands every issued code to a [`DeliverySink`]. Actual SMS
//! gateways live outside this crate; they either implement the trait or
//! consume a [`ChannelSink`].

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use crate::code::OtpCode;
use crate::phone::PhoneNumber;

#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, phone: &PhoneNumber, code: &OtpCode) -> Result<()>;
}

/// Logs the dispatch without the code; for development setups
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl DeliverySink for LogSink {
    async fn deliver(&self, phone: &PhoneNumber, _code: &OtpCode) -> Result<()> {
        info!("OTP dispatched to phone {}", phone.fingerprint());
        Ok(())
    }
}

/// A code handed to an external dispatcher
#[derive(Debug, Clone)]
pub struct Delivery {
    pub phone: PhoneNumber,
    pub code: OtpCode,
}

/// Forwards deliveries to an mpsc channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl DeliverySink for ChannelSink {
    async fn deliver(&self, phone: &PhoneNumber, code: &OtpCode) -> Result<()> {
        self.tx
            .send(Delivery {
                phone: phone.clone(),
                code: code.clone(),
            })
            .map_err(|_| anyhow::anyhow!("delivery channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards() {
        let (sink, mut rx) = ChannelSink::channel();
        let phone = PhoneNumber::parse("+919876543210", None).unwrap();
        let code = OtpCode::generate();

        sink.deliver(&phone, &code).await.unwrap();

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.phone, phone);
        assert_eq!(delivery.code, code);
    }

    #[tokio::test]
    async fn test_channel_sink_closed() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        let phone = PhoneNumber::parse("+919876543210", None).unwrap();
        assert!(sink.deliver(&phone, &OtpCode::generate()).await.is_err());
    }
}
