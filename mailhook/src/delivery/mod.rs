//! Message delivery backends.
//!
//! A [`Backend`] takes a composed message and hands it to an MTA. The web
//! layer only ever sees `Arc<dyn Backend>`; which variant is active is
//! decided once at startup by [`build_backend`].

pub mod sendmail;
pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::BackendConfig;

pub use sendmail::SendmailBackend;
pub use smtp::SmtpBackend;

/// Errors raised while handing a message to the MTA.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sendmail exited with {status}: {stderr}")]
    Sendmail { status: String, stderr: String },
    #[error("I/O error during delivery: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid envelope address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("TLS setup failed: {0}")]
    Tls(String),
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),
    #[error("delivery timed out after {0} seconds")]
    Timeout(u64),
}

/// A way of handing a finished message to a mail transfer agent.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Deliver `message` from `envelope_from` to `envelope_to`, once.
    async fn deliver(
        &self,
        envelope_from: &str,
        envelope_to: &str,
        message: &[u8],
    ) -> Result<(), DeliveryError>;
}

/// Build the configured backend.
pub fn build_backend(config: &BackendConfig) -> Result<Arc<dyn Backend>, DeliveryError> {
    let backend: Arc<dyn Backend> = match config {
        BackendConfig::Sendmail { path } => Arc::new(SendmailBackend::new(path.clone())),
        BackendConfig::Smtp(smtp) => Arc::new(SmtpBackend::new(smtp)?),
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmtpConfig;

    #[test]
    fn test_build_sendmail_backend() {
        let backend = build_backend(&BackendConfig::Sendmail {
            path: "/usr/sbin/sendmail".to_string(),
        })
        .unwrap();

        assert_eq!(backend.name(), "sendmail");
    }

    #[tokio::test]
    async fn test_build_smtp_backend() {
        let backend = build_backend(&BackendConfig::Smtp(SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            user: String::new(),
            password: String::new(),
            skip_verify: false,
        }))
        .unwrap();

        assert_eq!(backend.name(), "smtp");
    }

    #[test]
    fn test_delivery_error_messages() {
        let err = DeliveryError::Sendmail {
            status: "exit status: 75".to_string(),
            stderr: "queue full".to_string(),
        };
        assert_eq!(err.to_string(), "sendmail exited with exit status: 75: queue full");
        assert_eq!(
            DeliveryError::Timeout(60).to_string(),
            "delivery timed out after 60 seconds"
        );
    }
}
