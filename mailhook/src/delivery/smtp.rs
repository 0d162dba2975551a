//! Delivery to a remote SMTP server.

use std::time::Duration;

use async_trait::async_trait;
use lettre::address::{Address, Envelope};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{info, warn};

use super::{Backend, DeliveryError};
use crate::config::SmtpConfig;

/// Socket timeout for individual SMTP commands.
const SMTP_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends the composed message with `MAIL FROM` / `RCPT TO` / `DATA`,
/// upgrading with STARTTLS when the server offers it.
pub struct SmtpBackend {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
    port: u16,
}

impl SmtpBackend {
    pub fn new(config: &SmtpConfig) -> Result<Self, DeliveryError> {
        let tls = TlsParameters::builder(config.host.clone())
            .dangerous_accept_invalid_certs(config.skip_verify)
            .build_rustls()
            .map_err(|e| DeliveryError::Tls(e.to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.host.as_str())
            .port(config.port)
            .tls(Tls::Opportunistic(tls))
            .timeout(Some(SMTP_COMMAND_TIMEOUT));

        if !config.user.is_empty() {
            builder = builder
                .credentials(Credentials::new(config.user.clone(), config.password.clone()))
                .authentication(vec![Mechanism::Plain]);
        }

        Ok(Self {
            transport: builder.build(),
            host: config.host.clone(),
            port: config.port,
        })
    }
}

fn parse_address(address: &str) -> Result<Address, DeliveryError> {
    address
        .parse::<Address>()
        .map_err(|e| DeliveryError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl Backend for SmtpBackend {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn deliver(
        &self,
        envelope_from: &str,
        envelope_to: &str,
        message: &[u8],
    ) -> Result<(), DeliveryError> {
        info!(
            host = %self.host,
            port = self.port,
            from = %envelope_from,
            to = %envelope_to,
            message_length = message.len(),
            "smtp_delivery_start"
        );

        let envelope = Envelope::new(
            Some(parse_address(envelope_from)?),
            vec![parse_address(envelope_to)?],
        )
        .map_err(|e| DeliveryError::Smtp(e.to_string()))?;

        match self.transport.send_raw(&envelope, message).await {
            Ok(response) => {
                info!(
                    to = %envelope_to,
                    code = %response.code(),
                    "smtp_delivery_complete"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    host = %self.host,
                    port = self.port,
                    error = %e,
                    "smtp_delivery_failed"
                );
                Err(DeliveryError::Smtp(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            user: "user".to_string(),
            password: "secret".to_string(),
            skip_verify: true,
        }
    }

    #[test]
    fn test_parse_address() {
        assert!(parse_address("a@x.com").is_ok());
        assert!(matches!(
            parse_address("not an address"),
            Err(DeliveryError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_envelope_rejected_before_connecting() {
        let backend = SmtpBackend::new(&config()).unwrap();

        let err = backend
            .deliver("not an address", "b@y.com", b"hello")
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_smtp_error() {
        let backend = SmtpBackend::new(&config()).unwrap();

        let err = backend
            .deliver("a@x.com", "b@y.com", b"Subject: x\r\n\r\nbody\r\n")
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::Smtp(_)));
    }
}
