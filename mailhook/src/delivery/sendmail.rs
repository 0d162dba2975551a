//! Delivery through a local sendmail-compatible program.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use super::{Backend, DeliveryError};

/// Pipes the message into `<path> -t -f <envelope_from>`.
#[derive(Debug, Clone)]
pub struct SendmailBackend {
    path: String,
}

impl SendmailBackend {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Backend for SendmailBackend {
    fn name(&self) -> &'static str {
        "sendmail"
    }

    async fn deliver(
        &self,
        envelope_from: &str,
        envelope_to: &str,
        message: &[u8],
    ) -> Result<(), DeliveryError> {
        info!(
            path = %self.path,
            from = %envelope_from,
            to = %envelope_to,
            message_length = message.len(),
            "sendmail_delivery_start"
        );

        let mut child = Command::new(&self.path)
            .arg("-t")
            .arg("-f")
            .arg(envelope_from)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DeliveryError::Spawn {
                program: self.path.clone(),
                source,
            })?;

        // The program may exit without draining stdin; its exit status decides.
        if let Some(mut stdin) = child.stdin.take() {
            let written = match stdin.write_all(message).await {
                Ok(()) => stdin.shutdown().await,
                Err(e) => Err(e),
            };
            match written {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    warn!(path = %self.path, "sendmail_stdin_closed_early");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                path = %self.path,
                status = %output.status,
                stderr = %stderr,
                "sendmail_delivery_failed"
            );
            return Err(DeliveryError::Sendmail {
                status: output.status.to_string(),
                stderr,
            });
        }

        info!(to = %envelope_to, "sendmail_delivery_complete");
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn write_script(dir: &Path, body: &str) -> String {
        let path = dir.join("fake-sendmail");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_sendmail_receives_args_and_message() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("captured");
        let args = dir.path().join("args");
        let script = write_script(
            dir.path(),
            &format!(
                "echo \"$@\" > {}\ncat > {}",
                args.display(),
                out.display()
            ),
        );

        let backend = SendmailBackend::new(script);
        backend
            .deliver("a@x.com", "b@y.com", b"Subject: Hi\r\n\r\nhello\r\n")
            .await
            .unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"Subject: Hi\r\n\r\nhello\r\n");
        assert_eq!(std::fs::read_to_string(&args).unwrap().trim(), "-t -f a@x.com");
    }

    #[tokio::test]
    async fn test_sendmail_failure_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "cat > /dev/null\necho 'no such user' >&2\nexit 67");

        let backend = SendmailBackend::new(script);
        let err = backend
            .deliver("a@x.com", "b@y.com", b"hello")
            .await
            .unwrap_err();

        match err {
            DeliveryError::Sendmail { stderr, .. } => assert_eq!(stderr, "no such user"),
            other => panic!("Expected Sendmail error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sendmail_early_exit_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "echo 'no such user' >&2\nexit 67");
        let message = vec![b'x'; 1024 * 1024];

        let backend = SendmailBackend::new(script);
        let err = backend
            .deliver("a@x.com", "b@y.com", &message)
            .await
            .unwrap_err();

        match err {
            DeliveryError::Sendmail { status, stderr } => {
                assert!(status.contains("67"), "unexpected status {}", status);
                assert_eq!(stderr, "no such user");
            }
            other => panic!("Expected Sendmail error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sendmail_missing_program() {
        let backend = SendmailBackend::new("/nonexistent/sendmail");
        let err = backend
            .deliver("a@x.com", "b@y.com", b"hello")
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::Spawn { .. }));
    }
}
