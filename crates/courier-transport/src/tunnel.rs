//! Public tunnels for the webhook server.
//!
//! When no public URL is configured, the runtime opens a tunnel to the local
//! port and registers the resulting HTTPS address as the webhook.

use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, trace, warn};

use courier_core::{TransportError, TransportResult};

/// How long to wait for the tunnel to report its public URL.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(15);

/// A running tunnel to a local port.
pub trait Tunnel: Send {
    /// Public HTTPS base URL of the tunnel.
    fn public_url(&self) -> &str;

    /// Closes the tunnel. Must not block: it runs from shutdown hooks.
    fn close(&mut self);
}

/// Tunnel backed by an `ngrok` child process.
pub struct NgrokTunnel {
    child: Child,
    public_url: String,
}

impl NgrokTunnel {
    /// Starts `<command> http <port>` and waits for its public URL.
    ///
    /// # Errors
    /// Returns [`TransportError::Tunnel`] if the process cannot be spawned,
    /// exits early, or does not report a URL in time.
    pub async fn open(command: &str, port: u16) -> TransportResult<Self> {
        let mut child = Command::new(command)
            .arg("http")
            .arg(port.to_string())
            .args(["--log", "stdout", "--log-format", "json"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TransportError::Tunnel(format!("failed to spawn '{command}': {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Tunnel("tunnel stdout not captured".into()))?;
        let mut lines = BufReader::new(stdout).lines();

        let found = tokio::time::timeout(STARTUP_TIMEOUT, async {
            while let Some(line) = lines.next_line().await? {
                trace!(line = %line, "tunnel output");
                if let Some(url) = public_url_from_log(&line) {
                    return Ok(Some(url));
                }
            }
            Ok::<_, std::io::Error>(None)
        })
        .await;

        let public_url = match found {
            Ok(Ok(Some(url))) => url,
            Ok(Ok(None)) => {
                return Err(TransportError::Tunnel(
                    "tunnel exited before reporting a public URL".into(),
                ));
            }
            Ok(Err(e)) => return Err(TransportError::Tunnel(e.to_string())),
            Err(_) => {
                return Err(TransportError::Tunnel(format!(
                    "no public URL within {}s",
                    STARTUP_TIMEOUT.as_secs()
                )));
            }
        };

        // Keep draining so the child never blocks on a full pipe.
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                trace!(line = %line, "tunnel output");
            }
            debug!("tunnel output closed");
        });

        info!(public_url = %public_url, port, "Tunnel established");

        Ok(Self { child, public_url })
    }
}

impl Tunnel for NgrokTunnel {
    fn public_url(&self) -> &str {
        &self.public_url
    }

    fn close(&mut self) {
        match self.child.start_kill() {
            Ok(()) => info!(public_url = %self.public_url, "Tunnel closed"),
            Err(e) => warn!(error = %e, "Failed to stop tunnel process"),
        }
    }
}

/// Extracts an HTTPS public URL from one JSON log line.
fn public_url_from_log(line: &str) -> Option<String> {
    let value: Value = serde_json::from_str(line).ok()?;
    value
        .get("url")
        .and_then(Value::as_str)
        .filter(|url| url.starts_with("https://"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_from_log() {
        let line = r#"{"lvl":"info","msg":"started tunnel","name":"command_line","addr":"http://localhost:3000","url":"https://ab12.ngrok.io"}"#;
        assert_eq!(
            public_url_from_log(line).as_deref(),
            Some("https://ab12.ngrok.io")
        );
    }

    #[test]
    fn test_public_url_ignores_other_lines() {
        assert!(public_url_from_log(r#"{"lvl":"info","msg":"starting web service"}"#).is_none());
        assert!(public_url_from_log(r#"{"url":"http://ab12.ngrok.io"}"#).is_none());
        assert!(public_url_from_log("not json").is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_is_tunnel_error() {
        let result = NgrokTunnel::open("courier-no-such-tunnel-binary", 3000).await;
        assert!(matches!(result, Err(TransportError::Tunnel(_))));
    }
}
