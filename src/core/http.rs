//! HTTP client utilities.
//!
//! Provides the shared client builder and maps transport failures onto the
//! connectivity taxonomy that drives fallback decisions.

use std::error::Error as StdError;
use std::io::ErrorKind;
use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use url::Url;

use crate::error::{ConnectivityKind, Result, UsageError};

/// Default timeout for a single usage request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(format!("copilot-usage/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| UsageError::Transport(e.to_string()))
}

/// GET `url` and return the body of a 2xx response.
///
/// # Errors
///
/// - [`UsageError::Connectivity`] when the host could not be reached
/// - [`UsageError::Http`] for a status outside 200..300
/// - [`UsageError::Transport`] for any other transport failure
pub async fn get_body(client: &Client, url: &Url) -> Result<Vec<u8>> {
    tracing::debug!(%url, "GET");

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| classify(url, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(UsageError::Http {
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|e| classify(url, &e))?;
    tracing::debug!(%url, status = status.as_u16(), bytes = body.len(), "response received");
    Ok(body.to_vec())
}

/// Map a reqwest error onto [`UsageError`].
#[must_use]
pub fn classify(url: &Url, err: &reqwest::Error) -> UsageError {
    match connectivity_kind(err) {
        Some(kind) => UsageError::Connectivity {
            url: url.to_string(),
            kind,
            message: error_chain(err),
        },
        None => UsageError::Transport(error_chain(err)),
    }
}

fn connectivity_kind(err: &reqwest::Error) -> Option<ConnectivityKind> {
    if err.is_timeout() {
        return Some(ConnectivityKind::Timeout);
    }

    // A connect error only counts when the socket layer failed. TLS
    // handshake failures also report `is_connect()` but reached the host.
    let mut socket_failure = false;
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if let Some(kind) = io_kind(io.kind()) {
                return Some(kind);
            }
            if is_dns_failure(cause) {
                return Some(ConnectivityKind::HostNotFound);
            }
            socket_failure |= io.kind() != ErrorKind::InvalidData;
        } else if is_dns_failure(cause) {
            return Some(ConnectivityKind::HostNotFound);
        } else if cause
            .to_string()
            .contains("connection closed before message completed")
        {
            return Some(ConnectivityKind::ConnectionLost);
        }
        source = cause.source();
    }

    if err.is_connect() && socket_failure {
        Some(ConnectivityKind::CannotConnect)
    } else if err.is_body() {
        // The body stream broke after headers arrived.
        Some(ConnectivityKind::ConnectionLost)
    } else {
        None
    }
}

/// Resolver failures carry no typed marker; both hyper's connector and the
/// system resolver describe them the same way.
fn is_dns_failure(cause: &(dyn StdError + 'static)) -> bool {
    let text = cause.to_string().to_lowercase();
    text.contains("dns error") || text.contains("failed to lookup address")
}

const fn io_kind(kind: ErrorKind) -> Option<ConnectivityKind> {
    match kind {
        ErrorKind::TimedOut => Some(ConnectivityKind::Timeout),
        ErrorKind::ConnectionRefused | ErrorKind::AddrNotAvailable => {
            Some(ConnectivityKind::CannotConnect)
        }
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof => Some(ConnectivityKind::ConnectionLost),
        ErrorKind::NetworkUnreachable | ErrorKind::HostUnreachable | ErrorKind::NetworkDown => {
            Some(ConnectivityKind::NotConnected)
        }
        _ => None,
    }
}

/// Join an error with its sources: `outer: inner: root`.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kinds_map_to_connectivity() {
        assert_eq!(
            io_kind(ErrorKind::ConnectionRefused),
            Some(ConnectivityKind::CannotConnect)
        );
        assert_eq!(
            io_kind(ErrorKind::ConnectionReset),
            Some(ConnectivityKind::ConnectionLost)
        );
        assert_eq!(io_kind(ErrorKind::TimedOut), Some(ConnectivityKind::Timeout));
        assert_eq!(
            io_kind(ErrorKind::NetworkUnreachable),
            Some(ConnectivityKind::NotConnected)
        );
        assert_eq!(io_kind(ErrorKind::PermissionDenied), None);
    }

    #[tokio::test]
    async fn refused_connection_is_connectivity() {
        // Bind then drop to get a port nobody is listening on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = build_client(Duration::from_secs(5)).unwrap();
        let url = Url::parse(&format!("http://127.0.0.1:{port}/usage")).unwrap();
        let err = get_body(&client, &url).await.unwrap_err();
        assert!(err.is_connectivity(), "expected connectivity error, got {err:?}");
    }

    #[tokio::test]
    async fn tls_handshake_failure_is_not_connectivity() {
        use std::io::{Read, Write};

        // A plain-text server: the TCP connection succeeds, the handshake fails.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
            }
        });

        let client = build_client(Duration::from_secs(5)).unwrap();
        let url = Url::parse(&format!("https://127.0.0.1:{port}/usage")).unwrap();
        let err = get_body(&client, &url).await.unwrap_err();
        assert!(!err.is_connectivity(), "TLS failure must not trigger fallback: {err:?}");
        assert!(matches!(err, UsageError::Transport(_)), "{err:?}");
    }
}
