//! Reqwest-backed identity directory.
//!
//! This adapter owns transport details only: the forwarded `Authorization`
//! header, the request timeout, and mapping non-2xx answers into
//! [`UpstreamFailure`] records.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, DATE, HeaderMap};
use reqwest::{Client, StatusCode, Url};

use crate::domain::{ForwardedCredential, InstructorProfile};
use crate::domain::ports::{IdentityDirectory, IdentityDirectoryError, UpstreamFailure};

/// Path of the caller-profile lookup, relative to the service base URL.
pub const SELF_PATH: &str = "v1/user/self";

/// Failure to build the adapter.
#[derive(Debug, thiserror::Error)]
pub enum IdentityClientError {
    /// The reqwest client could not be constructed.
    #[error("identity client could not be built: {0}")]
    Client(#[from] reqwest::Error),
    /// The base URL cannot be joined with the lookup path.
    #[error("identity base URL is unusable: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Identity directory calling `GET {base}/v1/user/self`.
#[derive(Debug, Clone)]
pub struct HttpIdentityDirectory {
    client: Client,
    endpoint: Url,
}

impl HttpIdentityDirectory {
    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the client cannot be built or `base_url` cannot
    /// be joined with [`SELF_PATH`].
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, IdentityClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: self_endpoint(base_url)?,
        })
    }

    /// Fully resolved lookup URL.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Join [`SELF_PATH`] onto `base`, treating the base path as a directory.
fn self_endpoint(base: &Url) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(SELF_PATH)
}

#[async_trait]
impl IdentityDirectory for HttpIdentityDirectory {
    async fn fetch_self(
        &self,
        credential: &ForwardedCredential,
    ) -> Result<InstructorProfile, IdentityDirectoryError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(AUTHORIZATION, credential.header_value())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let timestamp = date_header(response.headers());
        let request_url = response.url().to_string();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(
                status,
                UpstreamFailure {
                    timestamp,
                    status: status.as_u16(),
                    reason_phrase: status.canonical_reason().unwrap_or_default().to_owned(),
                    body: String::from_utf8_lossy(&body).into_owned(),
                    request_url,
                },
            ));
        }

        serde_json::from_slice(&body).map_err(|error| {
            IdentityDirectoryError::decode(format!("invalid identity profile payload: {error}"))
        })
    }
}

fn date_header(headers: &HeaderMap) -> String {
    headers
        .get(DATE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

fn map_transport_error(error: reqwest::Error) -> IdentityDirectoryError {
    IdentityDirectoryError::transport(error.to_string())
}

fn map_status_error(status: StatusCode, failure: UpstreamFailure) -> IdentityDirectoryError {
    if status == StatusCode::NOT_FOUND {
        IdentityDirectoryError::not_found(failure)
    } else {
        IdentityDirectoryError::upstream(failure)
    }
}

#[cfg(test)]
mod tests {
    //! Exercises the adapter against a one-shot TCP responder.

    use super::*;
    use rstest::rstest;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept one connection, answer with `response`, and return the raw
    /// request head.
    async fn serve_once(response: String) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.expect("read");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).await.expect("write");
            stream.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });
        let base = Url::parse(&format!("http://{addr}/identity")).expect("url");
        (base, handle)
    }

    fn http_response(status_line: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\n{extra_headers}content-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn directory(base: &Url) -> HttpIdentityDirectory {
        HttpIdentityDirectory::new(base, Duration::from_secs(2)).expect("directory")
    }

    #[rstest]
    #[case::bare("http://identity:8080", "http://identity:8080/v1/user/self")]
    #[case::trailing_slash("http://identity:8080/", "http://identity:8080/v1/user/self")]
    #[case::prefixed("http://gw/identity", "http://gw/identity/v1/user/self")]
    fn endpoint_joins_under_the_base_path(#[case] base: &str, #[case] expected: &str) {
        let base = Url::parse(base).expect("url");
        assert_eq!(self_endpoint(&base).expect("join").as_str(), expected);
    }

    #[tokio::test]
    async fn forwards_the_credential_and_decodes_the_profile() {
        let (base, server) = serve_once(http_response(
            "200 OK",
            "",
            r#"{"id":"u-1","username":"ada","email":"ada@example.com"}"#,
        ))
        .await;

        let profile = directory(&base)
            .fetch_self(&ForwardedCredential::from_bearer_token("tok"))
            .await
            .expect("profile");
        assert_eq!(profile.id.as_deref(), Some("u-1"));
        assert_eq!(profile.attributes["username"], "ada");

        let request = server.await.expect("server task").to_lowercase();
        assert!(request.starts_with("get /identity/v1/user/self "));
        assert!(request.contains("authorization: bearer tok"));
    }

    #[tokio::test]
    async fn not_found_keeps_the_upstream_record() {
        let (base, server) = serve_once(http_response(
            "404 Not Found",
            "date: Tue, 03 Mar 2026 10:00:00 GMT\r\n",
            r#"{"message":"no such user"}"#,
        ))
        .await;

        let err = directory(&base)
            .fetch_self(&ForwardedCredential::from_bearer_token("tok"))
            .await
            .expect_err("404");
        server.await.expect("server task");
        let failure = match err {
            IdentityDirectoryError::NotFound { failure } => failure,
            other => panic!("expected NotFound, got {other:?}"),
        };
        assert_eq!(failure.status, 404);
        assert_eq!(failure.reason_phrase, "Not Found");
        assert_eq!(failure.timestamp, "Tue, 03 Mar 2026 10:00:00 GMT");
        assert_eq!(failure.body, r#"{"message":"no such user"}"#);
        assert!(failure.request_url.ends_with("/identity/v1/user/self"));
    }

    #[tokio::test]
    async fn other_statuses_are_upstream_failures_without_a_date() {
        let (base, server) =
            serve_once(http_response("503 Service Unavailable", "", "{}")).await;

        let err = directory(&base)
            .fetch_self(&ForwardedCredential::from_bearer_token("tok"))
            .await
            .expect_err("503");
        server.await.expect("server task");
        let failure = match err {
            IdentityDirectoryError::Upstream { failure } => failure,
            other => panic!("expected Upstream, got {other:?}"),
        };
        assert_eq!(failure.status, 503);
        assert!(failure.timestamp.is_empty());
    }

    #[tokio::test]
    async fn undecodable_profiles_are_decode_errors() {
        let (base, server) = serve_once(http_response("200 OK", "", "[1,2,3]")).await;
        let err = directory(&base)
            .fetch_self(&ForwardedCredential::from_bearer_token("tok"))
            .await
            .expect_err("array body");
        server.await.expect("server task");
        assert!(matches!(err, IdentityDirectoryError::Decode { .. }));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        let base = Url::parse(&format!("http://{addr}/")).expect("url");

        let err = directory(&base)
            .fetch_self(&ForwardedCredential::from_bearer_token("tok"))
            .await
            .expect_err("refused");
        assert!(matches!(err, IdentityDirectoryError::Transport { .. }));
    }
}
