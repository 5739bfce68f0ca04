//! reqwest transport for a hosted Gradio app.
//!
//! A call is two requests: `POST {host}/call/{api}` queues the job and returns
//! an `event_id`, then `GET {host}/call/{api}/{event_id}` streams server-sent
//! events until a `complete` (or `error`) event arrives.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{InferenceError, InferenceTransport, TransportError};
use crate::config::Config;
use crate::retry::RetryPolicy;

const HUB_URL: &str = "https://huggingface.co";

#[derive(Debug, Deserialize)]
struct SpaceHost {
    host: String,
}

#[derive(Debug, Deserialize)]
struct QueuedCall {
    event_id: String,
}

#[derive(Clone)]
pub struct GradioTransport {
    client: Client,
    host: String,
    token: Option<String>,
}

impl GradioTransport {
    /// Resolves the Space host (unless `INFERENCE_HOST` is set) and checks the
    /// app answers `/config`. Transient failures are retried under `policy`.
    pub async fn connect(config: &Config, policy: &RetryPolicy) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.inference_timeout).build()?;
        let token = config.hf_token.clone();

        let transport = policy
            .run(
                move |attempt| {
                    let client = client.clone();
                    let token = token.clone();
                    async move {
                        debug!("Connecting to inference endpoint (attempt {attempt})");
                        let host = match &config.inference_host {
                            Some(host) => host.trim_end_matches('/').to_string(),
                            None => {
                                resolve_host(
                                    &client,
                                    HUB_URL,
                                    &config.inference_space,
                                    token.as_deref(),
                                )
                                .await?
                            }
                        };
                        let transport = GradioTransport { client, host, token };
                        transport.check_config().await?;
                        Ok::<_, TransportError>(transport)
                    }
                },
                TransportError::is_transient,
            )
            .await
            .map_err(InferenceError::from)?;

        info!("Inference endpoint ready at {}", transport.host);
        Ok(transport)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        authorize(request, self.token.as_deref())
    }

    async fn check_config(&self) -> Result<(), TransportError> {
        let response = self
            .authorized(self.client.get(format!("{}/config", self.host)))
            .send()
            .await?;
        let _: Value = read_json(check_status(response).await?, "app config").await?;
        Ok(())
    }

    fn call_url(&self, api_name: &str) -> String {
        format!("{}/call/{}", self.host, api_name.trim_start_matches('/'))
    }
}

#[async_trait]
impl InferenceTransport for GradioTransport {
    async fn predict(&self, api_name: &str, data: Vec<Value>) -> Result<Value, TransportError> {
        let url = self.call_url(api_name);

        let response = self
            .authorized(self.client.post(&url))
            .json(&json!({ "data": data }))
            .send()
            .await?;
        let queued: QueuedCall = read_json(check_status(response).await?, "queued call").await?;

        debug!(event_id = %queued.event_id, "Call queued");

        let response = self
            .authorized(self.client.get(format!("{url}/{}", queued.event_id)))
            .send()
            .await?;
        let response = check_status(response).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        parse_event_stream(&body, status)
    }
}

/// `GET {hub}/api/spaces/{space}/host` → `{"host": "https://....hf.space"}`.
async fn resolve_host(
    client: &Client,
    hub: &str,
    space: &str,
    token: Option<&str>,
) -> Result<String, TransportError> {
    let response = authorize(client.get(format!("{hub}/api/spaces/{space}/host")), token)
        .send()
        .await?;
    let resolved: SpaceHost = read_json(check_status(response).await?, "space host").await?;
    Ok(resolved.host.trim_end_matches('/').to_string())
}

/// A body cut off in transit is transient; a complete body that does not
/// parse is malformed.
async fn read_json<T: DeserializeOwned>(
    response: Response,
    what: &str,
) -> Result<T, TransportError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|e| TransportError::Malformed(format!("invalid {what} response: {e}")))
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("Inference endpoint returned {status}: {body}");
    Err(TransportError::Remote {
        status: status.as_u16(),
        message: body,
    })
}

/// Picks the payload of the last `complete` event. An `error` event is a
/// remote failure; a stream that ends without either was cut off in transit.
fn parse_event_stream(body: &str, status: u16) -> Result<Value, TransportError> {
    let mut event = "";
    let mut completed = None;

    for line in body.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
        } else if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            match event {
                "complete" => {
                    let value = serde_json::from_str(data).map_err(|e| {
                        TransportError::Malformed(format!("invalid completion payload: {e}"))
                    })?;
                    completed = Some(value);
                }
                "error" => {
                    let message = match data {
                        "" | "null" => "remote operation failed".to_string(),
                        other => other.to_string(),
                    };
                    return Err(TransportError::Remote { status, message });
                }
                _ => {}
            }
        }
    }

    completed.ok_or_else(|| {
        TransportError::Transient("event stream ended before completion".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(host: &str) -> Config {
        Config {
            inference_host: Some(host.to_string()),
            ..test_config()
        }
    }

    async fn mount_config(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "4.0"})))
            .mount(server)
            .await;
    }

    #[test]
    fn test_event_stream_takes_completion_payload() {
        let body = "event: generating\ndata: [\"par\"]\n\n\
                    event: heartbeat\ndata: null\n\n\
                    event: complete\ndata: [\"Q1?\\nQ2?\"]\n\n";
        assert_eq!(parse_event_stream(body, 200).unwrap(), json!(["Q1?\nQ2?"]));
    }

    #[test]
    fn test_event_stream_error_is_remote() {
        let body = "event: error\ndata: null\n\n";
        let err = parse_event_stream(body, 200).unwrap_err();
        assert!(matches!(err, TransportError::Remote { status: 200, .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_truncated_event_stream_is_transient() {
        let body = "event: generating\ndata: [\"partial\"]\n";
        assert!(parse_event_stream(body, 200).unwrap_err().is_transient());
    }

    #[test]
    fn test_call_url_strips_leading_slash() {
        let transport = GradioTransport {
            client: Client::new(),
            host: "http://space.local".to_string(),
            token: None,
        };
        assert_eq!(transport.call_url("/chat"), "http://space.local/call/chat");
    }

    #[tokio::test]
    async fn test_resolve_host_reads_hub_response() {
        let hub = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/spaces/owner/space/host"))
            .and(header("authorization", "Bearer hf_test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"subdomain": "owner-space", "host": "https://owner-space.hf.space/"})),
            )
            .mount(&hub)
            .await;

        let host = resolve_host(&Client::new(), &hub.uri(), "owner/space", Some("hf_test"))
            .await
            .unwrap();

        assert_eq!(host, "https://owner-space.hf.space");
    }

    #[tokio::test]
    async fn test_connect_and_predict_round_trip() {
        let server = MockServer::start().await;
        mount_config(&server).await;
        Mock::given(method("POST"))
            .and(path("/call/chat"))
            .and(body_json(json!({"data": ["hello", 0.7]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"event_id": "abc123"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/call/chat/abc123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("event: complete\ndata: [\"Hi there\"]\n\n"),
            )
            .mount(&server)
            .await;

        let config = config_for(&server.uri());
        let transport = GradioTransport::connect(&config, &config.retry).await.unwrap();
        let output = transport
            .predict("/chat", vec![json!("hello"), json!(0.7)])
            .await
            .unwrap();

        assert_eq!(output, json!(["Hi there"]));
    }

    #[tokio::test]
    async fn test_predict_maps_rejected_call_to_remote_error() {
        let server = MockServer::start().await;
        mount_config(&server).await;
        Mock::given(method("POST"))
            .and(path("/call/chat"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad arguments"))
            .mount(&server)
            .await;

        let config = config_for(&server.uri());
        let transport = GradioTransport::connect(&config, &config.retry).await.unwrap();
        let err = transport.predict("/chat", vec![]).await.unwrap_err();

        match err {
            TransportError::Remote { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "bad arguments");
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connect_fails_when_app_rejects_config() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/config"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server.uri());
        assert!(GradioTransport::connect(&config, &config.retry).await.is_err());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let transport = GradioTransport {
            client: Client::new(),
            host: "http://127.0.0.1:9".to_string(),
            token: None,
        };
        let err = transport.predict("/chat", vec![]).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_invalid_host_fails_without_retry() {
        let mut config = test_config();
        config.inference_host = Some("not a url".to_string());
        let transport = GradioTransport {
            client: Client::new(),
            host: "not a url".to_string(),
            token: None,
        };

        let err = transport.predict("/chat", vec![]).await.unwrap_err();
        assert!(matches!(err, TransportError::Invalid(_)), "{err:?}");

        let started = tokio::time::Instant::now();
        assert!(GradioTransport::connect(&config, &config.retry).await.is_err());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_truncated_body_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                      content-length: 64\r\n\r\n{\"host\":",
                )
                .await
                .unwrap();
            socket.flush().await.unwrap();
        });

        let err = resolve_host(&Client::new(), &format!("http://{addr}"), "owner/space", None)
            .await
            .unwrap_err();

        assert!(err.is_transient(), "{err:?}");
    }

    #[tokio::test]
    async fn test_unparsable_host_response_is_malformed() {
        let hub = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/spaces/owner/space/host"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&hub)
            .await;

        let err = resolve_host(&Client::new(), &hub.uri(), "owner/space", None)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Malformed(_)), "{err:?}");
    }
}
