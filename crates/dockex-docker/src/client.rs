use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, StatusCode, header};
use http_body_util::{BodyExt, Empty};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::{
    config::{DockerConfig, DockerEndpoint},
    error::{DockerError, Result},
    traits::DockerApi,
    types::{ContainerInspect, ContainerStats, ContainerSummary, ImageSummary, SystemInfo},
};

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'<')
    .add(b'>');

/// Docker Engine API client.
///
/// Opens one HTTP/1.1 connection per request; the exporter issues few calls
/// per cycle and the daemon is usually local.
#[derive(Debug, Clone)]
pub struct DockerClient {
    endpoint: DockerEndpoint,
    api_version: String,
}

impl DockerClient {
    pub fn new(config: &DockerConfig) -> Result<Self> {
        Ok(Self {
            endpoint: config.endpoint()?,
            api_version: config.api_version.clone(),
        })
    }

    pub fn endpoint(&self) -> &DockerEndpoint {
        &self.endpoint
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get(path).await?;
        serde_json::from_slice(&body).map_err(|source| DockerError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn get(&self, path: &str) -> Result<Bytes> {
        let uri = format!("/v{}{}", self.api_version, path);
        let request = Request::builder()
            .method(Method::GET)
            .uri(&uri)
            .header(header::HOST, self.endpoint.authority())
            .header(header::ACCEPT, "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(DockerError::Request)?;

        let (status, body) = match &self.endpoint {
            #[cfg(unix)]
            DockerEndpoint::Unix(socket) => {
                let stream = tokio::net::UnixStream::connect(socket)
                    .await
                    .map_err(|source| DockerError::Connect {
                        endpoint: self.endpoint.to_string(),
                        source,
                    })?;
                exchange(stream, request).await?
            }
            #[cfg(not(unix))]
            DockerEndpoint::Unix(_) => {
                return Err(DockerError::InvalidHost(self.endpoint.to_string()));
            }
            DockerEndpoint::Tcp { host, port } => {
                let stream = tokio::net::TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(|source| DockerError::Connect {
                        endpoint: self.endpoint.to_string(),
                        source,
                    })?;
                exchange(stream, request).await?
            }
        };

        if !status.is_success() {
            return Err(DockerError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl DockerApi for DockerClient {
    async fn ping(&self) -> Result<()> {
        self.get("/_ping").await.map(|_| ())
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        self.get_json(&format!("/containers/json?all={all}")).await
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspect> {
        self.get_json(&format!("/containers/{}/json", encode_segment(id)))
            .await
    }

    async fn container_stats(&self, id: &str) -> Result<ContainerStats> {
        self.get_json(&format!(
            "/containers/{}/stats?stream=false&one-shot=true",
            encode_segment(id)
        ))
        .await
    }

    async fn list_images(&self, all: bool) -> Result<Vec<ImageSummary>> {
        self.get_json(&format!("/images/json?all={all}")).await
    }

    async fn info(&self) -> Result<SystemInfo> {
        self.get_json("/info").await
    }
}

async fn exchange<S>(stream: S, request: Request<Empty<Bytes>>) -> Result<(StatusCode, Bytes)>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, connection) = http1::handshake(TokioIo::new(stream))
        .await
        .map_err(DockerError::Http)?;

    tokio::spawn(async move {
        if let Err(err) = connection.await {
            debug!(error = %err, "docker connection closed with error");
        }
    });

    let response = sender
        .send_request(request)
        .await
        .map_err(DockerError::Http)?;
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(DockerError::Http)?
        .to_bytes();

    Ok((status, body))
}

fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

// Error bodies look like `{"message":"No such container: abc"}`.
fn error_message(body: &[u8]) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    use super::{DockerClient, encode_segment, error_message};
    use crate::{config::DockerConfig, error::DockerError, traits::DockerApi};

    /// Serves one canned response and hands back the request head it saw.
    async fn one_shot_daemon(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = socket.read(&mut buf).await.unwrap();
                if read == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..read]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&head).to_string()
        });

        (format!("tcp://{addr}"), handle)
    }

    fn client_for(host: String) -> DockerClient {
        DockerClient::new(&DockerConfig {
            host,
            api_version: "1.41".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_and_decodes_info() {
        let (host, daemon) = one_shot_daemon(
            "200 OK",
            r#"{"Containers":4,"ContainersRunning":1,"ContainersStopped":3}"#,
        )
        .await;

        let info = client_for(host).info().await.unwrap();
        assert_eq!(info.containers, 4);
        assert_eq!(info.containers_running, 1);
        assert_eq!(info.containers_stopped, 3);

        let head = daemon.await.unwrap();
        assert!(head.starts_with("GET /v1.41/info HTTP/1.1"), "{head}");
    }

    #[tokio::test]
    async fn maps_error_status_to_docker_error() {
        let (host, daemon) =
            one_shot_daemon("404 Not Found", r#"{"message":"No such container: gone"}"#).await;

        let err = client_for(host).inspect_container("gone").await.unwrap_err();
        match err {
            DockerError::Status {
                status, message, ..
            } => {
                assert_eq!(status, 404);
                assert_eq!(message, "No such container: gone");
            }
            other => panic!("unexpected error: {other}"),
        }

        let head = daemon.await.unwrap();
        assert!(head.starts_with("GET /v1.41/containers/gone/json"), "{head}");
    }

    #[tokio::test]
    async fn reports_undecodable_bodies() {
        let (host, daemon) = one_shot_daemon("200 OK", "{not json").await;

        let err = client_for(host).container_stats("abc").await.unwrap_err();
        assert!(matches!(err, DockerError::Decode { .. }));
        daemon.await.unwrap();
    }

    #[tokio::test]
    async fn connect_failure_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(format!("tcp://{addr}")).ping().await.unwrap_err();
        assert!(matches!(err, DockerError::Connect { .. }));
    }

    #[test]
    fn extracts_daemon_error_message() {
        assert_eq!(
            error_message(br#"{"message":"No such container: abc"}"#),
            "No such container: abc"
        );
        assert_eq!(error_message(b"page not found\n"), "page not found");
    }

    #[test]
    fn container_ids_pass_through_encoding() {
        assert_eq!(encode_segment("4f66ad9a0b2e"), "4f66ad9a0b2e");
        assert_eq!(encode_segment("a/b c"), "a%2Fb%20c");
    }
}
