//! Built-in RTSP request responder.
//!
//! # Responsibilities
//! - Bind the configured service port on attach
//! - Read RTSP request heads and echo `CSeq`
//! - Answer `OPTIONS`, resolve request paths against the mount table
//! - Report mounted endpoints; media transport is left to a full engine
//!
//! # Design Decisions
//! - Request parsing and response building are pure functions
//! - Heads and bodies are size-limited; oversized input closes the connection
//! - Every connection is tracked and logged with a connection id

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use url::Url;

use crate::config::{parse_port, Config};
use crate::engine::mount_points::{MountPoints, MountRegistry};
use crate::engine::{Engine, EngineError};
use crate::lifecycle::EventLoop;
use crate::net::{ConnectionId, ConnectionTracker, Listener, ListenerError};

/// Default limit on concurrent client connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 256;

const RTSP_VERSION: &str = "RTSP/1.0";
const PUBLIC_METHODS: &str = "OPTIONS, GET_PARAMETER";
const SERVER_NAME: &str = concat!("devmount/", env!("CARGO_PKG_VERSION"));
const MAX_HEAD_BYTES: usize = 8 * 1024;
const MAX_BODY_BYTES: usize = 64 * 1024;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// A parsed RTSP request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub uri: String,
    pub version: String,
    pub cseq: Option<String>,
    pub content_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("empty request")]
    Empty,

    #[error("malformed request line {0:?}")]
    RequestLine(String),

    #[error("malformed header {0:?}")]
    Header(String),

    #[error("invalid content length {0:?}")]
    ContentLength(String),
}

/// Parse the lines of a request head (without line terminators).
pub fn parse_request(lines: &[String]) -> Result<Request, RequestError> {
    let (first, headers) = lines.split_first().ok_or(RequestError::Empty)?;

    let mut parts = first.split_whitespace();
    let (Some(method), Some(uri), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(RequestError::RequestLine(first.clone()));
    };

    let mut request = Request {
        method: method.to_string(),
        uri: uri.to_string(),
        version: version.to_string(),
        cseq: None,
        content_length: 0,
    };

    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| RequestError::Header(header.clone()))?;
        let (name, value) = (name.trim(), value.trim());

        if name.eq_ignore_ascii_case("cseq") {
            request.cseq = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-length") {
            request.content_length = value
                .parse()
                .map_err(|_| RequestError::ContentLength(value.to_string()))?;
        }
    }

    Ok(request)
}

/// Extract the endpoint path from a request URI.
///
/// Accepts absolute `rtsp://` URIs and bare paths; the query is dropped.
pub fn request_path(uri: &str) -> Option<String> {
    if uri.starts_with('/') {
        let path = uri.split(&['?', '#'][..]).next().unwrap_or_default();
        return Some(path.to_string());
    }

    let url = Url::parse(uri).ok()?;
    match url.scheme() {
        "rtsp" | "rtsps" | "rtspu" => Some(url.path().to_string()),
        _ => None,
    }
}

/// An RTSP response head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub reason: &'static str,
    pub cseq: Option<String>,
    pub headers: Vec<(&'static str, String)>,
    /// Close the connection after writing.
    pub close: bool,
}

impl Response {
    pub fn new(status: u16, reason: &'static str) -> Self {
        Self {
            status,
            reason,
            cseq: None,
            headers: Vec::new(),
            close: false,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    fn closing(mut self) -> Self {
        self.close = true;
        self
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{RTSP_VERSION} {} {}\r\n", self.status, self.reason)?;
        if let Some(cseq) = &self.cseq {
            write!(f, "CSeq: {cseq}\r\n")?;
        }
        write!(f, "Server: {SERVER_NAME}\r\n")?;
        for (name, value) in &self.headers {
            write!(f, "{name}: {value}\r\n")?;
        }
        f.write_str("\r\n")
    }
}

/// Build the response to `request`.
pub fn respond(request: &Request, mounts: &MountPoints) -> Response {
    let mut response = route(request, mounts);
    response.cseq = request.cseq.clone();
    response
}

fn route(request: &Request, mounts: &MountPoints) -> Response {
    if request.version != RTSP_VERSION {
        return Response::new(505, "RTSP Version Not Supported");
    }

    if request.method == "OPTIONS" {
        return Response::new(200, "OK").header("Public", PUBLIC_METHODS);
    }

    let Some(path) = request_path(&request.uri) else {
        return Response::new(400, "Bad Request");
    };
    let Some((mount, factory)) = mounts.match_path(&path) else {
        return Response::new(404, "Not Found");
    };

    match request.method.as_str() {
        "GET_PARAMETER" => Response::new(200, "OK"),
        _ => Response::new(501, "Not Implemented")
            .header("Public", PUBLIC_METHODS)
            .header("X-Mount", mount)
            .header("X-Launch", factory.launch()),
    }
}

/// Engine answering RTSP requests for the mounted endpoints.
#[derive(Debug)]
pub struct RtspEngine {
    bind_addr: SocketAddr,
    max_connections: usize,
    mount_points: MountPoints,
    tracker: ConnectionTracker,
    local_addr: Option<SocketAddr>,
}

impl RtspEngine {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            mount_points: MountPoints::new(),
            tracker: ConnectionTracker::new(),
            local_addr: None,
        }
    }

    /// Engine serving all interfaces on the configured port.
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let port =
            parse_port(&config.port).ok_or_else(|| EngineError::InvalidPort(config.port.clone()))?;
        Ok(Self::new(SocketAddr::from(([0, 0, 0, 0], port))))
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// The mount table this engine serves.
    pub fn registry(&self) -> &MountPoints {
        &self.mount_points
    }

    /// Bound address, once attached.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Connections accepted since the engine was attached.
    pub fn total_connections(&self) -> u64 {
        self.tracker.total_count()
    }
}

impl Engine for RtspEngine {
    fn mount_points(&self) -> Arc<dyn MountRegistry> {
        Arc::new(self.mount_points.clone())
    }

    fn attach(&mut self, event_loop: &EventLoop) -> Result<(), EngineError> {
        if let Some(addr) = self.local_addr {
            return Err(EngineError::AlreadyAttached(addr));
        }

        let listener = {
            let _guard = event_loop.enter();
            Listener::bind(self.bind_addr, self.max_connections)?
        };
        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            addr: self.bind_addr,
            source,
        })?;
        self.local_addr = Some(local_addr);

        tracing::info!(
            address = %local_addr,
            endpoints = self.mount_points.len(),
            "RTSP engine attached"
        );

        event_loop.spawn(serve(listener, self.mount_points.clone(), self.tracker.clone()));
        Ok(())
    }
}

async fn serve(listener: Listener, mounts: MountPoints, tracker: ConnectionTracker) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr, permit)) => {
                let guard = tracker.open(peer_addr);
                let mounts = mounts.clone();
                tokio::spawn(async move {
                    let connection_id = guard.id();
                    if let Err(e) = handle_connection(stream, &mounts, connection_id).await {
                        tracing::debug!(
                            connection_id = %connection_id,
                            peer_addr = %peer_addr,
                            error = %e,
                            "Connection ended with error"
                        );
                    }
                    drop(permit);
                    drop(guard);
                });
            }
            Err(ListenerError::Closed) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    mounts: &MountPoints,
    connection_id: ConnectionId,
) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    while let Some(head) = read_head(&mut reader).await? {
        let response = match parse_request(&head) {
            Ok(request) if request.content_length > MAX_BODY_BYTES => {
                Response::new(413, "Request Entity Too Large").closing()
            }
            Ok(request) => {
                let mut body = vec![0; request.content_length];
                reader.read_exact(&mut body).await?;

                let response = respond(&request, mounts);
                tracing::debug!(
                    connection_id = %connection_id,
                    method = %request.method,
                    uri = %request.uri,
                    status = response.status,
                    "Request handled"
                );
                response
            }
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, error = %e, "Malformed request");
                Response::new(400, "Bad Request").closing()
            }
        };

        write_half.write_all(response.to_string().as_bytes()).await?;
        if response.close {
            break;
        }
    }

    Ok(())
}

/// Read one request head. Returns `None` on end of stream.
async fn read_head<R>(reader: &mut R) -> io::Result<Option<Vec<String>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    let mut total = 0;

    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }

        total += read;
        if total > MAX_HEAD_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "request head too large",
            ));
        }

        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.is_empty() {
            if lines.is_empty() {
                continue;
            }
            return Ok(Some(lines));
        }
        lines.push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MediaFactory;

    fn head(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|line| line.to_string()).collect()
    }

    fn mounts() -> MountPoints {
        let mounts = MountPoints::new();
        mounts
            .add_factory("/a", MediaFactory::new("( fakesrc )"))
            .unwrap();
        mounts
    }

    #[test]
    fn parses_request_head() {
        let request = parse_request(&head(&[
            "ANNOUNCE rtsp://gw:8554/a RTSP/1.0",
            "CSeq: 7",
            "Content-Length: 12",
            "Content-Type: application/sdp",
        ]))
        .unwrap();

        assert_eq!(request.method, "ANNOUNCE");
        assert_eq!(request.uri, "rtsp://gw:8554/a");
        assert_eq!(request.cseq.as_deref(), Some("7"));
        assert_eq!(request.content_length, 12);
    }

    #[test]
    fn rejects_malformed_heads() {
        assert_eq!(parse_request(&[]), Err(RequestError::Empty));
        assert!(matches!(
            parse_request(&head(&["OPTIONS *"])),
            Err(RequestError::RequestLine(_))
        ));
        assert!(matches!(
            parse_request(&head(&["OPTIONS * RTSP/1.0", "CSeq 1"])),
            Err(RequestError::Header(_))
        ));
        assert!(matches!(
            parse_request(&head(&["OPTIONS * RTSP/1.0", "Content-Length: many"])),
            Err(RequestError::ContentLength(_))
        ));
    }

    #[test]
    fn request_paths() {
        assert_eq!(request_path("rtsp://gw:8554/a").as_deref(), Some("/a"));
        assert_eq!(request_path("rtsp://gw/a/stream=0?x=1").as_deref(), Some("/a/stream=0"));
        assert_eq!(request_path("/a?x=1").as_deref(), Some("/a"));
        assert_eq!(request_path("http://gw/a"), None);
        assert_eq!(request_path("garbage"), None);
    }

    #[test]
    fn options_lists_methods_and_echoes_cseq() {
        let request = parse_request(&head(&["OPTIONS * RTSP/1.0", "CSeq: 1"])).unwrap();
        let response = respond(&request, &mounts());

        assert_eq!(response.status, 200);
        assert_eq!(
            response.to_string(),
            format!(
                "RTSP/1.0 200 OK\r\nCSeq: 1\r\nServer: {SERVER_NAME}\r\nPublic: {PUBLIC_METHODS}\r\n\r\n"
            )
        );
    }

    #[test]
    fn unknown_path_is_not_found() {
        let request = parse_request(&head(&["DESCRIBE rtsp://gw/b RTSP/1.0", "CSeq: 2"])).unwrap();
        assert_eq!(respond(&request, &mounts()).status, 404);
    }

    #[test]
    fn mounted_path_reports_launch() {
        let request =
            parse_request(&head(&["ANNOUNCE rtsp://gw/a/stream=0 RTSP/1.0", "CSeq: 3"])).unwrap();
        let response = respond(&request, &mounts());

        assert_eq!(response.status, 501);
        assert!(response
            .headers
            .contains(&("X-Launch", "( fakesrc )".to_string())));
        assert!(response.headers.contains(&("X-Mount", "/a".to_string())));

        let keepalive = parse_request(&head(&["GET_PARAMETER rtsp://gw/a RTSP/1.0"])).unwrap();
        assert_eq!(respond(&keepalive, &mounts()).status, 200);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let request = parse_request(&head(&["OPTIONS * HTTP/1.1"])).unwrap();
        assert_eq!(respond(&request, &mounts()).status, 505);
    }

    #[test]
    fn engine_port_comes_from_config() {
        let config = Config {
            port: "9000".into(),
            ..Config::default()
        };
        let engine = RtspEngine::from_config(&config).unwrap();
        assert_eq!(engine.bind_addr.port(), 9000);
        assert!(engine.local_addr().is_none());

        let config = Config {
            port: "nope".into(),
            ..Config::default()
        };
        assert!(matches!(
            RtspEngine::from_config(&config),
            Err(EngineError::InvalidPort(_))
        ));
    }
}
