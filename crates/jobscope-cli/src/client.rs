//! Gateway WebSocket client.
//!
//! Implements [`RemoteClient`] over the JSON protocol in
//! [`jobscope_proto::api`]. One-shot requests share a single connection that
//! is opened on first use; every log or metric stream gets a dedicated
//! connection so it can be closed without affecting the others.
//!
//! # Example
//!
//! ```rust,no_run
//! use jobscope_cli::client::GatewayClient;
//! use jobscope_core::RemoteClient;
//! use jobscope_proto::{Address, ProjectRef};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = GatewayClient::new("ws://localhost:8080")?;
//! let project = ProjectRef::new("adam", "mnist")?;
//! let entity = client.fetch_one(&Address::Project { project }).await?;
//! println!("{}", entity.id);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use jobscope_core::{MessageStream, RemoteClient, RemoteError};
use jobscope_proto::{
    API_PROTOCOL_VERSION, Address, ApiRequest, ApiResponse, Cursor, Entity, JobAddress,
    ResponsePage, StreamKind, StreamMessage, error_codes,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, trace, warn};

use crate::config::validate_gateway_url;
use crate::error::CliError;

/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Gateway WebSocket client.
pub struct GatewayClient {
    url: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    conn: Option<Socket>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("url", &self.url)
            .field("connected", &self.conn.is_some())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Create a client for the gateway at `url`. No connection is made yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not start with `ws://` or `wss://`.
    pub fn new(url: impl Into<String>) -> Result<Self, CliError> {
        let url = url.into();
        validate_gateway_url(&url)?;
        Ok(Self {
            url,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            conn: None,
        })
    }

    /// Set the connect and request timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    /// Gateway URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns true if the request connection is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Close the request connection, if one was opened.
    pub async fn shutdown(&mut self) {
        if let Some(mut ws) = self.conn.take() {
            if let Err(e) = ws.close(None).await {
                debug!(error = %e, "error closing gateway connection");
            }
        }
    }

    /// Open a connection and perform the hello/welcome handshake.
    async fn open(&mut self) -> Result<Socket, RemoteError> {
        debug!(url = %self.url, "connecting to gateway");

        let (mut ws, _response) = timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| RemoteError::Unavailable(format!("connecting to {} timed out", self.url)))?
            .map_err(|e| RemoteError::Unavailable(format!("cannot connect to {}: {e}", self.url)))?;

        let hello = ApiRequest::hello(env!("CARGO_PKG_VERSION"));
        match exchange(&mut ws, &hello, self.request_timeout).await? {
            ApiResponse::Welcome {
                server_version,
                protocol_version,
            } => {
                if protocol_version != API_PROTOCOL_VERSION {
                    warn!(
                        server = protocol_version,
                        client = API_PROTOCOL_VERSION,
                        "protocol version mismatch"
                    );
                }
                debug!(version = %server_version, "handshake complete");
                Ok(ws)
            }
            other => Err(unexpected("hello", &other)),
        }
    }

    /// Send a request on the shared connection and wait for its response.
    async fn request(&mut self, request: &ApiRequest) -> Result<ApiResponse, RemoteError> {
        if self.conn.is_none() {
            self.conn = Some(self.open().await?);
        }
        let Some(ws) = self.conn.as_mut() else {
            return Err(RemoteError::Unavailable("connection not open".into()));
        };

        let result = exchange(ws, request, self.request_timeout).await;
        if matches!(result, Err(RemoteError::Unavailable(_))) {
            self.conn = None;
        }
        result
    }

    async fn subscribe(
        &mut self,
        kind: StreamKind,
        job: &JobAddress,
    ) -> Result<GatewayStream, RemoteError> {
        let mut ws = self.open().await?;
        let request = ApiRequest::subscribe(kind, job.clone());

        match exchange(&mut ws, &request, self.request_timeout).await {
            Ok(ApiResponse::Subscribed { stream }) if stream == kind => {
                debug!(%job, %kind, "subscribed");
                Ok(GatewayStream { ws, ended: false })
            }
            Ok(other) => {
                let _ = ws.close(None).await;
                Err(unexpected(request.request_type(), &other))
            }
            Err(e) => {
                let _ = ws.close(None).await;
                Err(e)
            }
        }
    }
}

impl RemoteClient for GatewayClient {
    type Stream = GatewayStream;

    async fn fetch_one(&mut self, address: &Address) -> Result<Entity, RemoteError> {
        let request = ApiRequest::GetEntity {
            address: address.clone(),
        };
        match self.request(&request).await? {
            ApiResponse::Entity { entity } => Ok(entity),
            other => Err(unexpected(request.request_type(), &other)),
        }
    }

    async fn fetch_page(
        &mut self,
        address: &Address,
        cursor: Option<&Cursor>,
    ) -> Result<ResponsePage, RemoteError> {
        let request = ApiRequest::ListStatuses {
            address: address.clone(),
            cursor: cursor.cloned(),
        };
        match self.request(&request).await? {
            ApiResponse::Statuses { page } => Ok(page),
            other => Err(unexpected(request.request_type(), &other)),
        }
    }

    async fn open_log_stream(&mut self, job: &JobAddress) -> Result<GatewayStream, RemoteError> {
        self.subscribe(StreamKind::Logs, job).await
    }

    async fn open_metric_stream(
        &mut self,
        job: &JobAddress,
    ) -> Result<GatewayStream, RemoteError> {
        self.subscribe(StreamKind::Resources, job).await
    }
}

/// A subscription on its own connection.
pub struct GatewayStream {
    ws: Socket,
    ended: bool,
}

impl std::fmt::Debug for GatewayStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayStream")
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}

impl MessageStream for GatewayStream {
    async fn next_message(&mut self) -> Option<Result<StreamMessage, RemoteError>> {
        if self.ended {
            return None;
        }

        loop {
            let frame = match self.ws.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    self.ended = true;
                    return Some(Err(RemoteError::Unavailable(e.to_string())));
                }
                None => {
                    self.ended = true;
                    return None;
                }
            };

            let text = match frame {
                Message::Text(text) => text,
                Message::Close(_) => {
                    trace!("gateway closed stream");
                    self.ended = true;
                    return None;
                }
                Message::Binary(_) => {
                    self.ended = true;
                    return Some(Err(RemoteError::Unavailable(
                        "unexpected binary message".into(),
                    )));
                }
                _ => continue,
            };

            return match ApiResponse::from_json(&text) {
                Ok(ApiResponse::Message { message }) => Some(Ok(message)),
                Ok(ApiResponse::StreamEnd { delivered }) => {
                    trace!(delivered, "gateway ended stream");
                    self.ended = true;
                    None
                }
                Ok(ApiResponse::Error { code, message, .. }) => {
                    self.ended = true;
                    Some(Err(map_error(code, message)))
                }
                Ok(other) => {
                    self.ended = true;
                    Some(Err(unexpected("stream", &other)))
                }
                Err(e) => {
                    self.ended = true;
                    Some(Err(RemoteError::Unavailable(e.to_string())))
                }
            };
        }
    }

    async fn close(&mut self) {
        self.ended = true;
        if let Err(e) = self.ws.close(None).await {
            debug!(error = %e, "error closing stream connection");
        }
    }
}

/// Send one request and read its response frame.
async fn exchange(
    ws: &mut Socket,
    request: &ApiRequest,
    request_timeout: Duration,
) -> Result<ApiResponse, RemoteError> {
    let request_type = request.request_type();
    let json = request
        .to_json()
        .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

    trace!(request_type, "sending request");
    ws.send(Message::Text(json))
        .await
        .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

    let response = timeout(request_timeout, read_response(ws))
        .await
        .map_err(|_| RemoteError::Unavailable(format!("request '{request_type}' timed out")))??;

    if let ApiResponse::Error { code, message, .. } = response {
        return Err(map_error(code, message));
    }

    trace!(request_type, "received response");
    Ok(response)
}

async fn read_response(ws: &mut Socket) -> Result<ApiResponse, RemoteError> {
    loop {
        let frame = ws
            .next()
            .await
            .ok_or_else(|| RemoteError::Unavailable("connection closed".into()))?
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        match frame {
            Message::Text(text) => {
                return ApiResponse::from_json(&text)
                    .map_err(|e| RemoteError::Unavailable(e.to_string()));
            }
            Message::Binary(_) => {
                return Err(RemoteError::Unavailable("unexpected binary message".into()));
            }
            Message::Close(_) => {
                return Err(RemoteError::Unavailable(
                    "connection closed by server".into(),
                ));
            }
            _ => {}
        }
    }
}

/// Map a gateway error code onto the remote error kinds.
#[must_use]
pub fn map_error(code: u32, message: String) -> RemoteError {
    match code {
        error_codes::NOT_FOUND => RemoteError::NotFound(message),
        error_codes::PERMISSION_DENIED | error_codes::UNAUTHENTICATED => {
            RemoteError::Forbidden(message)
        }
        _ => RemoteError::Unavailable(format!("gateway error {code}: {message}")),
    }
}

fn unexpected(request_type: &str, response: &ApiResponse) -> RemoteError {
    RemoteError::Unavailable(format!(
        "unexpected response to {request_type}: {response:?}"
    ))
}
