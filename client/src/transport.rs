//! WebSocket transport.
//!
//! Thin wrapper around `tokio-tungstenite` exposing type-isolated writer and
//! reader halves behind the [`FrameSink`] / [`FrameStream`] traits, so the
//! connection manager can run against a fake transport in tests.
//!
//! A single [`Connector::open`] call builds the request URL (routing fields
//! as query parameters), inserts the bearer header and performs the
//! handshake. It returns a (sink, stream) pair ready for `tokio::select!`.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use shared::types::Role;
use tracing::debug;
use tungstenite::Message;
use tungstenite::client::IntoClientRequest;

use crate::error::TransportError;

/// Concrete WebSocket stream type.
type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

// ---------------------------------------------------------------------------
// Connection parameters
// ---------------------------------------------------------------------------

/// Everything needed to open the socket: endpoint, credential and routing
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Full `ws://` / `wss://` URL including the socket path.
    pub url: String,
    pub token: Option<String>,
    pub role: Role,
    /// User id for staff, cached guest id for guests.
    pub identity: Option<String>,
    /// Routing token of the web widget a guest connects through.
    pub channel_token: Option<String>,
}

impl ConnectParams {
    pub fn new(url: impl Into<String>, role: Role) -> Self {
        Self {
            url: url.into(),
            token: None,
            role,
            identity: None,
            channel_token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_identity(mut self, identity: Option<String>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_channel_token(mut self, channel_token: Option<String>) -> Self {
        self.channel_token = channel_token;
        self
    }

    /// The URL with `role`, `identity`, `channelToken` and `token` appended
    /// as query fields.
    pub fn request_url(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("role", self.role.as_str());
        if let Some(identity) = &self.identity {
            query.append_pair("identity", identity);
        }
        if let Some(channel_token) = &self.channel_token {
            query.append_pair("channelToken", channel_token);
        }
        if let Some(token) = &self.token {
            query.append_pair("token", token);
        }
        let query = query.finish();

        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, separator, query)
    }
}

// ---------------------------------------------------------------------------
// Frames and halves
// ---------------------------------------------------------------------------

/// Received WebSocket frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsFrame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    /// Close frame; 1005 when the peer sent no code.
    Close { code: u16, reason: String },
}

/// Write half of an open connection.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    async fn send_pong(&mut self, data: Vec<u8>) -> Result<(), TransportError>;

    /// Send a close frame and flush.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of an open connection.
#[async_trait]
pub trait FrameStream: Send {
    /// Next frame, or `None` once the stream has ended.
    async fn next_frame(&mut self) -> Option<Result<WsFrame, TransportError>>;
}

pub type FramePair = (Box<dyn FrameSink>, Box<dyn FrameStream>);

/// Opens connections. The connection manager calls this once per attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, params: &ConnectParams) -> Result<FramePair, TransportError>;
}

// ---------------------------------------------------------------------------
// tokio-tungstenite implementation
// ---------------------------------------------------------------------------

/// Production connector backed by `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

struct WsWriter {
    sink: futures_util::stream::SplitSink<WsStream, Message>,
}

struct WsReader {
    stream: futures_util::stream::SplitStream<WsStream>,
}

#[async_trait]
impl FrameSink for WsWriter {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn send_pong(&mut self, data: Vec<u8>) -> Result<(), TransportError> {
        self.sink
            .send(Message::Pong(data))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // Peer may already be gone; the close frame is a courtesy.
        let _ = self.sink.send(Message::Close(None)).await;
        self.sink
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}

#[async_trait]
impl FrameStream for WsReader {
    async fn next_frame(&mut self) -> Option<Result<WsFrame, TransportError>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(WsFrame::Text(text))),
                Some(Ok(Message::Binary(data))) => return Some(Ok(WsFrame::Binary(data))),
                Some(Ok(Message::Ping(data))) => return Some(Ok(WsFrame::Ping(data))),
                Some(Ok(Message::Pong(data))) => return Some(Ok(WsFrame::Pong(data))),
                Some(Ok(Message::Close(close_frame))) => {
                    let (code, reason) = close_frame
                        .map(|cf| (cf.code.into(), cf.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    return Some(Ok(WsFrame::Close { code, reason }));
                }
                // Raw frames - skip
                Some(Ok(Message::Frame(_))) => continue,
                Some(Err(e)) => {
                    return Some(Err(TransportError::ConnectionFailed(format!(
                        "WebSocket read error: {e}"
                    ))));
                }
                None => return None,
            }
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, params: &ConnectParams) -> Result<FramePair, TransportError> {
        let url = params.request_url();
        debug!("Opening socket to {}", params.url);

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {e}", params.url)))?;

        if let Some(token) = &params.token {
            let value = http::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TransportError::InvalidEndpoint(format!("bad token header: {e}")))?;
            request
                .headers_mut()
                .insert(http::header::AUTHORIZATION, value);
        }

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("WebSocket connect failed: {e}")))?;

        let (sink, stream) = ws_stream.split();

        Ok((Box::new(WsWriter { sink }), Box::new(WsReader { stream })))
    }
}
