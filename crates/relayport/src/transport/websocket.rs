//! `tokio-tungstenite` socket provider.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use super::{socket_pair, PeerEmitter, Socket, SocketProvider};

/// Opens real WebSocket connections, one background task per socket.
///
/// The task ends when the server closes the connection or when every
/// [`SocketSender`](super::SocketSender) for the socket is dropped.
#[derive(Debug, Clone, Default)]
pub struct TungsteniteProvider {
    origin: Option<String>,
}

impl TungsteniteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `origin` as the `Origin` header of every upgrade request.
    /// Some relays refuse connections without one.
    pub fn with_origin(origin: impl Into<String>) -> Self {
        Self {
            origin: Some(origin.into()),
        }
    }
}

impl SocketProvider for TungsteniteProvider {
    fn open(&self, url: &str) -> Socket {
        let (socket, peer) = socket_pair(url);
        let (emitter, outbound) = peer.split();
        tokio::spawn(drive(url.to_string(), self.origin.clone(), emitter, outbound));
        socket
    }
}

fn build_request(url: &str, origin: Option<&str>) -> Result<Request, String> {
    let mut request = url.into_client_request().map_err(|e| e.to_string())?;
    if let Some(origin) = origin {
        let value = HeaderValue::from_str(origin).map_err(|e| format!("invalid origin: {e}"))?;
        request.headers_mut().insert("Origin", value);
    }
    Ok(request)
}

// ---------------------------------------------------------------------------
// Socket Driver
// ---------------------------------------------------------------------------

async fn drive(
    url: String,
    origin: Option<String>,
    emitter: PeerEmitter,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let request = match build_request(&url, origin.as_deref()) {
        Ok(request) => request,
        Err(e) => {
            emitter.fail(e);
            return;
        }
    };

    let ws_stream = match tokio_tungstenite::connect_async(request).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            warn!(origin = %emitter.origin(), error = %e, "WebSocket connect failed");
            emitter.fail(e.to_string());
            return;
        }
    };

    debug!(origin = %emitter.origin(), "WebSocket open");
    if !emitter.open() {
        return;
    }

    let (mut ws_write, mut ws_read) = ws_stream.split();
    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(text) => {
                    if let Err(e) = ws_write.send(WsMessage::Text(text.into())).await {
                        warn!(error = %e, "WebSocket write failed");
                        emitter.fail(e.to_string());
                        break;
                    }
                }
                None => {
                    debug!(origin = %emitter.origin(), "Socket released, closing");
                    let _ = ws_write.send(WsMessage::Close(None)).await;
                    break;
                }
            },
            incoming = ws_read.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    if !emitter.deliver(text.to_string()) {
                        break;
                    }
                }
                Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => {
                        if !emitter.deliver(text) {
                            break;
                        }
                    }
                    Err(_) => debug!("Dropping non-UTF-8 binary frame"),
                },
                Some(Ok(WsMessage::Close(_))) | None => {
                    info!(origin = %emitter.origin(), "Relay closed connection");
                    emitter.close();
                    break;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    emitter.fail(e.to_string());
                    break;
                }
                _ => {}
            },
        }
    }
}
