//! WebSocket transport using tokio-tungstenite

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::infrastructure::websocket::protocol::{parse_frame, ParsedFrame};
use crate::ports::outbound::{AuthToken, TransportError, TransportPort, TransportSignal, TransportStream};

const EVENT_BUFFER: usize = 64;

/// Opens authenticated WebSocket connections to the event server.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: Url,
}

impl WebSocketTransport {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

#[async_trait]
impl TransportPort for WebSocketTransport {
    async fn open(&self, token: &AuthToken) -> Result<TransportStream, TransportError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|e| TransportError::Handshake(format!("invalid token: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (ws_stream, _response) = connect_async(request)
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        tracing::info!(url = %self.url, "Connected to event server");

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let shutdown = CancellationToken::new();
        tokio::spawn(socket_task(ws_stream, tx, shutdown.clone()));

        Ok(TransportStream::new(rx, shutdown))
    }
}

/// Reads frames until the socket ends or the stream handle is dropped.
async fn socket_task(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    tx: mpsc::Sender<TransportSignal>,
    shutdown: CancellationToken,
) {
    let (mut write, mut read) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("Closing event socket");
                if let Err(e) = write.send(Message::Close(None)).await {
                    tracing::debug!("Failed to send close frame: {}", e);
                }
                return;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                    Ok(ParsedFrame::Event(event)) => {
                        if tx.send(TransportSignal::Event(event)).await.is_err() {
                            return;
                        }
                    }
                    Ok(ParsedFrame::Ignored { event }) => {
                        tracing::debug!(%event, "Ignoring unhandled event");
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse server frame: {}", e);
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    break frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "server closed connection".to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break format!("websocket error: {}", e),
                None => break "socket ended".to_string(),
            }
        }
    };

    let _ = tx.send(TransportSignal::Closed { reason }).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use campuslive_domain::EventCategory;
    use std::sync::{Arc, Mutex, PoisonError};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    #[tokio::test]
    async fn streams_events_then_reports_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let auth_header = Arc::new(Mutex::new(None::<String>));

        let auth_for_server = Arc::clone(&auth_header);
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_hdr_async(socket, |req: &Request, resp: Response| {
                let value = req
                    .headers()
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                *auth_for_server.lock().unwrap_or_else(PoisonError::into_inner) = value;
                Ok::<Response, ErrorResponse>(resp)
            })
            .await
            .expect("handshake");

            for frame in [
                r#"{"event":"typing","data":{}}"#,
                "garbage",
                r#"{"event":"newParticipant","data":{"title":"Chess night","content":"Mo joined"}}"#,
            ] {
                ws.send(Message::Text(frame.to_string())).await.expect("send");
            }
            ws.close(None).await.expect("close");
        });

        let url = Url::parse(&format!("ws://{}/ws", addr)).expect("url");
        let transport = WebSocketTransport::new(url);
        let mut stream = transport
            .open(&AuthToken::new("secret"))
            .await
            .expect("open");

        let Some(TransportSignal::Event(event)) = stream.next().await else {
            panic!("expected an event first");
        };
        assert_eq!(event.category, EventCategory::NewParticipant);
        assert_eq!(event.content, "Mo joined");

        assert!(matches!(
            stream.next().await,
            Some(TransportSignal::Closed { .. })
        ));
        server.await.expect("server task");

        assert_eq!(
            auth_header
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .as_deref(),
            Some("Bearer secret")
        );
    }

    #[tokio::test]
    async fn refused_connection_is_handshake_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let url = Url::parse(&format!("ws://{}/ws", addr)).expect("url");
        let result = WebSocketTransport::new(url)
            .open(&AuthToken::new("secret"))
            .await;

        assert!(matches!(result, Err(TransportError::Handshake(_))));
    }
}
