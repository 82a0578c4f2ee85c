//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Every accepted TCP stream is upgraded on its own task, so one slow or
//! silent client never holds up the accept loop. Finished connections
//! are queued for [`WebSocketTransport::accept`].
//!
//! Requests are refused with HTTP 400 and a plain-text body when:
//! - they are not complete WebSocket upgrades ([`EXPECTED_WEBSOCKET`]), or
//! - the [`RouteGuard`] rejects the request path.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt, Chain, Join};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::machine::TryParse;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response, create_response, write_response,
};
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode, header};

use crate::{Connection, ConnectionId, RouteGuard, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// How long a client gets to complete the HTTP upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Body of the 400 response to a request that is not a WebSocket upgrade.
pub const EXPECTED_WEBSOCKET: &str = "Expected WebSocket";

/// Largest request head we are willing to buffer before the upgrade.
const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// Upgraded connections waiting for `accept`.
const ACCEPT_QUEUE: usize = 128;

/// The socket with its already-read request head put back in front.
type Replay = Join<Chain<Cursor<Vec<u8>>, OwnedReadHalf>, OwnedWriteHalf>;

type WsStream = tokio_tungstenite::WebSocketStream<Replay>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    local_addr: SocketAddr,
    incoming: mpsc::Receiver<WebSocketConnection>,
    listener: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address and starts
    /// accepting in the background.
    pub async fn bind(
        addr: &str,
        guard: impl RouteGuard,
        handshake_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        let local_addr =
            listener.local_addr().map_err(TransportError::AcceptFailed)?;
        tracing::info!(%local_addr, "WebSocket transport listening");

        let (tx, incoming) = mpsc::channel(ACCEPT_QUEUE);
        let listener = tokio::spawn(listen(
            listener,
            Arc::new(guard),
            handshake_timeout,
            tx,
        ));

        Ok(Self {
            local_addr,
            incoming,
            listener,
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        self.incoming.recv().await.ok_or(TransportError::Shutdown)
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        self.listener.abort();
        tracing::info!(local_addr = %self.local_addr, "WebSocket transport shut down");
        Ok(())
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Accept loop: one upgrade task per TCP stream.
async fn listen<G: RouteGuard>(
    listener: TcpListener,
    guard: Arc<G>,
    handshake_timeout: Duration,
    tx: mpsc::Sender<WebSocketConnection>,
) {
    while !tx.is_closed() {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
                // Usually fd exhaustion; back off instead of spinning.
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let guard = Arc::clone(&guard);
        let tx = tx.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(handshake_timeout, upgrade(stream, &*guard))
                .await
            {
                Ok(Ok(conn)) => {
                    tracing::debug!(
                        id = %conn.id,
                        %addr,
                        route = %conn.route,
                        "accepted WebSocket connection"
                    );
                    // Only fails if the transport is gone; the connection
                    // drops with it.
                    let _ = tx.send(conn).await;
                }
                Ok(Err(e)) => {
                    tracing::debug!(%addr, error = %e, "upgrade refused");
                }
                Err(_) => {
                    tracing::debug!(%addr, "upgrade timed out");
                }
            }
        });
    }
}

/// Reads the request head, validates it, and performs the WebSocket
/// handshake.
async fn upgrade<G: RouteGuard>(
    mut stream: TcpStream,
    guard: &G,
) -> Result<WebSocketConnection, TransportError> {
    let (request, buffered) = read_request_head(&mut stream).await?;

    if !request.as_ref().is_some_and(is_upgrade_request) {
        write_bad_request(&mut stream, EXPECTED_WEBSOCKET).await?;
        return Err(TransportError::Rejected(EXPECTED_WEBSOCKET.into()));
    }

    // tungstenite parses the head again, so hand it the bytes we took.
    let (read_half, write_half) = stream.into_split();
    let replay = tokio::io::join(Cursor::new(buffered).chain(read_half), write_half);

    let mut route = None;
    let mut refusal = None;
    let callback = |request: &Request, response: Response| {
        match guard.route(request.uri().path()) {
            Ok(key) => {
                route = Some(key);
                Ok(response)
            }
            Err(reason) => {
                let rejection = bad_request(&reason);
                refusal = Some(reason);
                Err(rejection)
            }
        }
    };

    let accepted = tokio_tungstenite::accept_hdr_async(replay, callback).await;
    let ws = match accepted {
        Ok(ws) => ws,
        Err(e) => {
            return Err(match refusal {
                Some(reason) => TransportError::Rejected(reason),
                None => TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                )),
            });
        }
    };
    let route = route.ok_or_else(|| {
        TransportError::Rejected("handshake finished without a route".into())
    })?;

    let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
    let (sink, stream) = ws.split();

    Ok(WebSocketConnection {
        id,
        route: Arc::from(route),
        sink: Arc::new(Mutex::new(sink)),
        stream: Arc::new(Mutex::new(stream)),
    })
}

/// Reads until a full request head is buffered.
///
/// Returns the parsed request (`None` if it is not valid HTTP for a
/// WebSocket handshake) and every byte read so far.
async fn read_request_head(
    stream: &mut TcpStream,
) -> Result<(Option<Request>, Vec<u8>), TransportError> {
    let mut buf = Vec::with_capacity(1024);
    loop {
        let n = stream
            .read_buf(&mut buf)
            .await
            .map_err(TransportError::AcceptFailed)?;
        if n == 0 {
            return Err(TransportError::ConnectionClosed(
                "closed before sending a request".into(),
            ));
        }
        match Request::try_parse(&buf) {
            Ok(Some((_, request))) => return Ok((Some(request), buf)),
            Ok(None) if buf.len() < MAX_REQUEST_HEAD => continue,
            Ok(None) => {
                return Err(TransportError::Rejected("request head too large".into()));
            }
            Err(e) => {
                tracing::debug!(error = %e, "malformed request head");
                return Ok((None, buf));
            }
        }
    }
}

/// A complete upgrade: `GET`, HTTP/1.1 or later, `Connection: Upgrade`,
/// `Upgrade: websocket`, version 13 and a key.
fn is_upgrade_request(request: &Request) -> bool {
    create_response(request).is_ok()
}

fn bad_request(reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Answers a request tungstenite never sees.
async fn write_bad_request(
    stream: &mut TcpStream,
    reason: &str,
) -> Result<(), TransportError> {
    let mut response = bad_request(reason);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(reason.len()));
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));

    let mut bytes = Vec::new();
    write_response(&mut bytes, &response).map_err(|e| {
        TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e,
        ))
    })?;
    bytes.extend_from_slice(reason.as_bytes());

    stream
        .write_all(&bytes)
        .await
        .map_err(TransportError::SendFailed)?;
    stream.shutdown().await.map_err(TransportError::SendFailed)
}

/// A single WebSocket connection.
///
/// Read and write halves are locked separately, so a task parked in
/// [`recv`](Connection::recv) never blocks another task's
/// [`send`](Connection::send). Cloning shares the same socket.
#[derive(Clone)]
pub struct WebSocketConnection {
    id: ConnectionId,
    route: Arc<str>,
    sink: Arc<Mutex<SplitSink<WsStream, Message>>>,
    stream: Arc<Mutex<SplitStream<WsStream>>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, frame: &str) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .send(Message::text(frame))
            .await
            .map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })
    }

    async fn recv(&self) -> Result<Option<String>, Self::Error> {
        loop {
            let msg = self.stream.lock().await.next().await;
            match msg {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(data))) => {
                    match String::from_utf8(data.to_vec()) {
                        Ok(text) => return Ok(Some(text)),
                        Err(_) => {
                            tracing::debug!(id = %self.id, "dropping non-UTF-8 binary frame");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn route(&self) -> &str {
        &self.route
    }
}
