//! Chat session: one WebSocket connection relaying caller lines to the server
//! and server replies back to the caller until cancellation or the first error.
//!
//! A dedicated task owns the read half of the socket and pushes every decoded
//! `content` into the inbound queue. The calling task owns the write half and
//! waits on whichever comes first: the reader's result, cancellation, or the
//! next outbound line. Both halves are dropped before [`ChatApi::chat`]
//! returns, so the connection is released exactly once on every exit path.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use crate::client::CatClient;
use crate::error::{Error, Result};
use crate::messages::{ServerMessage, UserMessage};

/// Well-known user chat endpoint of a local server.
pub const DEFAULT_WS_URL: &str = "ws://localhost:1865/ws/user";

/// Chat API client.
pub struct ChatApi {
    client: CatClient,
}

impl ChatApi {
    pub(crate) fn new(client: CatClient) -> Self {
        Self { client }
    }

    /// Open a chat session and relay messages until it ends.
    ///
    /// Lines received on `outbound` are trimmed and sent as `{"text": ..}`
    /// frames in order. Every server frame's `content` is pushed to
    /// `inbound`; a full `inbound` queue stalls the reader, not the writer.
    ///
    /// Returns `Ok(())` after a close frame was sent because `cancel` fired
    /// or every `outbound` sender was dropped. Any connect, read, decode or
    /// write failure ends the session and is returned as is.
    pub async fn chat(
        &self,
        cancel: CancellationToken,
        inbound: mpsc::Sender<String>,
        outbound: &mut mpsc::Receiver<String>,
    ) -> Result<()> {
        let url = self.client.ws_url();
        tracing::debug!(%url, "opening chat session");
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(Error::Connect)?;
        tracing::debug!("chat session open");
        run_session(socket, cancel, inbound, outbound).await
    }
}

/// Drive a chat session over an already-open socket.
///
/// [`ChatApi::chat`] calls this with a `tokio-tungstenite` stream; any other
/// duplex message stream works the same way. `socket` is dropped before this
/// returns.
pub async fn run_session<S>(
    socket: S,
    cancel: CancellationToken,
    inbound: mpsc::Sender<String>,
    outbound: &mut mpsc::Receiver<String>,
) -> Result<()>
where
    S: Stream<Item = std::result::Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Send
        + 'static,
{
    let (mut writer, reader) = socket.split();

    let (done_tx, mut done_rx) = oneshot::channel();
    let read_task = ReadTask(Some(tokio::spawn(async move {
        let _ = done_tx.send(read_loop(reader, inbound).await);
    })));

    let result = loop {
        tokio::select! {
            res = &mut done_rx => {
                // The slot is only dropped unfilled if the reader panicked.
                break res.unwrap_or(Err(Error::PeerClosed));
            }
            _ = cancel.cancelled() => {
                tracing::debug!("chat cancelled, closing");
                break send_close(&mut writer).await;
            }
            line = outbound.recv() => match line {
                Some(line) => {
                    if let Err(e) = send_line(&mut writer, &line).await {
                        break Err(e);
                    }
                }
                None => {
                    tracing::debug!("outbound queue closed, closing");
                    break send_close(&mut writer).await;
                }
            },
        }
    };

    read_task.shutdown().await;
    drop(writer);

    if let Err(e) = &result {
        tracing::debug!(error = %e, "chat session failed");
    }
    result
}

/// Handle to the reader task; aborts it when dropped.
struct ReadTask(Option<JoinHandle<()>>);

impl ReadTask {
    /// Stop the reader and wait until it has released the read half.
    async fn shutdown(mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for ReadTask {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

async fn read_loop<R>(mut reader: R, inbound: mpsc::Sender<String>) -> Result<()>
where
    R: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let frame = match reader.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return Err(Error::Read(e)),
            None => return Err(Error::PeerClosed),
        };

        let body = match frame {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(bytes) => bytes,
            Message::Close(frame) => {
                tracing::debug!(?frame, "peer closed chat");
                return Err(Error::PeerClosed);
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };

        let message = ServerMessage::from_slice(&body).map_err(|e| {
            tracing::warn!(error = %e, body = %String::from_utf8_lossy(&body), "undecodable chat frame");
            Error::Decode(e)
        })?;

        inbound
            .send(message.content)
            .await
            .map_err(|_| Error::InboundClosed)?;
    }
}

async fn send_line<W>(writer: &mut W, line: &str) -> Result<()>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let body = UserMessage::new(line).to_json()?;
    tracing::debug!(bytes = body.len(), "sending chat line");
    writer.send(Message::Text(body)).await.map_err(Error::Write)
}

async fn send_close<W>(writer: &mut W) -> Result<()>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    // No wait for the peer's close reply.
    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    };
    writer
        .send(Message::Close(Some(frame)))
        .await
        .map_err(Error::Write)
}
