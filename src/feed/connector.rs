use std::time::Duration;

use futures_util::StreamExt;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::feed::types::ScoreEvent;

pub type FeedResult<T> = core::result::Result<T, FeedError>;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed connection error: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("feed connection closed by remote")]
    Closed,
}

/// Connection lifecycle. There is no terminal state — the connector
/// cycles back to `Connecting` until cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Disconnected,
    Connecting,
    Connected,
}

pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Owns the single realtime connection to the score feed. Decoded events
/// go out over an unbounded channel in arrival order; the consumer side
/// decides what runs concurrently.
#[derive(Debug)]
pub struct FeedConnector {
    url: String,
    reconnect_delay: Duration,
    events: UnboundedSender<ScoreEvent>,
    state: watch::Sender<FeedState>,
}

impl FeedConnector {
    pub fn new(url: &str, events: UnboundedSender<ScoreEvent>) -> Self {
        let (state, _) = watch::channel(FeedState::Disconnected);

        Self {
            url: url.to_string(),
            reconnect_delay: RECONNECT_DELAY,
            events,
            state,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn state(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    /// Run until cancelled. Every close or connect failure schedules one
    /// reconnect attempt after the configured delay; attempts are
    /// unbounded, the feed is expected to come back.
    #[instrument(skip(self, cancel), fields(url = %self.url))]
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            self.state.send_replace(FeedState::Connecting);

            match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    self.state.send_replace(FeedState::Connected);
                    info!("connected to score feed");

                    match self.read_stream(stream, &cancel).await {
                        Ok(()) => break, // cancelled
                        Err(err) => warn!(error = %err, "lost score feed connection"),
                    }
                }
                Err(err) => {
                    warn!(error = %err, "score feed connect failed");
                }
            }

            self.state.send_replace(FeedState::Disconnected);
            info!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "reconnecting to score feed"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = cancel.cancelled() => break,
            }
        }

        self.state.send_replace(FeedState::Disconnected);
    }

    /// Read frames until the connection drops. `Ok(())` means the caller
    /// cancelled; any disconnect comes back as an error for `run` to
    /// report before scheduling the retry.
    async fn read_stream(
        &self,
        stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
        cancel: &CancellationToken,
    ) -> FeedResult<()> {
        let (_, mut reader) = stream.split();

        loop {
            tokio::select! {
                incoming = reader.next() => match incoming {
                    Some(Ok(Message::Text(raw))) => self.decode_and_forward(raw.as_str()),
                    Some(Ok(Message::Close(frame))) => {
                        info!(frame = ?frame, "score feed sent close frame");
                        return Err(FeedError::Closed);
                    }
                    // ping/pong/binary: nothing to decode
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(FeedError::Connection(err)),
                    None => return Err(FeedError::Closed),
                },

                _ = cancel.cancelled() => {
                    info!("feed shutdown requested");
                    return Ok(());
                }
            }
        }
    }

    /// A malformed payload is dropped with a report; one bad message
    /// never tears the connection down.
    fn decode_and_forward(&self, raw: &str) {
        match serde_json::from_str::<ScoreEvent>(raw) {
            Ok(event) => {
                if self.events.send(event).is_err() {
                    error!("score receiver dropped; discarding event");
                }
            }
            Err(err) => {
                warn!(error = %err, payload_len = raw.len(), "dropping malformed feed payload");
            }
        }
    }
}
