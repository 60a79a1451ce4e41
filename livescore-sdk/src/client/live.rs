//! Reconnecting live-stream consumer with a polling fallback.
//!
//! A [`LiveClient`] is spawned into a supervisor task that owns the
//! connection, its reconnect timer and the local [`LiveState`]. The
//! returned [`LiveHandle`] exposes the local state and lets the host
//! application report visibility changes:
//!
//! - While [`Visibility::Hidden`], the connection is closed (or polling is
//!   paused). Becoming visible again reconnects immediately with the
//!   backoff reset.
//! - In push mode, failures reconnect after [`ReconnectBackoff`] delays;
//!   any `init` resets the backoff.
//! - In polling mode (or when no stream URL can be derived from the base
//!   URL), the full result is fetched on the adaptive cadence and a failed
//!   poll is retried after a fixed [`POLL_RETRY_DELAY`].

use futures_util::{SinkExt, StreamExt};
use time::Date;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use super::{ClientError, ScoresClient};
use crate::backoff::{POLL_RETRY_DELAY, ReconnectBackoff};
use crate::cadence::refresh_interval;
use crate::live_state::{Applied, LiveState};
use crate::objects::{AggregationResult, LiveMessage, iso_date};

/// How the client receives updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// WebSocket push, with automatic fallback to polling when the stream
    /// URL cannot be derived.
    Push,
    /// Periodic `GET /scores` polling.
    Polling,
}

/// Visibility of the host view driving the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Builder for a reconnecting live-score consumer.
#[derive(Debug, Clone)]
pub struct LiveClient {
    scores: ScoresClient,
    date: Date,
    mode: TransportMode,
}

impl LiveClient {
    /// Create a push-mode client for `date`.
    pub fn new(base_url: Url, date: Date) -> Self {
        Self {
            scores: ScoresClient::new(base_url),
            date,
            mode: TransportMode::Push,
        }
    }

    pub fn with_mode(mut self, mode: TransportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replace the default `reqwest::Client` used for polling.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.scores = self.scores.with_http_client(client);
        self
    }

    /// `ws://` / `wss://` URL of the live stream for this client's date.
    ///
    /// Returns `None` when the base URL has no WebSocket counterpart.
    pub fn stream_url(&self) -> Option<Url> {
        let mut url = self.scores.base_url().join("/live-stream").ok()?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            _ => return None,
        };
        url.set_scheme(scheme).ok()?;
        url.query_pairs_mut()
            .append_pair("date", &iso_date::format(self.date));
        Some(url)
    }

    /// Spawn the supervisor task. The client starts visible.
    pub fn spawn(self) -> LiveHandle {
        let (state_tx, state_rx) = watch::channel(None);
        let (visibility_tx, visibility_rx) = watch::channel(Visibility::Visible);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let signals = Signals {
            visibility_rx,
            shutdown_rx,
        };

        let task = match (self.mode, self.stream_url()) {
            (TransportMode::Push, Some(url)) => {
                tokio::spawn(async move { self.run_push(url, state_tx, signals).await })
            }
            (mode, _) => {
                if mode == TransportMode::Push {
                    warn!(
                        base_url = %self.scores.base_url(),
                        "Live stream unavailable for base URL, falling back to polling"
                    );
                }
                tokio::spawn(async move { self.run_polling(state_tx, signals).await })
            }
        };

        LiveHandle {
            state_rx,
            visibility_tx,
            shutdown_tx,
            task,
        }
    }

    /// Push supervisor: connect, consume, reconnect with backoff.
    async fn run_push(
        self,
        url: Url,
        state_tx: watch::Sender<Option<AggregationResult>>,
        mut signals: Signals,
    ) {
        let mut backoff = ReconnectBackoff::new();
        let mut state = LiveState::new();

        loop {
            match signals.wait_visible().await {
                Wait::Shutdown => return,
                Wait::Resumed => backoff.reset(),
                Wait::Ready => {}
            }

            let end = consume_stream(&url, &mut state, &state_tx, &mut backoff, &mut signals).await;
            let err = match end {
                StreamEnd::Shutdown => return,
                StreamEnd::VisibilityChanged => {
                    info!(%url, "Visibility changed, live stream suspended");
                    backoff.reset();
                    continue;
                }
                StreamEnd::Failed(err) => err,
            };

            let delay = backoff.next_delay();
            warn!(
                %url,
                error = %err,
                delay_secs = delay.as_secs(),
                "Live stream failed, reconnecting after backoff"
            );

            match signals.sleep(delay).await {
                Sleep::Shutdown => return,
                Sleep::Elapsed => {}
                // The view went through a hide/show cycle: reconnect as
                // soon as it is visible, starting from the initial delay.
                Sleep::VisibilityChanged => backoff.reset(),
            }
        }
    }

    /// Polling supervisor: fetch on the adaptive cadence.
    async fn run_polling(
        self,
        state_tx: watch::Sender<Option<AggregationResult>>,
        mut signals: Signals,
    ) {
        let mut state = LiveState::new();

        loop {
            if let Wait::Shutdown = signals.wait_visible().await {
                return;
            }

            let delay = match self.scores.get_scores(self.date).await {
                Ok(result) => {
                    let delay = refresh_interval(&result, time::OffsetDateTime::now_utc());
                    state.replace(result);
                    state_tx.send_replace(state.result().cloned());
                    debug!(delay_secs = delay.as_secs(), "Polled scores");
                    delay
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        delay_secs = POLL_RETRY_DELAY.as_secs(),
                        "Poll failed, retrying"
                    );
                    POLL_RETRY_DELAY
                }
            };

            if let Sleep::Shutdown = signals.sleep(delay).await {
                return;
            }
        }
    }
}

/// How a single stream connection ended.
enum StreamEnd {
    Shutdown,
    /// The host view was hidden (and possibly shown again) while connected.
    VisibilityChanged,
    Failed(ClientError),
}

/// Open one WebSocket connection and apply messages until it ends.
async fn consume_stream(
    url: &Url,
    state: &mut LiveState,
    state_tx: &watch::Sender<Option<AggregationResult>>,
    backoff: &mut ReconnectBackoff,
    signals: &mut Signals,
) -> StreamEnd {
    let connected = tokio::select! {
        biased;

        end = signals.interrupted() => return end,
        connected = connect_async(url.as_str()) => connected,
    };
    let (socket, _) = match connected {
        Ok(conn) => conn,
        Err(e) => return StreamEnd::Failed(e.into()),
    };
    debug!(%url, "Live stream connected");
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            biased;

            end = signals.interrupted() => {
                let _ = write.send(Message::Close(None)).await;
                return end;
            }

            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let message: LiveMessage = match serde_json::from_str(&text) {
                            Ok(m) => m,
                            Err(e) => {
                                warn!(error = %e, "Ignoring undecodable live frame");
                                continue;
                            }
                        };
                        if matches!(message, LiveMessage::Init(_)) {
                            backoff.reset();
                        }
                        if state.apply(message) != Applied::Unchanged {
                            state_tx.send_replace(state.result().cloned());
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return StreamEnd::Failed(ClientError::StreamClosed);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return StreamEnd::Failed(e.into()),
                }
            }
        }
    }
}

/// Outcome of waiting for the view to become visible.
enum Wait {
    /// Already visible.
    Ready,
    /// Was hidden and became visible again.
    Resumed,
    Shutdown,
}

/// Outcome of an interruptible sleep.
enum Sleep {
    Elapsed,
    VisibilityChanged,
    Shutdown,
}

/// Control signals owned by the supervisor task.
struct Signals {
    visibility_rx: watch::Receiver<Visibility>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Signals {
    fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    async fn wait_visible(&mut self) -> Wait {
        let mut waited = false;
        loop {
            if self.is_shutdown() {
                return Wait::Shutdown;
            }
            if *self.visibility_rx.borrow_and_update() == Visibility::Visible {
                return if waited { Wait::Resumed } else { Wait::Ready };
            }
            waited = true;

            tokio::select! {
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() {
                        return Wait::Shutdown;
                    }
                }
                changed = self.visibility_rx.changed() => {
                    if changed.is_err() {
                        return Wait::Shutdown;
                    }
                    if *self.visibility_rx.borrow() == Visibility::Visible {
                        info!("View visible again, resuming");
                    }
                }
            }
        }
    }

    /// Resolves when the supervisor is told to stop or the visibility of
    /// the host view changes. Never resolves otherwise.
    async fn interrupted(&mut self) -> StreamEnd {
        tokio::select! {
            biased;

            _ = self.shutdown_rx.wait_for(|stop| *stop) => StreamEnd::Shutdown,
            changed = self.visibility_rx.changed() => {
                if changed.is_err() {
                    StreamEnd::Shutdown
                } else {
                    StreamEnd::VisibilityChanged
                }
            }
        }
    }

    async fn sleep(&mut self, delay: std::time::Duration) -> Sleep {
        tokio::select! {
            changed = self.shutdown_rx.changed() => {
                if changed.is_err() || *self.shutdown_rx.borrow() {
                    Sleep::Shutdown
                } else {
                    Sleep::Elapsed
                }
            }
            changed = self.visibility_rx.changed() => {
                if changed.is_err() {
                    Sleep::Shutdown
                } else {
                    Sleep::VisibilityChanged
                }
            }
            _ = tokio::time::sleep(delay) => Sleep::Elapsed,
        }
    }
}

/// Handle to a spawned [`LiveClient`].
pub struct LiveHandle {
    state_rx: watch::Receiver<Option<AggregationResult>>,
    visibility_tx: watch::Sender<Visibility>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LiveHandle {
    /// Watch the local scoreboard state.
    pub fn state(&self) -> watch::Receiver<Option<AggregationResult>> {
        self.state_rx.clone()
    }

    /// The current local scoreboard, if any has been received.
    pub fn current(&self) -> Option<AggregationResult> {
        self.state_rx.borrow().clone()
    }

    /// Stream of local state changes, starting with the current value.
    pub fn updates(&self) -> WatchStream<Option<AggregationResult>> {
        WatchStream::new(self.state_rx.clone())
    }

    /// Report the visibility of the host view. Reporting the current
    /// visibility again is a no-op.
    pub fn set_visibility(&self, visibility: Visibility) {
        self.visibility_tx.send_if_modified(|current| {
            if *current == visibility {
                false
            } else {
                *current = visibility;
                true
            }
        });
    }

    /// Stop the supervisor and wait for it to close the connection.
    pub async fn shutdown(self) {
        self.shutdown_tx.send_replace(true);
        let _ = self.task.await;
    }
}
