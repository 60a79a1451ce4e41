//! Axum server setup and router configuration.

use crate::api;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    api::router().with_state(state)
}

/// Run the server with graceful shutdown support.
///
/// On SIGTERM/SIGINT, `shutdown_tx` is flipped to `true` so live sessions
/// and background tasks stop, then in-flight requests are drained.
pub async fn run_server(
    router: Router,
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_tx.send_replace(true);
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use futures_util::StreamExt;
    use livescore_core::config::{CacheConfig, RetryPolicy};
    use livescore_core::processors::{Aggregator, AggregatorContext, SourceSlot};
    use livescore_core::rate_limit::DomainRateLimiter;
    use livescore_core::sources::{FetchError, SourceAdapter};
    use livescore_sdk::client::LiveClient;
    use livescore_sdk::objects::{
        AggregationResult, Competitor, Event, EventDetail, EventStatus, HealthResponse,
        HealthStatus, LiveCloseCode,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use time::Date;
    use time::macros::{date, datetime};
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tower::ServiceExt;

    /// Source returning a fixed list of games, or failing when `games` is
    /// `None`.
    struct FixedSource {
        id: &'static str,
        games: Option<Vec<Event>>,
    }

    #[async_trait]
    impl SourceAdapter for FixedSource {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.id
        }

        async fn fetch_events(
            &self,
            _date: Date,
            _limiter: &DomainRateLimiter,
        ) -> Result<Vec<Event>, FetchError> {
            self.games.clone().ok_or_else(|| FetchError::Transient {
                message: "upstream timed out".into(),
            })
        }

        async fn fetch_event_detail(
            &self,
            id: &str,
            _limiter: &DomainRateLimiter,
        ) -> Result<EventDetail, FetchError> {
            let games = self.games.as_ref().ok_or_else(|| FetchError::Transient {
                message: "upstream timed out".into(),
            })?;
            let event = games
                .iter()
                .find(|g| g.id == id)
                .cloned()
                .ok_or(FetchError::NotFound)?;
            Ok(EventDetail {
                event,
                summary: Some("box score".into()),
                extra: serde_json::Value::Null,
            })
        }
    }

    fn game(id: &str) -> Event {
        Event {
            id: id.into(),
            league: "mlb".into(),
            status: EventStatus::Live,
            home: Competitor {
                name: "Cubs".into(),
                abbreviation: Some("CHC".into()),
                score: Some(2),
            },
            away: Competitor {
                name: "Mets".into(),
                abbreviation: Some("NYM".into()),
                score: Some(1),
            },
            situation: None,
            start_time: datetime!(2025-06-01 18:05 UTC),
            updated_at: None,
        }
    }

    fn test_state() -> (AppState, watch::Sender<bool>) {
        let sources = vec![
            FixedSource {
                id: "mlb",
                games: Some(vec![game("7")]),
            },
            FixedSource {
                id: "nba",
                games: None,
            },
        ];
        let ctx = AggregatorContext::from_config(
            sources.iter().map(|s| s.id),
            &CacheConfig::default(),
            &[],
            RetryPolicy::new(0, Duration::from_millis(1)),
        );
        let slots = sources
            .into_iter()
            .map(|s| SourceSlot::new(Arc::new(s), false))
            .collect();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = AppState::new(Arc::new(Aggregator::new(slots, ctx)), shutdown_rx);
        (state, shutdown_tx)
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_scores_returns_partial_result() {
        let (state, _shutdown_tx) = test_state();
        let (status, body) = get(build_router(state), "/scores?date=2025-06-01").await;

        assert_eq!(status, StatusCode::OK);
        let result: AggregationResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.date, date!(2025 - 06 - 01));
        assert_eq!(result.leagues.len(), 2);
        assert_eq!(result.leagues[0].games[0].id, "7");
        assert!(result.leagues[1].is_error());
        assert!(result.has_live);
    }

    #[tokio::test]
    async fn test_scores_rejects_bad_or_missing_date() {
        let (state, _shutdown_tx) = test_state();
        let router = build_router(state);

        let (status, _) = get(router.clone(), "/scores?date=06-01-2025").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get(router, "/scores").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_reflects_fetch_outcomes() {
        let (state, _shutdown_tx) = test_state();
        let router = build_router(state);

        let (_, body) = get(router.clone(), "/health").await;
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert!(health.sources.iter().all(|s| s.status == HealthStatus::Unknown));

        get(router.clone(), "/scores?date=2025-06-01").await;

        let (status, body) = get(router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.sources[0].source, "mlb");
        assert_eq!(health.sources[0].status, HealthStatus::Healthy);
        assert_eq!(health.sources[1].status, HealthStatus::Degraded);
        assert_eq!(health.sources[1].consecutive_fails, 1);
        assert!(health.sources[1].last_error.is_some());
    }

    #[tokio::test]
    async fn test_event_detail_status_codes() {
        let (state, _shutdown_tx) = test_state();
        let router = build_router(state);

        let (status, body) = get(router.clone(), "/events/mlb/7").await;
        assert_eq!(status, StatusCode::OK);
        let detail: EventDetail = serde_json::from_slice(&body).unwrap();
        assert_eq!(detail.event.id, "7");

        let (status, _) = get(router.clone(), "/events/mlb/99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get(router.clone(), "/events/nfl/7").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get(router, "/events/nba/1").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    async fn serve(state: AppState) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(state);
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        addr
    }

    #[tokio::test]
    async fn test_live_client_receives_init() {
        let (state, _shutdown_tx) = test_state();
        let addr = serve(state).await;

        let base = url::Url::parse(&format!("http://{addr}/")).unwrap();
        let handle = LiveClient::new(base, date!(2025 - 06 - 01)).spawn();

        let mut state_rx = handle.state();
        let result = tokio::time::timeout(Duration::from_secs(5), state_rx.wait_for(Option::is_some))
            .await
            .unwrap()
            .unwrap()
            .clone()
            .unwrap();
        assert_eq!(result.leagues[0].id, "mlb");
        assert!(result.has_live);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_live_stream_bad_date_closes_with_code() {
        let (state, _shutdown_tx) = test_state();
        let addr = serve(state).await;

        let (mut socket, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}/live-stream?date=tomorrow"))
                .await
                .unwrap();
        match socket.next().await {
            Some(Ok(WsMessage::Close(Some(frame)))) => {
                assert_eq!(u16::from(frame.code), LiveCloseCode::BAD_DATE);
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_live_stream_closes_normally_on_shutdown() {
        let (state, shutdown_tx) = test_state();
        let addr = serve(state).await;

        let (mut socket, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}/live-stream?date=2025-06-01"))
                .await
                .unwrap();
        let init = socket.next().await.unwrap().unwrap();
        assert!(init.to_text().unwrap().contains(r#""type":"init""#));

        shutdown_tx.send_replace(true);
        match socket.next().await {
            Some(Ok(WsMessage::Close(Some(frame)))) => {
                assert_eq!(u16::from(frame.code), LiveCloseCode::NORMAL);
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }
}
