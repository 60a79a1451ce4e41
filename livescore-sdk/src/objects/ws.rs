//! WebSocket message types for the live score stream.
//!
//! The `GET /live-stream?date=YYYY-MM-DD` endpoint upgrades to a WebSocket
//! connection and pushes [`LiveMessage`] JSON frames.
//!
//! # Protocol
//!
//! 1. The server sends a [`LiveMessage::Init`] carrying the full
//!    [`AggregationResult`] immediately after the upgrade.
//! 2. On every refresh tick the server sends either a
//!    [`LiveMessage::Update`] with exactly the games whose visible fields
//!    changed, or a [`LiveMessage::Ping`] keepalive when nothing changed.
//! 3. The stream is unidirectional: clients never send data frames. A
//!    client that wants to stop simply closes the socket.
//! 4. If the initial aggregation fails, the server sends a close frame with
//!    an application-defined close code (see [`LiveCloseCode`]).

use serde::{Deserialize, Serialize};

use super::event::Event;
use super::scores::AggregationResult;

/// Server-to-client live stream message.
///
/// Serialized as an internally-tagged JSON object so the client can
/// dispatch on the `"type"` field:
///
/// ```json
/// {"type":"init","date":"2025-06-01","leagues":[ ... ],"hasLive":true}
/// {"type":"update","games":[ ... ],"hasLive":true}
/// {"type":"ping","ts":1748800000000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveMessage {
    /// Full state, sent once per connection.
    Init(AggregationResult),

    /// Games whose score, status, inning, half or outs changed since the
    /// last message on this connection.
    Update {
        games: Vec<Event>,
        #[serde(rename = "hasLive")]
        has_live: bool,
    },

    /// Keepalive with the server's unix timestamp in milliseconds.
    Ping { ts: i64 },
}

impl LiveMessage {
    /// A keepalive stamped with the current time.
    pub fn ping_now() -> Self {
        let now = time::OffsetDateTime::now_utc();
        LiveMessage::Ping {
            ts: (now.unix_timestamp_nanos() / 1_000_000) as i64,
        }
    }
}

/// Well-known WebSocket close codes used by the live stream.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct LiveCloseCode;

impl LiveCloseCode {
    /// Normal closure (server shutdown).
    pub const NORMAL: u16 = 1000;

    /// The initial aggregation could not be produced.
    pub const INTERNAL_ERROR: u16 = 1011;

    /// The `date` query parameter was missing or malformed.
    pub const BAD_DATE: u16 = 4400;
}
