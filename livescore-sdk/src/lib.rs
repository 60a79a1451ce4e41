//! Shared types for the livescore aggregation server.
//!
//! - [`objects`]: the event model and every JSON body the server produces.
//! - [`cadence`]: the adaptive refresh interval used by both the push loop
//!   and polling clients.
//! - [`backoff`]: reconnect policy for live stream consumers.
//! - [`live_state`]: client-side state fed by live stream messages.
//! - `client` (feature `client`): REST and reconnecting live clients.

pub mod backoff;
pub mod cadence;
pub mod live_state;
pub mod objects;

#[cfg(feature = "client")]
pub mod client;
