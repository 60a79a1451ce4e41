//! Long-running units of work built on the sources.
//!
//! - `Aggregator`: one concurrent pass over all sources per request,
//!   producing an `AggregationResult`
//! - `LiveSession`: per-subscriber loop that re-runs the aggregation on an
//!   adaptive cadence and pushes changed games

pub mod aggregator;
pub mod live_session;

pub use aggregator::{
    AggregateError, Aggregator, AggregatorContext, DetailError, ResultProvider, SourceSlot,
};
pub use live_session::{ConnectionSnapshot, LiveSession};
