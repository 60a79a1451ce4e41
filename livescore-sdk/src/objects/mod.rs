pub mod event;
pub mod health;
pub mod scores;
pub mod ws;

pub use event::{
    Competitor, Event, EventDetail, EventStatus, InningHalf, Runners, Situation,
    VolatileProjection,
};
pub use health::{HealthResponse, HealthStatus, SourceHealthReport};
pub use scores::{AggregationResult, LeagueGroup, STALE_NOTICE};
pub use ws::{LiveCloseCode, LiveMessage};

/// `YYYY-MM-DD` (de)serialization for [`time::Date`], the format used by
/// every `date` query parameter and field.
pub mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;
    use time::format_description::BorrowedFormatItem;
    use time::macros::format_description;

    const FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

    /// Parse a `YYYY-MM-DD` string.
    pub fn parse(s: &str) -> Result<Date, time::error::Parse> {
        Date::parse(s, FORMAT)
    }

    /// Format a date as `YYYY-MM-DD`.
    pub fn format(date: Date) -> String {
        date.format(FORMAT).unwrap_or_default()
    }

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let s = date.format(FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

}
