use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;

use crate::config::WIDGET_REFRESH_SECS;
use crate::model::ForecastSnapshot;
use crate::store::{SnapshotStore, load_snapshot};

pub const PLACEHOLDER_TEMPERATURE: &str = "Loading...";
pub const MISSING_TEMPERATURE: &str = "N/A";

/// A single widget timeline entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetEntry {
    pub date: String,
    pub temperature: String,
    pub refresh_after: String,
}

impl WidgetEntry {
    pub fn placeholder(now: DateTime<Utc>) -> Self {
        Self::with_temperature(now, PLACEHOLDER_TEMPERATURE.to_string())
    }

    fn with_temperature(now: DateTime<Utc>, temperature: String) -> Self {
        let refresh_secs = i64::try_from(WIDGET_REFRESH_SECS).unwrap_or(i64::MAX);
        Self {
            date: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            temperature,
            refresh_after: (now + Duration::seconds(refresh_secs))
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

pub fn temperature_label(snapshot: Option<&ForecastSnapshot>) -> String {
    match snapshot {
        Some(snapshot) => format!("{}°", snapshot.current.temperature_c),
        None => MISSING_TEMPERATURE.to_string(),
    }
}

/// Reads the latest shared snapshot; never fails, a missing snapshot renders as `N/A`.
pub fn timeline_entry<S, N>(store: &S, now_fn: N) -> WidgetEntry
where
    S: SnapshotStore + ?Sized,
    N: Fn() -> DateTime<Utc>,
{
    let snapshot = load_snapshot(store);
    WidgetEntry::with_temperature(now_fn(), temperature_label(snapshot.as_ref()))
}
