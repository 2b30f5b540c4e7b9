use chrono::{DateTime, SecondsFormat, Utc};

/// Raw row of the `signals` table (see migrations/0001_create_signals.sql).
#[derive(Debug, sqlx::FromRow)]
pub struct SignalRow {
    pub id: i64,
    pub pair: String,
    pub timeframe: String,
    #[sqlx(rename = "type")]
    pub signal_type: String,
    /// Milliseconds since the Unix epoch.
    pub entry_time: Option<i64>,
    pub result: Option<String>,
}

/// A persisted signal. Pair/timeframe/type are stored as plain text; their
/// domains are enforced when requests are parsed, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub id: i64,
    pub pair: String,
    pub timeframe: String,
    pub signal_type: String,
    pub entry_time: Option<DateTime<Utc>>,
    /// WIN/LOSS, reserved for outcome tracking. Never written by this service.
    pub result: Option<String>,
}

impl From<SignalRow> for SignalRecord {
    fn from(row: SignalRow) -> Self {
        Self {
            id: row.id,
            pair: row.pair,
            timeframe: row.timeframe,
            signal_type: row.signal_type,
            entry_time: row.entry_time.and_then(DateTime::<Utc>::from_timestamp_millis),
            result: row.result,
        }
    }
}

/// `2024-05-01T12:00:00.000Z`
pub fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
