use std::time::{Duration, Instant};

use signal_desk::client::RequestState;
use signal_desk::error::AppError;
use signal_desk::types::{AssetPair, GenerateSignalResponse, HistoryEntry, Timeframe};

/// Shown for any failed generate request; the error detail goes below it.
pub const ERROR_NOTICE: &str = "Error generating signal. Please check your connection and try again.";

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Pair,
    Timeframe,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug)]
pub struct AppState {
    pub base_url: String,
    pub status: ConnectionStatus,
    pub focus: Focus,
    pub pair_cursor: usize,
    pub timeframe_cursor: usize,
    pub pair: Option<AssetPair>,
    pub timeframe: Option<Timeframe>,
    pub signal: RequestState<GenerateSignalResponse>,
    /// When the current result was revealed. It stays valid for one candle.
    pub revealed_at: Option<Instant>,
    pub notice: Option<String>,
    pub history: Vec<HistoryEntry>,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            status: ConnectionStatus::Connecting,
            focus: Focus::Pair,
            pair_cursor: 0,
            timeframe_cursor: 0,
            pair: None,
            timeframe: None,
            signal: RequestState::Idle,
            revealed_at: None,
            notice: None,
            history: Vec::new(),
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Pair => Focus::Timeframe,
            Focus::Timeframe => Focus::Pair,
        };
    }

    pub fn cursor_down(&mut self) {
        match self.focus {
            Focus::Pair => {
                self.pair_cursor = (self.pair_cursor + 1).min(AssetPair::ALL.len() - 1);
            }
            Focus::Timeframe => {
                self.timeframe_cursor = (self.timeframe_cursor + 1).min(Timeframe::ALL.len() - 1);
            }
        }
    }

    pub fn cursor_up(&mut self) {
        match self.focus {
            Focus::Pair => self.pair_cursor = self.pair_cursor.saturating_sub(1),
            Focus::Timeframe => self.timeframe_cursor = self.timeframe_cursor.saturating_sub(1),
        }
    }

    /// Pick the item under the cursor in the focused list. Selections are
    /// locked while a request is in flight.
    pub fn select_at_cursor(&mut self) {
        if self.signal.is_in_flight() {
            return;
        }
        match self.focus {
            Focus::Pair => self.pair = AssetPair::ALL.get(self.pair_cursor).copied(),
            Focus::Timeframe => self.timeframe = Timeframe::ALL.get(self.timeframe_cursor).copied(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.pair.is_some() && self.timeframe.is_some()
    }

    /// The "get signal" control is enabled only when both selectors are set
    /// and nothing is pending.
    pub fn can_request(&self) -> bool {
        self.is_ready() && !self.signal.is_in_flight()
    }

    /// Move to in-flight and hand back what to request, or None if the
    /// control is disabled.
    pub fn begin_request(&mut self, now: Instant) -> Option<(AssetPair, Timeframe)> {
        if !self.can_request() {
            return None;
        }
        let (pair, timeframe) = (self.pair?, self.timeframe?);
        self.signal = RequestState::InFlight { started: now };
        self.revealed_at = None;
        self.notice = None;
        Some((pair, timeframe))
    }

    pub fn finish_request(
        &mut self,
        result: Result<GenerateSignalResponse, AppError>,
        now: Instant,
    ) {
        match result {
            Ok(signal) => {
                self.signal = RequestState::Resolved(Ok(signal));
                self.revealed_at = Some(now);
            }
            Err(e) => {
                self.signal = RequestState::Resolved(Err(e.to_string()));
                self.revealed_at = None;
                self.notice = Some(ERROR_NOTICE.to_string());
            }
        }
    }

    /// "New analysis": drop the current result.
    pub fn reset(&mut self) {
        if self.signal.is_in_flight() {
            return;
        }
        self.signal = RequestState::Idle;
        self.revealed_at = None;
        self.notice = None;
    }

    /// Time left in the revealed signal's candle; None once it has lapsed
    /// or when nothing is revealed.
    pub fn remaining_validity(&self, now: Instant) -> Option<Duration> {
        let signal = self.signal.value()?;
        let revealed_at = self.revealed_at?;
        let candle = signal.timeframe.parse::<Timeframe>().ok()?.duration();
        let elapsed = now.saturating_duration_since(revealed_at);
        candle.checked_sub(elapsed).filter(|left| !left.is_zero())
    }

    /// Apply a finished history fetch. A failure keeps the last good list.
    pub fn apply_history(&mut self, result: Result<Vec<HistoryEntry>, AppError>) {
        match result {
            Ok(history) => {
                self.history = history;
                self.status = ConnectionStatus::Connected;
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_confidence(confidence: f64) -> String {
    format!("{:.0}%", confidence * 100.0)
}

pub fn format_countdown(left: Duration) -> String {
    let secs = left.as_secs_f64().ceil() as u64;
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

/// `2024-05-01T12:34:56.789Z` -> `12:34:56`. Falls back to the raw string.
pub fn format_entry_time(iso: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(iso)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|_| iso.to_string())
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
