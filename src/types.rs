//! Request/response contract shared by the HTTP API and the client.
//! The enumerations here are the only definition of the valid domains.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub const GENERATE_PATH: &str = "/api/signals/generate";
pub const HISTORY_PATH: &str = "/api/signals/history";

// ---------------------------------------------------------------------------
// Asset pairs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetPair {
    #[serde(rename = "EUR/USD OTC")]
    EurUsd,
    #[serde(rename = "GBP/USD OTC")]
    GbpUsd,
    #[serde(rename = "USD/JPY OTC")]
    UsdJpy,
    #[serde(rename = "AUD/USD OTC")]
    AudUsd,
    #[serde(rename = "USD/CHF OTC")]
    UsdChf,
    #[serde(rename = "EUR/GBP OTC")]
    EurGbp,
    #[serde(rename = "EUR/JPY OTC")]
    EurJpy,
    #[serde(rename = "GBP/JPY OTC")]
    GbpJpy,
}

impl AssetPair {
    pub const ALL: [AssetPair; 8] = [
        AssetPair::EurUsd,
        AssetPair::GbpUsd,
        AssetPair::UsdJpy,
        AssetPair::AudUsd,
        AssetPair::UsdChf,
        AssetPair::EurGbp,
        AssetPair::EurJpy,
        AssetPair::GbpJpy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetPair::EurUsd => "EUR/USD OTC",
            AssetPair::GbpUsd => "GBP/USD OTC",
            AssetPair::UsdJpy => "USD/JPY OTC",
            AssetPair::AudUsd => "AUD/USD OTC",
            AssetPair::UsdChf => "USD/CHF OTC",
            AssetPair::EurGbp => "EUR/GBP OTC",
            AssetPair::EurJpy => "EUR/JPY OTC",
            AssetPair::GbpJpy => "GBP/JPY OTC",
        }
    }
}

impl std::fmt::Display for AssetPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AssetPair {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        AssetPair::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("unknown asset pair {s:?}")))
    }
}

// ---------------------------------------------------------------------------
// Timeframes
// ---------------------------------------------------------------------------

/// Nominal validity of a signal: one candle of this length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1s")]
    S1,
    #[serde(rename = "5s")]
    S5,
    #[serde(rename = "30s")]
    S30,
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
}

impl Timeframe {
    pub const ALL: [Timeframe; 5] = [
        Timeframe::S1,
        Timeframe::S5,
        Timeframe::S30,
        Timeframe::M1,
        Timeframe::M5,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::S1 => "1s",
            Timeframe::S5 => "5s",
            Timeframe::S30 => "30s",
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
        }
    }

    /// Candle length.
    pub fn duration(&self) -> Duration {
        let secs = match self {
            Timeframe::S1 => 1,
            Timeframe::S5 => 5,
            Timeframe::S30 => 30,
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
        };
        Duration::from_secs(secs)
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Timeframe::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("unknown timeframe {s:?}")))
    }
}

// ---------------------------------------------------------------------------
// Signal type
// ---------------------------------------------------------------------------

/// CALL = buy direction, PUT = sell direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Call,
    Put,
}

impl SignalType {
    pub const ALL: [SignalType; 2] = [SignalType::Call, SignalType::Put];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Call => "CALL",
            SignalType::Put => "PUT",
        }
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SignalType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        SignalType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("unknown signal type {s:?}")))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateSignalRequest {
    pub pair: AssetPair,
    pub timeframe: Timeframe,
}

impl GenerateSignalRequest {
    /// Validate a raw request body. Anything other than a JSON object whose
    /// `pair` and `timeframe` are members of their enumerations is rejected.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| AppError::Validation(e.to_string()))?;
        if !value.is_object() {
            return Err(AppError::Validation("request body must be an object".to_string()));
        }
        serde_json::from_value(value).map_err(|e| AppError::Validation(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateSignalResponse {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub pair: String,
    pub timeframe: String,
    /// ISO-8601, UTC.
    pub timestamp: String,
    pub confidence: f64,
}

impl GenerateSignalResponse {
    /// Shape checks that typed deserialization alone does not cover.
    pub fn validate(&self) -> Result<()> {
        if chrono::DateTime::parse_from_rfc3339(&self.timestamp).is_err() {
            return Err(AppError::InvalidResponse(format!(
                "timestamp {:?} is not ISO-8601",
                self.timestamp
            )));
        }
        if !self.confidence.is_finite() || self.confidence <= 0.0 || self.confidence > 1.0 {
            return Err(AppError::InvalidResponse(format!(
                "confidence {} outside (0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub pair: String,
    pub timeframe: String,
    #[serde(rename = "type")]
    pub signal_type: String,
    #[serde(rename = "entryTime")]
    pub entry_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
