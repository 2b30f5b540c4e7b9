//! HTTP client for the signal API, plus the request-state model the UI
//! renders from.

use std::time::{Duration, Instant};

use crate::error::{AppError, Result};
use crate::types::{
    AssetPair, ErrorBody, GenerateSignalRequest, GenerateSignalResponse, HistoryEntry, Timeframe,
    GENERATE_PATH, HISTORY_PATH,
};

/// The UI never reveals a result before this much time has passed.
pub const MIN_ANALYSIS_DELAY: Duration = Duration::from_millis(2500);

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct SignalClient {
    base_url: String,
    http: reqwest::Client,
}

impl SignalClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a generate request. Non-2xx responses and bodies that do not
    /// match the response contract are errors.
    pub async fn generate(
        &self,
        pair: AssetPair,
        timeframe: Timeframe,
    ) -> Result<GenerateSignalResponse> {
        let url = format!("{}{}", self.base_url, GENERATE_PATH);
        let resp = self
            .http
            .post(&url)
            .json(&GenerateSignalRequest { pair, timeframe })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<ErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => status.to_string(),
            };
            return Err(AppError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = resp.bytes().await?;
        let signal: GenerateSignalResponse = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::InvalidResponse(e.to_string()))?;
        signal.validate()?;
        Ok(signal)
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        let url = format!("{}{}", self.base_url, HISTORY_PATH);
        let resp = self.http.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Api {
                status: status.as_u16(),
                message: status.to_string(),
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| AppError::InvalidResponse(e.to_string()))
    }
}

/// Run the generate request alongside a timer; returns once both are done,
/// so the caller never sees an outcome before `min_delay`.
pub async fn generate_with_min_delay(
    client: &SignalClient,
    pair: AssetPair,
    timeframe: Timeframe,
    min_delay: Duration,
) -> Result<GenerateSignalResponse> {
    let (result, ()) = tokio::join!(
        client.generate(pair, timeframe),
        tokio::time::sleep(min_delay),
    );
    result
}

// ---------------------------------------------------------------------------
// Request state
// ---------------------------------------------------------------------------

/// What the UI shows for one request slot.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestState<T> {
    Idle,
    InFlight { started: Instant },
    Resolved(std::result::Result<T, String>),
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        RequestState::Idle
    }
}

impl<T> RequestState<T> {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, RequestState::InFlight { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            RequestState::Resolved(Ok(v)) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestState::Resolved(Err(e)) => Some(e.as_str()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
