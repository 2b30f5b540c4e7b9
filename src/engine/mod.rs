pub mod random;

pub use random::RandomModel;

use crate::types::{AssetPair, SignalType, Timeframe};

/// Output of a signal model for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub signal_type: SignalType,
    /// In (0, 1], two decimal places.
    pub confidence: f64,
}

/// Turns a validated (pair, timeframe) into a decision.
/// Implementations must not read persisted state.
pub trait SignalModel: Send + Sync {
    fn decide(&self, pair: AssetPair, timeframe: Timeframe) -> Decision;
}

/// Half-open confidence band `[low, high)` for a timeframe.
pub fn confidence_band(timeframe: Timeframe) -> (f64, f64) {
    match timeframe {
        Timeframe::S1 | Timeframe::S5 => (0.60, 0.90),
        Timeframe::S30 => (0.75, 0.95),
        Timeframe::M1 | Timeframe::M5 => (0.85, 0.95),
    }
}
