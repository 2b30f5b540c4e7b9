use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{confidence_band, Decision, SignalModel};
use crate::types::{AssetPair, SignalType, Timeframe};

/// Coin-flip CALL/PUT with a confidence drawn from the timeframe's band.
/// Stand-in for a real model; ignores the pair entirely.
pub struct RandomModel {
    rng: Mutex<StdRng>,
}

impl RandomModel {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence, for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalModel for RandomModel {
    fn decide(&self, _pair: AssetPair, timeframe: Timeframe) -> Decision {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let signal_type = if rng.gen_bool(0.5) {
            SignalType::Call
        } else {
            SignalType::Put
        };

        // Draw whole hundredths so the rounded value stays inside [low, high).
        let (low, high) = confidence_band(timeframe);
        let lo = (low * 100.0).round() as u32;
        let hi = (high * 100.0).round() as u32;
        let confidence = f64::from(rng.gen_range(lo..hi)) / 100.0;

        Decision {
            signal_type,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_two_decimals(v: f64) -> bool {
        ((v * 100.0).round() - v * 100.0).abs() < 1e-9
    }

    #[test]
    fn confidence_stays_in_band_for_every_combination() {
        let model = RandomModel::seeded(7);
        for pair in AssetPair::ALL {
            for tf in Timeframe::ALL {
                let (low, high) = confidence_band(tf);
                for _ in 0..200 {
                    let d = model.decide(pair, tf);
                    assert!(
                        d.confidence >= low && d.confidence < high,
                        "{pair} {tf}: confidence={} not in [{low}, {high})",
                        d.confidence
                    );
                    assert!(is_two_decimals(d.confidence), "confidence={}", d.confidence);
                }
            }
        }
    }

    #[test]
    fn both_directions_are_produced() {
        let model = RandomModel::seeded(42);
        let mut calls = 0;
        let mut puts = 0;
        for _ in 0..1000 {
            match model.decide(AssetPair::EurUsd, Timeframe::M1).signal_type {
                SignalType::Call => calls += 1,
                SignalType::Put => puts += 1,
            }
        }
        assert!(calls > 400 && puts > 400, "calls={calls} puts={puts}");
    }

    #[test]
    fn seeded_models_repeat() {
        let a = RandomModel::seeded(99);
        let b = RandomModel::seeded(99);
        for tf in Timeframe::ALL {
            assert_eq!(a.decide(AssetPair::UsdChf, tf), b.decide(AssetPair::UsdChf, tf));
        }
    }

    #[test]
    fn band_edges() {
        assert_eq!(confidence_band(Timeframe::S1), (0.60, 0.90));
        assert_eq!(confidence_band(Timeframe::S5), (0.60, 0.90));
        assert_eq!(confidence_band(Timeframe::S30), (0.75, 0.95));
        assert_eq!(confidence_band(Timeframe::M1), (0.85, 0.95));
        assert_eq!(confidence_band(Timeframe::M5), (0.85, 0.95));
    }
}
