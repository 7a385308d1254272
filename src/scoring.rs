//! # Risk scoring
//!
//! Turns a client's feature vector into a risk score in `[0, 1]`. The
//! default is the deterministic rule-based scorer below; [`RiskScorer`] is
//! the seam where a learned model could be substituted without touching the
//! pipeline. Scorers are selected at construction, never per call.

/// Feature-vector position of the requests-per-second value.
pub const FEATURE_RPS: usize = 0;
/// Feature-vector position of the inter-arrival variance (ms²).
pub const FEATURE_BURSTINESS: usize = 1;
/// Feature-vector position of the endpoint entropy (bits).
pub const FEATURE_ENDPOINT_ENTROPY: usize = 2;
/// Feature-vector position of the lifetime error rate.
pub const FEATURE_ERROR_RATE: usize = 3;

/// A pure mapping from a client feature vector to a risk score.
///
/// Implementations must be total, deterministic, and side-effect-free, and
/// must return a value in `[0, 1]` for every input. Trailing features are
/// optional; implementations treat missing positions as zero.
pub trait RiskScorer: Send + Sync {
    /// Scores the feature vector laid out per the `FEATURE_*` constants.
    fn score(&self, features: &[f32]) -> f32;
}

/// The default deterministic scorer.
///
/// Reads only the rate and burstiness features. Rate carries weight 0.60,
/// burstiness 0.40; a client that is both fast and bursty picks up a
/// combined penalty. Near-zero burstiness at a nontrivial rate is also
/// penalized: metronome-regular arrivals are a machine signature, not a
/// human one.
pub struct RuleBasedScorer;

impl RiskScorer for RuleBasedScorer {
    fn score(&self, features: &[f32]) -> f32 {
        if features.len() < 2 {
            return 0.0;
        }

        let rps = features[FEATURE_RPS];
        let burstiness = features[FEATURE_BURSTINESS];
        let mut risk = 0.0f32;

        // Rate factor (weight 0.60)
        if rps > 100.0 {
            risk += 0.60;
        } else if rps > 50.0 {
            risk += 0.45;
        } else if rps > 20.0 {
            risk += 0.25;
        } else if rps > 10.0 {
            risk += 0.10;
        }

        // Burstiness factor (weight 0.40)
        if burstiness > 3000.0 {
            risk += 0.40;
        } else if burstiness > 1500.0 {
            risk += 0.20;
        } else if burstiness < 100.0 && rps > 5.0 {
            // too uniform
            risk += 0.15;
        }

        // Combined penalty
        if rps > 75.0 && burstiness > 2500.0 {
            risk = (risk + 0.20).min(1.0);
        }

        risk.clamp(0.0, 1.0)
    }
}
