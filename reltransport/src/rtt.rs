//! RTT estimation and RTO derivation.
//!
//! Unlike Jacobson/Karels (RFC 6298) smoothing, this estimator uses a single
//! exponentially-weighted moving average with `alpha = 0.875` and derives
//! `RTO = max(2 * RTT, min_rto)` directly, with no separate variance term.
//! The first sample (seeded from the handshake's elapsed wall-clock)
//! initializes `RTT` directly rather than being passed through the
//! smoother.

use std::time::Duration;

/// Smoothed RTT estimator using a single-EWMA update rule.
#[derive(Debug, Clone, Copy)]
pub struct RttEstimator {
    /// Smoothed round-trip estimate, in seconds. `None` until the first sample.
    rtt: Option<f64>,
    /// Current retransmission timeout, in seconds.
    rto: f64,
    alpha: f64,
    min_rto: f64,
    bootstrap_rto: f64,
}

impl RttEstimator {
    pub fn new(alpha: f64, min_rto: Duration, bootstrap_rto: Duration) -> Self {
        Self {
            rtt: None,
            rto: bootstrap_rto.as_secs_f64(),
            alpha,
            min_rto: min_rto.as_secs_f64(),
            bootstrap_rto: bootstrap_rto.as_secs_f64(),
        }
    }

    /// Feed a new RTT sample (seconds). The first call sets `RTT` directly;
    /// subsequent calls apply `RTT <- alpha*RTT + (1-alpha)*sample`.
    pub fn update(&mut self, sample: f64) {
        self.rtt = Some(match self.rtt {
            None => sample,
            Some(prev) => self.alpha * prev + (1.0 - self.alpha) * sample,
        });
        self.rto = (2.0 * self.rtt.unwrap()).max(self.min_rto);
    }

    /// Current smoothed RTT in seconds, if a sample has been taken.
    pub fn rtt(&self) -> Option<f64> {
        self.rtt
    }

    /// Current RTO in seconds.
    pub fn rto(&self) -> f64 {
        self.rto
    }

    pub fn rto_duration(&self) -> Duration {
        Duration::from_secs_f64(self.rto)
    }

    /// Reset RTO to the bootstrap value, leaving any existing RTT sample
    /// untouched. Unused by the current engine but kept for symmetry with
    /// `update`; a future reconnection path would call this.
    pub fn reset_rto(&mut self) {
        self.rto = self.bootstrap_rto;
    }
}
