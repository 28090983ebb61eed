// clogwatch testdata - Signal patterns
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Signal patterns for synthetic plant channels.
//!
//! Patterns are evaluated at the sample offset from the start of the
//! dataset, in seconds, and can be stacked with `Composite`.

use rand::prelude::*;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Signal pattern definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalPattern {
    /// Constant level.
    Constant { value: f64 },

    /// Sinusoidal wave.
    ///
    /// `value = offset + amplitude * sin(2*PI*t/period_secs + phase)`
    Sine {
        amplitude: f64,
        period_secs: f64,
        phase: f64,
        offset: f64,
    },

    /// Random walk from `start`, reverting toward it with `reversion`
    /// per sample (0 = pure walk).
    RandomWalk {
        start: f64,
        step_std: f64,
        reversion: f64,
    },

    /// Sum of the component patterns.
    Composite(Vec<SignalPattern>),
}

impl SignalPattern {
    pub fn constant(value: f64) -> Self {
        SignalPattern::Constant { value }
    }

    pub fn sine(offset: f64, amplitude: f64, period_secs: f64) -> Self {
        SignalPattern::Sine {
            amplitude,
            period_secs,
            phase: 0.0,
            offset,
        }
    }

    /// Stateless evaluation at `t_secs`.
    ///
    /// A random walk has no memory here and returns `start` plus one step;
    /// use [`PatternState::evaluate`] for the accumulated walk.
    pub fn evaluate(&self, t_secs: f64, rng: &mut (impl Rng + ?Sized)) -> f64 {
        match self {
            SignalPattern::Constant { value } => *value,

            SignalPattern::Sine {
                amplitude,
                period_secs,
                phase,
                offset,
            } => {
                if *period_secs <= 0.0 {
                    return *offset;
                }
                offset + amplitude * (2.0 * PI * t_secs / period_secs + phase).sin()
            }

            SignalPattern::RandomWalk { start, step_std, .. } => start + gaussian(*step_std, rng),

            SignalPattern::Composite(parts) => parts.iter().map(|p| p.evaluate(t_secs, rng)).sum(),
        }
    }
}

/// Zero-mean normal sample; zero for a non-positive or non-finite std.
pub(crate) fn gaussian(std: f64, rng: &mut (impl Rng + ?Sized)) -> f64 {
    if !(std > 0.0 && std.is_finite()) {
        return 0.0;
    }
    Normal::new(0.0, std).map(|n| n.sample(rng)).unwrap_or(0.0)
}

/// Per-channel state for patterns with memory.
#[derive(Debug, Clone, Default)]
pub struct PatternState {
    /// Current random walk level, one slot per walk in evaluation order.
    walks: Vec<f64>,
}

impl PatternState {
    /// Create state initialized for a pattern.
    pub fn for_pattern(pattern: &SignalPattern) -> Self {
        let mut walks = Vec::new();
        collect_walk_starts(pattern, &mut walks);
        Self { walks }
    }

    /// Current levels of the random walks inside the pattern.
    pub fn walk_levels(&self) -> &[f64] {
        &self.walks
    }

    /// Evaluate the pattern, advancing any random walk.
    pub fn evaluate(
        &mut self,
        pattern: &SignalPattern,
        t_secs: f64,
        rng: &mut (impl Rng + ?Sized),
    ) -> f64 {
        let mut slot = 0;
        self.evaluate_at(pattern, t_secs, rng, &mut slot)
    }

    fn evaluate_at(
        &mut self,
        pattern: &SignalPattern,
        t_secs: f64,
        rng: &mut (impl Rng + ?Sized),
        slot: &mut usize,
    ) -> f64 {
        match pattern {
            SignalPattern::RandomWalk {
                start,
                step_std,
                reversion,
            } => {
                let i = *slot;
                *slot += 1;
                if i >= self.walks.len() {
                    self.walks.push(*start);
                }
                let level = self.walks[i];
                let next = level + reversion.clamp(0.0, 1.0) * (start - level) + gaussian(*step_std, rng);
                self.walks[i] = next;
                next
            }

            SignalPattern::Composite(parts) => {
                let mut total = 0.0;
                for part in parts {
                    total += self.evaluate_at(part, t_secs, rng, slot);
                }
                total
            }

            _ => pattern.evaluate(t_secs, rng),
        }
    }
}

fn collect_walk_starts(pattern: &SignalPattern, out: &mut Vec<f64>) {
    match pattern {
        SignalPattern::RandomWalk { start, .. } => out.push(*start),
        SignalPattern::Composite(parts) => parts.iter().for_each(|p| collect_walk_starts(p, out)),
        _ => {}
    }
}
