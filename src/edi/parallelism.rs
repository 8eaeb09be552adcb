//! Parallelism test on beam firing angles.
//!
//! Beams are lines, not directions: a beam at α and one at α + π are parallel.
//! The default test therefore works on doubled angles (axial statistics).

use std::f64::consts::PI;

use crate::config::InstrumentConfig;

/// Outcome of a parallelism test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParallelismResult {
    /// Mean beam orientation in [0, π), radians.
    pub mean_angle: f64,
    /// Angular standard deviation, radians.
    pub stdev_angle: f64,
    /// Whether the beams are parallel enough for a method to be attempted.
    pub fit: bool,
}

/// Geometric fitness check run before any estimator.
pub trait ParallelismTest {
    fn test(&self, alphas: &[f64], config: &InstrumentConfig) -> ParallelismResult;
}

/// Axial circular mean and standard deviation from doubled angles.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubledAngleParallelism;

impl ParallelismTest for DoubledAngleParallelism {
    fn test(&self, alphas: &[f64], config: &InstrumentConfig) -> ParallelismResult {
        let n = alphas.len();
        if n == 0 {
            return ParallelismResult {
                mean_angle: f64::NAN,
                stdev_angle: f64::NAN,
                fit: false,
            };
        }

        let (s, c) = alphas.iter().fold((0.0, 0.0), |(s, c), &a| {
            let (sa, ca) = (2.0 * a).sin_cos();
            (s + sa, c + ca)
        });
        let r = (s * s + c * c).sqrt() / n as f64;
        let mean_angle = (s.atan2(c) / 2.0).rem_euclid(PI);
        let stdev_angle = if r >= 1.0 {
            0.0
        } else if r <= 0.0 {
            f64::INFINITY
        } else {
            (-2.0 * r.ln()).sqrt() / 2.0
        };

        let fit = n >= config.parallelism_min_beams as usize
            && stdev_angle <= config.parallelism_max_stdev_deg.to_radians();

        ParallelismResult {
            mean_angle,
            stdev_angle,
            fit,
        }
    }
}
