//! Single-method time-of-flight (SMT) drift-step estimator.
//!
//! The eligible beams are nearly parallel, so they fall into two groups by
//! firing direction: along the mean axis and against it. The group whose
//! electrons return sooner was fired towards the drift target. The difference
//! of the group mean times of flight gives the drift step; the spread inside the
//! groups says how reliably the two directions can be told apart.
//!
//! Result layout: `[separation_us, spread_us, drift_step_m, drift_angle_rad]`.

use std::f64::consts::{PI, TAU};

use tracing::debug;

use super::beam::{BeamPartition, BeamSet};
use super::parallelism::ParallelismResult;
use super::status::StatusCode;
use crate::config::InstrumentConfig;

/// What an estimator hands back to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorResult {
    pub status: StatusCode,
    pub message: String,
    pub result: [f64; 4],
    pub partition: BeamPartition,
}

/// A time-of-flight method the engine can dispatch to once beams pass the
/// parallelism test.
pub trait TofEstimator {
    /// The status this estimator reports on success.
    fn success_code(&self) -> StatusCode;

    /// Estimate from the beams at `eligible` indices of `set`. The returned
    /// partition must only reference those indices.
    fn estimate(
        &self,
        set: &BeamSet,
        eligible: &[usize],
        parallelism: &ParallelismResult,
        config: &InstrumentConfig,
    ) -> EstimatorResult;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SmtEstimator;

impl SmtEstimator {
    fn finish(
        status: StatusCode,
        result: [f64; 4],
        partition: BeamPartition,
        config: &InstrumentConfig,
    ) -> EstimatorResult {
        EstimatorResult {
            status,
            message: config.status_message(status).to_string(),
            result,
            partition,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

impl TofEstimator for SmtEstimator {
    fn success_code(&self) -> StatusCode {
        StatusCode::SmtSuccess
    }

    fn estimate(
        &self,
        set: &BeamSet,
        eligible: &[usize],
        parallelism: &ParallelismResult,
        config: &InstrumentConfig,
    ) -> EstimatorResult {
        let fill = [config.fill_value; 4];
        let axis = parallelism.mean_angle;

        // Split by firing direction relative to the axis.
        let (along, against): (Vec<usize>, Vec<usize>) = eligible.iter().copied().partition(|&i| {
            let off = (set.beams[i].alpha - axis).rem_euclid(TAU);
            !(off > PI / 2.0 && off < 3.0 * PI / 2.0)
        });

        // Without two usable groups, fall back to splitting at the gyrotime.
        let by_gyrotime = || {
            let mut partition = BeamPartition::default();
            for &i in eligible {
                let beam = &set.beams[i];
                partition.insert(i, beam.class, beam.tof < set.tg);
            }
            partition
        };

        let min_side = (config.smt_min_beams_per_side as usize).max(1);
        if along.len() < min_side || against.len() < min_side {
            debug!(
                "SMT: {} beams along / {} against the axis, need {} per side",
                along.len(),
                against.len(),
                min_side
            );
            return Self::finish(StatusCode::SmtTooFewBeams, fill, by_gyrotime(), config);
        }

        let tof = |idx: &[usize]| idx.iter().map(|&i| set.beams[i].tof).collect::<Vec<f64>>();
        let (tof_along, tof_against) = (tof(along.as_slice()), tof(against.as_slice()));
        let (mean_along, mean_against) = (mean(&tof_along), mean(&tof_against));
        let separation = (mean_against - mean_along).abs();
        if !separation.is_finite() || separation == 0.0 {
            return Self::finish(StatusCode::SmtDegenerateTof, fill, by_gyrotime(), config);
        }

        let along_is_towards = mean_along < mean_against;
        let mut partition = BeamPartition::default();
        for &i in &along {
            partition.insert(i, set.beams[i].class, along_is_towards);
        }
        for &i in &against {
            partition.insert(i, set.beams[i].class, !along_is_towards);
        }

        let sum_sq: f64 = tof_along
            .iter()
            .map(|t| (t - mean_along).powi(2))
            .chain(tof_against.iter().map(|t| (t - mean_against).powi(2)))
            .sum();
        let spread = (sum_sq / (tof_along.len() + tof_against.len()) as f64).sqrt();

        // Away beams travel the extra drift step twice over towards beams.
        let drift_step_m = config.electron_speed() * 0.5 * separation * 1e-6;
        let drift_angle = if along_is_towards {
            axis.rem_euclid(TAU)
        } else {
            (axis + PI).rem_euclid(TAU)
        };

        debug!(
            "SMT: separation {:.3} us, spread {:.3} us, d = {:.2} m at {:.1} deg",
            separation,
            spread,
            drift_step_m,
            drift_angle.to_degrees()
        );

        Self::finish(
            StatusCode::SmtSuccess,
            [separation, spread, drift_step_m, drift_angle],
            partition,
            config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edi::beam::{Beam, BeamClass};

    fn set(tofs: &[(f64, f64, BeamClass)]) -> BeamSet {
        BeamSet {
            xd: vec![0.0; tofs.len()],
            yd: vec![0.0; tofs.len()],
            tg: 1000.0,
            bmag: 35.7238,
            beams: tofs
                .iter()
                .map(|&(alpha, tof, class)| Beam {
                    alpha,
                    tri_ok: true,
                    tof,
                    class,
                })
                .collect(),
        }
    }

    fn parallel(mean_angle: f64) -> ParallelismResult {
        ParallelismResult {
            mean_angle,
            stdev_angle: 0.0,
            fit: true,
        }
    }

    #[test]
    fn test_smt_success() {
        let cfg = InstrumentConfig::default();
        let s = set(&[
            (0.3, 998.0, BeamClass::A),
            (0.3, 998.2, BeamClass::B),
            (0.3 + PI, 1002.0, BeamClass::A),
            (0.3 + PI, 1001.8, BeamClass::C),
        ]);
        let r = SmtEstimator.estimate(&s, &[0, 1, 2, 3], &parallel(0.3), &cfg);
        assert_eq!(r.status, StatusCode::SmtSuccess);
        assert_eq!(r.partition.class_a_towards, vec![0]);
        assert_eq!(r.partition.non_a_towards, vec![1]);
        assert_eq!(r.partition.class_a_away, vec![2]);
        assert_eq!(r.partition.non_a_away, vec![3]);
        assert!((r.result[0] - 3.8).abs() < 1e-9);
        assert!((r.result[1] - 0.1).abs() < 1e-9);
        assert!(r.result[2] > 0.0);
        assert!((r.result[3] - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_drift_angle_follows_towards_beams() {
        let cfg = InstrumentConfig::default();
        let s = set(&[(0.3 + PI, 999.0, BeamClass::A), (0.3, 1001.0, BeamClass::A)]);
        let r = SmtEstimator.estimate(&s, &[0, 1], &parallel(0.3), &cfg);
        assert_eq!(r.status, StatusCode::SmtSuccess);
        assert!((r.result[3] - (0.3 + PI)).abs() < 1e-9);
    }

    #[test]
    fn test_one_sided_beams() {
        let cfg = InstrumentConfig::default();
        let s = set(&[(0.3, 998.0, BeamClass::A), (0.3, 997.0, BeamClass::A)]);
        let r = SmtEstimator.estimate(&s, &[0, 1], &parallel(0.3), &cfg);
        assert_eq!(r.status, StatusCode::SmtTooFewBeams);
        assert_eq!(r.message, cfg.status_message(StatusCode::SmtTooFewBeams));
        assert_eq!(r.partition.len(), 2);
    }

    #[test]
    fn test_nan_tof_is_degenerate() {
        let cfg = InstrumentConfig::default();
        let s = set(&[(0.3, 998.0, BeamClass::A), (0.3 + PI, f64::NAN, BeamClass::A)]);
        let r = SmtEstimator.estimate(&s, &[0, 1], &parallel(0.3), &cfg);
        assert_eq!(r.status, StatusCode::SmtDegenerateTof);
    }
}
