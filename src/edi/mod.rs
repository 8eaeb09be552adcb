//! EDI beam classification engine.
//!
//! One call classifies one beam set:
//!
//! 1. Keep the triangulation-eligible beams (`tri_ok`).
//! 2. Run the parallelism test on their firing angles. If the beams are not
//!    parallel the attempt ends with [`StatusCode::ParallelismFailed`].
//! 3. Otherwise run the time-of-flight estimator, which partitions the eligible
//!    beams into towards/away and class-A/non-class-A subsets.
//! 4. On estimator success, build the 6-element output and the 180° ambiguity
//!    flag; on estimator failure, forward its status and message unchanged.
//!
//! Method failures are reported in [`EdiOutcome`], never as errors. The engine
//! is the last method in its chain, so it never asks the caller to continue
//! with a secondary (triangulation) method.

pub mod beam;
pub mod parallelism;
pub mod smt;
pub mod status;

use tracing::{debug, warn};

use crate::config::InstrumentConfig;
use crate::error::Result;

pub use beam::{Beam, BeamClass, BeamPartition, BeamSet};
pub use parallelism::{DoubledAngleParallelism, ParallelismResult, ParallelismTest};
pub use smt::{EstimatorResult, SmtEstimator, TofEstimator};
pub use status::StatusCode;

/// Caller options for one classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Suppress any follow-on triangulation attempt. This engine never
    /// requests one, so the flag cannot change `continue_with_secondary`.
    pub no_triangulation: bool,
}

/// Result of one classification attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EdiOutcome {
    /// The estimator succeeded.
    Success {
        code: StatusCode,
        message: String,
        /// `[r0, r1, r2, r3, tg, fill]`: estimator result, target gyrotime,
        /// and a fill value for the unused slot.
        output: [f64; 6],
        /// 180° ambiguity: the second result component exceeds the first.
        ambiguous: bool,
    },
    /// The estimator ran and reported failure.
    SoftFailure { code: StatusCode, message: String },
    /// The parallelism test failed; no estimator was attempted.
    HardFailure { code: StatusCode, message: String },
}

impl EdiOutcome {
    pub fn code(&self) -> StatusCode {
        match self {
            EdiOutcome::Success { code, .. }
            | EdiOutcome::SoftFailure { code, .. }
            | EdiOutcome::HardFailure { code, .. } => *code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            EdiOutcome::Success { message, .. }
            | EdiOutcome::SoftFailure { message, .. }
            | EdiOutcome::HardFailure { message, .. } => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, EdiOutcome::Success { .. })
    }

    /// Output vector; only present on success.
    pub fn output(&self) -> Option<&[f64; 6]> {
        match self {
            EdiOutcome::Success { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Ambiguity flag; only meaningful, and only present, on success.
    pub fn ambiguous(&self) -> Option<bool> {
        match self {
            EdiOutcome::Success { ambiguous, .. } => Some(*ambiguous),
            _ => None,
        }
    }
}

/// Everything returned by [`classify`].
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub outcome: EdiOutcome,
    pub parallelism: ParallelismResult,
    /// Eligible beams split by side and class. Empty on hard failure.
    pub partition: BeamPartition,
    /// Whether the caller should try a secondary method. Always false.
    pub continue_with_secondary: bool,
}

/// 180° ambiguity test on the first two estimator components.
pub fn is_ambiguous(result: &[f64; 4]) -> bool {
    result[1] / result[0] > 1.0
}

/// Classify one beam set with the given parallelism test and estimator.
///
/// Only malformed input (geometry arrays not matching the beams) is an `Err`.
pub fn classify<P, E>(
    set: &BeamSet,
    options: ClassifyOptions,
    config: &InstrumentConfig,
    test: &P,
    estimator: &E,
) -> Result<Classification>
where
    P: ParallelismTest + ?Sized,
    E: TofEstimator + ?Sized,
{
    set.validate()?;

    let eligible = set.eligible();
    let alphas: Vec<f64> = eligible.iter().map(|&i| set.beams[i].alpha).collect();
    let parallelism = test.test(&alphas, config);
    debug!(
        "EDI: {}/{} eligible beams, mean {:.2} deg, stdev {:.2} deg, fit={}, no_triangulation={}",
        eligible.len(),
        set.beams.len(),
        parallelism.mean_angle.to_degrees(),
        parallelism.stdev_angle.to_degrees(),
        parallelism.fit,
        options.no_triangulation
    );

    if !parallelism.fit {
        let code = StatusCode::ParallelismFailed;
        return Ok(Classification {
            outcome: EdiOutcome::HardFailure {
                code,
                message: config.status_message(code).to_string(),
            },
            parallelism,
            partition: BeamPartition::default(),
            continue_with_secondary: false,
        });
    }

    let EstimatorResult {
        status,
        message,
        result,
        mut partition,
    } = estimator.estimate(set, &eligible, &parallelism, config);

    // Ineligible beams never appear in the partition.
    partition.retain(|i| set.beams.get(i).is_some_and(|b| b.tri_ok));

    let outcome = if status == estimator.success_code() {
        EdiOutcome::Success {
            code: status,
            message,
            output: [
                result[0],
                result[1],
                result[2],
                result[3],
                set.tg,
                config.fill_value,
            ],
            ambiguous: is_ambiguous(&result),
        }
    } else {
        warn!("EDI estimator failed: {} ({})", message, status.code());
        EdiOutcome::SoftFailure {
            code: status,
            message,
        }
    };

    Ok(Classification {
        outcome,
        parallelism,
        partition,
        continue_with_secondary: false,
    })
}

/// Classify with the doubled-angle parallelism test and the SMT estimator.
pub fn classify_smt(
    set: &BeamSet,
    options: ClassifyOptions,
    config: &InstrumentConfig,
) -> Result<Classification> {
    classify(set, options, config, &DoubledAngleParallelism, &SmtEstimator)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Estimator returning a canned result.
    struct Canned {
        status: StatusCode,
        result: [f64; 4],
    }

    impl TofEstimator for Canned {
        fn success_code(&self) -> StatusCode {
            StatusCode::SmtSuccess
        }

        fn estimate(
            &self,
            set: &BeamSet,
            _eligible: &[usize],
            _parallelism: &ParallelismResult,
            _config: &InstrumentConfig,
        ) -> EstimatorResult {
            // Deliberately claims every beam, eligible or not.
            let mut partition = BeamPartition::default();
            for (i, b) in set.beams.iter().enumerate() {
                partition.insert(i, b.class, b.tof < set.tg);
            }
            EstimatorResult {
                status: self.status,
                message: "canned".to_string(),
                result: self.result,
                partition,
            }
        }
    }

    fn beams() -> BeamSet {
        let mk = |alpha: f64, tri_ok: bool, tof: f64| Beam {
            alpha,
            tri_ok,
            tof,
            class: BeamClass::A,
        };
        BeamSet {
            xd: vec![0.0; 4],
            yd: vec![0.0; 4],
            tg: 1000.0,
            bmag: 35.7238,
            beams: vec![
                mk(0.5, true, 999.0),
                mk(0.5 + std::f64::consts::PI, true, 1001.0),
                mk(2.0, false, 999.5),
                mk(0.501, true, 999.2),
            ],
        }
    }

    #[test]
    fn test_ambiguity_ratio() {
        assert!(is_ambiguous(&[2.0, 3.0, 0.0, 0.0]));
        assert!(!is_ambiguous(&[3.0, 2.0, 0.0, 0.0]));
        assert!(!is_ambiguous(&[2.0, 2.0, 0.0, 0.0]));
    }

    #[test]
    fn test_success_output_layout() {
        let cfg = InstrumentConfig::default();
        let est = Canned {
            status: StatusCode::SmtSuccess,
            result: [2.0, 3.0, 4.0, 5.0],
        };
        let c = classify(&beams(), ClassifyOptions::default(), &cfg, &DoubledAngleParallelism, &est)
            .unwrap();
        assert_eq!(
            c.outcome.output(),
            Some(&[2.0, 3.0, 4.0, 5.0, 1000.0, cfg.fill_value])
        );
        assert_eq!(c.outcome.ambiguous(), Some(true));
        assert!(!c.continue_with_secondary);
        // Beam 2 is not triangulation-eligible.
        assert!(c.partition.all().all(|i| i != 2));
        assert_eq!(c.partition.len(), 3);
    }

    #[test]
    fn test_soft_failure_forwarded_verbatim() {
        let cfg = InstrumentConfig::default();
        let est = Canned {
            status: StatusCode::SmtDegenerateTof,
            result: [0.0; 4],
        };
        let c = classify(&beams(), ClassifyOptions::default(), &cfg, &DoubledAngleParallelism, &est)
            .unwrap();
        assert_eq!(
            c.outcome,
            EdiOutcome::SoftFailure {
                code: StatusCode::SmtDegenerateTof,
                message: "canned".to_string()
            }
        );
        assert!(c.outcome.output().is_none());
        assert!(!c.continue_with_secondary);
    }

    #[test]
    fn test_parallelism_failure_is_hard() {
        let cfg = InstrumentConfig::default();
        let mut set = beams();
        set.beams[3].alpha = 1.6;
        let c = classify_smt(
            &set,
            ClassifyOptions {
                no_triangulation: true,
            },
            &cfg,
        )
        .unwrap();
        assert_eq!(c.outcome.code(), StatusCode::ParallelismFailed);
        assert!(matches!(c.outcome, EdiOutcome::HardFailure { .. }));
        assert_eq!(c.outcome.message(), cfg.status_message(StatusCode::ParallelismFailed));
        assert!(c.outcome.output().is_none());
        assert!(c.partition.is_empty());
        assert!(!c.continue_with_secondary);
    }

    #[test]
    fn test_misaligned_geometry_is_error() {
        let cfg = InstrumentConfig::default();
        let mut set = beams();
        set.xd.pop();
        assert!(classify_smt(&set, ClassifyOptions::default(), &cfg).is_err());
    }
}
