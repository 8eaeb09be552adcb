//! Frame rotation of field series.
//!
//! A [`RotationSpec`] is either one fixed matrix, one matrix per sample, or a
//! piecewise-constant sequence keyed by start epochs. Rotating a series
//! preserves its shape and recomputes the magnitude column from the rotated
//! vector.

use crate::error::{ProcessingError, Result};
use crate::record::{FieldSeries, SpinAxisSeries};
use crate::time::last_at_or_before;
use crate::{Matrix3, Vector3};

/// A fixed or time-varying rotation.
#[derive(Debug, Clone, PartialEq)]
pub enum RotationSpec {
    /// Same matrix applied to every sample.
    Fixed(Matrix3),
    /// One matrix per sample; length must match the series.
    PerSample(Vec<Matrix3>),
    /// Matrix `i` applies from `starts[i]` until the next start. Samples
    /// before the first start use the first matrix.
    Piecewise {
        starts: Vec<i64>,
        matrices: Vec<Matrix3>,
    },
}

impl RotationSpec {
    pub fn identity() -> Self {
        RotationSpec::Fixed(Matrix3::identity())
    }

    /// The inverse rotation (transpose of each matrix).
    pub fn transpose(&self) -> Self {
        match self {
            RotationSpec::Fixed(m) => RotationSpec::Fixed(m.transpose()),
            RotationSpec::PerSample(ms) => {
                RotationSpec::PerSample(ms.iter().map(|m| m.transpose()).collect())
            }
            RotationSpec::Piecewise { starts, matrices } => RotationSpec::Piecewise {
                starts: starts.clone(),
                matrices: matrices.iter().map(|m| m.transpose()).collect(),
            },
        }
    }

    fn validate(&self, n: usize) -> Result<()> {
        match self {
            RotationSpec::Fixed(_) => Ok(()),
            RotationSpec::PerSample(ms) => ProcessingError::check_len("rotation matrices", n, ms.len()),
            RotationSpec::Piecewise { starts, matrices } => {
                ProcessingError::check_len("piecewise rotation starts", matrices.len(), starts.len())?;
                if matrices.is_empty() {
                    return Err(ProcessingError::InsufficientData {
                        what: "piecewise rotation",
                        needed: 1,
                        found: 0,
                    });
                }
                if starts.windows(2).any(|w| w[0] > w[1]) {
                    return Err(ProcessingError::UnsortedEpochs {
                        what: "piecewise rotation starts",
                    });
                }
                Ok(())
            }
        }
    }

    fn matrix_at(&self, i: usize, t: i64) -> &Matrix3 {
        match self {
            RotationSpec::Fixed(m) => m,
            RotationSpec::PerSample(ms) => &ms[i],
            RotationSpec::Piecewise { starts, matrices } => {
                &matrices[last_at_or_before(starts, t).unwrap_or(0)]
            }
        }
    }
}

/// Rotate a field series.
///
/// `epoch` is only consulted for piecewise rotations but must always match
/// the series length.
pub fn rotate(spec: &RotationSpec, field: &FieldSeries, epoch: &[i64]) -> Result<FieldSeries> {
    ProcessingError::check_len("rotation epoch", field.len(), epoch.len())?;
    spec.validate(field.len())?;
    Ok(FieldSeries::from_vectors(
        field
            .vectors()
            .zip(epoch)
            .enumerate()
            .map(|(i, (v, &t))| spec.matrix_at(i, t) * v),
    ))
}

/// Rotation taking body (BCS) vectors into the spin-plane (SMPA) frame, given
/// the spin axis expressed in BCS.
///
/// SMPA z is the spin axis, x is BCS y crossed with it, and y completes the
/// right-handed set. The rows of the returned matrix are the SMPA axes
/// expressed in BCS.
pub fn smpa_from_bcs(mpa: &Vector3) -> Matrix3 {
    let z = mpa.normalize();
    let mut x = Vector3::y().cross(&z);
    if x.norm() < 1e-12 {
        // Spin axis along BCS y: fall back to BCS z for the reference axis.
        x = Vector3::z().cross(&z);
    }
    let x = x.normalize();
    let y = z.cross(&x);
    Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()])
}

/// Per-sample SMPA -> BCS rotation. `sample_axis[i]` is the index into
/// `mpa` of the spin axis belonging to the table that calibrated sample `i`.
pub fn bcs_from_smpa(mpa: &SpinAxisSeries, sample_axis: &[usize]) -> Result<RotationSpec> {
    ProcessingError::check_len("mpa", mpa.epoch.len(), mpa.axis.len())?;
    let matrices: Vec<Option<Matrix3>> = mpa
        .axis
        .iter()
        .map(|a| {
            let usable = a.iter().all(|c| c.is_finite()) && a.norm() > 0.0;
            usable.then(|| smpa_from_bcs(a).transpose())
        })
        .collect();
    let per_sample = sample_axis
        .iter()
        .map(|&k| {
            matrices
                .get(k)
                .copied()
                .flatten()
                .ok_or(ProcessingError::InvalidSpinAxis { index: k })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(RotationSpec::PerSample(per_sample))
}

/// Rotation by `angle` radians about +z.
pub fn rotation_z(angle: f64) -> Matrix3 {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> FieldSeries {
        FieldSeries::from_xyz(&[[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [3.0, 0.0, 4.0]])
    }

    #[test]
    fn test_identity_preserves_series() {
        let s = series();
        let r = rotate(&RotationSpec::identity(), &s, &[0, 1, 2]).unwrap();
        assert_eq!(r, s);
    }

    #[test]
    fn test_fixed_rotation_recomputes_magnitude() {
        let r = rotate(
            &RotationSpec::Fixed(rotation_z(std::f64::consts::FRAC_PI_2)),
            &series(),
            &[0, 1, 2],
        )
        .unwrap();
        let v = r.vector(0);
        assert!((v - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
        assert!((r.magnitude(2) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_per_sample_length_checked() {
        let spec = RotationSpec::PerSample(vec![Matrix3::identity(); 2]);
        assert!(matches!(
            rotate(&spec, &series(), &[0, 1, 2]),
            Err(ProcessingError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_piecewise_selects_interval() {
        let spec = RotationSpec::Piecewise {
            starts: vec![10, 20],
            matrices: vec![Matrix3::identity(), -Matrix3::identity()],
        };
        let s = FieldSeries::from_xyz(&[[1.0, 0.0, 0.0]; 3]);
        let r = rotate(&spec, &s, &[5, 15, 25]).unwrap();
        assert!((r.vector(0).x - 1.0).abs() < 1e-12);
        assert!((r.vector(1).x - 1.0).abs() < 1e-12);
        assert!((r.vector(2).x + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_smpa_from_bcs_maps_axis_to_z() {
        let mpa = Vector3::new(0.02, -0.01, 1.0);
        let m = smpa_from_bcs(&mpa);
        let z = m * mpa.normalize();
        assert!((z - Vector3::z()).norm() < 1e-12);
        assert!((m * m.transpose() - Matrix3::identity()).norm() < 1e-12);
        assert!((m.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_transpose_inverts() {
        let spec = RotationSpec::Fixed(rotation_z(0.3));
        let s = series();
        let epoch = [0, 1, 2];
        let there = rotate(&spec, &s, &epoch).unwrap();
        let back = rotate(&spec.transpose(), &there, &epoch).unwrap();
        for i in 0..s.len() {
            assert!((back.vector(i) - s.vector(i)).norm() < 1e-12);
        }
    }

    fn axes(axis: Vec<Vector3>) -> SpinAxisSeries {
        SpinAxisSeries {
            epoch: vec![0; axis.len()],
            range: vec![crate::record::Range::Lo; axis.len()],
            axis,
        }
    }

    #[test]
    fn test_bcs_from_smpa_uses_each_samples_axis() {
        let tilted = Vector3::new(0.5, 0.0, 1.0);
        let mpa = axes(vec![Vector3::z(), tilted]);
        let spec = bcs_from_smpa(&mpa, &[0, 1, 0]).unwrap();
        let s = FieldSeries::from_xyz(&[[1.0, 0.0, 0.0]; 3]);
        let r = rotate(&spec, &s, &[0, 1, 2]).unwrap();
        assert!((r.vector(0) - Vector3::x()).norm() < 1e-12);
        assert!((r.vector(1) - smpa_from_bcs(&tilted).transpose() * Vector3::x()).norm() < 1e-12);
        assert!((r.vector(2) - Vector3::x()).norm() < 1e-12);
    }

    #[test]
    fn test_bcs_from_smpa_rejects_bad_axis() {
        let mpa = axes(vec![Vector3::z(), Vector3::zeros(), Vector3::new(f64::NAN, 0.0, 1.0)]);
        assert!(bcs_from_smpa(&mpa, &[0, 0]).is_ok());
        assert_eq!(
            bcs_from_smpa(&mpa, &[0, 1]).unwrap_err(),
            ProcessingError::InvalidSpinAxis { index: 1 }
        );
        assert_eq!(
            bcs_from_smpa(&mpa, &[2]).unwrap_err(),
            ProcessingError::InvalidSpinAxis { index: 2 }
        );
        assert_eq!(
            bcs_from_smpa(&mpa, &[3]).unwrap_err(),
            ProcessingError::InvalidSpinAxis { index: 3 }
        );
    }

    #[test]
    fn test_piecewise_rejects_unsorted_starts() {
        let spec = RotationSpec::Piecewise {
            starts: vec![20, 10],
            matrices: vec![Matrix3::identity(), -Matrix3::identity()],
        };
        let s = FieldSeries::from_xyz(&[[1.0, 0.0, 0.0]; 2]);
        assert_eq!(
            rotate(&spec, &s, &[5, 15]).unwrap_err(),
            ProcessingError::UnsortedEpochs {
                what: "piecewise rotation starts"
            }
        );
    }
}
