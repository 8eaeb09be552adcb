//! Despin strategies: spin-plane (SMPA) -> despun (DMPA) rotations.
//!
//! Two sources of spin phase are supported. Definitive attitude is preferred;
//! it assumes the major principal axis coincides with the angular-momentum
//! vector, so despinning is a rotation about SMPA +z by the spin phase. When no
//! attitude is available, the phase is reconstructed from sun-sensor pulses.
//! [`DespinInputs::resolve`] picks the strategy from what was supplied.

use std::f64::consts::TAU;

use tracing::{debug, info};

use crate::config::InstrumentConfig;
use crate::error::{ProcessingError, Result};
use crate::rotation::{rotation_z, RotationSpec};
use crate::time::last_at_or_before;
use crate::Vector3;

/// A way of producing the SMPA -> DMPA rotation for a set of epochs.
pub trait DespinStrategy {
    fn name(&self) -> &'static str;

    /// One rotation per epoch.
    fn rotation(&self, epoch: &[i64], config: &InstrumentConfig) -> Result<RotationSpec>;
}

/// Definitive attitude samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttitudeSeries {
    pub epoch: Vec<i64>,
    /// Spin phase in degrees, wrapped to [0, 360).
    pub phase_deg: Vec<f64>,
    /// Angular-momentum unit vector in the inertial frame.
    pub l_vector: Vec<Vector3>,
}

impl AttitudeSeries {
    fn validate(&self) -> Result<()> {
        ProcessingError::check_len("attitude phase", self.epoch.len(), self.phase_deg.len())?;
        ProcessingError::check_len("attitude L vector", self.epoch.len(), self.l_vector.len())?;
        if self.epoch.len() < 2 {
            return Err(ProcessingError::InsufficientData {
                what: "attitude samples",
                needed: 2,
                found: self.epoch.len(),
            });
        }
        Ok(())
    }

    /// Phase in radians, unwrapped so consecutive samples differ by less than π.
    fn unwrapped_phase(&self) -> Vec<f64> {
        let mut out: Vec<f64> = Vec::with_capacity(self.phase_deg.len());
        for &p in &self.phase_deg {
            let p = p.to_radians();
            match out.last() {
                None => out.push(p),
                Some(&prev) => {
                    let delta = (p - prev).rem_euclid(TAU);
                    let delta = if delta > std::f64::consts::PI { delta - TAU } else { delta };
                    out.push(prev + delta);
                }
            }
        }
        out
    }

    /// Spin phase (radians) at `t`, linearly interpolated and extrapolated
    /// from the nearest segment.
    pub fn phase_at(&self, t: i64) -> Result<f64> {
        self.validate()?;
        Ok(interpolate(&self.epoch, &self.unwrapped_phase(), t))
    }
}

fn interpolate(epoch: &[i64], phase: &[f64], t: i64) -> f64 {
    let n = epoch.len();
    let i = epoch.partition_point(|&e| e <= t).clamp(1, n - 1);
    let (t0, t1) = (epoch[i - 1], epoch[i]);
    let (p0, p1) = (phase[i - 1], phase[i]);
    if t1 == t0 {
        return p0;
    }
    p0 + (p1 - p0) * (t - t0) as f64 / (t1 - t0) as f64
}

impl DespinStrategy for AttitudeSeries {
    fn name(&self) -> &'static str {
        "attitude"
    }

    fn rotation(&self, epoch: &[i64], _config: &InstrumentConfig) -> Result<RotationSpec> {
        self.validate()?;
        let phase = self.unwrapped_phase();
        Ok(RotationSpec::PerSample(
            epoch
                .iter()
                .map(|&t| rotation_z(interpolate(&self.epoch, &phase, t)))
                .collect(),
        ))
    }
}

/// Sun-sensor pulse times and spin periods.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SunPulseSeries {
    pub epoch: Vec<i64>,
    /// Spin period in ns at each pulse. Non-positive or non-finite values
    /// are replaced by the spacing to the neighbouring pulse.
    pub period_ns: Vec<f64>,
}

impl SunPulseSeries {
    fn period(&self, i: usize) -> Option<f64> {
        let p = self.period_ns[i];
        if p.is_finite() && p > 0.0 {
            return Some(p);
        }
        let spacing = if i + 1 < self.epoch.len() {
            self.epoch[i + 1] - self.epoch[i]
        } else if i > 0 {
            self.epoch[i] - self.epoch[i - 1]
        } else {
            return None;
        };
        (spacing > 0).then_some(spacing as f64)
    }

    /// Spin phase (radians) at `t`, measured from the governing pulse.
    pub fn phase_at(&self, t: i64, offset_rad: f64) -> Result<f64> {
        ProcessingError::check_len("sun-pulse period", self.epoch.len(), self.period_ns.len())?;
        if self.epoch.is_empty() {
            return Err(ProcessingError::InsufficientData {
                what: "sun pulses",
                needed: 1,
                found: 0,
            });
        }
        let i = last_at_or_before(&self.epoch, t).unwrap_or(0);
        let period = self.period(i).ok_or(ProcessingError::InsufficientData {
            what: "sun-pulse period",
            needed: 2,
            found: 1,
        })?;
        Ok(TAU * (t - self.epoch[i]) as f64 / period + offset_rad)
    }
}

impl DespinStrategy for SunPulseSeries {
    fn name(&self) -> &'static str {
        "sun-pulse"
    }

    fn rotation(&self, epoch: &[i64], config: &InstrumentConfig) -> Result<RotationSpec> {
        let offset = config.sunpulse_phase_offset_deg.to_radians();
        let matrices = epoch
            .iter()
            .map(|&t| self.phase_at(t, offset).map(rotation_z))
            .collect::<Result<Vec<_>>>()?;
        Ok(RotationSpec::PerSample(matrices))
    }
}

/// Candidate despin sources for one Level 2 build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DespinInputs {
    pub attitude: Option<AttitudeSeries>,
    pub sunpulse: Option<SunPulseSeries>,
}

impl DespinInputs {
    pub fn from_attitude(attitude: AttitudeSeries) -> Self {
        Self {
            attitude: Some(attitude),
            sunpulse: None,
        }
    }

    pub fn from_sunpulse(sunpulse: SunPulseSeries) -> Self {
        Self {
            attitude: None,
            sunpulse: Some(sunpulse),
        }
    }

    pub fn has_attitude(&self) -> bool {
        self.attitude.is_some()
    }

    /// Attitude if supplied, otherwise sun pulse, otherwise `DespinInputMissing`.
    pub fn resolve(&self) -> Result<&dyn DespinStrategy> {
        if let Some(att) = &self.attitude {
            if self.sunpulse.is_some() {
                debug!("Both attitude and sun-pulse data supplied; attitude takes precedence");
            }
            return Ok(att as &dyn DespinStrategy);
        }
        match &self.sunpulse {
            Some(sp) => Ok(sp as &dyn DespinStrategy),
            None => Err(ProcessingError::DespinInputMissing),
        }
    }

    /// Resolve a strategy and build the SMPA -> DMPA rotation for `epoch`.
    pub fn despin_rotation(
        &self,
        epoch: &[i64],
        config: &InstrumentConfig,
    ) -> Result<RotationSpec> {
        let strategy = self.resolve()?;
        info!("Despinning {} samples with {} data", epoch.len(), strategy.name());
        strategy.rotation(epoch, config)
    }
}
