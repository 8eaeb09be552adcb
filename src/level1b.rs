//! Level 1A -> Level 1B: calibrate raw counts and rotate into the
//! spin-plane and body frames.
//!
//! Pipeline:
//! 1. Bound the hi/lo calibration tables and the raw record to the window.
//! 2. Calibrate into OMB, collecting one spin-axis estimate per interval.
//! 3. OMB -> SMPA with the fixed instrument rotation.
//! 4. SMPA -> BCS with the inverse of the spin-axis rotation, using for each
//!    sample the spin axis of the table that calibrated it.
//! 5. Compose the record from the requested frames.

use tracing::{debug, info};

use crate::calibration::{CalibrationSet, Calibrator, LinearCalibrator};
use crate::config::InstrumentConfig;
use crate::error::{ProcessingError, Result};
use crate::record::{FieldSeries, Frame, InstrumentRecord, RawRecord, RecordBuilder};
use crate::rotation::{bcs_from_smpa, rotate, RotationSpec};
use crate::time::TimeWindow;

/// Frames to include in a Level 1B record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Level1bFlags {
    /// Raw sensor-frame counts (`b_123`). Off by default.
    pub sensor: bool,
    pub bcs: bool,
    pub omb: bool,
    pub smpa: bool,
}

impl Level1bFlags {
    /// Apply the default policy: with no derived frame requested, BCS is used.
    pub fn effective(self) -> Self {
        if self.bcs || self.omb || self.smpa {
            self
        } else {
            Self { bcs: true, ..self }
        }
    }
}

/// Inputs to one Level 1B build.
#[derive(Debug, Clone, Copy)]
pub struct Level1bRequest<'a> {
    pub raw: &'a RawRecord,
    pub hi: &'a CalibrationSet,
    pub lo: &'a CalibrationSet,
    pub window: TimeWindow,
    pub flags: Level1bFlags,
}

/// Builds Level 1B records with a given calibrator.
pub struct Level1bBuilder<'a, C = LinearCalibrator> {
    config: &'a InstrumentConfig,
    calibrator: C,
}

impl<'a> Level1bBuilder<'a, LinearCalibrator> {
    pub fn new(config: &'a InstrumentConfig) -> Self {
        Self {
            config,
            calibrator: LinearCalibrator,
        }
    }
}

impl<'a, C: Calibrator> Level1bBuilder<'a, C> {
    pub fn with_calibrator(config: &'a InstrumentConfig, calibrator: C) -> Self {
        Self { config, calibrator }
    }

    /// Produce a Level 1B record. Any calibration or read failure is
    /// returned unchanged and no record is produced.
    pub fn build(&self, request: &Level1bRequest<'_>) -> Result<InstrumentRecord> {
        let flags = request.flags.effective();
        info!(
            "{}: building L1B (sensor={}, omb={}, smpa={}, bcs={})",
            self.config.spacecraft, flags.sensor, flags.omb, flags.smpa, flags.bcs
        );

        let hi = request.hi.bounded(&request.window)?;
        let lo = request.lo.bounded(&request.window)?;
        let raw = request.raw.slice(&request.window)?;
        if raw.epoch.is_empty() {
            return Err(ProcessingError::InsufficientData {
                what: "Level 1A samples in window",
                needed: 1,
                found: 0,
            });
        }
        debug!(
            "L1A: {} field samples, {} status samples; {} hi / {} lo tables",
            raw.epoch.len(),
            raw.epoch_stat.len(),
            hi.tables().len(),
            lo.tables().len()
        );

        let calibrated = self.calibrator.calibrate(&raw, &hi, &lo)?;

        let omb2smpa = RotationSpec::Fixed(self.config.omb_to_smpa_matrix());
        let b_smpa = rotate(&omb2smpa, &calibrated.b_omb, &raw.epoch)?;

        let smpa2bcs = bcs_from_smpa(&calibrated.mpa, &calibrated.sample_axis)?;
        let b_bcs = rotate(&smpa2bcs, &b_smpa, &raw.epoch)?;

        let b_123 = flags.sensor.then(|| FieldSeries::from_xyz(&raw.b_123));
        let mut builder = RecordBuilder::from_raw(&raw).with_mpa(calibrated.mpa);
        if let Some(b_123) = b_123 {
            builder = builder.with_field(Frame::Sensor123, b_123);
        }
        let record = builder
            .with_field_if(flags.bcs, Frame::Bcs, b_bcs)
            .with_field_if(flags.omb, Frame::Omb, calibrated.b_omb)
            .with_field_if(flags.smpa, Frame::Smpa, b_smpa)
            .build()?;

        info!(
            "{}: L1B record with {} samples, frames {:?}",
            self.config.spacecraft,
            record.epoch().len(),
            record.frames()
        );
        Ok(record)
    }
}
