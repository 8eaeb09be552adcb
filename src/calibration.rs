//! Calibration of raw sensor counts into the orthogonalized (OMB) frame.
//!
//! The transfer function sits behind the [`Calibrator`] trait. The default
//! [`LinearCalibrator`] applies a per-axis offset and gain followed by an
//! orthogonalization matrix, choosing the hi- or lo-range table from the range
//! flag that governs each sample.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{CalibrationError, ProcessingError, Result};
use crate::record::{FieldSeries, Range, RawRecord, SpinAxisSeries};
use crate::time::{last_at_or_before, TimeWindow};
use crate::{Matrix3, Vector3};

/// Calibration coefficients for one range over one validity interval.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    pub range: Range,
    /// Start of validity (ns, inclusive).
    pub start: i64,
    /// End of validity (ns, inclusive).
    pub end: i64,
    /// Per-axis offsets, in counts.
    pub offset: [f64; 3],
    /// Per-axis gains, nT per count.
    pub gain: [f64; 3],
    /// Sensor -> OMB orthogonalization.
    pub ortho: Matrix3,
    /// Spin-axis estimate for this interval, in BCS.
    pub mpa: Vector3,
}

impl CalibrationTable {
    pub fn covers(&self, t: i64) -> bool {
        t >= self.start && t <= self.end
    }

    /// Apply this table to one raw sample.
    pub fn apply(&self, raw: &[f64; 3]) -> Vector3 {
        let scaled = Vector3::new(
            (raw[0] - self.offset[0]) * self.gain[0],
            (raw[1] - self.offset[1]) * self.gain[1],
            (raw[2] - self.offset[2]) * self.gain[2],
        );
        self.ortho * scaled
    }
}

/// All tables of one range, sorted by start.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSet {
    pub range: Range,
    tables: Vec<CalibrationTable>,
}

impl CalibrationSet {
    pub fn new(range: Range, mut tables: Vec<CalibrationTable>) -> Self {
        tables.retain(|t| t.range == range);
        tables.sort_by_key(|t| t.start);
        Self { range, tables }
    }

    pub fn tables(&self) -> &[CalibrationTable] {
        &self.tables
    }

    /// Keep only tables whose interval intersects `window`.
    pub fn bounded(&self, window: &TimeWindow) -> Result<CalibrationSet> {
        let tables: Vec<CalibrationTable> = self
            .tables
            .iter()
            .filter(|t| window.intersects(t.start, t.end))
            .cloned()
            .collect();
        if tables.is_empty() {
            return Err(CalibrationError::EmptyTable { range: self.range }.into());
        }
        Ok(CalibrationSet {
            range: self.range,
            tables,
        })
    }

    /// Latest-starting table covering `t`.
    pub fn covering(&self, t: i64) -> Option<&CalibrationTable> {
        let upto = self.tables.partition_point(|c| c.start <= t);
        self.tables[..upto].iter().rev().find(|c| c.covers(t))
    }
}

/// Output of a calibration call.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibrated {
    pub b_omb: FieldSeries,
    /// One spin axis per (interval, range) table actually used.
    pub mpa: SpinAxisSeries,
    /// For each sample, the index into `mpa` of the table that calibrated it.
    pub sample_axis: Vec<usize>,
}

/// Transfer from raw counts to the OMB frame.
pub trait Calibrator {
    fn calibrate(
        &self,
        raw: &RawRecord,
        hi: &CalibrationSet,
        lo: &CalibrationSet,
    ) -> Result<Calibrated>;
}

/// Offset, gain, then orthogonalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearCalibrator;

impl Calibrator for LinearCalibrator {
    fn calibrate(
        &self,
        raw: &RawRecord,
        hi: &CalibrationSet,
        lo: &CalibrationSet,
    ) -> Result<Calibrated> {
        raw.validate()?;
        if raw.epoch_stat.is_empty() && !raw.epoch.is_empty() {
            return Err(ProcessingError::InsufficientData {
                what: "range flags",
                needed: 1,
                found: 0,
            });
        }

        let mut vectors = Vec::with_capacity(raw.epoch.len());
        let mut used = Vec::with_capacity(raw.epoch.len());
        let mut intervals: BTreeMap<(i64, Range), Vector3> = BTreeMap::new();

        for (&t, sample) in raw.epoch.iter().zip(&raw.b_123) {
            // Samples before the first status record take its flag.
            let stat_idx = last_at_or_before(&raw.epoch_stat, t).unwrap_or(0);
            let range = raw.range[stat_idx];
            let set = match range {
                Range::Hi => hi,
                Range::Lo => lo,
            };
            let table = set
                .covering(t)
                .ok_or(CalibrationError::NoCoverage { range, epoch: t })?;
            vectors.push(table.apply(sample));
            used.push((table.start, range));
            intervals.entry((table.start, range)).or_insert(table.mpa);
        }

        debug!(
            "Calibrated {} samples using {} calibration intervals",
            vectors.len(),
            intervals.len()
        );

        let keys: Vec<(i64, Range)> = intervals.keys().copied().collect();
        let sample_axis = used
            .iter()
            .map(|k| keys.partition_point(|x| x < k))
            .collect();
        let mut mpa = SpinAxisSeries::default();
        for ((start, range), axis) in intervals {
            mpa.epoch.push(start);
            mpa.range.push(range);
            mpa.axis.push(axis);
        }
        Ok(Calibrated {
            b_omb: FieldSeries::from_vectors(vectors),
            mpa,
            sample_axis,
        })
    }
}
