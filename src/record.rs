//! Instrument records: the per-stage data product handed from one builder to
//! the next.
//!
//! A record carries the high-rate field epochs, the slower status epochs with
//! their range and sample-rate flags, the spin-axis estimate, and zero or more
//! field series, each tagged by the frame it is expressed in. Field series are
//! stored as `[x, y, z, |B|]` rows.

use std::fmt;

use crate::error::{ProcessingError, Result};
use crate::time::TimeWindow;
use crate::Vector3;

/// Coordinate frame of a field series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Frame {
    /// Raw sensor frame (uncalibrated counts).
    Sensor123,
    /// Orthogonalized magnetometer frame.
    Omb,
    /// Spin-plane / major-principal-axis frame.
    Smpa,
    /// Spacecraft body frame.
    Bcs,
    /// Despun major-principal-axis frame.
    Dmpa,
    /// Geocentric solar ecliptic.
    Gse,
}

impl Frame {
    pub const ALL: [Frame; 6] = [
        Frame::Sensor123,
        Frame::Omb,
        Frame::Smpa,
        Frame::Bcs,
        Frame::Dmpa,
        Frame::Gse,
    ];

    /// Variable name used for this frame's field in output products.
    pub fn variable_name(self) -> &'static str {
        match self {
            Frame::Sensor123 => "b_123",
            Frame::Omb => "b_omb",
            Frame::Smpa => "b_smpa",
            Frame::Bcs => "b_bcs",
            Frame::Dmpa => "b_dmpa",
            Frame::Gse => "b_gse",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.variable_name())
    }
}

/// Magnetometer range flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Range {
    Lo,
    Hi,
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Range::Lo => f.write_str("lo-range"),
            Range::Hi => f.write_str("hi-range"),
        }
    }
}

// ── Field series ────────────────────────────────────────────────────────────

/// A 4-wide vector series: three components plus magnitude.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSeries {
    rows: Vec<[f64; 4]>,
}

impl FieldSeries {
    /// Build from 3-vectors, computing the magnitude column.
    pub fn from_vectors<I>(vectors: I) -> Self
    where
        I: IntoIterator<Item = Vector3>,
    {
        let rows = vectors
            .into_iter()
            .map(|v| [v.x, v.y, v.z, v.norm()])
            .collect();
        Self { rows }
    }

    /// Build from raw `[x, y, z]` rows.
    pub fn from_xyz(rows: &[[f64; 3]]) -> Self {
        Self::from_vectors(rows.iter().map(|r| Vector3::new(r[0], r[1], r[2])))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[[f64; 4]] {
        &self.rows
    }

    /// Vector part of sample `i`.
    pub fn vector(&self, i: usize) -> Vector3 {
        let r = &self.rows[i];
        Vector3::new(r[0], r[1], r[2])
    }

    pub fn vectors(&self) -> impl Iterator<Item = Vector3> + '_ {
        self.rows.iter().map(|r| Vector3::new(r[0], r[1], r[2]))
    }

    pub fn magnitude(&self, i: usize) -> f64 {
        self.rows[i][3]
    }
}

/// Spin-axis estimate: one axis vector per calibration interval used, keyed
/// by the interval start and the range of its table. Entries are sorted by
/// `(epoch, range)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpinAxisSeries {
    pub epoch: Vec<i64>,
    pub range: Vec<Range>,
    pub axis: Vec<Vector3>,
}

impl SpinAxisSeries {
    pub fn len(&self) -> usize {
        self.epoch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epoch.is_empty()
    }
}

// ── Level 1A input ──────────────────────────────────────────────────────────

/// Parsed Level 1A record: raw sensor counts plus status flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub epoch: Vec<i64>,
    pub b_123: Vec<[f64; 3]>,
    pub epoch_stat: Vec<i64>,
    pub range: Vec<Range>,
    pub sample_rate: Vec<f64>,
}

impl RawRecord {
    /// Check that the field and status series are aligned with their epochs.
    pub fn validate(&self) -> Result<()> {
        ProcessingError::check_len("b_123 vs epoch", self.epoch.len(), self.b_123.len())?;
        ProcessingError::check_len("range vs epoch_stat", self.epoch_stat.len(), self.range.len())?;
        ProcessingError::check_len(
            "sample_rate vs epoch_stat",
            self.epoch_stat.len(),
            self.sample_rate.len(),
        )
    }

    /// Bound the record to a time window.
    ///
    /// Status samples are kept from the last one at or before the first kept
    /// field sample, so every kept field sample retains its governing range flag.
    pub fn slice(&self, window: &TimeWindow) -> Result<RawRecord> {
        self.validate()?;
        let fidx = window.index_range(&self.epoch);
        let mut sidx = window.index_range(&self.epoch_stat);
        if let Some(&t0) = self.epoch.get(fidx.start) {
            if !fidx.is_empty() {
                if let Some(i) = crate::time::last_at_or_before(&self.epoch_stat, t0) {
                    sidx.start = sidx.start.min(i);
                }
            }
        }
        Ok(RawRecord {
            epoch: self.epoch[fidx.clone()].to_vec(),
            b_123: self.b_123[fidx].to_vec(),
            epoch_stat: self.epoch_stat[sidx.clone()].to_vec(),
            range: self.range[sidx.clone()].to_vec(),
            sample_rate: self.sample_rate[sidx].to_vec(),
        })
    }
}

// ── Instrument record ───────────────────────────────────────────────────────

/// Per-stage data product.
///
/// Constructed only through [`RecordBuilder`], which checks that every field
/// series matches `epoch` and every status series matches `epoch_stat`.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentRecord {
    epoch: Vec<i64>,
    epoch_stat: Vec<i64>,
    range: Vec<Range>,
    sample_rate: Vec<f64>,
    mpa: Option<SpinAxisSeries>,
    fields: [Option<FieldSeries>; 6],
}

impl InstrumentRecord {
    pub fn epoch(&self) -> &[i64] {
        &self.epoch
    }

    pub fn epoch_stat(&self) -> &[i64] {
        &self.epoch_stat
    }

    pub fn range(&self) -> &[Range] {
        &self.range
    }

    pub fn sample_rate(&self) -> &[f64] {
        &self.sample_rate
    }

    pub fn mpa(&self) -> Option<&SpinAxisSeries> {
        self.mpa.as_ref()
    }

    pub fn field(&self, frame: Frame) -> Option<&FieldSeries> {
        self.fields[frame.slot()].as_ref()
    }

    /// The field in `frame`, or `MissingFrame`.
    pub fn require(&self, frame: Frame) -> Result<&FieldSeries> {
        self.field(frame).ok_or(ProcessingError::MissingFrame(frame))
    }

    pub fn has(&self, frame: Frame) -> bool {
        self.fields[frame.slot()].is_some()
    }

    /// Frames present in the record, in canonical order.
    pub fn frames(&self) -> Vec<Frame> {
        Frame::ALL.into_iter().filter(|f| self.has(*f)).collect()
    }
}

/// Incremental assembly of an [`InstrumentRecord`].
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: InstrumentRecord,
}

impl RecordBuilder {
    /// Start a record from the epoch and status series of a raw record.
    /// The raw sensor field is not carried over; add it explicitly.
    pub fn from_raw(raw: &RawRecord) -> Self {
        Self {
            record: InstrumentRecord {
                epoch: raw.epoch.clone(),
                epoch_stat: raw.epoch_stat.clone(),
                range: raw.range.clone(),
                sample_rate: raw.sample_rate.clone(),
                mpa: None,
                fields: Default::default(),
            },
        }
    }

    /// Continue from an existing record, keeping all of its frames.
    pub fn from_record(record: InstrumentRecord) -> Self {
        Self { record }
    }

    pub fn with_field(mut self, frame: Frame, series: FieldSeries) -> Self {
        self.record.fields[frame.slot()] = Some(series);
        self
    }

    /// Add `series` only if `include` is set.
    pub fn with_field_if(self, include: bool, frame: Frame, series: FieldSeries) -> Self {
        if include {
            self.with_field(frame, series)
        } else {
            self
        }
    }

    /// Withhold a frame inherited from the base record.
    pub fn without_field(mut self, frame: Frame) -> Self {
        self.record.fields[frame.slot()] = None;
        self
    }

    pub fn with_mpa(mut self, mpa: SpinAxisSeries) -> Self {
        self.record.mpa = Some(mpa);
        self
    }

    /// Validate alignment and return the record.
    pub fn build(self) -> Result<InstrumentRecord> {
        let r = &self.record;
        let n = r.epoch.len();
        for frame in Frame::ALL {
            if let Some(series) = r.field(frame) {
                ProcessingError::check_len(frame.variable_name(), n, series.len())?;
            }
        }
        let ns = r.epoch_stat.len();
        ProcessingError::check_len("range", ns, r.range.len())?;
        ProcessingError::check_len("sample_rate", ns, r.sample_rate.len())?;
        if let Some(mpa) = &r.mpa {
            ProcessingError::check_len("mpa", mpa.epoch.len(), mpa.axis.len())?;
            ProcessingError::check_len("mpa range", mpa.epoch.len(), mpa.range.len())?;
        }
        Ok(self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawRecord {
        RawRecord {
            epoch: vec![0, 10, 20, 30, 40, 50],
            b_123: vec![[1.0, 2.0, 2.0]; 6],
            epoch_stat: vec![0, 25],
            range: vec![Range::Lo, Range::Hi],
            sample_rate: vec![16.0, 16.0],
        }
    }

    #[test]
    fn test_field_series_magnitude() {
        let s = FieldSeries::from_xyz(&[[1.0, 2.0, 2.0], [0.0, 3.0, 4.0]]);
        assert_eq!(s.len(), 2);
        assert!((s.magnitude(0) - 3.0).abs() < 1e-12);
        assert!((s.magnitude(1) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_builder_rejects_misaligned_field() {
        let err = RecordBuilder::from_raw(&raw())
            .with_field(Frame::Omb, FieldSeries::from_xyz(&[[1.0, 0.0, 0.0]]))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::LengthMismatch {
                what: "b_omb",
                expected: 6,
                found: 1
            }
        ));
    }

    #[test]
    fn test_conditional_fields() {
        let s = FieldSeries::from_xyz(&raw().b_123);
        let rec = RecordBuilder::from_raw(&raw())
            .with_field_if(true, Frame::Bcs, s.clone())
            .with_field_if(false, Frame::Omb, s)
            .build()
            .unwrap();
        assert_eq!(rec.frames(), vec![Frame::Bcs]);
        assert!(matches!(
            rec.require(Frame::Omb),
            Err(ProcessingError::MissingFrame(Frame::Omb))
        ));
    }

    #[test]
    fn test_raw_slice_keeps_governing_status() {
        let w = TimeWindow::new(Some(30), Some(40)).unwrap();
        let s = raw().slice(&w).unwrap();
        assert_eq!(s.epoch, vec![30, 40]);
        // Status sample at 25 governs t=30 and must survive the cut.
        assert_eq!(s.epoch_stat, vec![25]);
        assert_eq!(s.range, vec![Range::Hi]);
    }

    #[test]
    fn test_raw_validate() {
        let mut r = raw();
        r.sample_rate.pop();
        assert!(r.validate().is_err());
    }
}
