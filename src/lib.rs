//! # mms_fields
//!
//! Level processing for spacecraft fluxgate magnetometer data, and beam
//! classification for the electron drift instrument (EDI).
//!
//! ## Magnetometer levels
//!
//! ```text
//! L1A (raw counts, b_123)
//!   └─ calibrate (hi/lo tables) ─────────► OMB  + spin-axis estimate
//!        └─ fixed instrument rotation ───► SMPA
//!             └─ inverse spin-axis rot. ─► BCS                     = L1B
//! L1B SMPA
//!   └─ despin (attitude ▸ sun pulse) ────► DMPA
//!        └─ inertial rotation ───────────► GSE (attitude path only) = L2
//! ```
//!
//! Each stage takes a record, adds the frames the caller asked for, and hands the
//! record on. Frames that were not requested are never present.
//!
//! ## EDI
//!
//! [`edi::classify`] runs a parallelism test over the triangulation-eligible
//! beams, then a time-of-flight estimator, and returns a status-coded
//! [`edi::EdiOutcome`] together with the towards/away beam partition.
//!
//! ## Example
//!
//! ```no_run
//! use mms_fields::*;
//!
//! # fn load() -> (RawRecord, CalibrationSet, CalibrationSet, SunPulseSeries) { unimplemented!() }
//! let (raw, hi, lo, sunpulse) = load();
//! let config = InstrumentConfig::for_spacecraft("mms2");
//!
//! let l1b = Level1bBuilder::new(&config).build(&Level1bRequest {
//!     raw: &raw,
//!     hi: &hi,
//!     lo: &lo,
//!     window: TimeWindow::from_iso(Some("2015-10-16T13:00:00Z"), Some("2015-10-16T13:10:00Z"))?,
//!     flags: Level1bFlags { smpa: true, bcs: true, ..Default::default() },
//! })?;
//!
//! let l2 = Level2Builder::new(&config).build(
//!     l1b,
//!     &DespinInputs::from_sunpulse(sunpulse),
//!     Level2Flags::default(),
//! )?;
//! for notice in &l2.notices {
//!     println!("{notice}");
//! }
//! # Ok::<(), ProcessingError>(())
//! ```

pub mod calibration;
pub mod config;
pub mod despin;
pub mod edi;
mod error;
pub mod level1b;
pub mod level2;
pub mod record;
pub mod rotation;
pub mod time;

pub use calibration::{CalibrationSet, CalibrationTable, Calibrated, Calibrator, LinearCalibrator};
pub use config::InstrumentConfig;
pub use despin::{AttitudeSeries, DespinInputs, DespinStrategy, SunPulseSeries};
pub use error::{CalibrationError, ProcessingError, Result};
pub use level1b::{Level1bBuilder, Level1bFlags, Level1bRequest};
pub use level2::{Level2Builder, Level2Flags, Level2Product, Notice};
pub use record::{FieldSeries, Frame, InstrumentRecord, Range, RawRecord, RecordBuilder, SpinAxisSeries};
pub use rotation::{rotate, RotationSpec};
pub use time::TimeWindow;

// Field math is done in f64 throughout; calibrated values span many
// decades between lo and hi range.
pub type Vector3 = nalgebra::Vector3<f64>;
pub type Matrix3 = nalgebra::Matrix3<f64>;
