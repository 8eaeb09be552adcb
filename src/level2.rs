//! Level 1B -> Level 2: despin the spin-plane field and, where possible,
//! rotate into an inertial frame.
//!
//! The despun (DMPA) field always comes from the resolved despin strategy.
//! The inertial (GSE) step depends on which despin data was available:
//! - attitude supplied: the DMPA -> GSE chain has no implementation yet, so a
//!   request for the GSE frame fails with `NotImplemented`;
//! - attitude absent: there is nothing to rotate with. The GSE frame is left
//!   out and a [`Notice::InertialRotationSkipped`] is attached to the product.

use std::fmt;

use tracing::{info, warn};

use crate::config::InstrumentConfig;
use crate::despin::DespinInputs;
use crate::error::{ProcessingError, Result};
use crate::record::{Frame, InstrumentRecord, RecordBuilder};
use crate::rotation::rotate;

/// Frames to include in a Level 2 record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Level2Flags {
    /// Keep the spin-plane field inherited from Level 1B.
    pub smpa: bool,
    pub dmpa: bool,
    pub gse: bool,
}

impl Level2Flags {
    /// Apply the default policy: with nothing requested, DMPA is used.
    pub fn effective(self) -> Self {
        if self.smpa || self.dmpa || self.gse {
            self
        } else {
            Self { dmpa: true, ..self }
        }
    }
}

/// Non-fatal conditions raised while building a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// No attitude data was supplied, so no inertial-frame field exists.
    /// `requested` records whether the caller asked for the GSE frame.
    InertialRotationSkipped { requested: bool },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::InertialRotationSkipped { requested } => write!(
                f,
                "no attitude data: rotation to the inertial frame was skipped{}",
                if *requested { " (b_gse was requested)" } else { "" }
            ),
        }
    }
}

/// Level 2 record plus the notices raised while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Level2Product {
    pub record: InstrumentRecord,
    pub notices: Vec<Notice>,
}

impl Level2Product {
    pub fn inertial_skipped(&self) -> bool {
        self.notices
            .iter()
            .any(|n| matches!(n, Notice::InertialRotationSkipped { .. }))
    }
}

/// Builds Level 2 products from Level 1B records.
pub struct Level2Builder<'a> {
    config: &'a InstrumentConfig,
}

impl<'a> Level2Builder<'a> {
    pub fn new(config: &'a InstrumentConfig) -> Self {
        Self { config }
    }

    /// Despin `l1b` and compose the Level 2 record.
    ///
    /// The input must carry a spin-plane field. Missing despin data and a
    /// GSE request backed by attitude data are fatal.
    pub fn build(
        &self,
        l1b: InstrumentRecord,
        despin: &DespinInputs,
        flags: Level2Flags,
    ) -> Result<Level2Product> {
        let flags = flags.effective();
        info!(
            "{}: building L2 (smpa={}, dmpa={}, gse={})",
            self.config.spacecraft, flags.smpa, flags.dmpa, flags.gse
        );

        let b_smpa = l1b.require(Frame::Smpa)?;
        let smpa2dmpa = despin.despin_rotation(l1b.epoch(), self.config)?;
        let b_dmpa = rotate(&smpa2dmpa, b_smpa, l1b.epoch())?;

        let mut notices = Vec::new();
        if despin.has_attitude() {
            if flags.gse {
                return Err(ProcessingError::NotImplemented {
                    what: "DMPA -> GSE rotation from definitive attitude",
                });
            }
        } else {
            let notice = Notice::InertialRotationSkipped {
                requested: flags.gse,
            };
            warn!("{}: {}", self.config.spacecraft, notice);
            notices.push(notice);
        }

        let mut builder = RecordBuilder::from_record(l1b);
        if !flags.smpa {
            builder = builder.without_field(Frame::Smpa);
        }
        let record = builder.with_field_if(flags.dmpa, Frame::Dmpa, b_dmpa).build()?;

        info!(
            "{}: L2 record with {} samples, frames {:?}",
            self.config.spacecraft,
            record.epoch().len(),
            record.frames()
        );
        Ok(Level2Product { record, notices })
    }
}
