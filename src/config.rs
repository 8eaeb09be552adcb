//! Instrument configuration context.
//!
//! Holds the instrument constants every stage needs: fixed rotations, the
//! sun-sensor phase offset, the EDI thresholds, and the status-message table.
//! It is read-only once built and passed by reference into each call, so it can
//! be shared freely across threads processing independent windows or beam sets.
//!
//! The context can be persisted with [rkyv](https://docs.rs/rkyv) for fast
//! reloading.

use rkyv::{Archive, Deserialize, Serialize};
use tracing::info;

use crate::edi::StatusCode;
use crate::Matrix3;

/// Read-only instrument constants.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Observatory identifier (e.g. "mms1").
    pub spacecraft: String,
    /// Fixed OMB -> SMPA rotation, row-major.
    pub omb_to_smpa: [[f64; 3]; 3],
    /// Angle (degrees) from the sun-sensor line of sight to SMPA +x,
    /// measured about the spin axis.
    pub sunpulse_phase_offset_deg: f64,
    /// EDI electron energy in eV (500 or 1000 on MMS).
    pub edi_energy_ev: f64,
    /// Minimum number of triangulation-eligible beams for the parallelism test.
    pub parallelism_min_beams: u32,
    /// Maximum axial standard deviation (degrees) for beams to count as parallel.
    pub parallelism_max_stdev_deg: f64,
    /// Minimum number of towards and of away beams the SMT method needs.
    pub smt_min_beams_per_side: u32,
    /// Fill value written to unused output slots.
    pub fill_value: f64,
    /// Status message per [`StatusCode`], indexed by `StatusCode::code()`.
    pub status_messages: Vec<String>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        let h = std::f64::consts::FRAC_1_SQRT_2;
        Self {
            spacecraft: "mms1".to_string(),
            omb_to_smpa: [[h, h, 0.0], [-h, h, 0.0], [0.0, 0.0, 1.0]],
            sunpulse_phase_offset_deg: 0.0,
            edi_energy_ev: 1000.0,
            parallelism_min_beams: 2,
            parallelism_max_stdev_deg: 3.0,
            smt_min_beams_per_side: 1,
            fill_value: -1.0e31,
            status_messages: StatusCode::ALL
                .iter()
                .map(|c| c.default_message().to_string())
                .collect(),
        }
    }
}

impl InstrumentConfig {
    /// Default configuration for a given observatory.
    pub fn for_spacecraft(spacecraft: &str) -> Self {
        Self {
            spacecraft: spacecraft.to_string(),
            ..Default::default()
        }
    }

    /// OMB -> SMPA rotation as a matrix.
    pub fn omb_to_smpa_matrix(&self) -> Matrix3 {
        let m = &self.omb_to_smpa;
        Matrix3::new(
            m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
        )
    }

    /// Human-readable message for a status code.
    ///
    /// Falls back to the built-in text if the table is shorter than the
    /// status enumeration.
    pub fn status_message(&self, code: StatusCode) -> &str {
        self.status_messages
            .get(code.code() as usize)
            .map(String::as_str)
            .unwrap_or_else(|| code.default_message())
    }

    /// EDI electron speed in m/s for the configured energy.
    pub fn electron_speed(&self) -> f64 {
        const ELECTRON_MASS_KG: f64 = 9.109_383_7e-31;
        const EV_TO_J: f64 = 1.602_176_634e-19;
        (2.0 * self.edi_energy_ev * EV_TO_J / ELECTRON_MASS_KG).sqrt()
    }

    /// Serialize to bytes with rkyv.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map_err(|e| anyhow::anyhow!("rkyv serialization failed: {}", e))?;
        Ok(bytes.to_vec())
    }

    /// Deserialize from bytes produced by [`InstrumentConfig::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| anyhow::anyhow!("rkyv deserialization failed: {}", e))
    }

    /// Save the configuration to a file.
    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, &bytes)?;
        info!("Saved instrument config to {} ({} bytes)", path, bytes.len());
        Ok(())
    }

    /// Load a configuration from a file.
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        let config = Self::from_bytes(&bytes)?;
        info!(
            "Loaded instrument config for {} from {}",
            config.spacecraft, path
        );
        Ok(config)
    }
}
