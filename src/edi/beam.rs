//! EDI beam sets and their towards/away partitions.

use crate::error::{ProcessingError, Result};

/// Gyrotime of an electron in a 1 nT field, in microseconds.
const GYROTIME_US_NT: f64 = 35_723.8;

/// Beam quality class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeamClass {
    A,
    B,
    C,
    D,
}

/// A single EDI beam hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Beam {
    /// Firing angle in the plane perpendicular to B, radians.
    pub alpha: f64,
    /// Whether the beam may be used for triangulation / parallelism.
    pub tri_ok: bool,
    /// Time of flight, microseconds.
    pub tof: f64,
    pub class: BeamClass,
}

/// Beams from one estimation interval with their geometry context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeamSet {
    /// Gun positions in the plane perpendicular to B (m), one per beam.
    pub xd: Vec<f64>,
    pub yd: Vec<f64>,
    /// Target gyrotime, microseconds.
    pub tg: f64,
    /// Field magnitude, nT.
    pub bmag: f64,
    pub beams: Vec<Beam>,
}

impl BeamSet {
    /// Check that the geometry arrays line up with the beams.
    pub fn validate(&self) -> Result<()> {
        ProcessingError::check_len("beam xd", self.beams.len(), self.xd.len())?;
        ProcessingError::check_len("beam yd", self.beams.len(), self.yd.len())
    }

    /// Indices of triangulation-eligible beams.
    pub fn eligible(&self) -> Vec<usize> {
        self.beams
            .iter()
            .enumerate()
            .filter(|(_, b)| b.tri_ok)
            .map(|(i, _)| i)
            .collect()
    }

    /// Expected gyrotime (µs) for `bmag`.
    pub fn gyrotime_from_bmag(&self) -> Option<f64> {
        (self.bmag > 0.0).then(|| GYROTIME_US_NT / self.bmag)
    }
}

/// Split of the eligible beams, as indices into [`BeamSet::beams`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeamPartition {
    pub class_a_towards: Vec<usize>,
    pub non_a_towards: Vec<usize>,
    pub class_a_away: Vec<usize>,
    pub non_a_away: Vec<usize>,
}

impl BeamPartition {
    /// Place beam `idx` in its subset.
    pub fn insert(&mut self, idx: usize, class: BeamClass, towards: bool) {
        let subset = match (class == BeamClass::A, towards) {
            (true, true) => &mut self.class_a_towards,
            (false, true) => &mut self.non_a_towards,
            (true, false) => &mut self.class_a_away,
            (false, false) => &mut self.non_a_away,
        };
        subset.push(idx);
    }

    pub fn towards(&self) -> impl Iterator<Item = usize> + '_ {
        self.class_a_towards.iter().chain(&self.non_a_towards).copied()
    }

    pub fn away(&self) -> impl Iterator<Item = usize> + '_ {
        self.class_a_away.iter().chain(&self.non_a_away).copied()
    }

    pub fn all(&self) -> impl Iterator<Item = usize> + '_ {
        self.towards().chain(self.away())
    }

    pub fn len(&self) -> usize {
        self.class_a_towards.len()
            + self.non_a_towards.len()
            + self.class_a_away.len()
            + self.non_a_away.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every index for which `keep` is false.
    pub fn retain(&mut self, keep: impl Fn(usize) -> bool) {
        for subset in [
            &mut self.class_a_towards,
            &mut self.non_a_towards,
            &mut self.class_a_away,
            &mut self.non_a_away,
        ] {
            subset.retain(|&i| keep(i));
        }
    }
}
