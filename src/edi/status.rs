//! Status codes shared by the EDI engine and its callers.

use std::fmt;

/// Closed set of EDI classification status codes.
///
/// Each code has a fixed message; the configured table in
/// [`InstrumentConfig`](crate::InstrumentConfig) may override the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    /// The SMT time-of-flight method produced a result.
    SmtSuccess = 0,
    /// Triangulation-eligible beams are not parallel enough.
    ParallelismFailed = 1,
    /// Not enough beams on the towards or the away side.
    SmtTooFewBeams = 2,
    /// Towards and away times of flight could not be separated.
    SmtDegenerateTof = 3,
}

impl StatusCode {
    pub const ALL: [StatusCode; 4] = [
        StatusCode::SmtSuccess,
        StatusCode::ParallelismFailed,
        StatusCode::SmtTooFewBeams,
        StatusCode::SmtDegenerateTof,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a numeric code. Unknown values are rejected.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn is_success(self) -> bool {
        matches!(self, StatusCode::SmtSuccess)
    }

    pub fn default_message(self) -> &'static str {
        match self {
            StatusCode::SmtSuccess => "SMT: drift step resolved from time of flight",
            StatusCode::ParallelismFailed => "Parallelism test failed: beams are not parallel",
            StatusCode::SmtTooFewBeams => "SMT: too few towards or away beams",
            StatusCode::SmtDegenerateTof => "SMT: towards/away times of flight not separable",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.default_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for c in StatusCode::ALL {
            assert_eq!(StatusCode::from_code(c.code()), Some(c));
        }
        assert_eq!(StatusCode::from_code(200), None);
    }

    #[test]
    fn test_only_smt_success_is_success() {
        let successes: Vec<_> = StatusCode::ALL.into_iter().filter(|c| c.is_success()).collect();
        assert_eq!(successes, vec![StatusCode::SmtSuccess]);
    }
}
