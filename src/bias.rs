use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::error::BiasError;

pub const MIN_BIAS: u8 = 1;
pub const MAX_BIAS: u8 = 15;

/// The longest token that can name a value in `MIN_BIAS..=MAX_BIAS`.
const MAX_DIGITS: usize = 2;

/// `PerfBias` is an `energy_perf_bias` hint that has passed validation.
/// The kernel accepts `0` to `15`, where `0` favors performance and `15`
/// favors power savings. `0` is rejected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PerfBias(u8);

impl PerfBias {
    pub fn value(self) -> u8 {
        self.0
    }
}

impl FromStr for PerfBias {
    type Err = BiasError;

    /// `from_str` validates a raw command-line token.
    /// Only ASCII digits are accepted, so signs, whitespace and hex prefixes are
    /// rejected before any conversion happens.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if token.is_empty() || !token.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(BiasError::InvalidNumber(token.to_string()));
        }
        if token.len() > MAX_DIGITS {
            return Err(BiasError::OutOfRange(token.to_string()));
        }

        let value: u8 = token
            .parse()
            .map_err(|_| BiasError::InvalidNumber(token.to_string()))?;
        if !(MIN_BIAS..=MAX_BIAS).contains(&value) {
            return Err(BiasError::OutOfRange(token.to_string()));
        }
        Ok(PerfBias(value))
    }
}

impl fmt::Display for PerfBias {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
