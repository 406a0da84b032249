//! Voucher Codes

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum accepted length of a voucher code.
pub const MAX_CODE_LEN: usize = 50;

/// Reasons a typed voucher code is rejected before any lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VoucherCodeError {
    /// Nothing but whitespace was entered.
    #[error("voucher code is empty")]
    Empty,

    /// The code is longer than [`MAX_CODE_LEN`].
    #[error("voucher code is longer than {MAX_CODE_LEN} characters")]
    TooLong,

    /// The code contains a character outside `A-Z`, `0-9`, `-` and `_`.
    #[error("voucher code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A case-normalized voucher code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoucherCode(String);

impl VoucherCode {
    /// Normalize and validate a raw code.
    ///
    /// # Errors
    ///
    /// Returns a [`VoucherCodeError`] if the trimmed code is empty, too long,
    /// or contains characters other than ASCII letters, digits, `-` and `_`.
    pub fn parse(raw: &str) -> Result<Self, VoucherCodeError> {
        let code = raw.trim().to_ascii_uppercase();

        if code.is_empty() {
            return Err(VoucherCodeError::Empty);
        }

        if code.chars().count() > MAX_CODE_LEN {
            return Err(VoucherCodeError::TooLong);
        }

        if let Some(invalid) = code
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(VoucherCodeError::InvalidCharacter(invalid));
        }

        Ok(Self(code))
    }

    /// Normalize a code issued by the server: trim and upper-case only.
    ///
    /// Catalog codes are taken as given; the shape rules of [`Self::parse`]
    /// apply to typed input.
    ///
    /// # Errors
    ///
    /// Returns [`VoucherCodeError::Empty`] if nothing is left after trimming.
    pub fn from_server(raw: &str) -> Result<Self, VoucherCodeError> {
        let code = raw.trim().to_uppercase();

        if code.is_empty() {
            return Err(VoucherCodeError::Empty);
        }

        Ok(Self(code))
    }

    /// The normalized code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoucherCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VoucherCode {
    type Err = VoucherCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VoucherCode {
    type Error = VoucherCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_server(&value)
    }
}

impl From<VoucherCode> for String {
    fn from(value: VoucherCode) -> Self {
        value.0
    }
}
