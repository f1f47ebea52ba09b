//! CNJ unified case number parsing.
//!
//! A canonical identifier is exactly 20 digits, laid out as
//! `NNNNNNN-DD.AAAA.J.TR.OOOO`: sequence, check digits, filing year, judicial
//! segment, court and originating unit. Punctuation in the input is ignored;
//! the dashed form is derived, never parsed back as authoritative.

use crate::error::LookupError;
use serde::Serialize;
use std::fmt;

/// Digits in a canonical identifier.
pub const CANONICAL_DIGITS: usize = 20;

/// Minimum digits accepted by the structured API, which matches on raw
/// digits rather than on the canonical layout.
pub const MIN_LOOSE_DIGITS: usize = 10;

/// A validated 20-digit case identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CaseIdentifier {
    digits: String,
}

impl CaseIdentifier {
    /// Strip every non-digit character and validate the digit count.
    pub fn normalize(raw: &str) -> Result<Self, LookupError> {
        let digits = digits_of(raw);
        if digits.len() != CANONICAL_DIGITS {
            return Err(LookupError::InvalidIdentifier {
                expected: "exactly 20",
                found: digits.len(),
            });
        }
        Ok(Self { digits })
    }

    /// All 20 digits without punctuation.
    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn sequence(&self) -> &str {
        &self.digits[0..7]
    }

    pub fn check_digits(&self) -> &str {
        &self.digits[7..9]
    }

    pub fn year(&self) -> &str {
        &self.digits[9..13]
    }

    /// Judicial segment (`J`): 8 state, 4 federal, 5 labor, ...
    pub fn segment(&self) -> &str {
        &self.digits[13..14]
    }

    /// Court within the segment (`TR`).
    pub fn court(&self) -> &str {
        &self.digits[14..16]
    }

    /// Originating unit / forum (`OOOO`).
    pub fn unit(&self) -> &str {
        &self.digits[16..20]
    }

    /// `NNNNNNN-DD.AAAA.J.TR.OOOO`
    pub fn dashed(&self) -> String {
        format!(
            "{}-{}.{}.{}.{}.{}",
            self.sequence(),
            self.check_digits(),
            self.year(),
            self.segment(),
            self.court(),
            self.unit()
        )
    }

    /// `NNNNNNN-DD.AAAA`, the prefix some portals take as a separate field.
    pub fn sequence_check_year(&self) -> String {
        format!("{}-{}.{}", self.sequence(), self.check_digits(), self.year())
    }
}

impl fmt::Display for CaseIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dashed())
    }
}

/// What a lookup is keyed on: a full identifier, or only the loose digit
/// string when the structured API is the sole target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseQuery {
    digits: String,
    identifier: Option<CaseIdentifier>,
    court: Option<String>,
}

impl CaseQuery {
    /// Strict query: the identifier must have exactly 20 digits.
    pub fn strict(raw: &str, court: Option<&str>) -> Result<Self, LookupError> {
        let identifier = CaseIdentifier::normalize(raw)?;
        Ok(Self {
            digits: identifier.digits().to_string(),
            identifier: Some(identifier),
            court: court.map(str::to_string),
        })
    }

    /// Loose query for the structured API: at least 10 digits.
    pub fn loose(raw: &str, court: Option<&str>) -> Result<Self, LookupError> {
        let digits = digits_of(raw);
        if digits.len() < MIN_LOOSE_DIGITS {
            return Err(LookupError::InvalidIdentifier {
                expected: "at least 10",
                found: digits.len(),
            });
        }
        let identifier = CaseIdentifier::normalize(&digits).ok();
        Ok(Self {
            digits,
            identifier,
            court: court.map(str::to_string),
        })
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// The canonical identifier, required by the portal adapters.
    pub fn identifier(&self) -> Result<&CaseIdentifier, LookupError> {
        self.identifier
            .as_ref()
            .ok_or(LookupError::InvalidIdentifier {
                expected: "exactly 20",
                found: self.digits.len(),
            })
    }

    /// Court alias given explicitly by the caller, if any.
    pub fn court(&self) -> Option<&str> {
        self.court.as_deref()
    }
}

fn digits_of(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}
