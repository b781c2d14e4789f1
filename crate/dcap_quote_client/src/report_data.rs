use std::str::FromStr;

use crate::error::{Error, ValidationErrorKind};

/// Size in bytes of the report data bound into a DCAP quote.
pub const REPORT_DATA_SIZE: usize = 64;

/// The 64 bytes of user data the attestation service embeds in the quote.
#[derive(Clone, PartialEq, Eq)]
pub struct ReportData([u8; REPORT_DATA_SIZE]);

impl ReportData {
    pub fn new(bytes: [u8; REPORT_DATA_SIZE]) -> Self {
        Self(bytes)
    }

    /// Decode a report data value from its hexadecimal representation.
    ///
    /// Upper and lower case digits are both accepted. Nothing but local
    /// decoding happens here, so a rejected value never reaches the network.
    ///
    /// # Returns
    ///
    /// Either [`ReportData`] or [`Error::ValidationError`] of kind
    /// [`ValidationErrorKind::MalformedHex`] if `s` is not valid hex, or
    /// [`ValidationErrorKind::WrongLength`] if it does not decode to exactly
    /// [`REPORT_DATA_SIZE`] bytes.
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s).map_err(|e| match e {
            hex::FromHexError::InvalidHexCharacter { c, index } => Error::validation(
                ValidationErrorKind::MalformedHex,
                format!("invalid character {c:?} at position {index}"),
            ),
            hex::FromHexError::OddLength => Error::validation(
                ValidationErrorKind::MalformedHex,
                format!("odd number of hex digits ({})", s.len()),
            ),
            e => Error::validation(ValidationErrorKind::MalformedHex, e.to_string()),
        })?;

        Self::try_from(bytes.as_slice())
    }

    pub fn as_bytes(&self) -> &[u8; REPORT_DATA_SIZE] {
        &self.0
    }

    /// Lower-case hex encoding, as embedded in the request path.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<&[u8]> for ReportData {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; REPORT_DATA_SIZE] = bytes.try_into().map_err(|_| {
            Error::validation(
                ValidationErrorKind::WrongLength,
                format!(
                    "report data must be {REPORT_DATA_SIZE} bytes, got {}",
                    bytes.len()
                ),
            )
        })?;

        Ok(Self(bytes))
    }
}

impl FromStr for ReportData {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl std::fmt::Display for ReportData {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for ReportData {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_tuple("ReportData").field(&self.to_hex()).finish()
    }
}
