#![allow(dead_code)]

use log::warn;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IccError {
    #[error("truncated ICC profile")]
    Truncated(#[from] io::Error),
    #[error("ICC profile is empty")]
    Empty,
}

/// Validates that a `colr` payload trailing slice (method 2/3/4: restricted
/// ICC, any ICC, or vendor) is non-empty, per the standard's requirement
/// that the profile/vendor bytes be present.
pub fn validate_profile_bytes(bytes: &[u8]) -> Result<(), IccError> {
    if bytes.is_empty() {
        warn!("colr profile payload is empty");
        return Err(IccError::Empty);
    }
    Ok(())
}
