pub mod ulog;

use crate::model::RawRecording;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("ulog: {0}")]
    Ulog(#[from] ulog::UlogParseError),
    #[error("unable to detect format")]
    UnknownFormat,
}

/// Detect the log format from its leading bytes and parse it.
///
/// ULog is identified by its magic header; anything else is rejected
/// without attempting a parse.
pub fn parse_auto(data: &[u8]) -> Result<RawRecording, ParseError> {
    if ulog::is_ulog(data) {
        return Ok(ulog::parse_ulog(data)?);
    }
    Err(ParseError::UnknownFormat)
}
