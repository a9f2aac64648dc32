//! JSON decoding and encoding of SenML packs

use serde_json::Value;

use crate::error::{Result, SenMLError};
use crate::record::SenMLRecord;

/// Content-Type for SenML JSON format
pub const SENML_JSON_CONTENT_TYPE: &str = "application/senml+json";

/// Decode a JSON array into records, preserving array order.
///
/// The first element that fails to decode aborts the whole pack; its index
/// is carried by the returned error.
pub fn decode(bytes: &[u8]) -> Result<Vec<SenMLRecord>> {
    let root: Value = serde_json::from_slice(bytes)?;
    let Value::Array(elements) = root else {
        return Err(SenMLError::NotAnArray);
    };

    let records = elements
        .iter()
        .enumerate()
        .map(|(index, element)| {
            SenMLRecord::from_json_value(element).map_err(|kind| SenMLError::record(index, kind))
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(records = records.len(), "decoded SenML pack");
    Ok(records)
}

/// Encode records as a compact JSON array
pub fn encode(records: &[SenMLRecord]) -> Result<Vec<u8>> {
    serde_json::to_vec(records).map_err(|e| SenMLError::serialization(e.to_string()))
}

/// Encode records as an indented JSON array
pub fn encode_pretty(records: &[SenMLRecord]) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(records).map_err(|e| SenMLError::serialization(e.to_string()))
}

/// Extract media type parameters from Content-Type header
pub fn parse_content_type(content_type: &str) -> Option<&str> {
    let media_type = content_type.split(';').next()?.trim();
    if media_type.eq_ignore_ascii_case(SENML_JSON_CONTENT_TYPE) {
        Some("senml")
    } else {
        None
    }
}
