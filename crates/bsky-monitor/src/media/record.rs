//! Recovery of the durable post record from its view-layer projection.
//!
//! The feed only exposes a playlist for videos. The blob reference needed to
//! fetch the original file lives in the post record, which the view layer
//! hands back as untyped JSON. Re-encoding it to CBOR and decoding into
//! [`FeedPostRecord`] gives the typed record, blob ref included.

use serde_json::Value;

use crate::bsky::FeedPostRecord;
use crate::error::{MonitorError, Result};

/// Encode `record` to CBOR and decode it back as a typed post record.
pub fn decode_post_record(record: &Value) -> Result<FeedPostRecord> {
    let mut wire = Vec::new();
    ciborium::into_writer(record, &mut wire)
        .map_err(|e| MonitorError::Record(format!("failed to marshal to CBOR: {e}")))?;

    ciborium::from_reader(wire.as_slice())
        .map_err(|e| MonitorError::Record(format!("failed to unmarshal from CBOR: {e}")))
}
