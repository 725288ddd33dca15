use crate::api::DraftSnapshot;
use crate::StorageError;

pub fn encode_draft(draft: &DraftSnapshot) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(draft)?)
}

pub fn decode_draft(bytes: &[u8]) -> Result<DraftSnapshot, StorageError> {
    Ok(serde_json::from_slice(bytes)?)
}
