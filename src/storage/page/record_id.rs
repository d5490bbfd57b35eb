use crate::common::constants::INVALID_PID;
use crate::common::{Error, Result};
use crate::storage::disk::disk_manager::PageId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem::size_of;

/// Points at one tuple slot in a heap page: the value stored in B+ tree
/// leaf entries.
#[derive(Clone, Copy, Debug, Hash, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordId {
    page_id: PageId,
    slot_id: u16,
}

/// Fixed byte width of a serialized [`RecordId`].
pub(crate) const RECORD_ID_BYTES: usize = size_of::<PageId>() + size_of::<u16>();

pub const INVALID_RID: RecordId = RecordId {
    page_id: INVALID_PID,
    slot_id: 0,
};

impl RecordId {
    pub fn new(page_id: PageId, slot_id: u16) -> RecordId {
        RecordId { page_id, slot_id }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn slot_id(&self) -> u16 {
        self.slot_id
    }

    /// Deserialize from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RECORD_ID_BYTES {
            return Err(Error::InvalidData("Byte slice is too short".to_string()));
        }

        let page_id_bytes = &bytes[..size_of::<PageId>()];
        let page_id: PageId = bincode::deserialize(page_id_bytes)
            .map_err(|e| Error::InvalidData(format!("Failed to deserialize PageId: {}", e)))?;

        let slot_id_bytes = &bytes[size_of::<PageId>()..RECORD_ID_BYTES];
        let slot_id = u16::from_le_bytes(
            slot_id_bytes
                .try_into()
                .map_err(|_| Error::InvalidData("Failed to convert bytes to u16".to_string()))?,
        );

        Ok(RecordId { page_id, slot_id })
    }

    /// Serializes the RecordId to a byte vector of [`RECORD_ID_BYTES`] length.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = bincode::serialize(&self.page_id)
            .map_err(|e| Error::InvalidData(format!("Failed to serialize PageId: {}", e)))?;
        bytes.extend(self.slot_id.to_le_bytes());

        Ok(bytes)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot_id)
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.page_id, self.slot_id).cmp(&(other.page_id, other.slot_id))
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
