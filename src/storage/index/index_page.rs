//! Header shared by every B+ tree index page.
//!
//! Index page layout (all header fields little-endian u32):
//!   [0..4]   kind: 1 = internal, 2 = leaf (0 = uninitialized)
//!   [4..8]   size: number of occupied slots
//!   [8..12]  max_size: slot capacity
//!   [12..16] page_id
//!   [16..20] parent_page_id (INVALID_PID at the root)
//!   [20..24] next_page_id: right sibling (leaf pages only)
//! The slot array follows immediately; slot geometry belongs to the views.

use crate::common::constants::WRONG_PAGE_KIND_MSG;
use crate::common::{Error, Result};
use crate::storage::buffer::buffer_pool_manager::BufferPoolManager;
use crate::storage::disk::disk_manager::PageId;
use std::sync::{Arc, RwLock};

pub const INDEX_PAGE_HEADER_BYTES: usize = 24;

const KIND_OFFSET: usize = 0;
const SIZE_OFFSET: usize = 4;
const MAX_SIZE_OFFSET: usize = 8;
const PAGE_ID_OFFSET: usize = 12;
const PARENT_PAGE_ID_OFFSET: usize = 16;
const NEXT_PAGE_ID_OFFSET: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexPageKind {
    Internal = 1,
    Leaf = 2,
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Returns the page kind, or `None` for a buffer that holds no index page.
pub fn kind(data: &[u8]) -> Option<IndexPageKind> {
    match read_u32(data, KIND_OFFSET) {
        1 => Some(IndexPageKind::Internal),
        2 => Some(IndexPageKind::Leaf),
        _ => None,
    }
}

pub(crate) fn set_kind(data: &mut [u8], kind: IndexPageKind) {
    write_u32(data, KIND_OFFSET, kind as u32);
}

pub(crate) fn size(data: &[u8]) -> u32 {
    read_u32(data, SIZE_OFFSET)
}

pub(crate) fn set_size(data: &mut [u8], size: u32) {
    write_u32(data, SIZE_OFFSET, size);
}

pub(crate) fn max_size(data: &[u8]) -> u32 {
    read_u32(data, MAX_SIZE_OFFSET)
}

pub(crate) fn set_max_size(data: &mut [u8], max_size: u32) {
    write_u32(data, MAX_SIZE_OFFSET, max_size);
}

pub(crate) fn page_id(data: &[u8]) -> PageId {
    read_u32(data, PAGE_ID_OFFSET)
}

pub(crate) fn set_page_id(data: &mut [u8], page_id: PageId) {
    write_u32(data, PAGE_ID_OFFSET, page_id);
}

pub(crate) fn parent_page_id(data: &[u8]) -> PageId {
    read_u32(data, PARENT_PAGE_ID_OFFSET)
}

pub(crate) fn set_parent_page_id(data: &mut [u8], parent_page_id: PageId) {
    write_u32(data, PARENT_PAGE_ID_OFFSET, parent_page_id);
}

pub(crate) fn next_page_id(data: &[u8]) -> PageId {
    read_u32(data, NEXT_PAGE_ID_OFFSET)
}

pub(crate) fn set_next_page_id(data: &mut [u8], next_page_id: PageId) {
    write_u32(data, NEXT_PAGE_ID_OFFSET, next_page_id);
}

/// Rewrites a moved child's parent pointer through the buffer pool: fetch,
/// update in place, unpin dirty. Fails with [`Error::PoolExhausted`] when the
/// pool cannot supply the child's frame; structural operations propagate that
/// to their caller.
pub(crate) fn reparent_child(
    bpm: &Arc<RwLock<BufferPoolManager>>,
    child_page_id: PageId,
    new_parent_id: PageId,
) -> Result<()> {
    let child = bpm
        .write()?
        .fetch_page(&child_page_id)
        .ok_or(Error::PoolExhausted)?;
    {
        let mut child_guard = child.write()?;
        debug_assert!(
            kind(child_guard.data()).is_some(),
            "{}",
            WRONG_PAGE_KIND_MSG
        );
        set_parent_page_id(child_guard.data_mut(), new_parent_id);
    }
    bpm.write()?.unpin_page(&child_page_id, true);
    Ok(())
}
