use crate::common::constants::{
    CHILD_NOT_FOUND_MSG, DUPLICATE_KEY_MSG, INDEX_KEY_OUT_OF_RANGE_MSG, INVALID_PID,
};
use crate::common::{Error, Result};
use crate::config::config::FERRO_DB_PAGE_SIZE_BYTES;
use crate::storage::buffer::buffer_pool_manager::BufferPoolManager;
use crate::storage::disk::disk_manager::PageId;
use crate::storage::index::generic_key::{GenericKey, KeyComparator};
use crate::storage::index::index_page::{self, IndexPageKind, INDEX_PAGE_HEADER_BYTES};
use crate::storage::index::internal_page::InternalPage;
use crate::storage::page::{RecordId, RECORD_ID_BYTES};
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};

/// Data-node view over a raw page buffer.
///
/// Slots hold `(key, record id)` pairs in key-ascending order; a leaf never
/// holds two equal keys. `next_page_id` links to the right sibling so the
/// leaf level forms a key-ordered chain.
///
/// The view borrows the buffer of a pinned frame and must not outlive the
/// pin. Rotations update the parent's separator through the buffer pool and
/// surface [`Error::PoolExhausted`] when it cannot supply the parent frame.
pub struct LeafPage<'a, const N: usize> {
    data: &'a mut [u8],
}

impl<'a, const N: usize> LeafPage<'a, N> {
    const SLOT_BYTES: usize = N + RECORD_ID_BYTES;

    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    /// Formats the buffer as an empty leaf page with no right sibling.
    pub fn init(&mut self, page_id: PageId, parent_page_id: PageId, max_size: u32) {
        self.data.fill(0);
        index_page::set_kind(self.data, IndexPageKind::Leaf);
        index_page::set_size(self.data, 0);
        index_page::set_max_size(self.data, max_size);
        index_page::set_page_id(self.data, page_id);
        index_page::set_parent_page_id(self.data, parent_page_id);
        index_page::set_next_page_id(self.data, INVALID_PID);
    }

    /// Number of `(key, record id)` slots this page geometry can hold.
    pub fn max_entries() -> usize {
        (FERRO_DB_PAGE_SIZE_BYTES - INDEX_PAGE_HEADER_BYTES) / Self::SLOT_BYTES
    }

    pub fn size(&self) -> usize {
        index_page::size(self.data) as usize
    }

    pub fn max_size(&self) -> usize {
        index_page::max_size(self.data) as usize
    }

    pub fn page_id(&self) -> PageId {
        index_page::page_id(self.data)
    }

    pub fn parent_page_id(&self) -> PageId {
        index_page::parent_page_id(self.data)
    }

    pub fn set_parent_page_id(&mut self, parent_page_id: PageId) {
        index_page::set_parent_page_id(self.data, parent_page_id);
    }

    pub fn next_page_id(&self) -> PageId {
        index_page::next_page_id(self.data)
    }

    pub fn set_next_page_id(&mut self, next_page_id: PageId) {
        index_page::set_next_page_id(self.data, next_page_id);
    }

    pub fn key_at(&self, index: usize) -> GenericKey<N> {
        assert!(index < self.size(), "{}", INDEX_KEY_OUT_OF_RANGE_MSG);
        let offset = Self::slot_offset(index);
        GenericKey::from_bytes(&self.data[offset..offset + N])
    }

    pub fn item_at(&self, index: usize) -> (GenericKey<N>, RecordId) {
        assert!(index < self.size(), "{}", INDEX_KEY_OUT_OF_RANGE_MSG);
        let offset = Self::slot_offset(index);
        let key = GenericKey::from_bytes(&self.data[offset..offset + N]);
        let value = RecordId::from_bytes(&self.data[offset + N..offset + N + RECORD_ID_BYTES])
            .expect("Leaf slot holds an undecodable record id.");
        (key, value)
    }

    /// Smallest slot index whose key is >= `key`; `size` when `key` is
    /// greater than every stored key.
    pub fn key_index<C: KeyComparator<N>>(&self, key: &GenericKey<N>, comparator: &C) -> usize {
        let (mut low, mut high) = (0, self.size());
        while low < high {
            let mid = low + (high - low) / 2;
            match comparator.compare(&self.key_at(mid), key) {
                Ordering::Less => low = mid + 1,
                _ => high = mid,
            }
        }
        low
    }

    /// Binary-searches for `key`, short-circuiting when it falls outside the
    /// page's key range.
    pub fn lookup<C: KeyComparator<N>>(
        &self,
        key: &GenericKey<N>,
        comparator: &C,
    ) -> Option<RecordId> {
        let size = self.size();
        if size == 0
            || comparator.compare(key, &self.key_at(0)) == Ordering::Less
            || comparator.compare(key, &self.key_at(size - 1)) == Ordering::Greater
        {
            return None;
        }

        let index = self.key_index(key, comparator);
        match comparator.compare(key, &self.key_at(index)) {
            Ordering::Equal => Some(self.item_at(index).1),
            _ => None,
        }
    }

    /// Inserts `(key, value)` at its sorted position. Appends when the key is
    /// greater than everything stored, prepends when smaller, binary-searches
    /// otherwise. Duplicate keys are a caller error and abort.
    ///
    /// # Returns
    /// - the page's size after the insert.
    pub fn insert<C: KeyComparator<N>>(
        &mut self,
        key: &GenericKey<N>,
        value: RecordId,
        comparator: &C,
    ) -> usize {
        let size = self.size();

        if size == 0 || comparator.compare(key, &self.key_at(size - 1)) == Ordering::Greater {
            self.set_size_raw(size + 1);
            self.write_slot(size, key, value);
        } else if comparator.compare(key, &self.key_at(0)) == Ordering::Less {
            self.data.copy_within(
                Self::slot_offset(0)..Self::slot_offset(size),
                Self::slot_offset(1),
            );
            self.set_size_raw(size + 1);
            self.write_slot(0, key, value);
        } else {
            let index = self.key_index(key, comparator);
            if comparator.compare(key, &self.key_at(index)) == Ordering::Equal {
                panic!("{}", DUPLICATE_KEY_MSG);
            }
            self.data.copy_within(
                Self::slot_offset(index)..Self::slot_offset(size),
                Self::slot_offset(index + 1),
            );
            self.set_size_raw(size + 1);
            self.write_slot(index, key, value);
        }

        size + 1
    }

    /// Removes `key`'s slot if present; a missing key is a no-op.
    ///
    /// # Returns
    /// - the page's size after the removal.
    pub fn remove_and_delete<C: KeyComparator<N>>(
        &mut self,
        key: &GenericKey<N>,
        comparator: &C,
    ) -> usize {
        let size = self.size();
        if size == 0
            || comparator.compare(key, &self.key_at(0)) == Ordering::Less
            || comparator.compare(key, &self.key_at(size - 1)) == Ordering::Greater
        {
            return size;
        }

        let index = self.key_index(key, comparator);
        if comparator.compare(key, &self.key_at(index)) != Ordering::Equal {
            return size;
        }

        self.data.copy_within(
            Self::slot_offset(index + 1)..Self::slot_offset(size),
            Self::slot_offset(index),
        );
        self.set_size_raw(size - 1);
        size - 1
    }

    /// Moves the upper half (⌊size/2⌋ slots) into the empty split recipient
    /// and splices it into the sibling chain directly to this page's right.
    pub fn move_half_to(&mut self, recipient: &mut LeafPage<'_, N>) {
        let size = self.size();
        let half = size / 2;
        assert_eq!(recipient.size(), 0, "Split recipient must be empty.");

        recipient.data[Self::slot_offset(0)..Self::slot_offset(half)]
            .copy_from_slice(&self.data[Self::slot_offset(size - half)..Self::slot_offset(size)]);
        recipient.set_size_raw(half);
        self.set_size_raw(size - half);

        recipient.set_next_page_id(self.next_page_id());
        self.set_next_page_id(recipient.page_id());
    }

    /// Appends every slot to `recipient` during a merge and hands it this
    /// page's right sibling so the leaf chain stays intact. The caller
    /// deletes this page afterwards.
    pub fn move_all_to(&mut self, recipient: &mut LeafPage<'_, N>) {
        let size = self.size();
        let start = recipient.size();
        assert!(start + size <= recipient.max_size());

        recipient.data[Self::slot_offset(start)..Self::slot_offset(start + size)]
            .copy_from_slice(&self.data[Self::slot_offset(0)..Self::slot_offset(size)]);
        recipient.set_size_raw(start + size);
        recipient.set_next_page_id(self.next_page_id());
    }

    /// Rotates this page's first entry onto the end of its left sibling
    /// `recipient`. This page's separator in the parent is rewritten to its
    /// new first key.
    pub fn move_first_to_end_of(
        &mut self,
        recipient: &mut LeafPage<'_, N>,
        bpm: &Arc<RwLock<BufferPoolManager>>,
    ) -> Result<()> {
        assert!(self.size() > 1, "Rotation donor has nothing to give.");
        let (moved_key, moved_value) = self.item_at(0);

        let size = self.size();
        self.data.copy_within(
            Self::slot_offset(1)..Self::slot_offset(size),
            Self::slot_offset(0),
        );
        self.set_size_raw(size - 1);

        let end = recipient.size();
        assert!(end < recipient.max_size());
        recipient.set_size_raw(end + 1);
        recipient.write_slot(end, &moved_key, moved_value);

        let new_boundary = self.key_at(0);
        let parent_id = self.parent_page_id();
        {
            let parent_handle = bpm
                .write()?
                .fetch_page(&parent_id)
                .ok_or(Error::PoolExhausted)?;
            let mut parent_guard = parent_handle.write()?;
            let mut parent = InternalPage::<N>::new(parent_guard.data_mut());
            let parent_index = parent.value_index(self.page_id());
            assert!(parent_index < parent.size(), "{}", CHILD_NOT_FOUND_MSG);
            parent.set_key_at(parent_index, &new_boundary);
        }
        bpm.write()?.unpin_page(&parent_id, true);
        Ok(())
    }

    /// Rotates this page's last entry onto the front of its right sibling
    /// `recipient`. The parent's separator at `parent_index` (the
    /// recipient's slot) becomes the moved key, the recipient's new first
    /// key.
    pub fn move_last_to_front_of(
        &mut self,
        recipient: &mut LeafPage<'_, N>,
        parent_index: usize,
        bpm: &Arc<RwLock<BufferPoolManager>>,
    ) -> Result<()> {
        assert!(self.size() > 1, "Rotation donor has nothing to give.");
        let last = self.size() - 1;
        let (moved_key, moved_value) = self.item_at(last);
        self.set_size_raw(last);

        let size = recipient.size();
        assert!(size < recipient.max_size());
        recipient.data.copy_within(
            Self::slot_offset(0)..Self::slot_offset(size),
            Self::slot_offset(1),
        );
        recipient.set_size_raw(size + 1);
        recipient.write_slot(0, &moved_key, moved_value);

        let parent_id = recipient.parent_page_id();
        {
            let parent_handle = bpm
                .write()?
                .fetch_page(&parent_id)
                .ok_or(Error::PoolExhausted)?;
            let mut parent_guard = parent_handle.write()?;
            let mut parent = InternalPage::<N>::new(parent_guard.data_mut());
            debug_assert_eq!(parent.value_at(parent_index), recipient.page_id());
            parent.set_key_at(parent_index, &moved_key);
        }
        bpm.write()?.unpin_page(&parent_id, true);
        Ok(())
    }

    fn slot_offset(index: usize) -> usize {
        INDEX_PAGE_HEADER_BYTES + index * Self::SLOT_BYTES
    }

    fn set_size_raw(&mut self, size: usize) {
        index_page::set_size(self.data, size as u32);
    }

    fn write_slot(&mut self, index: usize, key: &GenericKey<N>, value: RecordId) {
        let offset = Self::slot_offset(index);
        self.data[offset..offset + N].copy_from_slice(key.as_bytes());
        let value_bytes = value
            .to_bytes()
            .expect("Record id could not be serialized into a leaf slot.");
        self.data[offset + N..offset + N + RECORD_ID_BYTES].copy_from_slice(&value_bytes);
    }
}
