use crate::common::constants::{CHILD_NOT_FOUND_MSG, INDEX_KEY_OUT_OF_RANGE_MSG};
use crate::common::{Error, Result};
use crate::config::config::FERRO_DB_PAGE_SIZE_BYTES;
use crate::storage::buffer::buffer_pool_manager::BufferPoolManager;
use crate::storage::disk::disk_manager::PageId;
use crate::storage::index::generic_key::{GenericKey, KeyComparator};
use crate::storage::index::index_page::{self, IndexPageKind, INDEX_PAGE_HEADER_BYTES};
use std::cmp::Ordering;
use std::mem::size_of;
use std::sync::{Arc, RwLock};

/// Routing-node view over a raw page buffer.
///
/// Slots hold `(separator key, child page id)` pairs in key-ascending order.
/// Slot 0 only carries a child pointer; its key bytes are a placeholder, so a
/// page of size n routes through n child pointers and n - 1 separators. Each
/// separator is the smallest key in the subtree under its own child.
///
/// The view borrows the buffer of a pinned frame and must not outlive the
/// pin. Operations that touch cooperator pages (children being re-parented,
/// the parent during rotations) go back through the buffer pool and surface
/// [`Error::PoolExhausted`] when it cannot supply a frame.
pub struct InternalPage<'a, const N: usize> {
    data: &'a mut [u8],
}

impl<'a, const N: usize> InternalPage<'a, N> {
    const SLOT_BYTES: usize = N + size_of::<PageId>();

    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    /// Formats the buffer as an internal page holding nothing but its
    /// placeholder slot 0.
    pub fn init(&mut self, page_id: PageId, parent_page_id: PageId, max_size: u32) {
        self.data.fill(0);
        index_page::set_kind(self.data, IndexPageKind::Internal);
        index_page::set_size(self.data, 1);
        index_page::set_max_size(self.data, max_size);
        index_page::set_page_id(self.data, page_id);
        index_page::set_parent_page_id(self.data, parent_page_id);
    }

    /// Number of `(key, child)` slots this page geometry can hold.
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

    pub fn key_at(&self, index: usize) -> GenericKey<N> {
        assert!(index < self.size(), "{}", INDEX_KEY_OUT_OF_RANGE_MSG);
        let offset = Self::slot_offset(index);
        GenericKey::from_bytes(&self.data[offset..offset + N])
    }

    pub fn set_key_at(&mut self, index: usize, key: &GenericKey<N>) {
        assert!(index < self.size(), "{}", INDEX_KEY_OUT_OF_RANGE_MSG);
        let offset = Self::slot_offset(index);
        self.data[offset..offset + N].copy_from_slice(key.as_bytes());
    }

    pub fn value_at(&self, index: usize) -> PageId {
        assert!(index < self.size(), "{}", INDEX_KEY_OUT_OF_RANGE_MSG);
        let offset = Self::slot_offset(index) + N;
        PageId::from_le_bytes(self.data[offset..offset + 4].try_into().unwrap())
    }

    pub fn set_value_at(&mut self, index: usize, value: PageId) {
        assert!(index < self.size(), "{}", INDEX_KEY_OUT_OF_RANGE_MSG);
        let offset = Self::slot_offset(index) + N;
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Slot index holding `value` as its child pointer, or `size` when no
    /// slot does.
    pub fn value_index(&self, value: PageId) -> usize {
        (0..self.size())
            .find(|&index| self.value_at(index) == value)
            .unwrap_or_else(|| self.size())
    }

    /// Routes a search key to the child whose subtree covers it: the unique
    /// child at index i with key_at(i) <= key < key_at(i + 1), the leftmost
    /// child for keys below every separator, the rightmost for keys at or
    /// above the last one. A key equal to a separator routes right.
    pub fn lookup<C: KeyComparator<N>>(&self, key: &GenericKey<N>, comparator: &C) -> PageId {
        let size = self.size();
        assert!(size > 1, "Internal page routes nothing without a separator.");

        if comparator.compare(key, &self.key_at(1)) == Ordering::Less {
            return self.value_at(0);
        }
        if comparator.compare(key, &self.key_at(size - 1)) != Ordering::Less {
            return self.value_at(size - 1);
        }

        let (mut low, mut high) = (1, size - 1);
        while low + 1 < high {
            let mid = low + (high - low) / 2;
            match comparator.compare(key, &self.key_at(mid)) {
                Ordering::Less => high = mid,
                _ => low = mid,
            }
        }
        self.value_at(low)
    }

    /// Turns a fresh root into a two-child node after its former only child
    /// split: slot 0 points at the old child, slot 1 carries the first
    /// separator and the split-off sibling.
    pub fn populate_new_root(
        &mut self,
        old_child: PageId,
        new_key: &GenericKey<N>,
        new_child: PageId,
    ) {
        assert_eq!(self.size(), 1, "New root must hold only its placeholder slot.");
        self.set_value_at(0, old_child);
        self.set_size_raw(2);
        self.write_slot(1, new_key, new_child);
    }

    /// Inserts `(new_key, new_child)` immediately after the slot pointing at
    /// `old_child`.
    ///
    /// # Returns
    /// - the page's size after the insert.
    pub fn insert_after(
        &mut self,
        old_child: PageId,
        new_key: &GenericKey<N>,
        new_child: PageId,
    ) -> usize {
        let index = self.value_index(old_child);
        let size = self.size();
        assert!(index < size, "{}", CHILD_NOT_FOUND_MSG);

        self.data.copy_within(
            Self::slot_offset(index + 1)..Self::slot_offset(size),
            Self::slot_offset(index + 2),
        );
        self.set_size_raw(size + 1);
        self.write_slot(index + 1, new_key, new_child);
        size + 1
    }

    /// Removes the slot at `index`, closing the gap.
    pub fn remove(&mut self, index: usize) {
        let size = self.size();
        assert!(index < size, "{}", INDEX_KEY_OUT_OF_RANGE_MSG);

        self.data.copy_within(
            Self::slot_offset(index + 1)..Self::slot_offset(size),
            Self::slot_offset(index),
        );
        self.set_size_raw(size - 1);
    }

    /// Drops the last separator and returns the lone remaining child. Used
    /// when the root collapses to a single subtree during delete.
    pub fn remove_only_child(&mut self) -> PageId {
        self.set_size_raw(self.size() - 1);
        assert_eq!(self.size(), 1, "Page still routes through more than one child.");
        self.value_at(0)
    }

    /// Moves the upper half (⌈size/2⌉ slots) into `recipient`, a freshly
    /// initialized page holding only its placeholder slot. Moved children are
    /// re-parented onto the recipient.
    pub fn move_half_to(
        &mut self,
        recipient: &mut InternalPage<'_, N>,
        bpm: &Arc<RwLock<BufferPoolManager>>,
    ) -> Result<()> {
        let size = self.size();
        let half = (size + 1) / 2;
        assert_eq!(
            recipient.size(),
            1,
            "Split recipient must hold only its placeholder slot."
        );

        recipient.data[Self::slot_offset(0)..Self::slot_offset(half)]
            .copy_from_slice(&self.data[Self::slot_offset(size - half)..Self::slot_offset(size)]);
        recipient.set_size_raw(half);
        self.set_size_raw(size - half);

        for index in 0..half {
            index_page::reparent_child(bpm, recipient.value_at(index), recipient.page_id())?;
        }
        Ok(())
    }

    /// Appends every slot to `recipient` during a merge. The otherwise-unused
    /// slot 0 key is first rewritten with the parent's separator at
    /// `index_in_parent`, turning it into a valid boundary between the two
    /// halves. Moved children are re-parented; the caller deletes this page
    /// afterwards.
    pub fn move_all_to(
        &mut self,
        recipient: &mut InternalPage<'_, N>,
        index_in_parent: usize,
        bpm: &Arc<RwLock<BufferPoolManager>>,
    ) -> Result<()> {
        let parent_id = self.parent_page_id();
        let separator = {
            let parent_handle = bpm
                .write()?
                .fetch_page(&parent_id)
                .ok_or(Error::PoolExhausted)?;
            let mut parent_guard = parent_handle.write()?;
            let parent = InternalPage::<N>::new(parent_guard.data_mut());
            debug_assert_eq!(parent.value_at(index_in_parent), self.page_id());
            parent.key_at(index_in_parent)
        };
        bpm.write()?.unpin_page(&parent_id, false);
        self.set_key_at(0, &separator);

        let size = self.size();
        let start = recipient.size();
        assert!(start + size <= recipient.max_size());

        recipient.data[Self::slot_offset(start)..Self::slot_offset(start + size)]
            .copy_from_slice(&self.data[Self::slot_offset(0)..Self::slot_offset(size)]);
        recipient.set_size_raw(start + size);

        for index in start..start + size {
            index_page::reparent_child(bpm, recipient.value_at(index), recipient.page_id())?;
        }
        Ok(())
    }

    /// Rotates this page's first child onto the end of its left sibling
    /// `recipient`. The parent's separator at `parent_index` (this page's
    /// slot) comes down as the moved entry's key, and the displaced key at
    /// index 1 goes up to replace it.
    pub fn move_first_to_end_of(
        &mut self,
        recipient: &mut InternalPage<'_, N>,
        parent_index: usize,
        bpm: &Arc<RwLock<BufferPoolManager>>,
    ) -> Result<()> {
        assert!(self.size() > 1, "Rotation donor has nothing to give.");
        let moved_child = self.value_at(0);
        let displaced_key = self.key_at(1);
        let parent_id = self.parent_page_id();

        let separator = {
            let parent_handle = bpm
                .write()?
                .fetch_page(&parent_id)
                .ok_or(Error::PoolExhausted)?;
            let mut parent_guard = parent_handle.write()?;
            let mut parent = InternalPage::<N>::new(parent_guard.data_mut());
            debug_assert_eq!(parent.value_at(parent_index), self.page_id());
            let separator = parent.key_at(parent_index);
            parent.set_key_at(parent_index, &displaced_key);
            separator
        };
        bpm.write()?.unpin_page(&parent_id, true);

        let end = recipient.size();
        assert!(end < recipient.max_size());
        recipient.set_size_raw(end + 1);
        recipient.write_slot(end, &separator, moved_child);

        // slot 0 keeps its placeholder key and takes over slot 1's child.
        self.set_value_at(0, self.value_at(1));
        self.remove(1);

        index_page::reparent_child(bpm, moved_child, recipient.page_id())
    }

    /// Rotates this page's last entry onto the front of its right sibling
    /// `recipient`. The parent's separator at `parent_index` (the
    /// recipient's slot) comes down as the key over the recipient's former
    /// first child, and the moved key goes up to replace it.
    pub fn move_last_to_front_of(
        &mut self,
        recipient: &mut InternalPage<'_, N>,
        parent_index: usize,
        bpm: &Arc<RwLock<BufferPoolManager>>,
    ) -> Result<()> {
        assert!(self.size() > 1, "Rotation donor has nothing to give.");
        let last = self.size() - 1;
        let moved_key = self.key_at(last);
        let moved_child = self.value_at(last);
        self.set_size_raw(last);

        let parent_id = recipient.parent_page_id();
        let separator = {
            let parent_handle = bpm
                .write()?
                .fetch_page(&parent_id)
                .ok_or(Error::PoolExhausted)?;
            let mut parent_guard = parent_handle.write()?;
            let mut parent = InternalPage::<N>::new(parent_guard.data_mut());
            debug_assert_eq!(parent.value_at(parent_index), recipient.page_id());
            let separator = parent.key_at(parent_index);
            parent.set_key_at(parent_index, &moved_key);
            separator
        };
        bpm.write()?.unpin_page(&parent_id, true);

        let size = recipient.size();
        assert!(size < recipient.max_size());
        recipient
            .data
            .copy_within(Self::slot_offset(0)..Self::slot_offset(size), Self::slot_offset(1));
        recipient.set_size_raw(size + 1);
        // after the shift, slot 1 holds the former slot 0 child; the
        // pulled-down separator becomes its key.
        recipient.set_key_at(1, &separator);
        recipient.set_value_at(0, moved_child);

        index_page::reparent_child(bpm, moved_child, recipient.page_id())
    }

    fn slot_offset(index: usize) -> usize {
        INDEX_PAGE_HEADER_BYTES + index * Self::SLOT_BYTES
    }

    fn set_size_raw(&mut self, size: usize) {
        index_page::set_size(self.data, size as u32);
    }

    fn write_slot(&mut self, index: usize, key: &GenericKey<N>, value: PageId) {
        let offset = Self::slot_offset(index);
        self.data[offset..offset + N].copy_from_slice(key.as_bytes());
        self.data[offset + N..offset + N + 4].copy_from_slice(&value.to_le_bytes());
    }
}
