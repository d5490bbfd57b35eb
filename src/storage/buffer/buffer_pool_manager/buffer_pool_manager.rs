use crate::common::constants::NO_CORRESPONDING_FRAME_ID_MSG;
use crate::config::config::DbConfig;
use crate::storage::buffer::lru_replacer::LruReplacer;
use crate::storage::disk::disk_manager::{DiskManager, PageId};
use crate::storage::page::{Page, PageHandle};
use log::{debug, trace, warn};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

pub type FrameId = usize;

#[derive(Copy, Clone, Debug)]
pub struct FrameMetadata {
    frame_id: FrameId,
    pin_count: usize,
}

impl FrameMetadata {
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            pin_count: 0,
        }
    }

    pub fn pin_count(&self) -> usize {
        self.pin_count
    }

    pub fn increment_pin_count(&mut self) {
        self.pin_count += 1;
    }

    pub fn decrement_pin_count(&mut self) {
        if self.pin_count == 0 {
            panic!("Pin count already at zero, cannot decrement.");
        }
        self.pin_count -= 1;
    }

    pub fn frame_id(&self) -> &FrameId {
        &self.frame_id
    }
}

/// Caches disk pages in a fixed set of in-memory frames.
///
/// All page access goes through here: a fetched or newly created page stays
/// pinned (ineligible for eviction) until every holder has unpinned it, and
/// dirty frames are written back through the disk manager on eviction or an
/// explicit flush. Callers must not touch a [`PageHandle`] after unpinning
/// the page it refers to.
#[derive(Debug)]
pub struct BufferPoolManager {
    /// Number of frames in the buffer pool.
    pub(crate) pool_size: usize,
    /// Array of buffer pool frames.
    pub(crate) pages: Vec<PageHandle>,
    /// HashMap that maps resident page IDs to frame metadata (offsets in
    /// `pages`, plus the pin count).
    pub(crate) page_table: HashMap<PageId, FrameMetadata>,
    /// Manages reads and writes of pages on disk.
    pub(crate) disk_manager: Arc<RwLock<DiskManager>>,
    /// Replacer to find unpinned frames for replacement.
    pub(crate) replacer: Arc<RwLock<LruReplacer>>,
    /// List of frames that don't hold any page.
    pub(crate) free_list: VecDeque<FrameId>,
}

#[derive(Default)]
pub struct BufferPoolManagerBuilder {
    pool_size: Option<usize>,
    disk_manager: Option<Arc<RwLock<DiskManager>>>,
}

impl BufferPoolManagerBuilder {
    pub fn pool_size(&mut self, pool_size: usize) -> &mut Self {
        self.pool_size = Some(pool_size);
        self
    }

    pub fn disk_manager(&mut self, disk_manager: Arc<RwLock<DiskManager>>) -> &mut Self {
        self.disk_manager = Some(disk_manager);
        self
    }

    pub fn build(&self) -> BufferPoolManager {
        let pool_size = self
            .pool_size
            .expect("`pool_size` not initialized before build.");
        let disk_manager = self
            .disk_manager
            .clone()
            .expect("`disk_manager` not initialized before build.");

        BufferPoolManager::new(pool_size, disk_manager)
    }

    pub fn build_with_handle(&self) -> Arc<RwLock<BufferPoolManager>> {
        Arc::new(RwLock::new(self.build()))
    }
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, disk_manager: Arc<RwLock<DiskManager>>) -> Self {
        BufferPoolManager {
            pool_size,
            pages: (0..pool_size)
                .map(|_| Arc::new(RwLock::new(Page::create_invalid_page())))
                .collect(),
            page_table: HashMap::new(),
            disk_manager,
            replacer: Arc::new(RwLock::new(LruReplacer::new(pool_size))),
            free_list: (0..pool_size).collect(),
        }
    }

    pub fn new_with_handle(
        pool_size: usize,
        disk_manager: Arc<RwLock<DiskManager>>,
    ) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self::new(pool_size, disk_manager)))
    }

    pub fn with_config(config: &DbConfig, disk_manager: Arc<RwLock<DiskManager>>) -> Self {
        Self::new(config.pool_size, disk_manager)
    }

    pub fn builder() -> BufferPoolManagerBuilder {
        BufferPoolManagerBuilder::default()
    }

    /// Creates a new page in the buffer pool.
    ///
    /// A frame is taken from the free list, or failing that by evicting an
    /// unpinned page (writing it back first if dirty). The new page's memory
    /// is zeroed, its pin count starts at 1, and it is clean.
    ///
    /// # Returns
    /// - `Some(PageId)`: The identifier of the newly created page. Use
    ///   [`Self::fetch_page`] or [`Self::get_page`] for the page contents.
    /// - `None`: If every frame is pinned.
    pub fn new_page(&mut self) -> Option<PageId> {
        let replacer_binding = Arc::clone(&self.replacer);
        let mut replacer = replacer_binding.write().unwrap();
        let disk_binding = Arc::clone(&self.disk_manager);
        let mut disk_writer = disk_binding.write().unwrap();

        let frame_id = self.get_free_frame(&mut replacer, &mut disk_writer)?;
        let page_id = disk_writer.allocate_page();

        // fresh pages start zeroed; no disk read is needed here.
        self.pages[frame_id] = Arc::new(RwLock::new(Page::new(page_id)));
        self.page_table.insert(page_id, FrameMetadata::new(frame_id));
        replacer.pin(&frame_id);
        self.increment_pin_count(&page_id);

        Some(page_id)
    }

    /// Fetches a page from the buffer pool, pinning it.
    ///
    /// A page-table hit returns the resident frame without touching the
    /// disk; a miss brings the page in from disk through a free or victim
    /// frame. Each successful fetch increments the pin count by one and the
    /// caller owes exactly one matching [`Self::unpin_page`].
    ///
    /// # Parameters
    /// - `page_id`: The identifier of the page to be fetched. Fetching a
    ///   page id that was never allocated is undefined behavior.
    ///
    /// # Returns
    /// - `Some(PageHandle)`: Shared handle to the pinned page.
    /// - `None`: If the page is not resident and every frame is pinned.
    pub fn fetch_page(&mut self, page_id: &PageId) -> Option<PageHandle> {
        let replacer_binding = Arc::clone(&self.replacer);
        let mut replacer = replacer_binding.write().unwrap();
        let disk_binding = Arc::clone(&self.disk_manager);
        let mut disk_writer = disk_binding.write().unwrap();

        let frame_id = match self.page_table.get(page_id) {
            Some(metadata) => {
                trace!("fetch hit for page {page_id}");
                *metadata.frame_id()
            }
            None => {
                let frame_id = self.get_free_frame(&mut replacer, &mut disk_writer)?;
                self.insert_page_from_disk_into_buffer(page_id, frame_id, &mut disk_writer);
                frame_id
            }
        };

        replacer.pin(&frame_id);
        self.increment_pin_count(page_id);

        self.pages.get(frame_id).map(Arc::clone)
    }

    /// Unpins a page, decrementing its pin count.
    ///
    /// The page's dirty flag is OR'd with `is_dirty`: once any holder has
    /// reported the page dirty, it stays dirty until a successful flush or
    /// writeback, regardless of what later unpins report. When the pin count
    /// reaches zero the frame becomes eligible for eviction.
    ///
    /// # Parameters
    /// - `page_id`: The identifier of the page to be unpinned.
    /// - `is_dirty`: Whether this holder modified the page.
    ///
    /// # Returns
    /// - `true`: The pin count was decremented.
    /// - `false`: The page is not resident, or its pin count was already 0.
    pub fn unpin_page(&mut self, page_id: &PageId, is_dirty: bool) -> bool {
        let Some(pin_count) = self.get_pin_count(page_id) else {
            return false;
        };
        match pin_count {
            0 => false,
            1 => {
                let binding = Arc::clone(&self.replacer);
                let mut replacer = binding.write().unwrap();

                self.decrement_pin_count(page_id);
                if is_dirty {
                    self.set_is_dirty(page_id, true);
                }
                let frame_id = *self
                    .page_table
                    .get(page_id)
                    .expect(NO_CORRESPONDING_FRAME_ID_MSG)
                    .frame_id();
                replacer.unpin(&frame_id);
                true
            }
            _ => {
                self.decrement_pin_count(page_id);
                if is_dirty {
                    self.set_is_dirty(page_id, true);
                }
                true
            }
        }
    }

    /// Flushes a page to disk if it is dirty, then clears the dirty flag.
    /// Flushing a clean page is a successful no-op. Pinning is unaffected.
    ///
    /// # Parameters
    /// - `page_id`: The identifier of the page to be flushed.
    ///
    /// # Returns
    /// - `true`: The page is resident (and now clean on disk).
    /// - `false`: The page is not in the buffer pool.
    pub fn flush_page(&mut self, page_id: &PageId) -> bool {
        let Some(page_binding) = self.get_page(page_id) else {
            return false;
        };
        let mut page = page_binding.write().unwrap();
        if page.get_is_dirty() {
            let binding = Arc::clone(&self.disk_manager);
            let mut disk_writer = binding.write().unwrap();

            disk_writer.write_page(page.page_id(), page.data());
            page.set_is_dirty(false);
        }
        true
    }

    /// Flushes every resident page in the buffer pool to disk.
    pub fn flush_all_pages(&mut self) {
        let page_ids: Vec<PageId> = self.page_table.keys().cloned().collect();

        for page_id in page_ids {
            self.flush_page(&page_id);
        }
    }

    /// Deletes a page from the buffer pool and deallocates it on disk.
    ///
    /// A page that is not resident only needs its disk allocation released.
    /// A pinned page cannot be deleted. Otherwise the frame is detached from
    /// the replacer and page table, reset, and returned to the free list.
    ///
    /// # Parameters
    /// - `page_id`: The identifier of the page to be deleted.
    ///
    /// # Returns
    /// - `true`: The page was deleted.
    /// - `false`: The page is still pinned.
    pub fn delete_page(&mut self, page_id: PageId) -> bool {
        let disk_binding = Arc::clone(&self.disk_manager);
        let mut disk_writer = disk_binding.write().unwrap();

        let Some(pin_count) = self.get_pin_count(&page_id) else {
            disk_writer.deallocate_page(&page_id);
            return true;
        };

        // page is in use.
        if pin_count > 0 {
            return false;
        }

        let replacer_binding = Arc::clone(&self.replacer);
        let mut replacer = replacer_binding.write().unwrap();

        self.remove_from_buffer(&page_id, &mut replacer);
        disk_writer.deallocate_page(&page_id);
        true
    }

    pub fn size(&self) -> usize {
        self.pool_size
    }

    /// Looks up the handle of a resident page without pinning it.
    pub fn get_page(&self, page_id: &PageId) -> Option<PageHandle> {
        self.page_table
            .get(page_id)
            .map(|entry| Arc::clone(&self.pages[*entry.frame_id()]))
    }

    pub(crate) fn get_pin_count(&self, page_id: &PageId) -> Option<usize> {
        Some(self.page_table.get(page_id)?.pin_count())
    }

    pub(crate) fn get_is_dirty(&self, page_id: &PageId) -> bool {
        let frame_id = *self
            .page_table
            .get(page_id)
            .expect(NO_CORRESPONDING_FRAME_ID_MSG)
            .frame_id();
        self.pages[frame_id].read().unwrap().get_is_dirty()
    }

    pub(crate) fn set_is_dirty(&mut self, page_id: &PageId, is_dirty: bool) {
        let frame_id = *self
            .page_table
            .get(page_id)
            .expect(NO_CORRESPONDING_FRAME_ID_MSG)
            .frame_id();
        self.pages[frame_id].write().unwrap().set_is_dirty(is_dirty);
    }

    /// Called after a page is evicted or removed from the buffer pool,
    /// detaching the page from the page table and resetting its frame.
    ///
    /// Note: this does NOT add `frame_id` back into the free list, as some of
    /// its calling contexts immediately reoccupy the frame.
    pub(crate) fn clean_frame_after_removal(&mut self, frame_id: FrameId, page_id: &PageId) {
        self.page_table.remove(page_id);
        self.pages[frame_id] = Arc::new(RwLock::new(Page::create_invalid_page()));
    }

    /// Evicts the replacer's victim, writing it back first when dirty.
    pub(crate) fn evict_from_buffer(
        &mut self,
        replacer: &mut RwLockWriteGuard<LruReplacer>,
        disk_writer: &mut RwLockWriteGuard<DiskManager>,
    ) -> Option<FrameId> {
        let frame_id = replacer.victim()?;

        let page_binding = Arc::clone(self.pages.get(frame_id)?);
        let mut page = page_binding.write().unwrap();
        let page_id = *page.page_id();
        if page.get_is_dirty() {
            debug!("writing back dirty page {page_id} during eviction");
            disk_writer.write_page(&page_id, page.data());
            page.set_is_dirty(false);
        }
        drop(page);

        // The evicted frame id is not pushed onto the free list; every caller
        // reoccupies it immediately.
        self.clean_frame_after_removal(frame_id, &page_id);

        Some(frame_id)
    }

    pub(crate) fn remove_from_buffer(
        &mut self,
        page_id: &PageId,
        replacer: &mut RwLockWriteGuard<LruReplacer>,
    ) {
        let frame_id = *self
            .page_table
            .get(page_id)
            .expect(NO_CORRESPONDING_FRAME_ID_MSG)
            .frame_id();

        replacer.remove(&frame_id);
        self.clean_frame_after_removal(frame_id, page_id);
        self.free_list.push_back(frame_id);
    }

    /// Acquires a frame for a page about to enter the pool: the free list is
    /// consulted first, then the replacer.
    pub(crate) fn get_free_frame(
        &mut self,
        replacer: &mut RwLockWriteGuard<LruReplacer>,
        disk_writer: &mut RwLockWriteGuard<DiskManager>,
    ) -> Option<FrameId> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Some(frame_id);
        }
        let victim = self.evict_from_buffer(replacer, disk_writer);
        if victim.is_none() {
            warn!("buffer pool exhausted: every frame is pinned");
        }
        victim
    }

    pub(crate) fn increment_pin_count(&mut self, page_id: &PageId) {
        self.page_table
            .get_mut(page_id)
            .expect(NO_CORRESPONDING_FRAME_ID_MSG)
            .increment_pin_count();
    }

    pub(crate) fn decrement_pin_count(&mut self, page_id: &PageId) {
        self.page_table
            .get_mut(page_id)
            .expect(NO_CORRESPONDING_FRAME_ID_MSG)
            .decrement_pin_count();
    }

    /// Reads `page_id` into `frame_id` and registers it in the page table
    /// with a pin count of zero; callers pin afterwards.
    pub(crate) fn insert_page_from_disk_into_buffer(
        &mut self,
        page_id: &PageId,
        frame_id: FrameId,
        disk_writer: &mut RwLockWriteGuard<DiskManager>,
    ) {
        let mut page = Page::new(*page_id);
        disk_writer.read_page(page_id, page.data_mut());

        self.page_table
            .insert(*page_id, FrameMetadata::new(frame_id));
        self.pages[frame_id] = Arc::new(RwLock::new(page));
    }
}
