use crate::common::constants::INVALID_PID;
use crate::config::config::FERRO_DB_PAGE_SIZE_BYTES;
use crate::storage::disk::disk_manager::PageId;
use std::sync::{Arc, RwLock};

pub type PageHandle = Arc<RwLock<Page>>;

/// One buffer pool frame's payload: a page worth of raw bytes plus the id of
/// the page currently occupying the frame and its dirty flag. Pin counts are
/// tracked by the buffer pool's page table, not here.
///
/// The byte buffer carries no interpretation of its own; index pages are read
/// and written through the typed views in [`crate::storage::index`].
#[derive(Clone, Debug)]
pub struct Page {
    pub(crate) page_id: PageId,
    pub(crate) data: Vec<u8>,
    pub is_dirty: bool,
}

impl Page {
    pub fn new(page_id: PageId) -> Page {
        Page {
            page_id,
            data: vec![0; FERRO_DB_PAGE_SIZE_BYTES],
            is_dirty: false,
        }
    }

    /// A frame placeholder holding no page.
    pub fn create_invalid_page() -> Page {
        Page::new(INVALID_PID)
    }

    pub fn is_invalid(&self) -> bool {
        self.page_id == INVALID_PID
    }

    pub fn page_id(&self) -> &PageId {
        &self.page_id
    }

    pub fn set_page_id(&mut self, page_id: PageId) {
        self.page_id = page_id;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zeroes the page bytes. Called before a frame is reused for a
    /// different page.
    pub fn reset_memory(&mut self) {
        self.data.fill(0);
    }

    pub fn get_is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Sets the page's dirty status to `is_dirty`, returning a boolean
    /// indicating if the dirty state changed.
    pub fn set_is_dirty(&mut self, is_dirty: bool) -> bool {
        if self.is_dirty == is_dirty {
            return false;
        }
        self.is_dirty = is_dirty;
        true
    }
}
