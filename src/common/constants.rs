// DiskManager
pub const INVALID_PID: u32 = u32::MAX;

// BufferPoolManager
pub const NO_CORRESPONDING_FRAME_ID_MSG: &str =
    "No frame corresponding to the given page id exists in the page table.";
pub const NO_CORRESPONDING_PAGE_MSG: &str =
    "No page corresponding to the given page id exists in the buffer pool.";
pub const NEW_PAGE_ERR_MSG: &str = "Could not get a new page from the buffer pool manager.";

// Index pages
pub const INDEX_KEY_OUT_OF_RANGE_MSG: &str = "Slot index is out of range for this index page.";
pub const WRONG_PAGE_KIND_MSG: &str = "Page buffer does not hold the expected index page kind.";
pub const DUPLICATE_KEY_MSG: &str = "Duplicate key inserted into a leaf page.";
pub const CHILD_NOT_FOUND_MSG: &str = "Child page id not present in this internal page.";
