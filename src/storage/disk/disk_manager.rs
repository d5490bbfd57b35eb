use crate::config::config::{data_dir, FERRO_DB_PAGE_SIZE_BYTES};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
#[cfg(test)]
use tempfile::NamedTempFile;

/// Offset into the database file
pub type PageId = u32;

/// Reads and writes raw pages of a single database file, and hands out page
/// ids for previously unused pages.
#[derive(Debug)]
pub struct DiskManager {
    current_page_no: AtomicU32,
    writer: BufWriter<File>,
    reader: BufReader<File>,
}

impl DiskManager {
    /// Creates a new disk manager for the given database file `filename`, e.g. `example.db`
    pub fn new(filename: &str) -> Self {
        let path = data_dir().join(filename);
        let file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .open(path)
            .expect("Unable to create or open database file.");
        let reader = file;
        let writer = reader.try_clone().expect("Unable to clone database file handle.");

        DiskManager {
            current_page_no: AtomicU32::new(0),
            writer: BufWriter::new(writer),
            reader: BufReader::new(reader),
        }
    }

    pub fn new_with_handle(filename: &str) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self::new(filename)))
    }

    /// Produces an id for a previously unused page. The page's bytes are
    /// zeroed on disk immediately so a later read of the fresh page succeeds.
    pub fn allocate_page(&mut self) -> PageId {
        let page_id = self.increment_and_fetch_page_no();
        self.write_page(&page_id, &[0; FERRO_DB_PAGE_SIZE_BYTES]);
        page_id
    }

    /// Releases a page id. Bytes are left in place on disk; id reuse is out
    /// of scope for this disk manager.
    pub fn deallocate_page(&mut self, page_id: &PageId) {
        debug!("deallocated page {page_id}");
    }

    /// Fills `buffer` with the page's bytes.
    pub fn read_page(&mut self, page_id: &PageId, buffer: &mut [u8]) {
        assert_eq!(buffer.len(), FERRO_DB_PAGE_SIZE_BYTES);
        let offset = Self::calculate_offset(page_id);
        self.reader
            .seek(SeekFrom::Start(offset as u64))
            .expect("Unable to seek to page offset.");
        self.reader
            .read_exact(buffer)
            .expect("Unable to read page from disk.");
    }

    /// Persists `data` as the page's bytes.
    pub fn write_page(&mut self, page_id: &PageId, data: &[u8]) {
        assert_eq!(data.len(), FERRO_DB_PAGE_SIZE_BYTES);
        let offset = Self::calculate_offset(page_id);
        self.writer
            .seek(SeekFrom::Start(offset as u64))
            .expect("Unable to seek to page offset.");
        self.writer
            .write_all(data)
            .expect("Unable to write page payload to disk.");
        self.writer
            .flush()
            .expect("Unable to flush page write to disk.");
    }

    fn calculate_offset(page_id: &PageId) -> u32 {
        page_id * FERRO_DB_PAGE_SIZE_BYTES as u32
    }

    /// Increments the current value and returns the new value
    /// # Returns
    /// - `current_value` after the increment
    fn increment_and_fetch_page_no(&mut self) -> u32 {
        1 + self.current_page_no.fetch_add(1, Ordering::SeqCst)
    }

    #[cfg(test)]
    /// Disk Manager Constructor for testing using a temporary file.
    pub fn new_for_test() -> Self {
        let temp_file = NamedTempFile::new_in(data_dir()).expect("Unable to create temp file");
        let writer = temp_file.reopen().expect("Unable to reopen temp file");

        DiskManager {
            current_page_no: AtomicU32::new(0),
            writer: BufWriter::new(writer),
            reader: BufReader::new(temp_file.into_file()),
        }
    }

    #[cfg(test)]
    /// Test-only version of `new_with_handle` that uses the test constructor.
    pub fn new_with_handle_for_test() -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self::new_for_test()))
    }
}
