use super::*;
use crate::common::constants::{INVALID_PID, NEW_PAGE_ERR_MSG, NO_CORRESPONDING_PAGE_MSG};
use crate::config::config::{data_dir, FERRO_DB_PAGE_SIZE_BYTES};
use crate::storage::disk::disk_manager::{DiskManager, PageId};
use crate::storage::page::PageHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_new_page_basic() {
    let mut bpm = get_bpm_with_pool_size(5);

    let page_id = bpm.new_page().unwrap();
    let page = bpm.get_page(&page_id).unwrap();
    let page_guard = page.read().unwrap();

    // new page correctly initialized.
    assert_eq!(page_id, 1);
    assert_eq!(page_id, *page_guard.page_id());
    assert!(page_guard.data().iter().all(|&byte| byte == 0));
    assert!(!page_guard.get_is_dirty());

    // page inserted into buffer pool, and pinned to prevent eviction.
    assert!(page_in_buffer(&bpm, &page_id));
    assert_eq!(bpm.get_pin_count(&page_id).unwrap(), 1);
}

#[test]
fn test_new_page_no_initial_frames() {
    let mut bpm = get_bpm_with_pool_size(0);
    assert!(bpm.new_page().is_none());
}

#[test]
fn test_cannot_create_page_beyond_buffer_pool_size() {
    let mut bpm = get_bpm_with_pool_size(2);

    // Create and pin two pages.
    let page_id1 = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
    let page_id2 = bpm.new_page().expect(NEW_PAGE_ERR_MSG);

    bpm.fetch_page(&page_id1);
    bpm.fetch_page(&page_id2);

    // All frames are now pinned, attempt to create another page.
    let result = bpm.new_page();
    assert!(result.is_none());
}

#[test]
fn test_new_page_evict_frame() {
    let pool_size = 3_usize;
    let mut bpm = get_bpm_with_pool_size(pool_size);

    let mut new_page_id: Option<PageId> = None;
    for _ in 0..pool_size {
        assert!(!bpm.free_list.is_empty());
        new_page_id = bpm.new_page();
        assert!(new_page_id.is_some());
    }

    // free list empty, and no evictable page.
    assert!(bpm.free_list.is_empty());
    assert!(bpm.new_page().is_none());

    // free list empty, but there's an evictable page.
    let page_id_to_evict = new_page_id.unwrap();
    assert!(bpm.unpin_page(&page_id_to_evict, false));
    assert!(bpm.free_list.is_empty());
    let new_page_after_eviction = bpm.new_page();
    assert!(new_page_after_eviction.is_some());
    assert!(!bpm.page_table.contains_key(&page_id_to_evict));

    assert!(bpm.free_list.is_empty());
    assert!(bpm.new_page().is_none());
}

/// Basic LRU eviction: with three unpinned pages, the page unpinned first is
/// the one replaced, and it remains fetchable from disk afterwards.
#[test]
fn test_least_recently_unpinned_page_is_evicted() {
    let mut bpm = get_bpm_with_pool_size(3);

    let page_id0 = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
    bpm.unpin_page(&page_id0, false);
    let page_id1 = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
    bpm.unpin_page(&page_id1, false);
    let page_id2 = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
    bpm.unpin_page(&page_id2, false);

    let page_id3 = bpm.new_page().expect(NEW_PAGE_ERR_MSG);

    // page 0 was the least recently unpinned page.
    assert!(!bpm.page_table.contains_key(&page_id0));
    assert!(bpm.page_table.contains_key(&page_id1));
    assert!(bpm.page_table.contains_key(&page_id2));
    assert!(bpm.page_table.contains_key(&page_id3));

    // the evicted page can be re-read from disk; page 1 is the next victim.
    assert_eq!(fetch_page_get_id(&page_id0, &mut bpm), page_id0);
    assert!(!bpm.page_table.contains_key(&page_id1));
}

#[test]
fn test_fetch_page_in_buffer() {
    let pool_size = 10_usize;
    let mut bpm = get_bpm_with_pool_size(pool_size);

    let page_ids = create_n_pages(&mut bpm, pool_size);
    page_ids
        .iter()
        .for_each(|&page_id| assert_eq!(fetch_page_get_id(&page_id, &mut bpm), page_id));
}

/// This test assumes [`super::BufferPoolManager::unpin_page`] functions properly.
#[test]
fn test_fetch_page_not_in_buffer() {
    let pool_size = 10_usize;
    let mut bpm = get_bpm_with_pool_size(pool_size);

    // fill buffer pool to capacity with new pages.
    let page_id_to_evict = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
    bpm.unpin_page(&page_id_to_evict, false);
    create_n_pages(&mut bpm, pool_size - 1);

    // and add another page.
    let another_page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
    bpm.unpin_page(&another_page_id, false); // for the fetch_page later

    // verify a page was evicted for the new page.
    assert!(!bpm.page_table.contains_key(&page_id_to_evict));

    // ...we should still be able to fetch that evicted page (from disk).
    assert_eq!(
        fetch_page_get_id(&page_id_to_evict, &mut bpm),
        page_id_to_evict
    );

    // another fetch of that page (this time from the buffer pool!)
    assert_eq!(
        fetch_page_get_id(&page_id_to_evict, &mut bpm),
        page_id_to_evict
    );
}

/// Dirty writeback through eviction: bytes written before an unpin-dirty
/// survive the page's round trip through disk.
#[test]
fn test_dirty_page_eviction_writes_back() {
    let mut bpm = get_bpm_with_pool_size(3);

    let page_id0 = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
    write_byte(&mut bpm, &page_id0, 0, b'A');
    bpm.unpin_page(&page_id0, true);

    // force page 0 out of the pool.
    for _ in 0..3 {
        let page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
        bpm.unpin_page(&page_id, false);
    }
    assert!(!bpm.page_table.contains_key(&page_id0));

    let page = bpm.fetch_page(&page_id0).expect(NO_CORRESPONDING_PAGE_MSG);
    assert_eq!(page.read().unwrap().data()[0], b'A');
}

#[test]
fn test_unpin_page_changes_dirty_flag() {
    let mut bpm = get_bpm_with_pool_size(5);
    let page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);

    assert!(!bpm.get_is_dirty(&page_id));
    assert!(bpm.unpin_page(&page_id, true));
    assert!(bpm.get_is_dirty(&page_id));
}

/// The dirty flag is sticky: an unpin with `is_dirty = false` must not wipe
/// out a previous holder's dirty report.
#[test]
fn test_unpin_page_dirty_flag_is_sticky() {
    let mut bpm = get_bpm_with_pool_size(5);
    let page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);

    bpm.fetch_page(&page_id);
    assert!(bpm.unpin_page(&page_id, true));
    assert!(bpm.unpin_page(&page_id, false));
    assert!(bpm.get_is_dirty(&page_id));
}

#[test]
fn test_unpin_page_not_in_buffer_pool() {
    let mut bpm = get_bpm_with_pool_size(0);
    // buffer pool is empty; unpinning an unknown page is a soft failure.
    assert!(!bpm.unpin_page(&INVALID_PID, false));
}

/// This test assumes [`super::BufferPoolManager::delete_page`] functions properly.
#[test]
fn test_unpin_page_before_and_after_deletion() {
    let mut bpm = get_bpm_with_pool_size(5);

    // Pin count: 1
    let page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);

    // Pin count: 0
    assert!(bpm.unpin_page(&page_id, false));

    // Pin count: still 0
    assert!(!bpm.unpin_page(&page_id, false));
    assert!(bpm.delete_page(page_id));
}

/// This test assumes [`super::BufferPoolManager::fetch_page`] properly increments pin count.
#[test]
fn test_unpin_page_decrements_multiple_times() {
    let mut bpm = get_bpm_with_pool_size(5);

    // Pin count: 1
    let page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
    // Pin count: 26
    for _ in 0..25 {
        bpm.fetch_page(&page_id);
    }
    assert_eq!(bpm.get_pin_count(&page_id).unwrap(), 26);

    // Pin count: 25 -> 24 -> ... -> 0
    for i in (0..26).rev() {
        assert!(bpm.unpin_page(&page_id, false));
        assert_eq!(bpm.get_pin_count(&page_id).unwrap(), i);
    }
}

#[test]
fn test_flush_page_does_not_exist() {
    let mut bpm = get_bpm_with_pool_size(5);
    let page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
    let different_page_id = page_id + 1;

    assert!(!bpm.flush_page(&different_page_id));
}

#[test]
fn test_flush_page_writes_through_and_clears_dirty_flag() {
    let file_name = create_temp_file();
    let disk_manager = DiskManager::new_with_handle(&file_name);
    let mut bpm = BufferPoolManager::builder()
        .pool_size(5)
        .disk_manager(disk_manager)
        .build();

    let page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
    write_byte(&mut bpm, &page_id, 7, 0x2A);
    bpm.set_is_dirty(&page_id, true);

    assert!(bpm.flush_page(&page_id));
    assert!(!bpm.get_is_dirty(&page_id));

    // Re-open the file with another disk manager and verify the bytes.
    let disk_manager = DiskManager::new_with_handle(&file_name);
    let mut buffer = [0_u8; FERRO_DB_PAGE_SIZE_BYTES];
    disk_manager
        .write()
        .unwrap()
        .read_page(&page_id, &mut buffer);
    assert_eq!(buffer[7], 0x2A);
}

#[test]
fn test_flush_clean_page_is_noop_success() {
    let mut bpm = get_bpm_with_pool_size(5);
    let page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);

    assert!(!bpm.get_is_dirty(&page_id));
    assert!(bpm.flush_page(&page_id));
    assert!(!bpm.get_is_dirty(&page_id));
}

#[test]
fn test_flush_all_pages() {
    let pool_size = 10;
    let file_name = create_temp_file();
    let disk_manager = DiskManager::new_with_handle(&file_name);
    let mut bpm = BufferPoolManager::builder()
        .pool_size(pool_size)
        .disk_manager(disk_manager)
        .build();

    let page_ids: Vec<PageId> = create_n_pages(&mut bpm, pool_size);

    // Tag each page with a unique byte.
    page_ids.iter().enumerate().for_each(|(i, page_id)| {
        write_byte(&mut bpm, page_id, 0, i as u8 + 1);
        bpm.set_is_dirty(page_id, true);
    });

    bpm.flush_all_pages();
    page_ids
        .iter()
        .for_each(|page_id| assert!(!bpm.get_is_dirty(page_id)));

    // Re-read each page from disk, and ensure its tag survived.
    let disk_manager = DiskManager::new_with_handle(&file_name);
    page_ids.iter().enumerate().for_each(|(i, page_id)| {
        let mut buffer = [0_u8; FERRO_DB_PAGE_SIZE_BYTES];
        disk_manager.write().unwrap().read_page(page_id, &mut buffer);
        assert_eq!(buffer[0], i as u8 + 1);
    });
}

/// Deleting a page that is not resident only releases the disk allocation.
#[test]
fn test_delete_page_not_resident_succeeds() {
    let mut bpm = get_bpm_with_pool_size(5);
    let page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
    let different_page_id = page_id + 1;

    assert!(bpm.delete_page(different_page_id));
}

/// Delete refuses a pinned page until its last holder unpins.
#[test]
fn test_cannot_delete_pinned_page() {
    let mut bpm = get_bpm_with_pool_size(5);
    let page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);

    assert!(!bpm.delete_page(page_id));

    bpm.unpin_page(&page_id, false);
    assert!(bpm.delete_page(page_id));
}

/// This test assumes [`super::BufferPoolManager::unpin_page`] properly decrements pin count.
#[test]
fn test_delete_evictable_page() {
    let mut bpm = get_bpm_with_pool_size(5);
    let page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
    let frames_free_before = bpm.free_list.len();

    bpm.unpin_page(&page_id, false);
    assert!(bpm.delete_page(page_id));

    // the frame went back on the free list and left the replacer.
    assert!(!bpm.page_table.contains_key(&page_id));
    assert_eq!(bpm.free_list.len(), frames_free_before + 1);
    assert_eq!(bpm.replacer.read().unwrap().size(), 0);
}

/// This test assumes [`super::BufferPoolManager::unpin_page`] properly decrements pin count.
#[test]
fn test_attempt_deletion_of_evictable_and_pinned_pages() {
    let pool_size = 20_usize;
    let mut bpm = get_bpm_with_pool_size(pool_size);
    let page_ids = create_n_pages(&mut bpm, pool_size);

    // unpin half the pages; the other half remain pinned
    let evictable_page_ids: Vec<PageId> = page_ids
        .iter()
        .filter(|&page_id| page_id % 2 == 0)
        .map(|page_id| {
            bpm.unpin_page(page_id, false);
            *page_id
        })
        .collect();

    for page_id in page_ids {
        let was_deleted = bpm.delete_page(page_id);
        let should_have_been_deleted = evictable_page_ids.contains(&page_id);
        assert_eq!(was_deleted, should_have_been_deleted);
    }
}

/// Every frame is in exactly one of {free list, page table}.
#[test]
fn test_frames_split_between_free_list_and_page_table() {
    let pool_size = 8_usize;
    let mut bpm = get_bpm_with_pool_size(pool_size);
    assert_eq!(bpm.free_list.len() + bpm.page_table.len(), pool_size);

    let page_ids = create_n_pages(&mut bpm, 5);
    assert_eq!(bpm.free_list.len() + bpm.page_table.len(), pool_size);

    bpm.unpin_page(&page_ids[0], false);
    bpm.delete_page(page_ids[0]);
    assert_eq!(bpm.free_list.len() + bpm.page_table.len(), pool_size);
}

/// Round trip through an explicit flush and an eviction: bytes written under
/// a pin come back identical after the page leaves and re-enters the pool.
#[test]
fn test_fetch_after_flush_and_eviction_round_trips() {
    let mut bpm = get_bpm_with_pool_size(2);

    let page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
    let payload: Vec<u8> = (0..64).map(|i| i as u8 ^ 0x5C).collect();
    {
        let page = bpm.get_page(&page_id).unwrap();
        let mut page_guard = page.write().unwrap();
        page_guard.data_mut()[..payload.len()].copy_from_slice(&payload);
    }
    bpm.unpin_page(&page_id, true);
    assert!(bpm.flush_page(&page_id));

    // cycle both frames to push the page out.
    for _ in 0..2 {
        let page_id = bpm.new_page().expect(NEW_PAGE_ERR_MSG);
        bpm.unpin_page(&page_id, false);
    }
    assert!(!bpm.page_table.contains_key(&page_id));

    let page = bpm.fetch_page(&page_id).expect(NO_CORRESPONDING_PAGE_MSG);
    assert_eq!(&page.read().unwrap().data()[..payload.len()], &payload[..]);
}

/// This test is simulating latches and concurrent access to the buffer pool
/// manager through its pool-wide lock; with a single frame, one pinned page
/// starves every other fetch.
#[test]
fn test_serialized_evictable() {
    const ROUNDS: usize = 20;
    const NUM_READERS: usize = 4;

    let disk_manager = new_disk_manager();
    let bpm = BufferPoolManager::new_with_handle(1, Arc::clone(&disk_manager));

    for _ in 0..ROUNDS {
        let signal = Arc::new(AtomicBool::new(false));

        // Allocate pages via DiskManager.
        let winner_pid = disk_manager.write().unwrap().allocate_page();
        let loser_pid = disk_manager.write().unwrap().allocate_page();

        crossbeam::thread::scope(|scope| {
            for _ in 0..NUM_READERS {
                let signal = Arc::clone(&signal);
                let bpm = Arc::clone(&bpm);

                scope.spawn(move |_| {
                    // Wait until the main thread has pinned the winner page.
                    while !signal.load(Ordering::SeqCst) {
                        thread::sleep(Duration::from_millis(1));
                    }

                    let mut bpm_guard = bpm.write().unwrap();
                    let _page_handle = bpm_guard.fetch_page(&winner_pid).unwrap();

                    // The only frame is pinned; no thread can bring in the
                    // other page.
                    assert!(bpm_guard.fetch_page(&loser_pid).is_none());

                    bpm_guard.unpin_page(&winner_pid, false);
                });
            }

            {
                let mut bpm_guard = bpm.write().unwrap();
                let page_handle = bpm_guard.fetch_page(&winner_pid).unwrap();
                let _page_read_lock = page_handle.read().unwrap();

                // Signal all the readers to proceed.
                signal.store(true, Ordering::SeqCst);

                drop(_page_read_lock);
                bpm_guard.unpin_page(&winner_pid, false);
            }
        })
        .unwrap();
    }
}

fn create_n_pages(bpm: &mut BufferPoolManager, n: usize) -> Vec<PageId> {
    (0..n)
        .map(|_| bpm.new_page().expect(NEW_PAGE_ERR_MSG))
        .collect()
}

fn new_disk_manager() -> Arc<RwLock<DiskManager>> {
    DiskManager::new_with_handle_for_test()
}

fn fetch_page_get_id(page_id: &PageId, bpm: &mut BufferPoolManager) -> PageId {
    let id = *fetch_page(page_id, bpm)
        .read()
        .expect(NO_CORRESPONDING_PAGE_MSG)
        .page_id();
    bpm.unpin_page(page_id, false);
    id
}

fn fetch_page(page_id: &PageId, bpm: &mut BufferPoolManager) -> PageHandle {
    bpm.fetch_page(page_id).expect(NO_CORRESPONDING_PAGE_MSG)
}

fn get_bpm_with_pool_size(pool_size: usize) -> BufferPoolManager {
    let disk_manager = new_disk_manager();
    BufferPoolManager::builder()
        .pool_size(pool_size)
        .disk_manager(disk_manager)
        .build()
}

fn page_in_buffer(buffer_pool_manager: &BufferPoolManager, page_id: &PageId) -> bool {
    match buffer_pool_manager.page_table.get(page_id) {
        None => false,
        Some(metadata) => !buffer_pool_manager.free_list.contains(metadata.frame_id()),
    }
}

fn write_byte(bpm: &mut BufferPoolManager, page_id: &PageId, offset: usize, value: u8) {
    let page = bpm.get_page(page_id).expect(NO_CORRESPONDING_PAGE_MSG);
    page.write().unwrap().data_mut()[offset] = value;
}

fn create_temp_file() -> String {
    let temp_file = NamedTempFile::new_in(data_dir()).expect("Failed to create temp file");

    temp_file
        .path()
        .file_name()
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned()
}
