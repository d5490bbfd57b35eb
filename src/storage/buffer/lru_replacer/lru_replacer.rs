use crate::storage::buffer::buffer_pool_manager::FrameId;
use std::collections::HashMap;

/// One link in the recency order. Frames are threaded into a doubly linked
/// list through the node store, front = most recently unpinned.
#[derive(Debug)]
pub(crate) struct LruNode {
    pub(crate) prev: Option<FrameId>,
    pub(crate) next: Option<FrameId>,
}

/// Tracks the frames currently eligible for eviction and picks the least
/// recently unpinned one as the victim.
///
/// Membership in `node_store` is membership in the eligible set; the list
/// pointers give O(1) unlink on [`Self::pin`] and O(1) push-front on
/// [`Self::unpin`].
#[derive(Debug)]
pub struct LruReplacer {
    pub(crate) node_store: HashMap<FrameId, LruNode>,
    pub(crate) head: Option<FrameId>,
    pub(crate) tail: Option<FrameId>,
    // Maximum number of frames that can be tracked by the replacer.
    pub(crate) max_size: usize,
}

impl LruReplacer {
    pub fn new(num_frames: usize) -> Self {
        Self {
            node_store: HashMap::with_capacity(num_frames),
            head: None,
            tail: None,
            max_size: num_frames,
        }
    }

    pub fn builder() -> LruReplacerBuilder {
        LruReplacerBuilder { max_size: None }
    }

    /// Removes and returns the least recently unpinned frame in the eligible
    /// set.
    ///
    /// # Returns
    /// - `Some(frame_id)` if a victim was found, `None` when no frame is
    ///   eligible for eviction.
    pub fn victim(&mut self) -> Option<FrameId> {
        let frame_id = self.tail?;
        self.detach(&frame_id);
        Some(frame_id)
    }

    /// Removes `frame_id` from the eligible set. A frame that is not being
    /// tracked is left alone.
    ///
    /// Called by the buffer pool whenever a frame's page gets pinned.
    pub fn pin(&mut self, frame_id: &FrameId) {
        if self.node_store.contains_key(frame_id) {
            self.detach(frame_id);
        }
    }

    /// Inserts `frame_id` as the most recently used member of the eligible
    /// set. Unpinning a frame that is already tracked is a no-op: repeated
    /// unpins do not promote recency.
    ///
    /// Called by the buffer pool when a frame's pin count drops to zero.
    /// Panics if the frame id lies outside the replacer's capacity.
    pub fn unpin(&mut self, frame_id: &FrameId) {
        if *frame_id >= self.max_size {
            panic!(
                "FrameId {frame_id} is invalid (replacer size: {})",
                self.max_size
            );
        }
        if self.node_store.contains_key(frame_id) {
            return;
        }
        self.push_front(*frame_id);
    }

    /// Removes `frame_id` from the eligible set, no matter where it sits in
    /// the recency order. Used when its page is deleted from the pool.
    /// Removing an untracked frame is a no-op.
    pub fn remove(&mut self, frame_id: &FrameId) {
        if self.node_store.contains_key(frame_id) {
            self.detach(frame_id);
        }
    }

    /// Returns the number of frames currently eligible for eviction.
    pub fn size(&self) -> usize {
        self.node_store.len()
    }

    fn push_front(&mut self, frame_id: FrameId) {
        let node = LruNode {
            prev: None,
            next: self.head,
        };
        if let Some(old_head) = self.head {
            self.node_store
                .get_mut(&old_head)
                .expect("Recency list head is not in the node store.")
                .prev = Some(frame_id);
        } else {
            self.tail = Some(frame_id);
        }
        self.head = Some(frame_id);
        self.node_store.insert(frame_id, node);
    }

    fn detach(&mut self, frame_id: &FrameId) {
        let node = self
            .node_store
            .remove(frame_id)
            .expect("Detached frame is not in the node store.");
        match node.prev {
            Some(prev) => {
                self.node_store
                    .get_mut(&prev)
                    .expect("Recency list predecessor is not in the node store.")
                    .next = node.next
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                self.node_store
                    .get_mut(&next)
                    .expect("Recency list successor is not in the node store.")
                    .prev = node.prev
            }
            None => self.tail = node.prev,
        }
    }
}

pub struct LruReplacerBuilder {
    max_size: Option<usize>,
}

impl LruReplacerBuilder {
    pub fn max_size(mut self, num_frames: usize) -> Self {
        assert!(num_frames > 0);
        self.max_size = Some(num_frames);
        self
    }

    pub fn build(self) -> LruReplacer {
        LruReplacer::new(
            self.max_size
                .expect("Replacer size was not specified before build."),
        )
    }
}
