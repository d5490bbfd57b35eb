//! B+ tree node layouts. An index page is an ordinary buffer pool frame
//! interpreted through one of the typed views in this module; the views do
//! the in-page work (search, ordered insert, removal, split/merge halves,
//! sibling rotations) that a tree-level driver composes into index
//! operations.

mod generic_key;
pub mod index_page;
pub mod internal_page;
pub mod leaf_page;

pub use generic_key::{GenericComparator, GenericKey, Key16, Key32, Key4, Key64, Key8, KeyComparator};
pub use index_page::{IndexPageKind, INDEX_PAGE_HEADER_BYTES};
pub use internal_page::InternalPage;
pub use leaf_page::LeafPage;
