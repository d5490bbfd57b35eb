pub(crate) mod lru_replacer;

pub use lru_replacer::{LruReplacer, LruReplacerBuilder};
