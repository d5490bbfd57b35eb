use std::cmp::Ordering;

/// Fixed-width opaque index key. The storage layer never interprets the
/// bytes; ordering comes from the comparator injected into every search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenericKey<const N: usize> {
    data: [u8; N],
}

pub type Key4 = GenericKey<4>;
pub type Key8 = GenericKey<8>;
pub type Key16 = GenericKey<16>;
pub type Key32 = GenericKey<32>;
pub type Key64 = GenericKey<64>;

impl<const N: usize> GenericKey<N> {
    pub fn zeroed() -> Self {
        Self { data: [0; N] }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = [0; N];
        data.copy_from_slice(bytes);
        Self { data }
    }

    /// Encodes an integer big-endian into the key's leading bytes, so that
    /// byte-lexicographic order matches numeric order. Keys narrower than 8
    /// bytes keep the integer's low `N` bytes.
    pub fn from_integer(value: u64) -> Self {
        let mut data = [0; N];
        let width = N.min(8);
        data[..width].copy_from_slice(&value.to_be_bytes()[8 - width..]);
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Total order over fixed-width keys, injected into every index page search.
pub trait KeyComparator<const N: usize> {
    fn compare(&self, lhs: &GenericKey<N>, rhs: &GenericKey<N>) -> Ordering;
}

/// Orders keys by their raw bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenericComparator<const N: usize>;

impl<const N: usize> KeyComparator<N> for GenericComparator<N> {
    fn compare(&self, lhs: &GenericKey<N>, rhs: &GenericKey<N>) -> Ordering {
        lhs.as_bytes().cmp(rhs.as_bytes())
    }
}
