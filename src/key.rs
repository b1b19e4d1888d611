//! Key contract: value equality plus an optional reference-identity reading.

use core::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

/// How a table hashes and compares its keys.
///
/// The mode applies uniformly to every key in a table: it selects both the
/// hash function and the equality test, so switching it forces a full
/// rehash (`OrdHashMap::set_key_mode`).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum KeyMode {
    /// Keys are equal when their values are equal (`Eq`/`Hash`).
    #[default]
    Value,
    /// Keys are equal when they are the same object
    /// (`MapKey::identity_eq`/`MapKey::identity_hash`).
    Identity,
}

/// Key contract for [`OrdHashMap`](crate::OrdHashMap).
///
/// `Eq + Hash` cover [`KeyMode::Value`]; the two provided methods cover
/// [`KeyMode::Identity`] and default to value semantics, which is the right
/// reading for immediate types (integers, strings-as-values): such keys have
/// no object identity distinct from their value. Handle types override them
/// with address comparison; see the `Rc`/`Arc`/`&T` impls below.
///
/// Contract: `identity_eq(a, b)` implies equal `identity_hash` results, and
/// both must be stable for as long as the key lives in a table. A borrowed
/// lookup (`Borrow<Q>`) hashes and compares with `Q`'s own impl of this
/// trait: `Rc<T>` borrows to `T`, whose identity reading is its value, not
/// an address. Identity-mode lookups therefore pass the handle itself; a
/// lookup through the referent misses entries keyed by allocation.
pub trait MapKey: Eq + Hash {
    /// Compare two keys as references rather than values.
    fn identity_eq(&self, other: &Self) -> bool {
        self == other
    }

    /// Hash consistently with [`identity_eq`](Self::identity_eq).
    fn identity_hash<H: Hasher>(&self, state: &mut H) {
        self.hash(state);
    }
}

// Immediate types: identity is the value itself, like a tagged fixnum.
macro_rules! value_identity {
    ($($ty:ty),* $(,)?) => {
        $(impl MapKey for $ty {})*
    };
}

value_identity! {
    u8, u16, u32, u64, u128, usize,
    i8, i16, i32, i64, i128, isize,
    bool, char, str, String,
}

// Boxes own their contents; identity follows the content, not the
// allocation, so a round-trip through `Box` never changes key semantics.
impl<T: ?Sized + MapKey> MapKey for Box<T> {
    fn identity_eq(&self, other: &Self) -> bool {
        (**self).identity_eq(other)
    }

    fn identity_hash<H: Hasher>(&self, state: &mut H) {
        (**self).identity_hash(state);
    }
}

// Shared handles: identity is the referent's address. Two clones of one
// `Rc` are the same key in identity mode; two allocations with equal
// contents are not.
impl<T: ?Sized + Eq + Hash> MapKey for Rc<T> {
    fn identity_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }

    fn identity_hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(self), state);
    }
}

impl<T: ?Sized + Eq + Hash> MapKey for Arc<T> {
    fn identity_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }

    fn identity_hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(self), state);
    }
}

// Borrowed handles (arena-style runtimes key objects by `&'arena T`).
// Hashes the same address as an `Rc`/`Arc` key over the same referent.
impl<T: ?Sized + Eq + Hash> MapKey for &T {
    fn identity_eq(&self, other: &Self) -> bool {
        std::ptr::eq(*self, *other)
    }

    fn identity_hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(*self, state);
    }
}
