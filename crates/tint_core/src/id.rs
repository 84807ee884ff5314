//! Process-wide object identifiers

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Identifier of a live object.
///
/// Ids are unique for the lifetime of the process and never reused. Id `1`
/// is reserved as the "trace everything" debug target, so the first real
/// object gets id `2`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Reserved id selecting all objects for debug tracing
    pub const ALL: ObjectId = ObjectId(1);

    /// First id handed out to an object
    pub const FIRST: u32 = 2;

    /// Create an id from a raw value
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw value
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread-safe object id generator
pub struct IdGenerator {
    next: AtomicU32,
}

impl IdGenerator {
    /// Create a new generator starting at [`ObjectId::FIRST`]
    pub const fn new() -> Self {
        Self {
            next: AtomicU32::new(ObjectId::FIRST),
        }
    }

    /// Generate the next unique id
    pub fn next(&self) -> ObjectId {
        ObjectId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Peek at the id the next call will return
    pub fn peek(&self) -> ObjectId {
        ObjectId(self.next.load(Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

static OBJECT_IDS: IdGenerator = IdGenerator::new();

/// Allocate an id from the process-wide generator
pub(crate) fn next_object_id() -> ObjectId {
    OBJECT_IDS.next()
}

/// Id the process-wide generator hands out next
pub(crate) fn peek_object_id() -> ObjectId {
    OBJECT_IDS.peek()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_starts_after_reserved_id() {
        let gen = IdGenerator::new();
        assert_eq!(gen.next().raw(), 2);
        assert_eq!(gen.next().raw(), 3);
        assert_eq!(gen.peek().raw(), 4);
    }

    #[test]
    fn test_global_ids_are_unique() {
        let a = next_object_id();
        let b = next_object_id();
        assert_ne!(a, b);
        assert!(a.raw() >= ObjectId::FIRST);
        assert_ne!(a, ObjectId::ALL);
    }
}
