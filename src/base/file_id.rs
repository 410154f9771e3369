//! File identifiers for tracking script files.

use std::fmt;

/// An interned identifier for a script file.
///
/// `FileId` is a 4-byte handle assigned by [`crate::hir::FileSet`]. Paths are
/// stored once in the file set; everything else (symbol tables, dependency
/// lists, navigation targets) refers to files by id, which keeps comparisons
/// and hashing O(1).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileId(pub u32);

impl FileId {
    /// Create a new FileId from a raw index.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

impl From<u32> for FileId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_file_id_identity() {
        assert_eq!(FileId::new(3), FileId::from(3));
        assert_ne!(FileId::new(3), FileId::new(4));
        assert_eq!(FileId::new(7).index(), 7);
    }

    #[test]
    fn test_file_id_dedups_in_sets() {
        let set: FxHashSet<FileId> = [1, 2, 1, 2, 3].into_iter().map(FileId::new).collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_file_id_display() {
        assert_eq!(FileId::new(12).to_string(), "file#12");
        assert_eq!(format!("{:?}", FileId::new(12)), "FileId(12)");
    }
}
