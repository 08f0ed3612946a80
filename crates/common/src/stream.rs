//! Stream kinds: the role a physical byte stream plays within a column.

use serde::{Deserialize, Serialize};

/// Semantic role of a stream within a column.
///
/// The discriminants are the wire codes written to stripe footers and packed
/// into per-stream initialization vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamKind {
    Present = 0,
    Data = 1,
    Length = 2,
    DictionaryData = 3,
    DictionaryCount = 4,
    Secondary = 5,
    RowIndex = 6,
    BloomFilter = 7,
    BloomFilterUtf8 = 8,
    EncryptedIndex = 9,
    EncryptedData = 10,
    StripeStatistics = 100,
    FileStatistics = 101,
}

impl StreamKind {
    /// Wire code of this stream kind.
    pub fn code(self) -> u32 {
        self as u32
    }
}
