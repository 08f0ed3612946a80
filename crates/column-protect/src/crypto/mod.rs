//! Stream encryption primitives for column data.
//!
//! This module is free of any file-format framing. It provides the algorithm
//! registry, the options a writer hands to a cipher, the AES-CTR keystream
//! engine and the per-stream IV layout.
//!
//! # IV layout
//!
//! ```text
//! byte  0      3      5        8                16
//!       | col  | kind | stripe | block counter  |
//! ```
//!
//! The counter half starts at zero for every (column, kind, stripe) so that no
//! two streams of a file share keystream.
//!
//! # Module invariants
//!
//! - **Key material is never logged or printed.** [`KeyBytes`] redacts its
//!   `Debug` output and zeroes itself on drop.
//! - **One keystream per engine.** Successive `encrypt` calls on a
//!   [`CipherEngine`] continue where the previous call stopped; chunking the
//!   input differently yields the same output.

pub mod algorithm;
pub mod cipher;
pub mod iv;
pub mod options;

pub use algorithm::{EncryptionAlgorithm, AES_CTR_128, AES_CTR_256};
pub use cipher::CipherEngine;
pub use iv::{clear_counter, derive_stream_iv, modify_iv_for_stripe, IV_LENGTH};
pub use options::{EncryptionOptions, KeyBytes};
