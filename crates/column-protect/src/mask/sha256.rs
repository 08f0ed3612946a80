//! Content hashing: replace string and binary values with their SHA-256
//! digest so equal inputs stay joinable after masking.

use common::ProtectError;
use sha2::{Digest, Sha256};

use super::check_range;
use crate::batch::ColumnBatch;

/// Leaf mask that hashes byte payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sha256Mask {
    /// Uppercase hex digest (64 characters). `max_length` truncates it for
    /// `char(n)` / `varchar(n)`; `pad` space-fills `char(n)` up to `n`.
    String { max_length: Option<usize>, pad: bool },
    /// Raw 32-byte digest.
    Binary,
}

impl Sha256Mask {
    /// Masked form of one value.
    pub fn digest(&self, value: &[u8]) -> Vec<u8> {
        let digest = Sha256::digest(value);
        match self {
            Sha256Mask::Binary => digest.to_vec(),
            Sha256Mask::String { max_length, pad } => {
                let mut hex = hex::encode_upper(digest).into_bytes();
                if let Some(n) = *max_length {
                    hex.truncate(n);
                    if *pad {
                        hex.resize(n, b' ');
                    }
                }
                hex
            }
        }
    }

    /// Hash rows `[start, start + length)`; null rows are skipped and
    /// presence is left unchanged.
    pub fn mask_data(
        &self,
        source: &ColumnBatch,
        target: &mut ColumnBatch,
        start: usize,
        length: usize,
    ) -> Result<(), ProtectError> {
        let target_name = target.variant_name();
        let (ColumnBatch::Bytes(src), ColumnBatch::Bytes(dst)) = (source, target) else {
            let batch = match source {
                ColumnBatch::Bytes(_) => target_name,
                other => other.variant_name(),
            };
            return Err(ProtectError::TypeMismatch {
                mask: "sha256",
                batch,
            });
        };
        check_range("sha256", start, length, src.presence.not_null.len())?;
        check_range("sha256", start, length, dst.presence.not_null.len())?;
        check_range("sha256", start, length, src.data.len())?;
        check_range("sha256", start, length, dst.data.len())?;
        for i in (start..start + length).filter(|&i| src.presence.is_valid(i)) {
            dst.data[i] = self.digest(&src.data[i]);
        }
        Ok(())
    }
}
