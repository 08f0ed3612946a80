//! Options a writer supplies to create a [`super::CipherEngine`].

use std::fmt;

use common::ProtectError;

use super::algorithm::EncryptionAlgorithm;

/// Key material, zeroed when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyBytes(Vec<u8>);

impl KeyBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for KeyBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyBytes([REDACTED])")
    }
}

/// Algorithm, key and initial IV for one encrypted stream.
#[derive(Debug, Clone)]
pub struct EncryptionOptions {
    pub algorithm: &'static EncryptionAlgorithm,
    pub key: KeyBytes,
    pub iv: Vec<u8>,
}

impl EncryptionOptions {
    pub fn new(
        algorithm: &'static EncryptionAlgorithm,
        key: impl Into<Vec<u8>>,
        iv: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            algorithm,
            key: KeyBytes::new(key),
            iv: iv.into(),
        }
    }

    /// Check key and IV lengths against the algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ProtectError::Configuration`] naming the offending field.
    pub fn validate(&self) -> Result<(), ProtectError> {
        ensure_length("key", self.algorithm, self.algorithm.key_length, self.key.len())?;
        ensure_length("iv", self.algorithm, self.algorithm.iv_length, self.iv.len())
    }
}

fn ensure_length(
    field: &str,
    algorithm: &EncryptionAlgorithm,
    expected: usize,
    actual: usize,
) -> Result<(), ProtectError> {
    if expected != actual {
        return Err(ProtectError::Configuration(format!(
            "{algorithm} {field} must be {expected} bytes, got {actual}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AES_CTR_128, AES_CTR_256};

    #[test]
    fn debug_redacts_key() {
        let options = EncryptionOptions::new(&AES_CTR_128, vec![0xAB; 16], vec![0; 16]);
        let rendered = format!("{options:?}");
        assert!(rendered.contains("KeyBytes([REDACTED])"));
        assert!(!rendered.contains("171"));
    }

    #[test]
    fn validate_names_the_bad_field() {
        let options = EncryptionOptions::new(&AES_CTR_128, vec![0; 15], vec![0; 16]);
        let err = options.validate().unwrap_err().to_string();
        assert!(err.contains("key must be 16 bytes, got 15"), "{err}");

        let options = EncryptionOptions::new(&AES_CTR_256, vec![0; 32], vec![0; 12]);
        let err = options.validate().unwrap_err().to_string();
        assert!(err.contains("iv must be 16 bytes, got 12"), "{err}");

        assert!(EncryptionOptions::new(&AES_CTR_256, vec![0; 32], vec![0; 16])
            .validate()
            .is_ok());
    }
}
