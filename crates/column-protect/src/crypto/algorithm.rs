//! Registry of the supported stream encryption algorithms.

use std::fmt;

use common::ProtectError;

use super::iv::IV_LENGTH;

/// Key length of AES-128 in bytes.
pub const AES_CTR_128_KEY_LENGTH: usize = 16;

/// Key length of AES-256 in bytes.
pub const AES_CTR_256_KEY_LENGTH: usize = 32;

/// Static description of an encryption algorithm.
///
/// Instances are only ever the constants below, so comparison by reference
/// and by value agree.
#[derive(Debug, PartialEq, Eq)]
pub struct EncryptionAlgorithm {
    pub name: &'static str,
    pub key_length: usize,
    pub iv_length: usize,
}

pub static AES_CTR_128: EncryptionAlgorithm = EncryptionAlgorithm {
    name: "AES_CTR_128",
    key_length: AES_CTR_128_KEY_LENGTH,
    iv_length: IV_LENGTH,
};

/// Registered so options can name it; [`super::CipherEngine`] rejects it.
pub static AES_CTR_256: EncryptionAlgorithm = EncryptionAlgorithm {
    name: "AES_CTR_256",
    key_length: AES_CTR_256_KEY_LENGTH,
    iv_length: IV_LENGTH,
};

impl EncryptionAlgorithm {
    /// Look up an algorithm by name, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`ProtectError::Configuration`] for unknown names.
    pub fn from_name(name: &str) -> Result<&'static EncryptionAlgorithm, ProtectError> {
        [&AES_CTR_128, &AES_CTR_256]
            .into_iter()
            .find(|alg| alg.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| {
                ProtectError::Configuration(format!("unknown encryption algorithm {name:?}"))
            })
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths() {
        assert_eq!(AES_CTR_128.key_length, 16);
        assert_eq!(AES_CTR_128.iv_length, 16);
        assert_eq!(AES_CTR_256.key_length, 32);
        assert_eq!(AES_CTR_256.iv_length, 16);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(EncryptionAlgorithm::from_name("aes_ctr_128").unwrap(), &AES_CTR_128);
        assert_eq!(EncryptionAlgorithm::from_name("AES_CTR_256").unwrap(), &AES_CTR_256);
        assert!(matches!(
            EncryptionAlgorithm::from_name("AES_GCM_128"),
            Err(ProtectError::Configuration(_))
        ));
    }

    #[test]
    fn display_is_name() {
        assert_eq!(AES_CTR_128.to_string(), "AES_CTR_128");
    }
}
