//! AES-128-CTR keystream engine for encrypted column streams.
//!
//! CTR mode turns AES into a stream cipher: the 16-byte IV is the initial
//! counter block, incremented as a 128-bit big-endian integer per block, and
//! the ciphertext is the plaintext XORed with the encrypted counters. There is
//! no padding and no authentication tag; output length equals input length.

use aes::Aes128;
use common::ProtectError;
use ctr::cipher::{KeyIvInit, StreamCipher};
use tracing::{debug, warn};

use super::algorithm::AES_CTR_128;
use super::options::EncryptionOptions;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Stateful keystream for one stream.
///
/// The context is dropped after the first backend failure and every later call
/// reports [`ProtectError::CryptoBackend`].
pub struct CipherEngine {
    algorithm: &'static str,
    context: Option<Aes128Ctr>,
}

impl CipherEngine {
    /// Create an engine positioned at the start of the keystream.
    ///
    /// # Errors
    ///
    /// - [`ProtectError::Configuration`] if the key or IV length does not
    ///   match the algorithm.
    /// - [`ProtectError::Unsupported`] for any algorithm other than
    ///   `AES_CTR_128`.
    /// - [`ProtectError::CryptoBackend`] if the cipher cannot be initialised.
    pub fn create(options: &EncryptionOptions) -> Result<Self, ProtectError> {
        options.validate()?;
        if options.algorithm != &AES_CTR_128 {
            return Err(ProtectError::Unsupported(format!(
                "{} not yet supported",
                options.algorithm
            )));
        }
        let context = Aes128Ctr::new_from_slices(options.key.as_bytes(), &options.iv)
            .map_err(|e| ProtectError::CryptoBackend(format!("{} init error: {e}", options.algorithm)))?;
        debug!(algorithm = options.algorithm.name, "cipher initialised");
        Ok(Self {
            algorithm: options.algorithm.name,
            context: Some(context),
        })
    }

    /// Encrypt `buf` in place, continuing the keystream.
    ///
    /// # Errors
    ///
    /// Returns [`ProtectError::CryptoBackend`] if the engine was released or
    /// the keystream is exhausted. In the latter case `buf` is left untouched
    /// and the engine is released.
    pub fn encrypt_in_place(&mut self, buf: &mut [u8]) -> Result<(), ProtectError> {
        let Some(context) = self.context.as_mut() else {
            return Err(ProtectError::CryptoBackend(format!(
                "{} cipher already released",
                self.algorithm
            )));
        };
        if buf.is_empty() {
            return Ok(());
        }
        if let Err(e) = context.try_apply_keystream(buf) {
            self.context = None;
            warn!(algorithm = self.algorithm, len = buf.len(), "keystream failure, releasing cipher");
            return Err(ProtectError::CryptoBackend(format!(
                "{} encrypt error: {e}",
                self.algorithm
            )));
        }
        Ok(())
    }

    /// Encrypt `input` into a new buffer of the same length.
    pub fn encrypt(&mut self, input: &[u8]) -> Result<Vec<u8>, ProtectError> {
        let mut out = input.to_vec();
        self.encrypt_in_place(&mut out)?;
        Ok(out)
    }

    /// Decryption is the same keystream application.
    pub fn decrypt(&mut self, input: &[u8]) -> Result<Vec<u8>, ProtectError> {
        self.encrypt(input)
    }

    pub fn is_released(&self) -> bool {
        self.context.is_none()
    }
}

impl std::fmt::Debug for CipherEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherEngine")
            .field("algorithm", &self.algorithm)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{derive_stream_iv, AES_CTR_256};
    use common::StreamKind;
    use proptest::prelude::*;

    /// AES-128-CTR keystream for key `00..0f` and the DATA stream IV of
    /// column 52, stripe 18.
    const KEYSTREAM: [u8; 210] = [
        0x82, 0x22, 0x52, 0xA8, 0x1C, 0xC7, 0xE7, 0xFE, 0x3E, 0x51, 0xF5, 0x0E, 0x0E, 0x9B, 0x64, 0xB1,
        0xF6, 0x4D, 0x36, 0xA9, 0xD9, 0xD7, 0x55, 0xDE, 0xCB, 0xD5, 0x62, 0x0E, 0x6D, 0xA6, 0x6B, 0x16,
        0x00, 0x0B, 0xE8, 0xBA, 0x9D, 0xDE, 0x78, 0xEC, 0x73, 0x05, 0xF6, 0x1E, 0x76, 0xD7, 0x9B, 0x7A,
        0x47, 0xE9, 0x61, 0x90, 0x65, 0x8B, 0x54, 0xAC, 0xF2, 0x3F, 0x67, 0xAE, 0x25, 0x63, 0x1D, 0x4B,
        0x41, 0x48, 0xC4, 0x15, 0x5F, 0x2A, 0x7F, 0x91, 0x9A, 0x87, 0xA1, 0x09, 0xFF, 0x68, 0x68, 0xCC,
        0xC0, 0x80, 0x52, 0xD4, 0xA5, 0x07, 0x4B, 0x79, 0xC7, 0x08, 0x46, 0x46, 0x8C, 0x74, 0x2C, 0x0D,
        0x9F, 0x55, 0x7E, 0xA7, 0x17, 0x47, 0x91, 0xFD, 0x01, 0xD4, 0x24, 0x1F, 0x76, 0xA1, 0xDC, 0xC3,
        0xEA, 0x13, 0x4C, 0x29, 0xCA, 0x68, 0x1E, 0x4F, 0x0D, 0x19, 0xE5, 0x09, 0xF9, 0xC5, 0xF4, 0x15,
        0x9A, 0xAD, 0xC4, 0xA1, 0x0F, 0x28, 0xD4, 0x3D, 0x59, 0xF0, 0x68, 0xD3, 0xC4, 0x98, 0x74, 0x68,
        0x37, 0xA4, 0xF4, 0x7C, 0x02, 0xCE, 0xC6, 0xCA, 0xA1, 0xF8, 0xC3, 0x8C, 0x7B, 0x72, 0x38, 0xD1,
        0xAA, 0x52, 0x90, 0xDE, 0x28, 0xA1, 0x53, 0x6E, 0xA6, 0x5C, 0xC0, 0x89, 0xC4, 0x21, 0x76, 0xC0,
        0x1F, 0xED, 0x0A, 0xF9, 0xA2, 0xA7, 0xC1, 0x8D, 0xA0, 0x92, 0x44, 0x4F, 0x60, 0x51, 0x7F, 0xD8,
        0x6D, 0x16, 0xAF, 0x46, 0x1C, 0x27, 0x20, 0x1C, 0x01, 0xBD, 0xC5, 0x0B, 0x62, 0x3F, 0xEF, 0xEE,
        0x37, 0xAE,
    ];

    fn options() -> EncryptionOptions {
        let key: Vec<u8> = (0u8..16).collect();
        let iv = derive_stream_iv(52, StreamKind::Data, 18).unwrap();
        EncryptionOptions::new(&AES_CTR_128, key, iv)
    }

    fn plaintext() -> Vec<u8> {
        (0..210).map(|i| (i + 3) as u8).collect()
    }

    fn expected() -> Vec<u8> {
        plaintext().iter().zip(KEYSTREAM).map(|(p, k)| p ^ k).collect()
    }

    #[test]
    fn matches_reference_ciphertext() {
        let mut engine = CipherEngine::create(&options()).unwrap();
        assert_eq!(engine.encrypt(&plaintext()).unwrap(), expected());
    }

    #[test]
    fn keystream_continues_across_calls() {
        let mut engine = CipherEngine::create(&options()).unwrap();
        let input = plaintext();
        let mut out = engine.encrypt(&input[..100]).unwrap();
        out.extend(engine.encrypt(&input[100..]).unwrap());
        assert_eq!(out, expected());
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let mut engine = CipherEngine::create(&options()).unwrap();
        assert!(engine.encrypt(&[]).unwrap().is_empty());
        assert_eq!(engine.encrypt(&plaintext()).unwrap(), expected());
    }

    #[test]
    fn decrypt_round_trip() {
        let ciphertext = CipherEngine::create(&options())
            .unwrap()
            .encrypt(b"column payload")
            .unwrap();
        let mut reader = CipherEngine::create(&options()).unwrap();
        assert_eq!(reader.decrypt(&ciphertext).unwrap(), b"column payload");
    }

    #[test]
    fn aes_256_is_not_yet_supported() {
        let options = EncryptionOptions::new(&AES_CTR_256, vec![0; 32], vec![0; 16]);
        match CipherEngine::create(&options) {
            Err(ProtectError::Unsupported(msg)) => assert!(msg.contains("not yet supported")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn wrong_lengths_are_configuration_errors() {
        let short_key = EncryptionOptions::new(&AES_CTR_128, vec![0; 8], vec![0; 16]);
        assert!(matches!(
            CipherEngine::create(&short_key),
            Err(ProtectError::Configuration(msg)) if msg.contains("key")
        ));
        let short_iv = EncryptionOptions::new(&AES_CTR_256, vec![0; 32], vec![0; 8]);
        assert!(matches!(
            CipherEngine::create(&short_iv),
            Err(ProtectError::Configuration(msg)) if msg.contains("iv")
        ));
    }

    #[test]
    fn released_engine_rejects_every_call() {
        let mut engine = CipherEngine::create(&options()).unwrap();
        engine.encrypt(b"abc").unwrap();
        engine.context = None;
        assert!(engine.is_released());
        let err = engine.encrypt(b"abc").unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(engine.encrypt(&[]), Err(ProtectError::CryptoBackend(_))));
        assert!(matches!(engine.decrypt(b"x"), Err(ProtectError::CryptoBackend(_))));
    }

    #[test]
    fn debug_does_not_expose_state() {
        let engine = CipherEngine::create(&options()).unwrap();
        assert_eq!(
            format!("{engine:?}"),
            "CipherEngine { algorithm: \"AES_CTR_128\", released: false }"
        );
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_output(split in 0usize..=210) {
            let mut engine = CipherEngine::create(&options()).unwrap();
            let input = plaintext();
            let mut out = engine.encrypt(&input[..split]).unwrap();
            out.extend(engine.encrypt(&input[split..]).unwrap());
            prop_assert_eq!(out, expected());
        }
    }
}
