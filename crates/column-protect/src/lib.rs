//! `column-protect`: column-level data protection for columnar files.
//!
//! Two independent layers:
//! 1. [`mask`] builds a mask tree mirroring a schema and applies it to
//!    in-memory column batches (nullify, redact or hash values).
//! 2. [`crypto`] encrypts serialized column streams with AES-128-CTR under a
//!    per-stream IV derived from column id, stream kind and stripe index.
//!
//! Typical writer setup:
//!
//! ```no_run
//! use column_protect::config::ProtectionConfig;
//! use column_protect::crypto::{derive_stream_iv, CipherEngine, EncryptionOptions};
//! use column_protect::StreamKind;
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = ProtectionConfig::from_env()?;
//! column_protect::telemetry::init(&cfg.log_level)?;
//! let mask = cfg.mask_tree()?;
//!
//! let iv = derive_stream_iv(1, StreamKind::Data, 1)?;
//! let options = EncryptionOptions::new(cfg.algorithm()?, vec![0u8; 16], iv);
//! let mut engine = CipherEngine::create(&options)?;
//! let ciphertext = engine.encrypt(b"serialized stream bytes")?;
//! # let _ = (mask, ciphertext);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod crypto;
pub mod mask;
pub mod telemetry;

pub use common::{ProtectError, StreamKind, TypeDescription, TypeKind};
pub use crypto::{CipherEngine, EncryptionAlgorithm, EncryptionOptions};
pub use mask::{build_mask_tree, DataMask, MaskDescription};
