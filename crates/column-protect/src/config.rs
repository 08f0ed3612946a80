//! Protection policy configuration.
//!
//! Values are read from `COLUMN_PROTECT_*` environment variables. The mask
//! description, algorithm name and schema are kept as strings and parsed by
//! [`ProtectionConfig::validate`], so a bad value is reported with the name of
//! the variable that carried it.

use std::collections::HashMap;

use anyhow::{Context, Result};
use common::TypeDescription;
use serde::Deserialize;

use crate::crypto::EncryptionAlgorithm;
use crate::mask::{build_mask_tree, DataMask, MaskDescription};

const ENV_PREFIX: &str = "COLUMN_PROTECT";

/// Validated protection policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtectionConfig {
    /// Mask description, e.g. `nullify`, `sha256` or `redact(Xx9$,0:1)`.
    #[serde(default = "default_mask")]
    pub mask: String,

    /// Stream encryption algorithm name.
    #[serde(default = "default_encryption_algorithm")]
    pub encryption_algorithm: String,

    /// Type string of the protected schema, e.g. `struct<a:int,b:string>`.
    #[serde(default)]
    pub schema: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_mask() -> String {
    "nullify".into()
}
fn default_encryption_algorithm() -> String {
    "AES_CTR_128".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            mask: default_mask(),
            encryption_algorithm: default_encryption_algorithm(),
            schema: None,
            log_level: default_log_level(),
        }
    }
}

impl ProtectionConfig {
    /// Load and validate configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    fn load(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).source(vars))
            .build()
            .context("failed to build configuration from environment")?;

        let c: ProtectionConfig = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    pub fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.mask, "COLUMN_PROTECT_MASK")?;
        ensure_non_empty(&self.log_level, "COLUMN_PROTECT_LOG_LEVEL")?;
        self.mask_description()?;
        self.algorithm()?;
        self.schema_type()?;
        Ok(())
    }

    pub fn mask_description(&self) -> Result<MaskDescription> {
        self.mask
            .parse::<MaskDescription>()
            .with_context(|| format!("COLUMN_PROTECT_MASK {:?} is invalid", self.mask))
    }

    pub fn algorithm(&self) -> Result<&'static EncryptionAlgorithm> {
        EncryptionAlgorithm::from_name(&self.encryption_algorithm).with_context(|| {
            format!(
                "COLUMN_PROTECT_ENCRYPTION_ALGORITHM {:?} is invalid",
                self.encryption_algorithm
            )
        })
    }

    /// The configured schema, if any.
    pub fn schema_type(&self) -> Result<Option<TypeDescription>> {
        self.schema
            .as_deref()
            .map(|s| {
                s.parse::<TypeDescription>()
                    .with_context(|| format!("COLUMN_PROTECT_SCHEMA {s:?} is invalid"))
            })
            .transpose()
    }

    /// Build the mask tree for the configured schema.
    ///
    /// # Errors
    ///
    /// Fails if no schema is configured or the tree cannot be built for it.
    pub fn mask_tree(&self) -> Result<DataMask> {
        let schema = self
            .schema_type()?
            .context("COLUMN_PROTECT_SCHEMA is required to build a mask tree")?;
        let description = self.mask_description()?;
        build_mask_tree(&description, &schema)
            .with_context(|| format!("cannot build {description} mask for {schema}"))
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} must not be empty");
    }
    Ok(())
}
