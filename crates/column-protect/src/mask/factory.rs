//! Mask tree construction.
//!
//! [`build`] walks a [`TypeDescription`] and produces a [`DataMask`] tree of the
//! same shape. Composite nodes are always built the same way; scalar leaves
//! are delegated to a [`MaskFactory`] policy, which decides what each scalar
//! kind turns into.

use std::fmt;
use std::str::FromStr;

use common::{ProtectError, TypeDescription, TypeKind};
use tracing::debug;

use super::{DataMask, RedactMask, RedactParams, Sha256Mask};

/// Scalar-leaf policy of a mask tree.
///
/// Each hook receives the schema node it is building for.
pub trait MaskFactory {
    fn build_boolean_mask(&self, ty: &TypeDescription) -> Result<DataMask, ProtectError>;
    /// tinyint, smallint, int and bigint.
    fn build_long_mask(&self, ty: &TypeDescription) -> Result<DataMask, ProtectError>;
    /// float and double.
    fn build_double_mask(&self, ty: &TypeDescription) -> Result<DataMask, ProtectError>;
    /// string, char and varchar.
    fn build_string_mask(&self, ty: &TypeDescription) -> Result<DataMask, ProtectError>;
    fn build_binary_mask(&self, ty: &TypeDescription) -> Result<DataMask, ProtectError>;
    fn build_date_mask(&self, ty: &TypeDescription) -> Result<DataMask, ProtectError>;
    /// timestamp and timestamp with local time zone.
    fn build_timestamp_mask(&self, ty: &TypeDescription) -> Result<DataMask, ProtectError>;
}

/// Build a mask tree for `ty` using `factory` for the scalar leaves.
///
/// # Errors
///
/// Returns [`ProtectError::Unsupported`] naming the type if the tree contains
/// a decimal column, and propagates any error from the factory hooks.
pub fn build<F: MaskFactory + ?Sized>(factory: &F, ty: &TypeDescription) -> Result<DataMask, ProtectError> {
    match ty.kind() {
        TypeKind::Boolean => factory.build_boolean_mask(ty),
        TypeKind::Byte | TypeKind::Short | TypeKind::Int | TypeKind::Long => {
            factory.build_long_mask(ty)
        }
        TypeKind::Float | TypeKind::Double => factory.build_double_mask(ty),
        TypeKind::String | TypeKind::Char | TypeKind::Varchar => factory.build_string_mask(ty),
        TypeKind::Timestamp | TypeKind::TimestampInstant => factory.build_timestamp_mask(ty),
        TypeKind::Date => factory.build_date_mask(ty),
        TypeKind::Binary => factory.build_binary_mask(ty),
        TypeKind::Union => Ok(DataMask::Union(build_children(factory, ty)?)),
        TypeKind::Struct => Ok(DataMask::Struct(build_children(factory, ty)?)),
        TypeKind::List => {
            let [element] = exact_children::<1, _>(factory, ty)?;
            Ok(DataMask::List(Box::new(element)))
        }
        TypeKind::Map => {
            let [key, value] = exact_children::<2, _>(factory, ty)?;
            Ok(DataMask::Map {
                key: Box::new(key),
                value: Box::new(value),
            })
        }
        TypeKind::Decimal => Err(ProtectError::Unsupported(format!("unhandled type {ty}"))),
    }
}

/// Build one mask per subtype of `ty`, preserving subtype order.
pub fn build_children<F: MaskFactory + ?Sized>(
    factory: &F,
    ty: &TypeDescription,
) -> Result<Vec<DataMask>, ProtectError> {
    ty.subtypes().iter().map(|child| build(factory, child)).collect()
}

fn exact_children<const N: usize, F: MaskFactory + ?Sized>(
    factory: &F,
    ty: &TypeDescription,
) -> Result<[DataMask; N], ProtectError> {
    build_children(factory, ty)?.try_into().map_err(|children: Vec<DataMask>| {
        ProtectError::Configuration(format!(
            "{ty} has {} subtypes, expected {N}",
            children.len()
        ))
    })
}

/// Every scalar becomes null.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullifyMaskFactory;

impl MaskFactory for NullifyMaskFactory {
    fn build_boolean_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Nullify)
    }
    fn build_long_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Nullify)
    }
    fn build_double_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Nullify)
    }
    fn build_string_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Nullify)
    }
    fn build_binary_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Nullify)
    }
    fn build_date_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Nullify)
    }
    fn build_timestamp_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Nullify)
    }
}

/// Shape-preserving redaction; see [`RedactParams`] for the parameter format.
///
/// Binary columns have no meaningful shape to keep and are nullified.
#[derive(Debug, Clone, Default)]
pub struct RedactMaskFactory {
    params: RedactParams,
}

impl RedactMaskFactory {
    /// # Errors
    ///
    /// Returns [`ProtectError::Configuration`] if `params` do not parse.
    pub fn new<S: AsRef<str>>(params: &[S]) -> Result<Self, ProtectError> {
        Ok(Self {
            params: RedactParams::parse(params)?,
        })
    }
}

impl MaskFactory for RedactMaskFactory {
    fn build_boolean_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Redact(RedactMask::Boolean))
    }

    fn build_long_mask(&self, ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        let (min, max) = match ty.kind() {
            TypeKind::Byte => (i8::MIN.into(), i8::MAX.into()),
            TypeKind::Short => (i16::MIN.into(), i16::MAX.into()),
            TypeKind::Int => (i32::MIN.into(), i32::MAX.into()),
            _ => (i64::MIN, i64::MAX),
        };
        Ok(DataMask::Redact(RedactMask::Long {
            min,
            max,
            params: self.params.clone(),
        }))
    }

    fn build_double_mask(&self, ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        let max = match ty.kind() {
            TypeKind::Float => f64::from(f32::MAX),
            _ => f64::MAX,
        };
        Ok(DataMask::Redact(RedactMask::Double {
            max,
            params: self.params.clone(),
        }))
    }

    fn build_string_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Redact(RedactMask::String(self.params.clone())))
    }

    fn build_binary_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Nullify)
    }

    fn build_date_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Redact(RedactMask::Date))
    }

    fn build_timestamp_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Redact(RedactMask::Timestamp))
    }
}

/// Strings and binaries are replaced by their SHA-256 digest; every other
/// scalar is nullified.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256MaskFactory;

impl MaskFactory for Sha256MaskFactory {
    fn build_boolean_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Nullify)
    }
    fn build_long_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Nullify)
    }
    fn build_double_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Nullify)
    }

    fn build_string_mask(&self, ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        let max_length = match ty.kind() {
            TypeKind::Char | TypeKind::Varchar => ty.max_length().map(|n| n as usize),
            _ => None,
        };
        Ok(DataMask::Sha256(Sha256Mask::String {
            max_length,
            pad: ty.kind() == TypeKind::Char,
        }))
    }

    fn build_binary_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Sha256(Sha256Mask::Binary))
    }

    fn build_date_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Nullify)
    }
    fn build_timestamp_mask(&self, _ty: &TypeDescription) -> Result<DataMask, ProtectError> {
        Ok(DataMask::Nullify)
    }
}

/// Built-in masking policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMaskKind {
    Nullify,
    Redact,
    Sha256,
}

impl DataMaskKind {
    pub fn name(self) -> &'static str {
        match self {
            DataMaskKind::Nullify => "nullify",
            DataMaskKind::Redact => "redact",
            DataMaskKind::Sha256 => "sha256",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "nullify" => Some(DataMaskKind::Nullify),
            "redact" => Some(DataMaskKind::Redact),
            "sha256" => Some(DataMaskKind::Sha256),
            _ => None,
        }
    }
}

/// A policy name plus its parameters, written `name` or `name(p1,p2,...)`.
///
/// ```text
/// nullify
/// sha256
/// redact(Xx9$,0:1,-2:-1)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskDescription {
    pub kind: DataMaskKind,
    pub params: Vec<String>,
}

impl MaskDescription {
    pub fn new(kind: DataMaskKind) -> Self {
        Self {
            kind,
            params: Vec::new(),
        }
    }
}

impl FromStr for MaskDescription {
    type Err = ProtectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ProtectError::Configuration(format!("invalid mask description {s:?}"));
        let (name, params) = match s.split_once('(') {
            Some((name, rest)) => {
                let inner = rest.strip_suffix(')').ok_or_else(invalid)?;
                let params = inner
                    .split(',')
                    .map(|p| p.trim().to_owned())
                    .filter(|p| !p.is_empty())
                    .collect();
                (name.trim(), params)
            }
            None => (s, Vec::new()),
        };
        let kind = DataMaskKind::from_name(name).ok_or_else(|| {
            ProtectError::Configuration(format!("unknown mask {name:?}"))
        })?;
        Ok(Self { kind, params })
    }
}

impl fmt::Display for MaskDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())?;
        if !self.params.is_empty() {
            write!(f, "({})", self.params.join(","))?;
        }
        Ok(())
    }
}

/// Build the mask tree for `ty` under the policy `description` names.
///
/// # Errors
///
/// - [`ProtectError::Configuration`] if the policy parameters are invalid.
/// - [`ProtectError::Unsupported`] if the schema contains an unhandled type.
pub fn build_mask_tree(
    description: &MaskDescription,
    ty: &TypeDescription,
) -> Result<DataMask, ProtectError> {
    let mask = match description.kind {
        DataMaskKind::Nullify => build(&NullifyMaskFactory, ty)?,
        DataMaskKind::Redact => build(&RedactMaskFactory::new(&description.params)?, ty)?,
        DataMaskKind::Sha256 => build(&Sha256MaskFactory, ty)?,
    };
    debug!(policy = %description, schema = %ty, "mask tree built");
    Ok(mask)
}
