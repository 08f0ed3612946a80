//! Data masks: irreversible per-column transformations applied before a
//! batch is written.
//!
//! A mask tree is built once per (schema, policy) by [`build_mask_tree`] and is
//! shaped exactly like the schema: struct masks hold one child per field, list
//! masks one child for the element type, map masks a key and a value mask,
//! union masks one child per branch. The tree is immutable after construction
//! and may be shared across threads.
//!
//! [`DataMask::mask_data`] rewrites rows `[start, start + length)` of a target
//! batch from the matching rows of a source batch. The target must already
//! hold (a copy of) the unmasked rows.
//!
//! # Module invariants
//!
//! - **Presence is only ever cleared by `Nullify`.** Value masks (redact,
//!   sha256) rewrite data in place and leave null flags alone; list and map
//!   masks pass their own presence through unchanged.
//! - **No logging of column values.** Masked or unmasked data never reaches a
//!   log field.

pub mod factory;
pub mod redact;
pub mod sha256;

pub use factory::{
    build, build_children, build_mask_tree, DataMaskKind, MaskDescription, MaskFactory,
    NullifyMaskFactory, RedactMaskFactory, Sha256MaskFactory,
};
pub use redact::{RedactMask, RedactParams};
pub use sha256::Sha256Mask;

use common::ProtectError;

use crate::batch::{ColumnBatch, Presence};

/// A node of a mask tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DataMask {
    /// Marks every row in range as null.
    Nullify,
    /// One child mask per struct field, in field order.
    Struct(Vec<DataMask>),
    /// Mask for the list element type.
    List(Box<DataMask>),
    Map {
        key: Box<DataMask>,
        value: Box<DataMask>,
    },
    /// One child mask per union branch, in branch order.
    Union(Vec<DataMask>),
    Redact(RedactMask),
    Sha256(Sha256Mask),
}

impl DataMask {
    pub fn name(&self) -> &'static str {
        match self {
            DataMask::Nullify => "nullify",
            DataMask::Struct(_) => "struct",
            DataMask::List(_) => "list",
            DataMask::Map { .. } => "map",
            DataMask::Union(_) => "union",
            DataMask::Redact(_) => "redact",
            DataMask::Sha256(_) => "sha256",
        }
    }

    /// Direct children in schema order; empty for leaf masks.
    pub fn children(&self) -> Vec<&DataMask> {
        match self {
            DataMask::Struct(children) | DataMask::Union(children) => children.iter().collect(),
            DataMask::List(element) => vec![element.as_ref()],
            DataMask::Map { key, value } => vec![key.as_ref(), value.as_ref()],
            DataMask::Nullify | DataMask::Redact(_) | DataMask::Sha256(_) => Vec::new(),
        }
    }

    /// Mask rows `[start, start + length)` of `target`, reading from `source`.
    ///
    /// # Errors
    ///
    /// - [`ProtectError::TypeMismatch`] if the batch variant does not match
    ///   the mask variant (the batch was not produced from this mask's schema).
    /// - [`ProtectError::OutOfRange`] if the range, or an offset it
    ///   translates to, lies outside either batch.
    pub fn mask_data(
        &self,
        source: &ColumnBatch,
        target: &mut ColumnBatch,
        start: usize,
        length: usize,
    ) -> Result<(), ProtectError> {
        match self {
            DataMask::Nullify => {
                check_range(self.name(), start, length, target.len())?;
                let presence = target.presence_mut();
                presence.has_nulls = true;
                presence.not_null[start..start + length].fill(false);
                Ok(())
            }
            DataMask::Struct(children) => {
                let names = (source.variant_name(), target.variant_name());
                let (ColumnBatch::Struct(src), ColumnBatch::Struct(dst)) = (source, target) else {
                    return Err(self.mismatch(names));
                };
                if src.fields.len() != children.len() || dst.fields.len() != children.len() {
                    return Err(ProtectError::TypeMismatch {
                        mask: "struct",
                        batch: "differently sized struct",
                    });
                }
                check_range(self.name(), start, length, src.presence.not_null.len())?;
                check_range(self.name(), start, length, dst.presence.not_null.len())?;
                for ((mask, src_field), dst_field) in
                    children.iter().zip(&src.fields).zip(dst.fields.iter_mut())
                {
                    mask.mask_data(src_field, dst_field, start, length)?;
                }
                Ok(())
            }
            DataMask::List(element) => {
                let names = (source.variant_name(), target.variant_name());
                let (ColumnBatch::List(src), ColumnBatch::List(dst)) = (source, target) else {
                    return Err(self.mismatch(names));
                };
                check_range(self.name(), start, length, src.presence.not_null.len())?;
                check_range(self.name(), start, length, dst.presence.not_null.len())?;
                let (lo, hi) = child_range(&src.offsets, start, length)?;
                check_range(self.name(), lo, hi - lo, src.elements.len())?;
                check_range(self.name(), lo, hi - lo, dst.elements.len())?;
                pass_through_presence(&src.presence, &mut dst.presence, start, length);
                element.mask_data(&src.elements, &mut dst.elements, lo, hi - lo)
            }
            DataMask::Map { key, value } => {
                let names = (source.variant_name(), target.variant_name());
                let (ColumnBatch::Map(src), ColumnBatch::Map(dst)) = (source, target) else {
                    return Err(self.mismatch(names));
                };
                check_range(self.name(), start, length, src.presence.not_null.len())?;
                check_range(self.name(), start, length, dst.presence.not_null.len())?;
                let (lo, hi) = child_range(&src.offsets, start, length)?;
                for len in [src.keys.len(), dst.keys.len(), src.elements.len(), dst.elements.len()] {
                    check_range(self.name(), lo, hi - lo, len)?;
                }
                pass_through_presence(&src.presence, &mut dst.presence, start, length);
                key.mask_data(&src.keys, &mut dst.keys, lo, hi - lo)?;
                value.mask_data(&src.elements, &mut dst.elements, lo, hi - lo)
            }
            DataMask::Union(children) => {
                let names = (source.variant_name(), target.variant_name());
                let (ColumnBatch::Union(src), ColumnBatch::Union(dst)) = (source, target) else {
                    return Err(self.mismatch(names));
                };
                if src.children.len() != children.len() || dst.children.len() != children.len() {
                    return Err(ProtectError::TypeMismatch {
                        mask: "union",
                        batch: "differently sized union",
                    });
                }
                check_range(self.name(), start, length, src.presence.not_null.len())?;
                check_range(self.name(), start, length, dst.presence.not_null.len())?;
                if src.tags.len() < start + length || src.offsets.len() < start + length {
                    return Err(ProtectError::OutOfRange(format!(
                        "union tags/offsets shorter than row range [{start}, {})",
                        start + length
                    )));
                }
                // Only the branch each row selected is touched.
                for row in start..start + length {
                    if !src.presence.is_valid(row) {
                        continue;
                    }
                    let tag = usize::from(src.tags[row]);
                    let position = usize::try_from(src.offsets[row]).map_err(|_| {
                        ProtectError::OutOfRange(format!("union offset of row {row}"))
                    })?;
                    let mask = children.get(tag).ok_or_else(|| {
                        ProtectError::OutOfRange(format!(
                            "union tag {tag} of row {row} exceeds {} branches",
                            children.len()
                        ))
                    })?;
                    mask.mask_data(&src.children[tag], &mut dst.children[tag], position, 1)?;
                }
                Ok(())
            }
            DataMask::Redact(mask) => mask.mask_data(source, target, start, length),
            DataMask::Sha256(mask) => mask.mask_data(source, target, start, length),
        }
    }

    /// Error for a batch pair that does not match this mask. Names the side
    /// that disagrees with the mask (the source when both do).
    fn mismatch(&self, (source, target): (&'static str, &'static str)) -> ProtectError {
        let batch = if source == self.name() { target } else { source };
        ProtectError::TypeMismatch {
            mask: self.name(),
            batch,
        }
    }
}

/// Fails unless `[start, start + length)` lies within `rows`.
pub(crate) fn check_range(
    what: &str,
    start: usize,
    length: usize,
    rows: usize,
) -> Result<(), ProtectError> {
    match start.checked_add(length) {
        Some(end) if end <= rows => Ok(()),
        _ => Err(ProtectError::OutOfRange(format!(
            "{what} rows [{start}, {start} + {length}) exceed batch of {rows} rows"
        ))),
    }
}

/// Translate a parent row range into its child element range through an
/// offsets array: `[offsets[start], offsets[start + length])`.
fn child_range(offsets: &[i64], start: usize, length: usize) -> Result<(usize, usize), ProtectError> {
    let offset_at = |i: usize| -> Result<usize, ProtectError> {
        let raw = offsets.get(i).copied().ok_or_else(|| {
            ProtectError::OutOfRange(format!(
                "offset {i} missing from offsets array of length {}",
                offsets.len()
            ))
        })?;
        usize::try_from(raw)
            .map_err(|_| ProtectError::OutOfRange(format!("negative offset {raw} at {i}")))
    };
    let lo = offset_at(start)?;
    let hi = offset_at(start + length)?;
    if hi < lo {
        return Err(ProtectError::OutOfRange(format!(
            "offsets decrease from {lo} to {hi}"
        )));
    }
    Ok((lo, hi))
}

/// Copy the source's null flags for the range into the target without
/// dropping nulls the target already records elsewhere.
fn pass_through_presence(src: &Presence, dst: &mut Presence, start: usize, length: usize) {
    let range = start..start + length;
    if src.has_nulls {
        dst.not_null[range.clone()].copy_from_slice(&src.not_null[range]);
        dst.has_nulls = true;
    } else {
        dst.not_null[range].fill(true);
    }
}
