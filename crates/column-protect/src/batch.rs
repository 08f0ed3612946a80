//! In-memory column batches.
//!
//! A [`ColumnBatch`] holds one column's values for a range of rows and mirrors
//! the schema tree: scalar variants carry a flat data array, composite variants
//! carry child batches. Every variant carries a [`Presence`] with one flag per
//! row.
//!
//! Offsets arrays (list, map) are non-decreasing with `rows + 1` entries; the
//! children of row `i` live at `[offsets[i], offsets[i + 1])`.

use common::{ProtectError, TypeDescription, TypeKind};

/// Per-row null tracking.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Presence {
    /// `true` = the row holds a value.
    pub not_null: Vec<bool>,
    /// Set when any row may be null. Readers ignore `not_null` when clear.
    pub has_nulls: bool,
}

impl Presence {
    /// `rows` non-null rows.
    pub fn all_valid(rows: usize) -> Self {
        Self {
            not_null: vec![true; rows],
            has_nulls: false,
        }
    }

    /// Presence taken from explicit per-row flags.
    pub fn from_flags(not_null: Vec<bool>) -> Self {
        let has_nulls = not_null.iter().any(|v| !v);
        Self { not_null, has_nulls }
    }

    /// Returns `true` if row `i` holds a value.
    pub fn is_valid(&self, i: usize) -> bool {
        !self.has_nulls || self.not_null.get(i).copied().unwrap_or(false)
    }
}

/// boolean, tinyint, smallint, int, bigint and date values.
#[derive(Debug, Clone, PartialEq)]
pub struct LongBatch {
    pub presence: Presence,
    pub data: Vec<i64>,
}

/// float and double values.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleBatch {
    pub presence: Presence,
    pub data: Vec<f64>,
}

/// string, char, varchar and binary values.
#[derive(Debug, Clone, PartialEq)]
pub struct BytesBatch {
    pub presence: Presence,
    pub data: Vec<Vec<u8>>,
}

/// Timestamps as seconds since the epoch plus a nanosecond part.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampBatch {
    pub presence: Presence,
    pub seconds: Vec<i64>,
    pub nanos: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructBatch {
    pub presence: Presence,
    /// One batch per field, indexed like the parent.
    pub fields: Vec<ColumnBatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListBatch {
    pub presence: Presence,
    pub offsets: Vec<i64>,
    pub elements: Box<ColumnBatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapBatch {
    pub presence: Presence,
    pub offsets: Vec<i64>,
    pub keys: Box<ColumnBatch>,
    pub elements: Box<ColumnBatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionBatch {
    pub presence: Presence,
    /// Selected branch per row.
    pub tags: Vec<u8>,
    /// Position of each row's value within its selected child.
    pub offsets: Vec<u64>,
    pub children: Vec<ColumnBatch>,
}

/// One column's values for a range of rows.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnBatch {
    Long(LongBatch),
    Double(DoubleBatch),
    Bytes(BytesBatch),
    Timestamp(TimestampBatch),
    Struct(StructBatch),
    List(ListBatch),
    Map(MapBatch),
    Union(UnionBatch),
}

impl ColumnBatch {
    /// Short name of the variant, used in type-mismatch errors.
    pub fn variant_name(&self) -> &'static str {
        match self {
            ColumnBatch::Long(_) => "long",
            ColumnBatch::Double(_) => "double",
            ColumnBatch::Bytes(_) => "bytes",
            ColumnBatch::Timestamp(_) => "timestamp",
            ColumnBatch::Struct(_) => "struct",
            ColumnBatch::List(_) => "list",
            ColumnBatch::Map(_) => "map",
            ColumnBatch::Union(_) => "union",
        }
    }

    pub fn presence(&self) -> &Presence {
        match self {
            ColumnBatch::Long(b) => &b.presence,
            ColumnBatch::Double(b) => &b.presence,
            ColumnBatch::Bytes(b) => &b.presence,
            ColumnBatch::Timestamp(b) => &b.presence,
            ColumnBatch::Struct(b) => &b.presence,
            ColumnBatch::List(b) => &b.presence,
            ColumnBatch::Map(b) => &b.presence,
            ColumnBatch::Union(b) => &b.presence,
        }
    }

    pub fn presence_mut(&mut self) -> &mut Presence {
        match self {
            ColumnBatch::Long(b) => &mut b.presence,
            ColumnBatch::Double(b) => &mut b.presence,
            ColumnBatch::Bytes(b) => &mut b.presence,
            ColumnBatch::Timestamp(b) => &mut b.presence,
            ColumnBatch::Struct(b) => &mut b.presence,
            ColumnBatch::List(b) => &mut b.presence,
            ColumnBatch::Map(b) => &mut b.presence,
            ColumnBatch::Union(b) => &mut b.presence,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.presence().not_null.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocate a batch of `rows` zero-valued, non-null rows shaped like `ty`.
    ///
    /// Lists and maps get one entry per row; unions select branch 0 for every
    /// row and give each branch `rows` slots.
    ///
    /// # Errors
    ///
    /// Returns [`ProtectError::Unsupported`] for decimal columns, which have
    /// no batch representation here.
    pub fn for_type(ty: &TypeDescription, rows: usize) -> Result<Self, ProtectError> {
        let presence = Presence::all_valid(rows);
        let unit_offsets = || (0..=rows as i64).collect::<Vec<_>>();
        let child = |i: usize| -> Result<Box<ColumnBatch>, ProtectError> {
            let sub = ty
                .subtype(i)
                .ok_or_else(|| ProtectError::Unsupported(format!("{ty} is missing subtype {i}")))?;
            Ok(Box::new(ColumnBatch::for_type(sub, rows)?))
        };
        let batch = match ty.kind() {
            TypeKind::Boolean
            | TypeKind::Byte
            | TypeKind::Short
            | TypeKind::Int
            | TypeKind::Long
            | TypeKind::Date => ColumnBatch::Long(LongBatch {
                presence,
                data: vec![0; rows],
            }),
            TypeKind::Float | TypeKind::Double => ColumnBatch::Double(DoubleBatch {
                presence,
                data: vec![0.0; rows],
            }),
            TypeKind::String | TypeKind::Char | TypeKind::Varchar | TypeKind::Binary => {
                ColumnBatch::Bytes(BytesBatch {
                    presence,
                    data: vec![Vec::new(); rows],
                })
            }
            TypeKind::Timestamp | TypeKind::TimestampInstant => {
                ColumnBatch::Timestamp(TimestampBatch {
                    presence,
                    seconds: vec![0; rows],
                    nanos: vec![0; rows],
                })
            }
            TypeKind::Struct => ColumnBatch::Struct(StructBatch {
                presence,
                fields: ty
                    .subtypes()
                    .iter()
                    .map(|f| ColumnBatch::for_type(f, rows))
                    .collect::<Result<_, _>>()?,
            }),
            TypeKind::List => ColumnBatch::List(ListBatch {
                presence,
                offsets: unit_offsets(),
                elements: child(0)?,
            }),
            TypeKind::Map => ColumnBatch::Map(MapBatch {
                presence,
                offsets: unit_offsets(),
                keys: child(0)?,
                elements: child(1)?,
            }),
            TypeKind::Union => ColumnBatch::Union(UnionBatch {
                presence,
                tags: vec![0; rows],
                offsets: (0..rows as u64).collect(),
                children: ty
                    .subtypes()
                    .iter()
                    .map(|b| ColumnBatch::for_type(b, rows))
                    .collect::<Result<_, _>>()?,
            }),
            TypeKind::Decimal => {
                return Err(ProtectError::Unsupported(format!(
                    "no batch representation for {ty}"
                )))
            }
        };
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_from_flags_sets_has_nulls() {
        let p = Presence::from_flags(vec![true, false, true]);
        assert!(p.has_nulls);
        assert!(p.is_valid(0));
        assert!(!p.is_valid(1));

        let p = Presence::from_flags(vec![true, true]);
        assert!(!p.has_nulls);
    }

    #[test]
    fn stale_flags_ignored_without_has_nulls() {
        let p = Presence {
            not_null: vec![false],
            has_nulls: false,
        };
        assert!(p.is_valid(0));
    }

    #[test]
    fn for_type_mirrors_schema() {
        let ty: TypeDescription = "struct<a:int,b:array<string>,c:map<string,double>,d:uniontype<int,timestamp>>"
            .parse()
            .unwrap();
        let batch = ColumnBatch::for_type(&ty, 3).unwrap();
        let ColumnBatch::Struct(s) = &batch else {
            panic!("expected struct batch, got {}", batch.variant_name());
        };
        assert_eq!(batch.len(), 3);
        assert_eq!(s.fields.len(), 4);
        assert_eq!(s.fields[0].variant_name(), "long");
        match &s.fields[1] {
            ColumnBatch::List(l) => {
                assert_eq!(l.offsets, vec![0, 1, 2, 3]);
                assert_eq!(l.elements.variant_name(), "bytes");
            }
            other => panic!("expected list, got {}", other.variant_name()),
        }
        match &s.fields[2] {
            ColumnBatch::Map(m) => {
                assert_eq!(m.keys.variant_name(), "bytes");
                assert_eq!(m.elements.variant_name(), "double");
            }
            other => panic!("expected map, got {}", other.variant_name()),
        }
        match &s.fields[3] {
            ColumnBatch::Union(u) => {
                assert_eq!(u.children.len(), 2);
                assert_eq!(u.children[1].variant_name(), "timestamp");
            }
            other => panic!("expected union, got {}", other.variant_name()),
        }
    }

    #[test]
    fn for_type_rejects_decimal() {
        let ty: TypeDescription = "struct<x:decimal(10,2)>".parse().unwrap();
        assert!(matches!(
            ColumnBatch::for_type(&ty, 1),
            Err(ProtectError::Unsupported(_))
        ));
    }
}
