//! Schema type tree.
//!
//! A [`TypeDescription`] is an immutable tree of type nodes. Scalars have no
//! children; composites list their subtypes in declaration order:
//!
//! - `struct`: one child per field, with parallel field names;
//! - `list`: exactly one child, the element type;
//! - `map`: exactly two children, key then value;
//! - `uniontype`: one child per branch.
//!
//! Types round-trip through their canonical string form, e.g.
//! `struct<id:bigint,tags:array<string>,attrs:map<string,double>>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtectError;

/// Default `max_length` for `char` / `varchar` declared without a length.
pub const DEFAULT_MAX_LENGTH: u32 = 256;
/// Default decimal precision when none is declared.
pub const DEFAULT_PRECISION: u32 = 38;
/// Default decimal scale when none is declared.
pub const DEFAULT_SCALE: u32 = 10;

/// Kind tag of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Binary,
    Timestamp,
    TimestampInstant,
    List,
    Map,
    Struct,
    Union,
    Decimal,
    Date,
    Varchar,
    Char,
}

impl TypeKind {
    /// Canonical type-string name.
    pub fn name(self) -> &'static str {
        match self {
            TypeKind::Boolean => "boolean",
            TypeKind::Byte => "tinyint",
            TypeKind::Short => "smallint",
            TypeKind::Int => "int",
            TypeKind::Long => "bigint",
            TypeKind::Float => "float",
            TypeKind::Double => "double",
            TypeKind::String => "string",
            TypeKind::Binary => "binary",
            TypeKind::Timestamp => "timestamp",
            TypeKind::TimestampInstant => "timestamp with local time zone",
            TypeKind::List => "array",
            TypeKind::Map => "map",
            TypeKind::Struct => "struct",
            TypeKind::Union => "uniontype",
            TypeKind::Decimal => "decimal",
            TypeKind::Date => "date",
            TypeKind::Varchar => "varchar",
            TypeKind::Char => "char",
        }
    }

    /// Returns `true` for struct, list, map and union.
    pub fn is_compound(self) -> bool {
        matches!(
            self,
            TypeKind::List | TypeKind::Map | TypeKind::Struct | TypeKind::Union
        )
    }

    fn from_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "boolean" => TypeKind::Boolean,
            "tinyint" => TypeKind::Byte,
            "smallint" => TypeKind::Short,
            "int" => TypeKind::Int,
            "bigint" => TypeKind::Long,
            "float" => TypeKind::Float,
            "double" => TypeKind::Double,
            "string" => TypeKind::String,
            "binary" => TypeKind::Binary,
            "timestamp" => TypeKind::Timestamp,
            "timestamp with local time zone" => TypeKind::TimestampInstant,
            "array" => TypeKind::List,
            "map" => TypeKind::Map,
            "struct" => TypeKind::Struct,
            "uniontype" => TypeKind::Union,
            "decimal" => TypeKind::Decimal,
            "date" => TypeKind::Date,
            "varchar" => TypeKind::Varchar,
            "char" => TypeKind::Char,
            _ => return None,
        };
        Some(kind)
    }
}

/// An immutable schema node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeDescription {
    kind: TypeKind,
    children: Vec<TypeDescription>,
    field_names: Vec<String>,
    max_length: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
}

impl TypeDescription {
    fn node(kind: TypeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            field_names: Vec::new(),
            max_length: None,
            precision: None,
            scale: None,
        }
    }

    /// A scalar node of the given kind.
    ///
    /// `char` and `varchar` get [`DEFAULT_MAX_LENGTH`]; `decimal` gets the
    /// default precision and scale. Compound kinds start with no children.
    pub fn primitive(kind: TypeKind) -> Self {
        match kind {
            TypeKind::Char => Self::char(DEFAULT_MAX_LENGTH),
            TypeKind::Varchar => Self::varchar(DEFAULT_MAX_LENGTH),
            TypeKind::Decimal => Self::decimal(DEFAULT_PRECISION, DEFAULT_SCALE),
            other => Self::node(other),
        }
    }

    pub fn char(max_length: u32) -> Self {
        Self {
            max_length: Some(max_length),
            ..Self::node(TypeKind::Char)
        }
    }

    pub fn varchar(max_length: u32) -> Self {
        Self {
            max_length: Some(max_length),
            ..Self::node(TypeKind::Varchar)
        }
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        Self {
            precision: Some(precision),
            scale: Some(scale),
            ..Self::node(TypeKind::Decimal)
        }
    }

    pub fn list(element: TypeDescription) -> Self {
        Self {
            children: vec![element],
            ..Self::node(TypeKind::List)
        }
    }

    pub fn map(key: TypeDescription, value: TypeDescription) -> Self {
        Self {
            children: vec![key, value],
            ..Self::node(TypeKind::Map)
        }
    }

    pub fn union(branches: Vec<TypeDescription>) -> Self {
        Self {
            children: branches,
            ..Self::node(TypeKind::Union)
        }
    }

    /// A struct with the given `(name, type)` fields, in order.
    pub fn struct_of<N: Into<String>>(fields: impl IntoIterator<Item = (N, TypeDescription)>) -> Self {
        let (field_names, children) = fields
            .into_iter()
            .map(|(name, ty)| (name.into(), ty))
            .unzip();
        Self {
            children,
            field_names,
            ..Self::node(TypeKind::Struct)
        }
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn subtype_count(&self) -> usize {
        self.children.len()
    }

    /// The `i`-th subtype, zero-based.
    pub fn subtype(&self, i: usize) -> Option<&TypeDescription> {
        self.children.get(i)
    }

    pub fn subtypes(&self) -> &[TypeDescription] {
        &self.children
    }

    /// Struct field names; empty for every other kind.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Declared length of a `char` / `varchar`.
    pub fn max_length(&self) -> Option<u32> {
        self.max_length
    }

    pub fn precision(&self) -> Option<u32> {
        self.precision
    }

    pub fn scale(&self) -> Option<u32> {
        self.scale
    }

    /// All nodes in pre-order paired with their column id (root = 0).
    ///
    /// These ids identify columns in stripe footers and in per-stream IVs.
    pub fn pre_order(&self) -> Vec<(u32, &TypeDescription)> {
        fn walk<'a>(node: &'a TypeDescription, out: &mut Vec<(u32, &'a TypeDescription)>) {
            out.push((out.len() as u32, node));
            for child in &node.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }
}

impl fmt::Display for TypeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())?;
        match self.kind {
            TypeKind::Char | TypeKind::Varchar => {
                write!(f, "({})", self.max_length.unwrap_or(DEFAULT_MAX_LENGTH))
            }
            TypeKind::Decimal => write!(
                f,
                "({},{})",
                self.precision.unwrap_or(DEFAULT_PRECISION),
                self.scale.unwrap_or(DEFAULT_SCALE)
            ),
            TypeKind::Struct => {
                f.write_str("<")?;
                for (i, (name, child)) in self.field_names.iter().zip(&self.children).enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write_field_name(f, name)?;
                    write!(f, ":{child}")?;
                }
                f.write_str(">")
            }
            TypeKind::List | TypeKind::Map | TypeKind::Union => {
                f.write_str("<")?;
                for (i, child) in self.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(">")
            }
            _ => Ok(()),
        }
    }
}

fn write_field_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    let plain = !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if plain {
        f.write_str(name)
    } else {
        write!(f, "`{}`", name.replace('`', "``"))
    }
}

impl FromStr for TypeDescription {
    type Err = ProtectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeParser { input: s, pos: 0 };
        let ty = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.pos != s.len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(ty)
    }
}

impl TryFrom<String> for TypeDescription {
    type Error = ProtectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeDescription> for String {
    fn from(value: TypeDescription) -> Self {
        value.to_string()
    }
}

/// Recursive-descent parser over the canonical type-string grammar.
struct TypeParser<'a> {
    input: &'a str,
    pos: usize,
}

impl TypeParser<'_> {
    fn error(&self, msg: &str) -> ProtectError {
        ProtectError::Configuration(format!(
            "invalid type string {:?}: {msg} at position {}",
            self.input, self.pos
        ))
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), ProtectError> {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    /// Consumes `byte` if it is next; returns whether it did.
    fn accept(&mut self, byte: u8) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_type(&mut self) -> Result<TypeDescription, ProtectError> {
        self.skip_whitespace();
        let start = self.pos;
        // Category names are letters and single spaces
        // ("timestamp with local time zone").
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphabetic() || b == b' ')
        {
            self.pos += 1;
        }
        let word = self.input[start..self.pos].trim_end();
        self.pos = start + word.len();
        let Some(kind) = TypeKind::from_name(word) else {
            self.pos = start;
            return Err(self.error("unknown type category"));
        };

        match kind {
            TypeKind::Char | TypeKind::Varchar => {
                let length = if self.accept(b'(') {
                    let n = self.parse_u32()?;
                    self.expect(b')')?;
                    n
                } else {
                    DEFAULT_MAX_LENGTH
                };
                Ok(if kind == TypeKind::Char {
                    TypeDescription::char(length)
                } else {
                    TypeDescription::varchar(length)
                })
            }
            TypeKind::Decimal => {
                if self.accept(b'(') {
                    let precision = self.parse_u32()?;
                    let scale = if self.accept(b',') { self.parse_u32()? } else { 0 };
                    self.expect(b')')?;
                    Ok(TypeDescription::decimal(precision, scale))
                } else {
                    Ok(TypeDescription::primitive(TypeKind::Decimal))
                }
            }
            TypeKind::List => {
                self.expect(b'<')?;
                let element = self.parse_type()?;
                self.expect(b'>')?;
                Ok(TypeDescription::list(element))
            }
            TypeKind::Map => {
                self.expect(b'<')?;
                let key = self.parse_type()?;
                self.expect(b',')?;
                let value = self.parse_type()?;
                self.expect(b'>')?;
                Ok(TypeDescription::map(key, value))
            }
            TypeKind::Union => {
                self.expect(b'<')?;
                let mut branches = vec![self.parse_type()?];
                while self.accept(b',') {
                    branches.push(self.parse_type()?);
                }
                self.expect(b'>')?;
                Ok(TypeDescription::union(branches))
            }
            TypeKind::Struct => {
                self.expect(b'<')?;
                let mut fields = Vec::new();
                if !self.accept(b'>') {
                    loop {
                        let name = self.parse_field_name()?;
                        self.expect(b':')?;
                        fields.push((name, self.parse_type()?));
                        if !self.accept(b',') {
                            break;
                        }
                    }
                    self.expect(b'>')?;
                }
                Ok(TypeDescription::struct_of(fields))
            }
            scalar => Ok(TypeDescription::node(scalar)),
        }
    }

    fn parse_u32(&mut self) -> Result<u32, ProtectError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| self.error("expected an integer"))
    }

    fn parse_field_name(&mut self) -> Result<String, ProtectError> {
        self.skip_whitespace();
        if self.peek() == Some(b'`') {
            self.pos += 1;
            let mut name = String::new();
            loop {
                let rest = &self.input[self.pos..];
                let Some(idx) = rest.find('`') else {
                    return Err(self.error("unterminated quoted field name"));
                };
                name.push_str(&rest[..idx]);
                self.pos += idx + 1;
                // A doubled backquote is an escaped backquote.
                if self.peek() == Some(b'`') {
                    name.push('`');
                    self.pos += 1;
                } else {
                    return Ok(name);
                }
            }
        }
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a field name"));
        }
        Ok(self.input[start..self.pos].to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_type_string_round_trip() {
        let s = "struct<id:bigint,tags:array<string>,attrs:map<string,array<double>>,u:uniontype<int,varchar(20)>>";
        let ty: TypeDescription = s.parse().unwrap();
        assert_eq!(ty.kind(), TypeKind::Struct);
        assert_eq!(ty.subtype_count(), 4);
        assert_eq!(ty.field_names(), ["id", "tags", "attrs", "u"]);
        assert_eq!(ty.subtype(2).unwrap().kind(), TypeKind::Map);
        assert_eq!(ty.to_string(), s);
    }

    #[test]
    fn parameterised_scalars() {
        let ty: TypeDescription = "char(10)".parse().unwrap();
        assert_eq!(ty.max_length(), Some(10));
        let ty: TypeDescription = "varchar".parse().unwrap();
        assert_eq!(ty.max_length(), Some(DEFAULT_MAX_LENGTH));
        let ty: TypeDescription = "decimal(10,2)".parse().unwrap();
        assert_eq!((ty.precision(), ty.scale()), (Some(10), Some(2)));
        assert_eq!(ty.to_string(), "decimal(10,2)");
    }

    #[test]
    fn timestamp_with_local_time_zone() {
        let ty: TypeDescription = "struct<ts:timestamp with local time zone,d:date>"
            .parse()
            .unwrap();
        assert_eq!(ty.subtype(0).unwrap().kind(), TypeKind::TimestampInstant);
        assert_eq!(ty.subtype(1).unwrap().kind(), TypeKind::Date);
    }

    #[test]
    fn quoted_field_names() {
        let ty: TypeDescription = "struct<`a b`:int,`x``y`:string>".parse().unwrap();
        assert_eq!(ty.field_names(), ["a b", "x`y"]);
        assert_eq!(ty.to_string(), "struct<`a b`:int,`x``y`:string>");
    }

    #[test]
    fn malformed_strings_rejected() {
        for bad in ["", "integer", "array<int", "map<int>", "struct<:int>", "int extra", "char(x)"] {
            let err = bad.parse::<TypeDescription>().unwrap_err();
            assert!(
                matches!(err, ProtectError::Configuration(_)),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn pre_order_column_ids() {
        let ty: TypeDescription = "struct<a:int,b:array<string>,c:double>".parse().unwrap();
        let ids: Vec<(u32, TypeKind)> = ty.pre_order().into_iter().map(|(id, t)| (id, t.kind())).collect();
        assert_eq!(
            ids,
            vec![
                (0, TypeKind::Struct),
                (1, TypeKind::Int),
                (2, TypeKind::List),
                (3, TypeKind::String),
                (4, TypeKind::Double),
            ]
        );
    }

    #[test]
    fn serde_goes_through_type_string() {
        let ty = TypeDescription::list(TypeDescription::primitive(TypeKind::Int));
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, "\"array<int>\"");
        let decoded: TypeDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, ty);
        assert!(serde_json::from_str::<TypeDescription>("\"array<\"").is_err());
    }
}
