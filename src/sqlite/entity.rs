//! Static storage metadata for record types.
//!
//! Each record type describes its table once, in a `static`:
//!
//! ```
//! use sqlite_manager::{DataType, Entity, EntityDescriptor, FieldDescriptor, Result, Row, Value};
//!
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! static USER: EntityDescriptor = EntityDescriptor::new(
//!     "users",
//!     &[
//!         FieldDescriptor::auto_key("id"),
//!         FieldDescriptor::new("name", DataType::Text),
//!     ],
//! );
//!
//! impl Entity for User {
//!     fn descriptor() -> &'static EntityDescriptor {
//!         &USER
//!     }
//!     fn key(&self) -> i64 {
//!         self.id
//!     }
//!     fn set_key(&mut self, key: i64) {
//!         self.id = key;
//!     }
//!     fn to_row(&self) -> Vec<Value> {
//!         vec![self.id.into(), self.name.clone().into()]
//!     }
//!     fn from_row(row: &Row<'_>) -> Result<Self> {
//!         Ok(Self {
//!             id: row.get("id")?,
//!             name: row.get("name")?,
//!         })
//!     }
//! }
//! ```

use std::collections::HashSet;

use super::error::{Error, Result};
use super::mapper::Row;
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Text,
    Real,
    Blob,
}

impl DataType {
    pub fn as_sql(self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
            DataType::Real => "REAL",
            DataType::Blob => "BLOB",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConstraint {
    PrimaryKey,
    /// Key is assigned by SQLite when the record's key is 0.
    AutoIncrement,
    NotNull,
    Unique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub data_type: DataType,
    pub constraints: &'static [ColumnConstraint],
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, data_type: DataType) -> Self {
        Self {
            name,
            data_type,
            constraints: &[],
        }
    }

    /// An `INTEGER PRIMARY KEY AUTOINCREMENT` field.
    pub const fn auto_key(name: &'static str) -> Self {
        Self {
            name,
            data_type: DataType::Integer,
            constraints: &[ColumnConstraint::PrimaryKey, ColumnConstraint::AutoIncrement],
        }
    }

    /// A caller-assigned `INTEGER PRIMARY KEY` field.
    pub const fn key(name: &'static str) -> Self {
        Self {
            name,
            data_type: DataType::Integer,
            constraints: &[ColumnConstraint::PrimaryKey],
        }
    }

    pub const fn with_constraints(self, constraints: &'static [ColumnConstraint]) -> Self {
        Self {
            constraints,
            ..self
        }
    }

    pub fn has(&self, constraint: ColumnConstraint) -> bool {
        self.constraints.contains(&constraint)
    }

    pub fn is_primary_key(&self) -> bool {
        self.has(ColumnConstraint::PrimaryKey)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.has(ColumnConstraint::AutoIncrement)
    }
}

/// Table name plus ordered field list for one record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub table: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl EntityDescriptor {
    pub const fn new(table: &'static str, fields: &'static [FieldDescriptor]) -> Self {
        Self { table, fields }
    }

    /// Checks the descriptor describes a table we can create and map.
    ///
    /// Rejects an empty table name, empty or duplicate field names, a missing
    /// or repeated primary key, a non-INTEGER key and auto-increment on a
    /// non-key field.
    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(Error::Schema("table name is empty".to_string()));
        }
        if self.fields.is_empty() {
            return Err(Error::Schema(format!("`{}` declares no fields", self.table)));
        }

        let mut seen = HashSet::new();
        for field in self.fields {
            if field.name.trim().is_empty() {
                return Err(Error::Schema(format!(
                    "`{}` has a field with an empty name",
                    self.table
                )));
            }
            if !seen.insert(field.name.to_ascii_lowercase()) {
                return Err(Error::Schema(format!(
                    "`{}` declares field `{}` twice",
                    self.table, field.name
                )));
            }
            if field.is_auto_increment() && !field.is_primary_key() {
                return Err(Error::Schema(format!(
                    "`{}.{}` is auto-increment but not the primary key",
                    self.table, field.name
                )));
            }
        }

        let key = self.primary_key()?;
        if key.data_type != DataType::Integer {
            return Err(Error::Schema(format!(
                "primary key `{}.{}` must be INTEGER",
                self.table, key.name
            )));
        }
        Ok(())
    }

    /// The single primary-key field.
    pub fn primary_key(&self) -> Result<&FieldDescriptor> {
        self.primary_key_index().map(|index| &self.fields[index])
    }

    pub(crate) fn primary_key_index(&self) -> Result<usize> {
        let mut keys = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_primary_key())
            .map(|(i, _)| i);
        match (keys.next(), keys.next()) {
            (Some(index), None) => Ok(index),
            (None, _) => Err(Error::Schema(format!(
                "`{}` has no primary key",
                self.table
            ))),
            (Some(_), Some(_)) => Err(Error::Schema(format!(
                "`{}` declares more than one primary key",
                self.table
            ))),
        }
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn require_field(&self, name: &str) -> Result<&FieldDescriptor> {
        self.field(name).ok_or_else(|| Error::UnknownField {
            table: self.table,
            field: name.to_string(),
        })
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }
}

/// A record type that can be stored in a table.
///
/// `to_row` yields one value per descriptor field, in descriptor order, the
/// key included. A key of 0 means "not yet persisted".
pub trait Entity: Sized {
    fn descriptor() -> &'static EntityDescriptor;

    fn key(&self) -> i64;

    fn set_key(&mut self, key: i64);

    fn to_row(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    static VALID: EntityDescriptor = EntityDescriptor::new(
        "products",
        &[
            FieldDescriptor::auto_key("id"),
            FieldDescriptor::new("name", DataType::Text),
            FieldDescriptor::new("price", DataType::Real),
        ],
    );

    #[test]
    fn valid_descriptor_passes() {
        VALID.validate().unwrap();
        assert_eq!(VALID.primary_key().unwrap().name, "id");
        assert_eq!(VALID.field_index("price"), Some(2));
        assert_eq!(VALID.column_names().collect::<Vec<_>>(), ["id", "name", "price"]);
    }

    #[test]
    fn missing_key_is_rejected() {
        static DESC: EntityDescriptor =
            EntityDescriptor::new("t", &[FieldDescriptor::new("name", DataType::Text)]);
        assert!(matches!(DESC.validate(), Err(Error::Schema(_))));
    }

    #[test]
    fn two_keys_are_rejected() {
        static DESC: EntityDescriptor =
            EntityDescriptor::new("t", &[FieldDescriptor::key("a"), FieldDescriptor::key("b")]);
        assert!(matches!(DESC.validate(), Err(Error::Schema(_))));
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        static DESC: EntityDescriptor = EntityDescriptor::new(
            "t",
            &[
                FieldDescriptor::auto_key("id"),
                FieldDescriptor::new("name", DataType::Text),
                FieldDescriptor::new("Name", DataType::Text),
            ],
        );
        let err = DESC.validate().unwrap_err();
        assert!(err.to_string().contains("twice"), "{err}");
    }

    #[test]
    fn text_key_is_rejected() {
        static DESC: EntityDescriptor = EntityDescriptor::new(
            "t",
            &[FieldDescriptor::new("code", DataType::Text)
                .with_constraints(&[ColumnConstraint::PrimaryKey])],
        );
        assert!(matches!(DESC.validate(), Err(Error::Schema(_))));
    }

    #[test]
    fn auto_increment_outside_key_is_rejected() {
        static DESC: EntityDescriptor = EntityDescriptor::new(
            "t",
            &[
                FieldDescriptor::key("id"),
                FieldDescriptor::new("seq", DataType::Integer)
                    .with_constraints(&[ColumnConstraint::AutoIncrement]),
            ],
        );
        assert!(matches!(DESC.validate(), Err(Error::Schema(_))));
    }
}
