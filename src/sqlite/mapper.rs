//! Conversion between records and column values.

use rusqlite::types::Value as SqlValue;

use super::entity::{Entity, EntityDescriptor};
use super::error::{Error, Result};
use super::value::{FromValue, Value};

/// One table row, aligned with an entity descriptor's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<'d> {
    descriptor: &'d EntityDescriptor,
    values: Vec<Value>,
}

impl<'d> Row<'d> {
    pub fn new(descriptor: &'d EntityDescriptor, values: Vec<Value>) -> Result<Self> {
        check_arity(descriptor, values.len())?;
        Ok(Self { descriptor, values })
    }

    /// Converts the named column into `T`.
    pub fn get<T: FromValue>(&self, field: &str) -> Result<T> {
        let value = self
            .value(field)
            .ok_or_else(|| Error::UnknownField {
                table: self.descriptor.table,
                field: field.to_string(),
            })?
            .clone();
        T::from_value(value).map_err(|e| match e {
            Error::Mapping(msg) => {
                Error::Mapping(format!("{}.{field}: {msg}", self.descriptor.table))
            }
            other => other,
        })
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.descriptor
            .field_index(field)
            .map(|index| &self.values[index])
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

fn check_arity(descriptor: &EntityDescriptor, len: usize) -> Result<()> {
    if len != descriptor.fields.len() {
        return Err(Error::Mapping(format!(
            "`{}` expects {} columns, got {len}",
            descriptor.table,
            descriptor.fields.len()
        )));
    }
    Ok(())
}

/// Double-quotes an SQL identifier.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Comma-separated quoted column list in descriptor order.
pub(crate) fn column_list(descriptor: &EntityDescriptor) -> String {
    descriptor
        .column_names()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn to_row<E: Entity>(record: &E) -> Result<Vec<Value>> {
    let values = record.to_row();
    check_arity(E::descriptor(), values.len())?;
    check_finite(E::descriptor(), &values)?;
    Ok(values)
}

/// SQLite stores NaN as NULL, so non-finite reals never reach a statement.
fn check_finite(descriptor: &EntityDescriptor, values: &[Value]) -> Result<()> {
    for (field, value) in descriptor.fields.iter().zip(values) {
        if let Value::Real(f) = value {
            if !f.is_finite() {
                return Err(Error::Mapping(format!(
                    "{}.{}: cannot store non-finite REAL {f}",
                    descriptor.table, field.name
                )));
            }
        }
    }
    Ok(())
}

pub(crate) fn from_row<E: Entity>(values: Vec<Value>) -> Result<E> {
    let row = Row::new(E::descriptor(), values)?;
    E::from_row(&row)
}

/// Reads every descriptor column, in order, from a driver row.
pub(crate) fn read_values(
    descriptor: &EntityDescriptor,
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<Vec<Value>> {
    (0..descriptor.fields.len())
        .map(|i| row.get::<_, SqlValue>(i).map(Value::from))
        .collect()
}

/// Columns and values for one `INSERT`.
#[derive(Debug)]
pub(crate) struct InsertPlan {
    pub columns: Vec<&'static str>,
    pub values: Vec<Value>,
    /// SQLite will assign the key; the record needs back-filling.
    pub generated_key: bool,
}

pub(crate) fn insert_plan<E: Entity>(record: &E) -> Result<InsertPlan> {
    let descriptor = E::descriptor();
    let key_index = descriptor.primary_key_index()?;
    let generated_key = descriptor.fields[key_index].is_auto_increment() && record.key() == 0;

    let mut columns = Vec::with_capacity(descriptor.fields.len());
    let mut values = Vec::with_capacity(descriptor.fields.len());
    for (index, (field, value)) in descriptor.fields.iter().zip(to_row(record)?).enumerate() {
        if generated_key && index == key_index {
            continue;
        }
        columns.push(field.name);
        values.push(value);
    }
    Ok(InsertPlan {
        columns,
        values,
        generated_key,
    })
}

/// Non-key columns and values for one `UPDATE`; the key value is last.
pub(crate) fn update_plan<E: Entity>(record: &E) -> Result<(Vec<&'static str>, Vec<Value>)> {
    let descriptor = E::descriptor();
    let key_index = descriptor.primary_key_index()?;
    let mut columns = Vec::with_capacity(descriptor.fields.len());
    let mut values = Vec::with_capacity(descriptor.fields.len());
    for (index, (field, value)) in descriptor.fields.iter().zip(to_row(record)?).enumerate() {
        if index != key_index {
            columns.push(field.name);
            values.push(value);
        }
    }
    values.push(Value::Integer(record.key()));
    Ok((columns, values))
}
