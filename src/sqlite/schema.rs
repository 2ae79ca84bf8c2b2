//! Table creation, reset and drop for entity types.

use std::collections::BTreeSet;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::database::Database;
use super::entity::{ColumnConstraint, Entity, EntityDescriptor};
use super::error::{Error, Result};
use super::mapper::quote_ident;

impl Database {
    /// Creates `E`'s table if it does not exist yet.
    ///
    /// An existing table is accepted when its column names match the
    /// descriptor; column types and constraints are not compared.
    pub async fn ensure_table<E: Entity>(&self) -> Result<()> {
        let descriptor = E::descriptor();
        descriptor.validate()?;

        let connection = self.connection().await;
        if table_exists(&connection, descriptor.table)? {
            check_columns(&connection, descriptor)?;
            debug!(table = descriptor.table, "table already present");
            return Ok(());
        }

        connection
            .execute_batch(&create_table_sql(descriptor))
            .map_err(|e| Error::Schema(format!("creating `{}`: {e}", descriptor.table)))?;
        info!(table = descriptor.table, "created table");
        Ok(())
    }

    /// Drops `E`'s table if present and recreates it empty.
    pub async fn reset_table<E: Entity>(&self) -> Result<()> {
        let descriptor = E::descriptor();
        descriptor.validate()?;

        let mut connection = self.connection().await;
        let tx = connection.transaction()?;
        tx.execute_batch(&format!(
            "{};\n{}",
            drop_table_sql(descriptor),
            create_table_sql(descriptor)
        ))
        .map_err(|e| Error::Schema(format!("resetting `{}`: {e}", descriptor.table)))?;
        tx.commit()?;
        info!(table = descriptor.table, "reset table");
        Ok(())
    }

    /// Drops `E`'s table. Dropping a missing table is a no-op.
    pub async fn drop_table<E: Entity>(&self) -> Result<()> {
        let descriptor = E::descriptor();
        let connection = self.connection().await;
        connection
            .execute_batch(&drop_table_sql(descriptor))
            .map_err(|e| Error::Schema(format!("dropping `{}`: {e}", descriptor.table)))?;
        info!(table = descriptor.table, "dropped table");
        Ok(())
    }

    pub async fn table_exists<E: Entity>(&self) -> Result<bool> {
        let connection = self.connection().await;
        table_exists(&connection, E::descriptor().table)
    }
}

pub(crate) fn create_table_sql(descriptor: &EntityDescriptor) -> String {
    let columns = descriptor
        .fields
        .iter()
        .map(|field| {
            let mut column = format!("{} {}", quote_ident(field.name), field.data_type.as_sql());
            if field.is_primary_key() {
                column.push_str(" PRIMARY KEY");
                if field.is_auto_increment() {
                    column.push_str(" AUTOINCREMENT");
                }
            } else if field.has(ColumnConstraint::Unique) {
                column.push_str(" UNIQUE");
            }
            if field.has(ColumnConstraint::NotNull) {
                column.push_str(" NOT NULL");
            }
            column
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({columns})",
        quote_ident(descriptor.table)
    )
}

fn drop_table_sql(descriptor: &EntityDescriptor) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(descriptor.table))
}

fn table_exists(connection: &Connection, table: &str) -> Result<bool> {
    let found = connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            params![table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn check_columns(connection: &Connection, descriptor: &EntityDescriptor) -> Result<()> {
    let mut stmt = connection.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let existing = stmt
        .query_map(params![descriptor.table], |row| row.get::<_, String>(0))?
        .map(|name| name.map(|n| n.to_ascii_lowercase()))
        .collect::<rusqlite::Result<BTreeSet<_>>>()?;
    let expected = descriptor
        .column_names()
        .map(str::to_ascii_lowercase)
        .collect::<BTreeSet<_>>();

    if existing != expected {
        return Err(Error::Schema(format!(
            "existing table `{}` has columns {:?}, expected {:?}",
            descriptor.table, existing, expected
        )));
    }
    Ok(())
}
