//! Insert, update and delete for single records and atomic batches.

use rusqlite::{params, params_from_iter, Connection, Transaction};
use tracing::{debug, warn};

use super::database::Database;
use super::entity::{Entity, EntityDescriptor};
use super::error::{Error, Result};
use super::mapper::{self, quote_ident, InsertPlan};

impl Database {
    /// Inserts `record` and returns its key.
    ///
    /// An unset (0) auto-increment key is filled in on `record` from the
    /// value SQLite assigned.
    pub async fn insert<E: Entity>(&self, record: &mut E) -> Result<i64> {
        let descriptor = E::descriptor();
        let plan = mapper::insert_plan(record)?;
        let key = {
            let connection = self.connection().await;
            insert_row(&connection, descriptor, &plan)?
        };
        if plan.generated_key {
            record.set_key(key);
        }
        debug!(table = descriptor.table, key, "inserted record");
        Ok(record.key())
    }

    /// Inserts all `records` in one transaction.
    ///
    /// Keys are back-filled only once the whole batch has committed; on
    /// failure nothing is written and every record is left untouched.
    pub async fn insert_all<E: Entity>(&self, records: &mut [E]) -> Result<usize> {
        let descriptor = E::descriptor();
        let plans = records
            .iter()
            .enumerate()
            .map(|(index, record)| mapper::insert_plan(record).map_err(|e| Error::batch(index, e)))
            .collect::<Result<Vec<_>>>()?;

        let keys = {
            let mut connection = self.connection().await;
            run_batch(&mut connection, descriptor, plans.len(), |tx, index| {
                insert_row(tx, descriptor, &plans[index])
            })?
        };

        for ((record, plan), key) in records.iter_mut().zip(&plans).zip(keys) {
            if plan.generated_key {
                record.set_key(key);
            }
        }
        debug!(table = descriptor.table, count = records.len(), "inserted batch");
        Ok(records.len())
    }

    /// Writes every non-key field of `record` to the row with its key.
    ///
    /// Fails with [`Error::NotFound`] when the key is unset or no row has it.
    pub async fn update<E: Entity>(&self, record: &E) -> Result<()> {
        let connection = self.connection().await;
        update_row(&connection, record)?;
        debug!(table = E::descriptor().table, key = record.key(), "updated record");
        Ok(())
    }

    /// Updates all `records` in one transaction; any missing key rolls back
    /// the whole batch.
    pub async fn update_all<E: Entity>(&self, records: &[E]) -> Result<usize> {
        let descriptor = E::descriptor();
        {
            let mut connection = self.connection().await;
            run_batch(&mut connection, descriptor, records.len(), |tx, index| {
                update_row(tx, &records[index])
            })?;
        }
        debug!(table = descriptor.table, count = records.len(), "updated batch");
        Ok(records.len())
    }

    /// Deletes the row with `record`'s key, returning the number of rows
    /// removed. A missing key removes nothing and is not an error.
    pub async fn delete<E: Entity>(&self, record: &E) -> Result<usize> {
        let descriptor = E::descriptor();
        let removed = {
            let connection = self.connection().await;
            delete_row(&connection, descriptor, record.key())?
        };
        debug!(table = descriptor.table, key = record.key(), removed, "deleted record");
        Ok(removed)
    }

    /// Deletes all `records` in one transaction, returning rows removed.
    pub async fn delete_all<E: Entity>(&self, records: &[E]) -> Result<usize> {
        let descriptor = E::descriptor();
        let removed: usize = {
            let mut connection = self.connection().await;
            run_batch(&mut connection, descriptor, records.len(), |tx, index| {
                delete_row(tx, descriptor, records[index].key())
            })?
        }
        .into_iter()
        .sum();
        debug!(table = descriptor.table, removed, "deleted batch");
        Ok(removed)
    }

    /// Loads the record with primary key `key`.
    pub async fn get<E: Entity>(&self, key: i64) -> Result<Option<E>> {
        let key_field = E::descriptor().primary_key()?.name;
        self.query::<E>().where_eq(key_field, key).first_or_default().await
    }
}

/// Runs `op` for each index inside one transaction, committing only if all
/// succeed. The failing index is reported in [`Error::Batch`].
fn run_batch<T>(
    connection: &mut Connection,
    descriptor: &EntityDescriptor,
    len: usize,
    mut op: impl FnMut(&Transaction<'_>, usize) -> Result<T>,
) -> Result<Vec<T>> {
    let tx = connection.transaction()?;
    let mut results = Vec::with_capacity(len);
    for index in 0..len {
        match op(&tx, index) {
            Ok(result) => results.push(result),
            Err(err) => {
                warn!(table = descriptor.table, index, error = %err, "batch rolled back");
                return Err(Error::batch(index, err));
            }
        }
    }
    tx.commit()?;
    Ok(results)
}

fn insert_row(
    connection: &Connection,
    descriptor: &EntityDescriptor,
    plan: &InsertPlan,
) -> Result<i64> {
    let table = quote_ident(descriptor.table);
    let sql = if plan.columns.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        let columns = plan
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; plan.columns.len()].join(", ");
        format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})")
    };
    connection
        .execute(&sql, params_from_iter(plan.values.iter()))
        .map_err(|e| Error::from_write(descriptor.table, e))?;
    Ok(connection.last_insert_rowid())
}

fn update_row<E: Entity>(connection: &Connection, record: &E) -> Result<()> {
    let descriptor = E::descriptor();
    let key = record.key();
    let not_found = || Error::NotFound {
        table: descriptor.table,
        key,
    };
    if key == 0 {
        return Err(not_found());
    }

    let key_column = quote_ident(descriptor.primary_key()?.name);
    let (columns, values) = mapper::update_plan(record)?;
    let assignments = if columns.is_empty() {
        format!("{key_column} = {key_column}")
    } else {
        columns
            .iter()
            .map(|c| format!("{} = ?", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let sql = format!(
        "UPDATE {} SET {assignments} WHERE {key_column} = ?",
        quote_ident(descriptor.table)
    );
    let changed = connection
        .execute(&sql, params_from_iter(values.iter()))
        .map_err(|e| Error::from_write(descriptor.table, e))?;
    if changed == 0 {
        return Err(not_found());
    }
    Ok(())
}

fn delete_row(connection: &Connection, descriptor: &EntityDescriptor, key: i64) -> Result<usize> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?1",
        quote_ident(descriptor.table),
        quote_ident(descriptor.primary_key()?.name)
    );
    connection
        .execute(&sql, params![key])
        .map_err(|e| Error::from_write(descriptor.table, e))
}
