//! SQLite handles, entity tables, CRUD and queries.
//!
//! A [`Registry`] hands out one [`Database`] per file. Record types implement
//! [`Entity`] with a static [`EntityDescriptor`]; the handle then manages
//! their table ([`Database::ensure_table`], [`Database::reset_table`]),
//! writes them ([`Database::insert`], [`Database::update_all`], ...) and reads
//! them back through [`Query`].

mod config;
mod crud;
mod database;
mod entity;
mod error;
mod mapper;
mod query;
mod registry;
mod schema;
mod value;

pub use config::{JournalMode, SqliteConfig};
pub use database::Database;
pub use entity::{ColumnConstraint, DataType, Entity, EntityDescriptor, FieldDescriptor};
pub use error::{Error, Result};
pub use mapper::Row;
pub use query::{Condition, Direction, Query, QueryOperator};
pub use registry::Registry;
pub use value::{FromValue, Value};
