//! Typed SQLite data access.
//!
//! # Intention
//!
//! - Share one connection per database file across the process.
//! - Describe record types statically and let the crate manage their tables.
//! - Cover CRUD for single records and atomic batches, plus fluent reads.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here.
//! - No business logic or unrelated utilities.

pub mod sqlite;

pub use sqlite::{
    ColumnConstraint, Condition, DataType, Database, Direction, Entity, EntityDescriptor, Error,
    FieldDescriptor, FromValue, JournalMode, Query, QueryOperator, Registry, Result, Row,
    SqliteConfig, Value,
};
