#![allow(dead_code)]

use sqlite_manager::{
    ColumnConstraint, DataType, Database, Entity, EntityDescriptor, FieldDescriptor, Registry,
    Result, Row, Value,
};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct User {
    pub id: i64,
    pub name: String,
}

impl User {
    pub fn named(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
        }
    }
}

static USER: EntityDescriptor = EntityDescriptor::new(
    "users",
    &[
        FieldDescriptor::auto_key("id"),
        FieldDescriptor::new("name", DataType::Text)
            .with_constraints(&[ColumnConstraint::NotNull]),
    ],
);

impl Entity for User {
    fn descriptor() -> &'static EntityDescriptor {
        &USER
    }
    fn key(&self) -> i64 {
        self.id
    }
    fn set_key(&mut self, key: i64) {
        self.id = key;
    }
    fn to_row(&self) -> Vec<Value> {
        vec![self.id.into(), self.name.as_str().into()]
    }
    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

impl Product {
    pub fn new(name: &str, price: f64) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            price,
        }
    }
}

static PRODUCT: EntityDescriptor = EntityDescriptor::new(
    "products",
    &[
        FieldDescriptor::auto_key("id"),
        FieldDescriptor::new("name", DataType::Text),
        FieldDescriptor::new("price", DataType::Real),
    ],
);

impl Entity for Product {
    fn descriptor() -> &'static EntityDescriptor {
        &PRODUCT
    }
    fn key(&self) -> i64 {
        self.id
    }
    fn set_key(&mut self, key: i64) {
        self.id = key;
    }
    fn to_row(&self) -> Vec<Value> {
        vec![self.id.into(), self.name.as_str().into(), self.price.into()]
    }
    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            price: row.get("price")?,
        })
    }
}

/// Account with a unique email, for constraint checks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub active: bool,
    pub note: Option<String>,
}

impl Account {
    pub fn new(email: &str) -> Self {
        Self {
            id: 0,
            email: email.to_string(),
            active: true,
            note: None,
        }
    }
}

static ACCOUNT: EntityDescriptor = EntityDescriptor::new(
    "accounts",
    &[
        FieldDescriptor::auto_key("id"),
        FieldDescriptor::new("email", DataType::Text)
            .with_constraints(&[ColumnConstraint::NotNull, ColumnConstraint::Unique]),
        FieldDescriptor::new("active", DataType::Integer),
        FieldDescriptor::new("note", DataType::Text),
    ],
);

impl Entity for Account {
    fn descriptor() -> &'static EntityDescriptor {
        &ACCOUNT
    }
    fn key(&self) -> i64 {
        self.id
    }
    fn set_key(&mut self, key: i64) {
        self.id = key;
    }
    fn to_row(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.email.as_str().into(),
            self.active.into(),
            self.note.clone().into(),
        ]
    }
    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            email: row.get("email")?,
            active: row.get("active")?,
            note: row.get("note")?,
        })
    }
}

/// Same table name as [`User`] but a different column set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LegacyUser {
    pub id: i64,
    pub login: String,
}

static LEGACY_USER: EntityDescriptor = EntityDescriptor::new(
    "users",
    &[
        FieldDescriptor::auto_key("id"),
        FieldDescriptor::new("login", DataType::Text),
    ],
);

impl Entity for LegacyUser {
    fn descriptor() -> &'static EntityDescriptor {
        &LEGACY_USER
    }
    fn key(&self) -> i64 {
        self.id
    }
    fn set_key(&mut self, key: i64) {
        self.id = key;
    }
    fn to_row(&self) -> Vec<Value> {
        vec![self.id.into(), self.login.as_str().into()]
    }
    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            login: row.get("login")?,
        })
    }
}

/// Descriptor with no primary key.
pub struct Keyless;

static KEYLESS: EntityDescriptor =
    EntityDescriptor::new("keyless", &[FieldDescriptor::new("name", DataType::Text)]);

impl Entity for Keyless {
    fn descriptor() -> &'static EntityDescriptor {
        &KEYLESS
    }
    fn key(&self) -> i64 {
        0
    }
    fn set_key(&mut self, _key: i64) {}
    fn to_row(&self) -> Vec<Value> {
        vec![Value::Null]
    }
    fn from_row(_row: &Row<'_>) -> Result<Self> {
        Ok(Keyless)
    }
}

// Helper function to create a temporary file-based database
pub fn create_temp_db() -> (Database, TempDir) {
    let dir = TempDir::new().unwrap();
    let registry = Registry::default();
    let db = registry.get_or_create(dir.path().join("test.db")).unwrap();
    (db, dir)
}

/// Temporary database with fresh `users` and `products` tables.
pub async fn create_test_db() -> (Database, TempDir) {
    let (db, dir) = create_temp_db();
    db.ensure_table::<User>().await.unwrap();
    db.ensure_table::<Product>().await.unwrap();
    (db, dir)
}

pub async fn seed_products(db: &Database) -> Vec<Product> {
    let mut products = vec![
        Product::new("Laptop", 1200.0),
        Product::new("Phone", 800.0),
        Product::new("Tablet", 600.0),
    ];
    db.insert_all(&mut products).await.unwrap();
    products
}
