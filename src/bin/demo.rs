//! Console walk-through of the crate over `users.db` and `products.db`.

use anyhow::{Context, Result};
use futures::executor::block_on;
use sqlite_manager::{
    DataType, Database, Entity, EntityDescriptor, FieldDescriptor, Registry, Row, Value,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default)]
struct User {
    id: i64,
    name: String,
}

static USER: EntityDescriptor = EntityDescriptor::new(
    "User",
    &[
        FieldDescriptor::auto_key("Id"),
        FieldDescriptor::new("Name", DataType::Text),
    ],
);

impl User {
    fn named(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
        }
    }
}

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

    fn from_row(row: &Row<'_>) -> sqlite_manager::Result<Self> {
        Ok(Self {
            id: row.get("Id")?,
            name: row.get("Name")?,
        })
    }
}

#[derive(Debug, Clone, Default)]
struct Product {
    id: i64,
    name: String,
    price: f64,
}

static PRODUCT: EntityDescriptor = EntityDescriptor::new(
    "Product",
    &[
        FieldDescriptor::auto_key("Id"),
        FieldDescriptor::new("Name", DataType::Text),
        FieldDescriptor::new("Price", DataType::Real),
    ],
);

impl Product {
    fn new(name: &str, price: f64) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            price,
        }
    }
}

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
        vec![
            self.id.into(),
            self.name.as_str().into(),
            self.price.into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> sqlite_manager::Result<Self> {
        Ok(Self {
            id: row.get("Id")?,
            name: row.get("Name")?,
            price: row.get("Price")?,
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let registry = Registry::default();
    block_on(run(&registry))
}

async fn run(registry: &Registry) -> Result<()> {
    let user_db = registry.get_or_create("users.db")?;
    let product_db = registry.get_or_create("products.db")?;

    // Ensure / reset tables
    user_db.ensure_table::<User>().await?;
    product_db.ensure_table::<Product>().await?;
    user_db.reset_table::<User>().await?;
    product_db.reset_table::<Product>().await?;

    // Single inserts
    user_db.insert(&mut User::named("Alice")).await?;
    product_db.insert(&mut Product::new("Laptop", 1200.0)).await?;

    // Batch inserts
    user_db
        .insert_all(&mut [User::named("Bob"), User::named("Charlie")])
        .await?;
    product_db
        .insert_all(&mut [Product::new("Phone", 800.0), Product::new("Tablet", 600.0)])
        .await?;

    // Query all
    let mut users = registry.query_for::<User>("users.db")?.to_list().await?;
    let products = registry.query_for::<Product>("products.db")?.to_list().await?;
    println!("Users count: {}", users.len());
    println!("Products count: {}", products.len());

    // Filtered query
    let alice = registry
        .query_for::<User>("users.db")?
        .where_eq("Name", "Alice")
        .first_or_default()
        .await?;
    println!(
        "Found: {}",
        alice.as_ref().map(|u| u.name.as_str()).unwrap_or_default()
    );

    // Single update
    if let Some(alice) = &alice {
        let mut renamed = alice.clone();
        renamed.name = "Alice Updated".to_string();
        user_db.update(&renamed).await?;
    }

    // Batch update
    for user in &mut users {
        user.name.push_str(" Batch");
    }
    user_db.update_all(&users).await?;

    // Single delete
    if let Some(alice) = &alice {
        user_db.delete(alice).await?;
    }

    // Batch delete
    let batch_users = user_db
        .query::<User>()
        .where_contains("Name", "Batch")
        .to_list()
        .await?;
    let removed = user_db.delete_all(&batch_users).await?;
    info!(removed, "batch delete finished");

    // Ordered query
    print_sorted_products(&product_db).await?;

    // Drop tables
    user_db.reset_table::<User>().await?;
    product_db.reset_table::<Product>().await?;

    println!("sqlite_manager demo finished");
    Ok(())
}

async fn print_sorted_products(product_db: &Database) -> Result<()> {
    let sorted = product_db
        .query::<Product>()
        .order_by_descending("Price")
        .to_list()
        .await
        .context("loading products by price")?;

    println!("Products sorted by price:");
    for product in sorted {
        println!("{} - {}", product.name, product.price);
    }
    Ok(())
}
