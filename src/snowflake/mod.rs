// ABOUTME: Snowflake warehouse access
// ABOUTME: Session login/execution and catalog listing used by commands

pub mod catalog;
pub mod connection;

pub use catalog::{list_databases, list_schemas, list_views, list_warehouses, use_warehouse};
pub use connection::{connect, SnowflakeSession};
