// ABOUTME: Library module for snow2gcp
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod bigquery;
pub mod commands;
pub mod config;
pub mod export;
pub mod interactive;
pub mod session;
pub mod snowflake;
pub mod table_ref;
pub mod unload;
pub mod utils;
