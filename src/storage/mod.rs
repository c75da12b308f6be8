//! `SQLite` storage layer for `tracker`.
//!
//! # Submodules
//!
//! - [`predicate`] - Typed filter predicates and search-field composition
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main `SQLite` storage implementation

pub mod predicate;
pub mod schema;
pub mod sqlite;

pub use predicate::{Condition, Predicate, SearchField, StoryColumn, compose};
pub use sqlite::SqliteStorage;
