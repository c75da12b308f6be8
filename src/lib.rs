//! `tracker` - project/story tracking persistence layer
//!
//! Projects own stories; the repository searches a project's stories by
//! sparse criteria, aggregates story points and rejection dates, and updates
//! story state, all against `SQLite`.
//!
//! # Architecture
//!
//! - [`model`] - Data types (Project, Story, SearchParams, projections)
//! - [`storage`] - `SQLite` repository and typed predicate composition
//! - [`config`] - Layered configuration (defaults, YAML, env, overrides)
//! - [`error`] - Error types and handling
//! - [`logging`] - tracing subscriber setup
//!
//! # Example
//!
//! ```rust
//! use tracker::model::{NewStory, SearchParams};
//! use tracker::storage::SqliteStorage;
//!
//! let mut storage = SqliteStorage::open_memory()?;
//! let project = storage.create_project("Apollo")?;
//! storage.create_story(&NewStory::new(project.id, "Login page", "alice", 3))?;
//!
//! let params = SearchParams {
//!     title: Some("Login".to_string()),
//!     ..Default::default()
//! };
//! assert_eq!(storage.search(project.id, &params)?.len(), 1);
//! # Ok::<(), tracker::TrackerError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod storage;

pub use error::{Result, TrackerError};
