//! Schema replication and recovery for Compact serialization.
//!
//! `compact-core` encodes and decodes values against a process-local schema
//! registry. This crate keeps that registry in agreement with a cluster:
//! schemas are replicated to every member before data referencing them is
//! sent, and schemas met in received data are fetched on demand.
//!
//! The cluster connection is abstracted by [`SchemaTransport`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use compact_client::{SerializationConfig, SerializationService};
//! use compact_derive::Compact;
//!
//! #[derive(Compact)]
//! struct Employee {
//!     age: i32,
//!     id: i64,
//! }
//!
//! let config = SerializationConfig::builder()
//!     .register_compact::<Employee>()
//!     .build()?;
//! let service = SerializationService::new(&config, transport);
//!
//! let data = service.to_data(&Employee { age: 23, id: 456 }).await?;
//! let back: Employee = service.to_object(&data).await?;
//! ```
//!
//! # Configuration
//!
//! Settings come from [`SerializationConfigBuilder`], from the environment
//! (`HZ_SCHEMA_MAX_PUT_RETRY_COUNT`, `HZ_INVOCATION_RETRY_PAUSE_MS`) or, with
//! the `config-file` feature, from YAML and TOML files.

#![warn(missing_docs)]

pub mod config;
pub mod config_file;
pub mod invocation;
pub mod lazy;
pub mod schema_service;
pub mod service;
pub mod transport;

pub use config::{ConfigError, SerializationConfig, SerializationConfigBuilder};
pub use invocation::invoke_with_schema_recovery;
pub use lazy::ReadOnlyLazyList;
pub use schema_service::SchemaService;
pub use service::SerializationService;
pub use transport::SchemaTransport;

pub use compact_core::{CompactError, Result};
