//! sqlgate core - shared abstractions for the sqlgate connection pool
//!
//! This crate provides the pieces every other sqlgate crate depends on:
//!
//! - `DatabaseDriver` - Trait for opening connections from settings
//! - `Connection` - Trait for a single live database socket
//! - `ConnectionSettings` / `SettingsFile` - How to reach the database
//! - Common types like `Value`, `Row` and `QueryResult`

mod connection;
mod driver;
mod error;
pub mod settings;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use settings::{ConnectionSettings, SettingsFile, SettingsSection};
pub use types::*;
