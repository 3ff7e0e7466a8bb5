//! # Spell API Database Crate
//!
//! This crate is the instrumented data-access layer between the spell API and
//! its MongoDB document store.
//!
//! ## Architectural Principles
//!
//! - **Thin Adapter:** Filters and documents are passed through to the store
//!   untouched. Query semantics belong to the store, not to this crate.
//! - **Uniform Instrumentation:** Every store call runs inside a `tracing` span
//!   that records collection, database, input and outcome (or error). Spells
//!   get a second, domain-level span around the store span.
//! - **Explicit Handles:** There is no global client. A `MongoConnection` is
//!   created once at startup and handed to a `SpellRepository` as an
//!   `Arc<dyn ConnectionCapability>`.
//!
//! ## Public API
//!
//! - `connect` / `connect_with`: Establish and ping a direct store connection.
//! - `SpellRepository`: `get_spell`, `add_spell` and `delete_spell`.
//! - `run_query`, `write_object`, `delete_object`: The generic instrumented primitives.
//! - `Context`: Caller-owned cancellation and deadlines for every operation.
//! - `DbError` / `StoreError`: The errors that can be returned from this crate.
//! - `memory::InMemoryConnection`: A store that lives inside the process.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod context;
pub mod error;
pub mod memory;
pub mod primitives;
pub mod spells;
pub mod store;

#[cfg(test)]
mod test_support;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, connect_with, MongoConnection};
pub use context::{CancelHandle, Context, Interrupted};
pub use error::{DbError, StoreError};
pub use primitives::{delete_object, run_query, write_object};
pub use spells::{SpellRepository, SPELL_COLLECTION, SPELL_DATABASE};
pub use store::{CollectionProvider, ConnectionCapability, DocumentCollection};

// Callers build filters and documents with the same BSON crate we do.
pub use bson;
