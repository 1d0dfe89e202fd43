//! Persistence Adapters - Order Repository Backends
//!
//! Two interchangeable implementations of the `OrderRepository` port:
//! - `FileOrderStore`: embedded single-file JSON store for local/dev,
//!   atomic tmp-write + rename
//! - `PgOrderStore`: PostgreSQL store for production, uniqueness
//!   enforced by a database constraint
//!
//! The backend is selected at startup from configuration; everything
//! above the port sees identical semantics.

pub mod file;
pub mod postgres;

pub use file::FileOrderStore;
pub use postgres::PgOrderStore;
