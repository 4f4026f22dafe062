//! Bookmarkr embedded database layer.
//!
//! Provides SQLite connection management and schema migrations for the
//! embedded store backend used by tests and the demo binary. The schema
//! mirrors the remote `bookmarks`/`profiles` tables.
//!
//! # Usage
//!
//! ```no_run
//! use bookmarkr::database::Database;
//!
//! // Open a persistent database
//! let db = Database::open("bookmarkr.db").expect("failed to open database");
//!
//! // Or use an in-memory database for testing
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//!
//! // Access the underlying connection for queries
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
