//! SQLite storage layer.
//!
//! Key-value persistence backed by a WAL-mode SQLite file with one writer
//! connection and a small read-only pool.

pub mod kv;
pub mod pool;
