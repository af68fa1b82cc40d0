//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - reqwest HTTP client (with CSRF handling) for the Transport port
//! - DuckDB for the SecretStore port, optionally encrypted
//! - an in-memory map for the SecretStore port

pub mod csrf;
pub mod duckdb_store;
pub mod http;
pub mod memory_store;

#[cfg(test)]
pub mod mock_server;
