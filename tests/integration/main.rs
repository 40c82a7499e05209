//! Tessera Integration Tests
//!
//! End-to-end tests across storage, the event pool and the command loop.

mod common;

mod command_loop;
mod concurrent_ingest;
mod pool_lifecycle;
