//! Storage layer abstraction.
//!
//! This module provides the two stores the collection layer talks to:
//! - **Remote**: the hosted hierarchical key-value store (REST or in-memory)
//! - **Local**: the legacy client-side store read by the migration runner

// Lock guards in the in-memory stores span the whole mutation.
#![allow(clippy::significant_drop_tightening)]

pub mod local;
pub mod memory;
pub mod rest;
pub mod traits;

pub use local::{FileLocalStore, MemoryLocalStore};
pub use memory::{Clock, MemoryStore};
pub use rest::RestStore;
pub use traits::{
    LocalStore, RemoteStore, child_path, is_server_timestamp, server_timestamp, validate_key,
};
