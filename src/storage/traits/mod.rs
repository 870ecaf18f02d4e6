//! Storage backend traits.

mod local;
mod remote;

pub use local::LocalStore;
pub use remote::{
    RemoteStore, child_path, is_server_timestamp, server_timestamp, validate_key,
};
