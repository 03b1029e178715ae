pub mod client;
pub mod config_key;
pub mod registry;

pub use client::*;
pub use config_key::*;
pub use registry::*;
