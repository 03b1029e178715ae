pub mod batching;
pub mod llm_client;

pub use batching::*;
pub use llm_client::*;
