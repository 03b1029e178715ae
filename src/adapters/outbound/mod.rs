pub mod echo_executor;
pub mod fn_executor;
pub mod tracing_logger;

pub use echo_executor::*;
pub use fn_executor::*;
pub use tracing_logger::*;
