pub mod batch;
pub mod engine;
pub mod executor;
pub mod params;
pub mod request;
pub mod settings;
pub mod stats;

pub use batch::*;
pub use engine::*;
pub use executor::*;
pub use params::*;
pub use request::*;
pub use settings::*;
pub use stats::*;
