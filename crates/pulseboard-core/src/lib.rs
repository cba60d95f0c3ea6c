pub mod config_manager;
pub mod error;
pub mod snapshot;

pub use config_manager::*;
pub use error::*;
pub use snapshot::*;
