pub mod config;
pub mod config_loader;
pub mod error;
pub mod gate;
pub mod manifest;
pub mod output;
pub mod registry;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use config::*;
pub use config_loader::*;
pub use error::*;
pub use gate::*;
pub use manifest::*;
pub use output::*;
pub use registry::*;
pub use traits::*;
