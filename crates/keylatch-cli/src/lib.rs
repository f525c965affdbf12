//! CLI argument models and configuration loading for the keylatch binary.

pub mod cli_args;
pub mod config_file;

pub use cli_args::*;
pub use config_file::*;
