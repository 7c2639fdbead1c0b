pub mod assemble;
pub mod config;
pub mod export;
pub mod overlay;
pub mod sampling;
pub mod stats;
pub mod stop;

pub use assemble::{
    assemble_dataset, assemble_from_config, reset_output, AssembleError, AssemblyOptions, RunSummary,
};
pub use config::ToolConfig;
