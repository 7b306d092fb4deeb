//! Library half of the `confscope` binary: configuration loading and the
//! file-level transformer.

pub mod config;
pub mod file_transformer;

pub use config::{CliConfig, ConfigError, PARALLEL_ENV};
pub use file_transformer::{
    transform_files, write_if_changed, FileTransformError, OutputFile, OutputStatus,
    TransformReport,
};
