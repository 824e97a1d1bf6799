//! Configuration loading and validation.

mod settings;

pub use settings::{ConfigError, Security, Settings, SourceSettings, TargetSettings};
