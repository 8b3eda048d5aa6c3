//! Configuration validation.

use super::GeneratorConfig;
use crate::error::{GeneratorError, Result};

/// Validate the configuration.
pub fn validate(config: &GeneratorConfig) -> Result<()> {
    if config.out_dir.as_os_str().is_empty() {
        return Err(GeneratorError::Config("out_dir is required".into()));
    }

    if config.out_dir.is_file() {
        return Err(GeneratorError::Config(format!(
            "out_dir '{}' points at a file",
            config.out_dir.display()
        )));
    }

    Ok(())
}
