use super::types::{file_size_ceiling, Config};
use super::ConfigError;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Batch size and transfer concurrency are at least 1
/// - File size ceilings stay within the 5 MiB (10 MiB relaxed) policy
/// - Accepted/supported media type sets are not empty
/// - JPEG quality is in 1..=100 and resize bounds are non-zero
/// - Gateway URL is http(s) and its timeout is non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    let orchestrator = &config.orchestrator;
    if orchestrator.max_batch_size == 0 {
        return Err(invalid("orchestrator.max_batch_size must be at least 1"));
    }
    if orchestrator.max_concurrent_transfers == 0 {
        return Err(invalid(
            "orchestrator.max_concurrent_transfers must be at least 1",
        ));
    }
    check_file_size(
        "orchestrator.max_file_size",
        orchestrator.max_file_size,
        orchestrator.relaxed_limits,
    )?;
    if orchestrator.accepted_types.is_empty() {
        return Err(invalid("orchestrator.accepted_types cannot be empty"));
    }

    let processing = &config.processing;
    check_file_size(
        "processing.max_file_size",
        processing.max_file_size,
        processing.relaxed_limits,
    )?;
    if processing.supported_types.is_empty() {
        return Err(invalid("processing.supported_types cannot be empty"));
    }
    if processing.quality == 0 || processing.quality > 100 {
        return Err(invalid("processing.quality must be between 1 and 100"));
    }
    if processing.max_width == 0 || processing.max_height == 0 {
        return Err(invalid(
            "processing.max_width and processing.max_height must be non-zero",
        ));
    }

    let url = config.gateway.url.as_str();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(invalid("gateway.url must start with http:// or https://"));
    }
    if config.gateway.timeout_secs == 0 {
        return Err(invalid("gateway.timeout_secs must be at least 1"));
    }

    if let Some(cdn) = &config.cdn {
        if cdn.cloud_name.is_empty() {
            return Err(invalid("cdn.cloud_name cannot be empty"));
        }
    }

    Ok(())
}

fn check_file_size(field: &str, size: u64, relaxed_limits: bool) -> Result<(), ConfigError> {
    if size == 0 {
        return Err(invalid(format!("{} must be greater than 0", field)));
    }
    let ceiling = file_size_ceiling(relaxed_limits);
    if size > ceiling {
        return Err(invalid(format!(
            "{} is {} bytes, above the {} byte ceiling{}",
            field,
            size,
            ceiling,
            if relaxed_limits {
                ""
            } else {
                " (set relaxed_limits = true to allow up to 10 MiB)"
            }
        )));
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}
