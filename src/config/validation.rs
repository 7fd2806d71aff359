use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid marketplace api_url '{url}', expected an http:// or https:// URL")]
    InvalidApiUrl { url: String },

    #[error("Invalid seller wallet address '{address}', expected 0x followed by 40 hex digits")]
    InvalidWalletAddress { address: String },

    #[error("Timeout must be positive: {field} = 0")]
    ZeroTimeout { field: &'static str },

    #[error("max_event_bytes must be positive")]
    ZeroMaxEventBytes,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_seller(config)?;
    validate_marketplace(config)?;
    validate_runtime(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.max_event_bytes == 0 {
        return Err(ValidationError::ZeroMaxEventBytes);
    }
    Ok(())
}

/// The offerings directory need not exist yet; missing offerings surface as
/// `NotFound` when a job first references them.
fn validate_seller(config: &Config) -> Result<(), ValidationError> {
    if let Some(address) = &config.seller.wallet_address {
        if !is_wallet_address(address) {
            return Err(ValidationError::InvalidWalletAddress {
                address: address.clone(),
            });
        }
    }
    Ok(())
}

fn validate_marketplace(config: &Config) -> Result<(), ValidationError> {
    let url = &config.marketplace.api_url;
    let has_host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty());

    if !has_host {
        return Err(ValidationError::InvalidApiUrl { url: url.clone() });
    }

    if config.marketplace.request_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "marketplace.request_timeout_secs",
        });
    }
    Ok(())
}

fn validate_runtime(config: &Config) -> Result<(), ValidationError> {
    if config.runtime.capability_timeout_secs == Some(0) {
        return Err(ValidationError::ZeroTimeout {
            field: "runtime.capability_timeout_secs",
        });
    }
    Ok(())
}

fn is_wallet_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
