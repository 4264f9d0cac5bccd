//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (backlog positive, address non-empty)
//! - Check the TLS table names a certificate path
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Listener address is empty or whitespace.
    EmptyAddress,
    /// Backlog must be positive.
    InvalidBacklog(i32),
    /// TLS table is present but names no certificate file.
    EmptyCertPath,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyAddress => write!(f, "listener.address must not be empty"),
            ValidationError::InvalidBacklog(backlog) => {
                write!(f, "listener.backlog must be positive, got {}", backlog)
            }
            ValidationError::EmptyCertPath => write!(f, "tls.cert_path must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.address.trim().is_empty() {
        errors.push(ValidationError::EmptyAddress);
    }
    if config.listener.backlog <= 0 {
        errors.push(ValidationError::InvalidBacklog(config.listener.backlog));
    }
    if let Some(tls) = &config.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::EmptyCertPath);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_address_rejected() {
        let mut config = AppConfig::default();
        config.listener.address = "   ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyAddress));
    }

    #[test]
    fn test_nonpositive_backlog_rejected() {
        let mut config = AppConfig::default();
        config.listener.backlog = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidBacklog(0)));
    }

    #[test]
    fn test_tls_without_cert_path_rejected() {
        let mut config = AppConfig::default();
        config.tls = Some(TlsConfig {
            cert_path: String::new(),
            passphrase: String::new(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptyCertPath]);
    }

    #[test]
    fn test_all_errors_collected() {
        let mut config = AppConfig::default();
        config.listener.address = String::new();
        config.listener.backlog = -1;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
