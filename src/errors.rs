//! Central error taxonomy for the coordinator.
//!
//! Every error carries a category so failures can be mapped onto
//! metrics and log fields without string matching at the call site.

use thiserror::Error;

/// High-level error categories for metrics and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// RPC transport failures, timeouts, connection loss.
    Network,
    /// Missing or invalid configuration.
    Configuration,
    /// A contract returned an unexpected or undecodable payload.
    Contract,
    /// Transaction signing or broadcast failures.
    Transaction,
    /// Internal coordinator errors.
    System,
}

impl ErrorCategory {
    /// Metric label for this category.
    pub fn metric_label(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Contract => "contract",
            ErrorCategory::Transaction => "transaction",
            ErrorCategory::System => "system",
        }
    }
}

/// Standardized error type with context and categorization.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("contract error ({contract}): {message}")]
    Contract { contract: String, message: String },

    #[error("transaction error: {message}")]
    Transaction {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("system error: {message}")]
    System { message: String },
}

impl CoordinatorError {
    /// Category for metrics/classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoordinatorError::Network { .. } => ErrorCategory::Network,
            CoordinatorError::Configuration { .. } => ErrorCategory::Configuration,
            CoordinatorError::Contract { .. } => ErrorCategory::Contract,
            CoordinatorError::Transaction { .. } => ErrorCategory::Transaction,
            CoordinatorError::System { .. } => ErrorCategory::System,
        }
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    pub fn network_with_source<S: Into<String>>(message: S, source: anyhow::Error) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn contract<C: Into<String>, M: Into<String>>(contract: C, message: M) -> Self {
        Self::Contract {
            contract: contract.into(),
            message: message.into(),
        }
    }

    /// A contract response that failed to deserialize.
    pub fn decode<C: Into<String>>(contract: C, err: serde_json::Error) -> Self {
        Self::Contract {
            contract: contract.into(),
            message: format!("undecodable response: {err}"),
        }
    }

    pub fn transaction<S: Into<String>>(message: S) -> Self {
        Self::Transaction {
            message: message.into(),
            source: None,
        }
    }

    pub fn transaction_with_source<S: Into<String>>(message: S, source: anyhow::Error) -> Self {
        Self::Transaction {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn error_categorization() {
        let net_err = CoordinatorError::network("RPC timeout");
        assert_eq!(net_err.category(), ErrorCategory::Network);
        assert_eq!(net_err.category().metric_label(), "network");

        let config_err = CoordinatorError::config("missing COORDINATOR_MNEMONIC");
        assert_eq!(config_err.category(), ErrorCategory::Configuration);

        let contract_err = CoordinatorError::contract("neutron1core", "unknown variant");
        assert_eq!(contract_err.category(), ErrorCategory::Contract);
        assert!(contract_err.to_string().contains("neutron1core"));
    }

    #[test]
    fn wrapped_source_keeps_category_and_message() {
        let base_error = anyhow!("connection refused");
        let categorized =
            CoordinatorError::network_with_source("failed to reach hub RPC", base_error);

        assert_eq!(categorized.category(), ErrorCategory::Network);
        assert!(categorized.to_string().contains("network error"));
        assert!(categorized.to_string().contains("failed to reach hub RPC"));
    }
}
