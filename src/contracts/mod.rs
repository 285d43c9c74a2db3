//! Thin typed handles over the protocol contracts.
//!
//! Only the message shapes the coordinator actually sends and reads are
//! modelled here. The shapes are the protocol boundary with contracts not
//! under this repository's control and must be preserved byte-for-byte;
//! responses tolerate unknown fields so that contract-side schema additions
//! stay harmless.

pub mod core;
pub mod provider;
pub mod pump;
pub mod puppeteer;
pub mod splitter;
pub mod staker;
pub mod validators;

use serde::{Deserialize, Serialize};

use crate::errors::CoordinatorError;

/// Coin shape used inside contract messages (`Uint128` amounts travel as
/// strings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinJson {
    pub denom: String,
    pub amount: String,
}

impl CoinJson {
    pub fn new(denom: &str, amount: u128) -> Self {
        Self {
            denom: denom.to_string(),
            amount: amount.to_string(),
        }
    }
}

/// Interchain-account registration state, shared by the pump and staker
/// contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IcaState {
    None,
    InProgress,
    Timeout,
    Registered { ica_address: String },
}

/// Parse a contract-side `Uint128` string.
pub fn parse_uint(contract: &str, raw: &str) -> Result<u128, CoordinatorError> {
    raw.parse::<u128>().map_err(|_| {
        CoordinatorError::contract(contract, format!("unparsable Uint128 '{raw}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ica_state_shapes() {
        let none: IcaState = serde_json::from_value(json!("none")).unwrap();
        assert_eq!(none, IcaState::None);

        let in_progress: IcaState = serde_json::from_value(json!("in_progress")).unwrap();
        assert_eq!(in_progress, IcaState::InProgress);

        let registered: IcaState =
            serde_json::from_value(json!({"registered": {"ica_address": "cosmos1ica"}}))
                .unwrap();
        assert_eq!(
            registered,
            IcaState::Registered {
                ica_address: "cosmos1ica".to_string()
            }
        );
    }

    #[test]
    fn coin_json_uses_string_amounts() {
        let coin = CoinJson::new("uatom", 1_500_000);
        assert_eq!(
            serde_json::to_value(&coin).unwrap(),
            json!({"denom": "uatom", "amount": "1500000"})
        );
    }

    #[test]
    fn parse_uint_rejects_garbage() {
        assert_eq!(parse_uint("c", "42").unwrap(), 42);
        assert!(parse_uint("c", "4.2").is_err());
        assert!(parse_uint("c", "-1").is_err());
    }
}
