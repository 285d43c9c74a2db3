//! Wallet management: mnemonic-derived signing key and bech32 address.

use anyhow::{anyhow, Result};
use cosmrs::bip32::{self, Mnemonic};
use cosmrs::crypto::secp256k1::SigningKey;
use cosmrs::crypto::PublicKey;
use cosmrs::AccountId;
use tracing::info;

/// Cosmos HD path used by the protocol deployments (coin type 118).
const DERIVATION_PATH: &str = "m/44'/118'/0'/0/0";

/// Holds the coordinator's signing key and derived account address.
pub struct Wallet {
    signing_key: SigningKey,
    public_key: PublicKey,
    address: AccountId,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address.to_string())
            .finish()
    }
}

impl Wallet {
    /// Derive a wallet from a BIP-39 mnemonic phrase.
    pub fn from_mnemonic(phrase: &str, prefix: &str) -> Result<Self> {
        let mnemonic = Mnemonic::new(phrase.trim(), Default::default())
            .map_err(|e| anyhow!("invalid mnemonic: {e}"))?;
        let seed = mnemonic.to_seed("");

        let path: bip32::DerivationPath = DERIVATION_PATH
            .parse()
            .map_err(|e| anyhow!("invalid derivation path: {e}"))?;
        let signing_key = SigningKey::derive_from_path(&seed, &path)
            .map_err(|e| anyhow!("key derivation failed: {e}"))?;

        let public_key = signing_key.public_key();
        let address = public_key
            .account_id(prefix)
            .map_err(|e| anyhow!("address derivation failed: {e}"))?;

        info!(address = %address, "derived coordinator wallet");

        Ok(Self {
            signing_key,
            public_key,
            address,
        })
    }

    pub fn address(&self) -> &AccountId {
        &self.address
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}
