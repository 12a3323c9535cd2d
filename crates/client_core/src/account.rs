use std::fmt;

use anyhow::{anyhow, Result};
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use sha3::{Digest, Sha3_256};
use shared::{
    codec::{self, CodecError},
    domain::{AccountAddress, Ed25519PublicKey, Ed25519Signature},
    protocol::{AccountAuthenticator, RawTransaction, SignedMessage},
};
use zeroize::Zeroize;

/// Authentication-key scheme byte for single ed25519 keys.
const ED25519_SCHEME: u8 = 0x00;
const RAW_TRANSACTION_SALT: &[u8] = b"CEDRA::RawTransaction";
/// AIP-80 prefix for ed25519 private keys.
const ED25519_PRIVATE_KEY_PREFIX: &str = "ed25519-priv-";

/// An ed25519 keypair held in process memory together with its derived account address.
pub struct LocalAccount {
    signing_key: SigningKey,
    address: AccountAddress,
}

impl LocalAccount {
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    /// Accepts bare or `0x` hex, optionally behind the AIP-80 `ed25519-priv-` prefix.
    pub fn from_private_key_hex(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let trimmed = trimmed
            .strip_prefix(ED25519_PRIVATE_KEY_PREFIX)
            .unwrap_or(trimmed);
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let mut decoded =
            hex::decode(digits).map_err(|err| anyhow!("invalid private key hex: {err}"))?;
        if decoded.len() != 32 {
            let actual = decoded.len();
            decoded.zeroize();
            return Err(anyhow!(
                "invalid private key length: expected 32 bytes, got {actual}"
            ));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&decoded);
        decoded.zeroize();
        let account = Self::from_seed(&seed);
        seed.zeroize();
        Ok(account)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = Ed25519PublicKey(signing_key.verifying_key().to_bytes());
        Self {
            address: derive_address(&public_key),
            signing_key,
        }
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign_transaction(
        &self,
        transaction: &RawTransaction,
    ) -> Result<AccountAuthenticator, CodecError> {
        let signature = self.signing_key.sign(&signing_message(transaction)?);
        Ok(AccountAuthenticator::Ed25519 {
            public_key: self.public_key(),
            signature: Ed25519Signature(signature.to_bytes()),
        })
    }

    pub fn sign_message(&self, message: &str) -> SignedMessage {
        let signature = self.signing_key.sign(message.as_bytes());
        SignedMessage {
            message: message.to_string(),
            public_key: self.public_key(),
            signature: Ed25519Signature(signature.to_bytes()),
        }
    }
}

impl fmt::Debug for LocalAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalAccount")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// `sha3_256(public_key || scheme)`, the chain's rule for single-key accounts.
pub fn derive_address(public_key: &Ed25519PublicKey) -> AccountAddress {
    let mut hasher = Sha3_256::new();
    hasher.update(public_key.as_bytes());
    hasher.update([ED25519_SCHEME]);
    AccountAddress(hasher.finalize().into())
}

/// Bytes an account signs to approve `transaction`: a hashed domain separator followed by the
/// encoded transaction.
pub fn signing_message(transaction: &RawTransaction) -> Result<Vec<u8>, CodecError> {
    let mut message = Sha3_256::digest(RAW_TRANSACTION_SALT).to_vec();
    message.extend_from_slice(&codec::to_bytes(transaction)?);
    Ok(message)
}

#[cfg(test)]
#[path = "tests/account_tests.rs"]
mod tests;
