// --- File: crates/meetsync_scheduler/src/token.rs ---
//! Proposal token minting and signature checks.
//!
//! A token is `<43 chars url-safe base64 of 32 random bytes>.<16 hex chars>`,
//! the suffix being a truncated HMAC-SHA256 of the random part. Forged or
//! mistyped tokens are rejected without a store lookup.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as base64_engine, Engine as _};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;

use crate::error::MeetingError;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_BYTES: usize = 32;
const SIGNATURE_HEX_LEN: usize = 16;

pub struct TokenSigner {
    secret: Vec<u8>,
    rng: SystemRandom,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &str) -> Result<Self, MeetingError> {
        if secret.is_empty() {
            return Err(MeetingError::Validation(
                "proposals.token_secret must not be empty".to_string(),
            ));
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
            rng: SystemRandom::new(),
        })
    }

    /// A fresh token carrying 256 bits of entropy.
    pub fn mint(&self) -> Result<String, MeetingError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng.fill(&mut bytes).map_err(|_| {
            MeetingError::Validation("system random generator unavailable".to_string())
        })?;
        let body = base64_engine.encode(bytes);
        let signature = self.sign(&body)?;
        Ok(format!("{body}.{signature}"))
    }

    /// Whether `token` has the expected shape and a valid signature.
    pub fn verify(&self, token: &str) -> bool {
        let Some((body, signature)) = token.split_once('.') else {
            return false;
        };
        let decoded_ok = base64_engine
            .decode(body)
            .map(|b| b.len() == TOKEN_BYTES)
            .unwrap_or(false);
        if !decoded_ok || signature.len() != SIGNATURE_HEX_LEN {
            return false;
        }
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(body.as_bytes());
        mac.verify_truncated_left(&expected).is_ok()
    }

    fn sign(&self, body: &str) -> Result<String, MeetingError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| MeetingError::Validation(format!("invalid token secret: {e}")))?;
        mac.update(body.as_bytes());
        let digest = mac.finalize().into_bytes();
        Ok(hex::encode(&digest[..SIGNATURE_HEX_LEN / 2]))
    }
}
