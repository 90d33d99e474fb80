//! Encrypted session tokens and signed OAuth state.
//!
//! Token format: base64url(nonce_12bytes || ciphertext || tag_16bytes) over the
//! JSON-encoded credentials. State format: `nonce.signature`, both base64url,
//! signature = HMAC-SHA256(nonce).

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::constant_time_compare;
use crate::google::GoogleCredentials;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const STATE_NONCE_LEN: usize = 24;

type HmacSha256 = Hmac<Sha256>;

/// Seals credentials into opaque tokens and signs OAuth state values.
#[derive(Clone)]
pub struct SessionCipher {
    enc_key: [u8; 32],
    mac_key: [u8; 32],
}

impl SessionCipher {
    /// Derive keys from a configured secret.
    pub fn from_secret(secret: &str) -> Self {
        Self::from_key_material(secret.as_bytes())
    }

    /// Keys that only live as long as this process.
    pub fn random() -> Self {
        let mut material = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut material);
        Self::from_key_material(&material)
    }

    fn from_key_material(material: &[u8]) -> Self {
        let derive = |label: &[u8]| -> [u8; 32] {
            let mut hasher = Sha256::new();
            hasher.update(label);
            hasher.update(material);
            hasher.finalize().into()
        };
        Self {
            enc_key: derive(b"tu-session-token:"),
            mac_key: derive(b"tu-oauth-state:"),
        }
    }

    /// Encrypt credentials into a session token.
    pub fn seal(&self, credentials: &GoogleCredentials) -> Result<String, &'static str> {
        let plaintext = serde_json::to_vec(credentials).map_err(|_| "Credential encoding failed")?;
        let cipher = Aes256Gcm::new_from_slice(&self.enc_key).map_err(|_| "Invalid key")?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|_| "Encryption failed")?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Decrypt a session token. Any malformed, foreign or tampered token yields `None`.
    pub fn open(&self, token: &str) -> Option<GoogleCredentials> {
        let data = URL_SAFE_NO_PAD.decode(token.trim()).ok()?;
        if data.len() < NONCE_LEN + TAG_LEN {
            return None;
        }

        let cipher = Aes256Gcm::new_from_slice(&self.enc_key).ok()?;
        let nonce = Nonce::from_slice(&data[..NONCE_LEN]);
        let plaintext = cipher.decrypt(nonce, &data[NONCE_LEN..]).ok()?;

        serde_json::from_slice(&plaintext).ok()
    }

    /// Fresh signed state for an authorization request.
    pub fn issue_state(&self) -> Result<String, &'static str> {
        let mut nonce = [0u8; STATE_NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let nonce = URL_SAFE_NO_PAD.encode(nonce);
        let signature = self.sign(&nonce)?;
        Ok(format!("{nonce}.{signature}"))
    }

    /// Check that `state` was issued by this cipher.
    pub fn verify_state(&self, state: &str) -> bool {
        let Some((nonce, signature)) = state.split_once('.') else {
            return false;
        };
        match self.sign(nonce) {
            Ok(expected) => constant_time_compare(signature, &expected),
            Err(_) => false,
        }
    }

    fn sign(&self, nonce: &str) -> Result<String, &'static str> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.mac_key).map_err(|_| "HMAC key error")?;
        mac.update(nonce.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}
