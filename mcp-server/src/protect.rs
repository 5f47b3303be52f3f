//! Credential protection: machine-scoped reversible encryption of secrets at rest
//!
//! Protected values are base64 of `nonce (12) || ciphertext || tag (16)`,
//! encrypted with AES-256-GCM under a key derived from the machine identity.
//! A value protected on one machine cannot be unprotected on another.
//!
//! Both directions fail open: `protect` returns the plaintext when no key is
//! available, and `unprotect` returns its input unchanged when decoding or
//! authentication fails, so a foreign or already-plain password never blocks
//! startup.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

/// Length of the AES-256 key in bytes.
pub const KEY_LENGTH: usize = 32;

const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// Mixed into the key derivation so the machine id alone is not the key.
const KEY_DOMAIN: &[u8] = b"netwrix-auditor-mcp/credential-protector/v1";

const MACHINE_ID_FILES: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];
const MACHINE_NAME_VARS: &[&str] = &["COMPUTERNAME", "HOSTNAME"];

#[derive(Debug, Error)]
pub enum ProtectError {
    #[error("machine identity is unavailable; cannot derive protection key")]
    MachineIdentityUnavailable,

    #[error("invalid base64: {0}")]
    InvalidEncoding(String),

    #[error("protected value too short")]
    TooShort,

    #[error("encryption failed")]
    Encryption,

    #[error("authentication failed (value was protected on another machine or is corrupt)")]
    Authentication,

    #[error("invalid UTF-8 in unprotected value")]
    InvalidUtf8,
}

#[derive(Clone)]
pub struct CredentialProtector {
    cipher: Option<Aes256Gcm>,
}

impl CredentialProtector {
    /// Protector keyed to this machine's identity.
    pub fn machine_scoped() -> Self {
        match machine_identity() {
            Some(identity) => Self::with_key(derive_key(&identity)),
            None => {
                warn!("No machine identity found; credential protection is disabled");
                Self { cipher: None }
            }
        }
    }

    pub fn with_key(key: [u8; KEY_LENGTH]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&key);
        Self {
            cipher: Some(Aes256Gcm::new(key)),
        }
    }

    /// Protect `plaintext`, returning it unchanged if it is empty or if
    /// protection is not possible on this machine.
    pub fn protect(&self, plaintext: &str) -> String {
        if plaintext.is_empty() {
            return String::new();
        }
        match self.try_protect(plaintext) {
            Ok(protected) => protected,
            Err(e) => {
                warn!(error = %e, "Failed to protect value, storing it unprotected");
                plaintext.to_string()
            }
        }
    }

    /// Reverse `protect`. Any failure is logged and the input is returned
    /// unchanged, treating it as plaintext.
    pub fn unprotect(&self, protected: &str) -> String {
        if protected.is_empty() {
            return String::new();
        }
        match self.try_unprotect(protected) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!(
                    error = %e,
                    fail_open = true,
                    "Failed to unprotect password, assuming it's not protected"
                );
                protected.to_string()
            }
        }
    }

    pub fn try_protect(&self, plaintext: &str) -> Result<String, ProtectError> {
        let cipher = self
            .cipher
            .as_ref()
            .ok_or(ProtectError::MachineIdentityUnavailable)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| ProtectError::Encryption)?;

        let mut combined = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(combined))
    }

    pub fn try_unprotect(&self, protected: &str) -> Result<String, ProtectError> {
        let cipher = self
            .cipher
            .as_ref()
            .ok_or(ProtectError::MachineIdentityUnavailable)?;
        let combined = STANDARD
            .decode(protected.trim())
            .map_err(|e| ProtectError::InvalidEncoding(e.to_string()))?;
        if combined.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(ProtectError::TooShort);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LENGTH);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| ProtectError::Authentication)?;
        String::from_utf8(plaintext).map_err(|_| ProtectError::InvalidUtf8)
    }
}

impl std::fmt::Debug for CredentialProtector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProtector")
            .field("cipher", &"[REDACTED]")
            .field("enabled", &self.cipher.is_some())
            .finish()
    }
}

fn derive_key(identity: &str) -> [u8; KEY_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(KEY_DOMAIN);
    hasher.update(identity.as_bytes());
    hasher.finalize().into()
}

/// Stable identifier of the local machine, shared by every user on it.
fn machine_identity() -> Option<String> {
    for path in MACHINE_ID_FILES {
        if let Ok(content) = std::fs::read_to_string(path) {
            let id = content.trim();
            if !id.is_empty() {
                debug!("Using machine identity from {path}");
                return Some(id.to_string());
            }
        }
    }
    MACHINE_NAME_VARS.iter().find_map(|var| {
        std::env::var(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protector() -> CredentialProtector {
        CredentialProtector::with_key(derive_key("test-machine"))
    }

    #[test]
    fn test_roundtrip() {
        let p = protector();
        for secret in ["hunter2", "pässwörd with spaces", "a", "{\"json\":true}"] {
            let protected = p.protect(secret);
            assert_ne!(protected, secret);
            assert_eq!(p.unprotect(&protected), secret);
        }
    }

    #[test]
    fn test_empty_passthrough() {
        let p = protector();
        assert_eq!(p.protect(""), "");
        assert_eq!(p.unprotect(""), "");
    }

    #[test]
    fn test_nonce_makes_output_unique() {
        let p = protector();
        assert_ne!(p.protect("same"), p.protect("same"));
    }

    #[test]
    fn test_unprotect_garbage_returns_input() {
        let p = protector();
        assert_eq!(p.unprotect("not base64 at all!"), "not base64 at all!");
        assert_eq!(p.unprotect("c2hvcnQ="), "c2hvcnQ=");
    }

    #[test]
    fn test_try_unprotect_reports_reason() {
        let p = protector();
        assert!(matches!(
            p.try_unprotect("%%%"),
            Err(ProtectError::InvalidEncoding(_))
        ));
        assert!(matches!(p.try_unprotect("c2hvcnQ="), Err(ProtectError::TooShort)));
    }

    #[test]
    fn test_other_machine_fails_open() {
        let protected = protector().protect("secret");
        let other = CredentialProtector::with_key(derive_key("another-machine"));
        assert!(matches!(
            other.try_unprotect(&protected),
            Err(ProtectError::Authentication)
        ));
        assert_eq!(other.unprotect(&protected), protected);
    }

    #[test]
    fn test_disabled_protector_is_identity() {
        let p = CredentialProtector { cipher: None };
        assert_eq!(p.protect("plain"), "plain");
        assert_eq!(p.unprotect("plain"), "plain");
    }

    #[test]
    fn test_debug_redacts_key() {
        let out = format!("{:?}", protector());
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn test_derive_key_is_deterministic() {
        assert_eq!(derive_key("m1"), derive_key("m1"));
        assert_ne!(derive_key("m1"), derive_key("m2"));
    }
}
