//! Response encryption using age
//!
//! Written reflections are sealed before they reach storage and revealed only
//! while a batch job or report needs the plaintext. The key lives in an
//! explicit cipher value that callers pass around; there is no process-wide
//! key.

use age::{Decryptor, Encryptor};
use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use std::io::{Read, Write};
use tracing::debug;

use crate::error::{DecryptionFailure, KttError, Result};

/// Turns plaintext responses into opaque blobs and back
pub trait ResponseCipher: Send + Sync {
    /// Encrypt a response text
    fn seal(&self, plaintext: &str) -> Result<Vec<u8>>;

    /// Decrypt a response text. Failures concern one record only.
    fn reveal(&self, ciphertext: &[u8]) -> std::result::Result<String, DecryptionFailure>;
}

/// age x25519 cipher bound to one identity
pub struct AgeCipher {
    identity: age::x25519::Identity,
    recipient: age::x25519::Recipient,
}

impl AgeCipher {
    /// Create a cipher with a freshly generated identity
    pub fn generate() -> Self {
        Self::from_identity(age::x25519::Identity::generate())
    }

    pub fn from_identity(identity: age::x25519::Identity) -> Self {
        let recipient = identity.to_public();
        Self {
            identity,
            recipient,
        }
    }

    /// Load an identity exported with [`AgeCipher::export_identity`]
    pub fn from_secret(secret: &SecretString) -> Result<Self> {
        let identity = secret
            .expose_secret()
            .trim()
            .parse::<age::x25519::Identity>()
            .map_err(|e| KttError::Encryption(format!("Failed to parse identity: {}", e)))?;
        Ok(Self::from_identity(identity))
    }

    /// The identity as an `AGE-SECRET-KEY-...` string
    pub fn export_identity(&self) -> SecretString {
        self.identity.to_string()
    }

    /// Public half, safe to log or display
    pub fn recipient(&self) -> String {
        self.recipient.to_string()
    }

    fn encrypt(&self, plaintext: &str) -> anyhow::Result<Vec<u8>> {
        let encryptor =
            Encryptor::with_recipients(std::iter::once(&self.recipient as &dyn age::Recipient))
                .context("Failed to create encryptor")?;

        let mut encrypted = vec![];
        let mut writer = encryptor
            .wrap_output(&mut encrypted)
            .context("Failed to wrap encryptor")?;
        writer
            .write_all(plaintext.as_bytes())
            .context("Failed to write encrypted data")?;
        writer.finish().context("Failed to finish encryption")?;

        Ok(encrypted)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> anyhow::Result<String> {
        let decryptor = Decryptor::new(ciphertext).context("Failed to create decryptor")?;

        let mut decrypted = vec![];
        let mut reader = decryptor
            .decrypt(std::iter::once(&self.identity as &dyn age::Identity))
            .context("Failed to decrypt (wrong key?)")?;
        reader
            .read_to_end(&mut decrypted)
            .context("Failed to read decrypted data")?;

        String::from_utf8(decrypted).context("Decrypted data is not valid UTF-8")
    }
}

impl ResponseCipher for AgeCipher {
    fn seal(&self, plaintext: &str) -> Result<Vec<u8>> {
        let sealed = self
            .encrypt(plaintext)
            .map_err(|e| KttError::Encryption(format!("{:#}", e)))?;
        debug!("Sealed response ({} bytes)", sealed.len());
        Ok(sealed)
    }

    fn reveal(&self, ciphertext: &[u8]) -> std::result::Result<String, DecryptionFailure> {
        self.decrypt(ciphertext)
            .map_err(|e| DecryptionFailure::new(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_and_reveal() {
        let cipher = AgeCipher::generate();
        let sealed = cipher.seal("The scene where the lights go out.").unwrap();

        assert!(!sealed.is_empty());
        assert_ne!(&sealed[..], "The scene where the lights go out.".as_bytes());
        assert_eq!(
            cipher.reveal(&sealed).unwrap(),
            "The scene where the lights go out."
        );
    }

    #[test]
    fn test_wrong_key_is_a_decryption_failure() {
        let sealed = AgeCipher::generate().seal("private").unwrap();
        let other = AgeCipher::generate();

        assert!(other.reveal(&sealed).is_err());
    }

    #[test]
    fn test_garbage_is_a_decryption_failure() {
        let cipher = AgeCipher::generate();
        let failure = cipher.reveal(b"not an age file").unwrap_err();
        assert!(failure.reason.contains("decryptor"));
    }

    #[test]
    fn test_identity_export_and_import() {
        let cipher = AgeCipher::generate();
        let sealed = cipher.seal("keep this").unwrap();

        let restored = AgeCipher::from_secret(&cipher.export_identity()).unwrap();
        assert_eq!(restored.recipient(), cipher.recipient());
        assert_eq!(restored.reveal(&sealed).unwrap(), "keep this");
    }

    #[test]
    fn test_invalid_identity_is_rejected() {
        let secret = SecretString::new("not-a-key".into());
        assert!(matches!(
            AgeCipher::from_secret(&secret),
            Err(KttError::Encryption(_))
        ));
    }
}
