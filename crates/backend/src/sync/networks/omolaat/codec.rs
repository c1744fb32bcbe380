use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use contracts::sync::SyncError;
use sha2::{Digest, Sha256};

/// Envelope codec for networks that wrap search payloads in an opaque
/// encrypted blob. Kept behind a trait so clients and tests never deal
/// with cipher details.
pub trait PayloadCodec: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, SyncError>;
    fn decrypt(&self, payload: &str) -> Result<String, SyncError>;
}

/// AES-256-GCM with the key derived from the network's shared secret.
/// Wire form is base64(nonce || ciphertext), nonce first.
pub struct AesGcmCodec {
    key: [u8; 32],
}

impl AesGcmCodec {
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut key = [0u8; 32];
        key.copy_from_slice(&Sha256::digest(passphrase.as_bytes()));
        Self { key }
    }
}

impl PayloadCodec for AesGcmCodec {
    fn encrypt(&self, plaintext: &str) -> Result<String, SyncError> {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| SyncError::DecryptionFailed(format!("encrypt: {}", e)))?;

        let mut wire = nonce_bytes.to_vec();
        wire.extend(ciphertext);
        Ok(BASE64.encode(wire))
    }

    fn decrypt(&self, payload: &str) -> Result<String, SyncError> {
        let wire = BASE64
            .decode(payload.trim())
            .map_err(|e| SyncError::DecryptionFailed(format!("base64: {}", e)))?;
        if wire.len() < 12 {
            return Err(SyncError::DecryptionFailed("payload too short".into()));
        }

        let (nonce_bytes, ciphertext) = wire.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);
        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| SyncError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| SyncError::DecryptionFailed(format!("utf8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips() {
        let codec = AesGcmCodec::from_passphrase("network-secret");
        let wire = codec.encrypt(r#"{"responses":[]}"#).unwrap();
        assert_eq!(codec.decrypt(&wire).unwrap(), r#"{"responses":[]}"#);
    }

    #[test]
    fn wrong_key_fails_as_decrypt_error() {
        let wire = AesGcmCodec::from_passphrase("right-key")
            .encrypt("payload")
            .unwrap();
        let err = AesGcmCodec::from_passphrase("wrong-key")
            .decrypt(&wire)
            .unwrap_err();
        assert_eq!(err.code(), "decrypt_failed");
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let codec = AesGcmCodec::from_passphrase("network-secret");
        let wire = codec.encrypt("payload").unwrap();
        let mut bytes = BASE64.decode(&wire).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = BASE64.encode(bytes);
        assert!(codec.decrypt(&tampered).is_err());
    }

    #[test]
    fn garbage_payload_is_rejected() {
        let codec = AesGcmCodec::from_passphrase("network-secret");
        assert!(codec.decrypt("not base64 at all!!!").is_err());
        assert!(codec.decrypt(&BASE64.encode(b"short")).is_err());
    }
}
