use aes_gcm::{
    aead::{Aead, OsRng},
    AeadCore, Aes256Gcm, Key, KeyInit, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

const VERSION_SIZE: usize = 1;
const GCM_NONCE_SIZE: usize = 12;
const GCM_TAG_SIZE: usize = 16;
const CURRENT_VERSION: u8 = 1;

/// Version byte, nonce, at least one ciphertext byte, and the auth tag.
const MIN_ENVELOPE_SIZE: usize = VERSION_SIZE + GCM_NONCE_SIZE + 1 + GCM_TAG_SIZE;

#[derive(Error, Debug)]
pub enum CryptoError {
    /// The envelope failed format checks before any decryption was attempted.
    #[error("the received cookie has an invalid format: {0}")]
    InvalidEnvelope(&'static str),
    /// Tag verification failed: wrong key, corrupted ciphertext, or a cookie
    /// issued under a rotated key. Callers treat this as "re-authenticate"
    /// rather than a hard error.
    #[error("cookie decryption failed")]
    DecryptionFailed,
    #[error("cookie encryption failed")]
    EncryptionFailed,
}

/// Encrypts a single cookie value into the transport envelope
/// `[version:1][nonce:12][ciphertext][tag:16]`, base64url encoded without
/// padding. A fresh random nonce is generated per call.
pub fn encrypt_cookie(encryption_key: &[u8; 32], plaintext: &str) -> Result<String, CryptoError> {
    let key = Key::<Aes256Gcm>::from_slice(encryption_key);
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let cipher = Aes256Gcm::new(key);

    // The aead ciphertext already carries the tag as its last 16 bytes
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut envelope = Vec::with_capacity(VERSION_SIZE + GCM_NONCE_SIZE + ciphertext.len());
    envelope.push(CURRENT_VERSION);
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);

    Ok(URL_SAFE_NO_PAD.encode(envelope))
}

/// Decrypts a cookie envelope produced by [`encrypt_cookie`], verifying the
/// authentication tag before any plaintext is returned.
pub fn decrypt_cookie(encryption_key: &[u8; 32], envelope: &str) -> Result<String, CryptoError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(envelope)
        .map_err(|_| CryptoError::InvalidEnvelope("not base64url"))?;

    if bytes.len() < MIN_ENVELOPE_SIZE {
        return Err(CryptoError::InvalidEnvelope("invalid length"));
    }
    if bytes[0] != CURRENT_VERSION {
        return Err(CryptoError::InvalidEnvelope("unsupported version"));
    }

    let nonce = Nonce::from_slice(&bytes[VERSION_SIZE..VERSION_SIZE + GCM_NONCE_SIZE]);
    let ciphertext = &bytes[VERSION_SIZE + GCM_NONCE_SIZE..];

    let key = Key::<Aes256Gcm>::from_slice(encryption_key);
    let cipher = Aes256Gcm::new(key);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
}
