//! Stored-credential cipher.
//!
//! Device passwords in the configuration file may be kept encrypted under a
//! master password. The format is AES in ECB mode, base64 encoded:
//!
//! - the master password is padded with `{` to the next multiple of 16
//!   bytes (always at least one `{`), giving a 16 or 32 byte key
//! - the plaintext is padded the same way before encryption
//! - decryption strips trailing `{`, so plaintexts ending in `{` do not
//!   survive a round trip
//!
//! Being ECB, equal plaintext blocks encrypt to equal ciphertext blocks.

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256, Block};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Result, SecretError};

const BLOCK: usize = 16;
const PAD: u8 = b'{';

enum Key {
    Aes128(Aes128),
    Aes256(Aes256),
}

/// Cipher for stored credentials.
pub struct SecretCipher {
    key: Key,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

fn pad(data: &[u8]) -> Vec<u8> {
    let mut padded = data.to_vec();
    padded.resize(data.len() + (BLOCK - data.len() % BLOCK), PAD);
    padded
}

impl SecretCipher {
    /// Derive the cipher from the master password.
    ///
    /// Fails with [`SecretError::InvalidKey`] for passwords of 32 bytes or
    /// more.
    pub fn new(password: &str) -> Result<Self> {
        let key = pad(password.as_bytes());
        let key = match key.len() {
            16 => Key::Aes128(
                Aes128::new_from_slice(&key).map_err(|_| SecretError::InvalidKey(16))?,
            ),
            32 => Key::Aes256(
                Aes256::new_from_slice(&key).map_err(|_| SecretError::InvalidKey(32))?,
            ),
            len => return Err(SecretError::InvalidKey(len).into()),
        };
        Ok(Self { key })
    }

    /// Encrypt `plaintext` into base64 ciphertext.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut data = pad(plaintext.as_bytes());
        for chunk in data.chunks_exact_mut(BLOCK) {
            let block = Block::from_mut_slice(chunk);
            match &self.key {
                Key::Aes128(cipher) => cipher.encrypt_block(block),
                Key::Aes256(cipher) => cipher.encrypt_block(block),
            }
        }
        STANDARD.encode(data)
    }

    /// Decrypt base64 `ciphertext`.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let mut data = STANDARD
            .decode(ciphertext.trim())
            .map_err(SecretError::from)?;
        if data.is_empty() || data.len() % BLOCK != 0 {
            return Err(SecretError::InvalidLength {
                len: data.len(),
                block: BLOCK,
            }
            .into());
        }

        for chunk in data.chunks_exact_mut(BLOCK) {
            let block = Block::from_mut_slice(chunk);
            match &self.key {
                Key::Aes128(cipher) => cipher.decrypt_block(block),
                Key::Aes256(cipher) => cipher.decrypt_block(block),
            }
        }

        let end = data.iter().rposition(|&b| b != PAD).map_or(0, |i| i + 1);
        data.truncate(end);
        String::from_utf8(data).map_err(|_| SecretError::NotUtf8.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_round_trip_short_and_long_keys() {
        for password in ["master", "a-sixteen-byte-k", "a much longer master password"] {
            let cipher = SecretCipher::new(password).unwrap();
            let encrypted = cipher.encrypt("sw1-login-pw");
            assert_ne!(encrypted, "sw1-login-pw");
            assert_eq!(cipher.decrypt(&encrypted).unwrap(), "sw1-login-pw");
        }
    }

    #[test]
    fn test_padding_always_adds_a_block_edge() {
        // 16 bytes of plaintext pad to 32.
        let cipher = SecretCipher::new("master").unwrap();
        let encrypted = cipher.encrypt("0123456789abcdef");
        assert_eq!(STANDARD.decode(encrypted).unwrap().len(), 32);
    }

    #[test]
    fn test_key_too_long() {
        let err = SecretCipher::new(&"k".repeat(32)).unwrap_err();
        assert!(matches!(err, Error::Secret(SecretError::InvalidKey(48))));
    }

    #[test]
    fn test_invalid_length() {
        let cipher = SecretCipher::new("master").unwrap();
        let err = cipher.decrypt(&STANDARD.encode([0u8; 10])).unwrap_err();
        assert!(matches!(
            err,
            Error::Secret(SecretError::InvalidLength { len: 10, block: 16 })
        ));
    }

    #[test]
    fn test_not_base64() {
        let cipher = SecretCipher::new("master").unwrap();
        assert!(matches!(
            cipher.decrypt("not base64!").unwrap_err(),
            Error::Secret(SecretError::Encoding(_))
        ));
    }

    #[test]
    fn test_trailing_pad_is_stripped() {
        let cipher = SecretCipher::new("master").unwrap();
        let encrypted = cipher.encrypt("pw{");
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "pw");
    }
}
