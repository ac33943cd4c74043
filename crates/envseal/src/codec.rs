//! Fernet authenticated encryption
//!
//! Tokens follow the Fernet format so files written by other Fernet
//! implementations stay readable:
//!
//! | Offset | Size | Description |
//! |--------|------|-------------|
//! | 0      | 1    | Version (0x80) |
//! | 1      | 8    | Timestamp, seconds since the epoch, big endian |
//! | 9      | 16   | IV |
//! | 25     | n    | AES-128-CBC ciphertext, PKCS#7 padded |
//! | 25+n   | 32   | HMAC-SHA256 over everything before it |
//!
//! The whole token is base64url encoded. The master key is the base64url
//! encoding of 32 bytes: signing key first, encryption key second.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use thiserror::Error;
use tracing::trace;
use zeroize::Zeroizing;

use crate::keys::MasterKey;

const VERSION: u8 = 0x80;
const KEY_SIZE: usize = 16;
const IV_SIZE: usize = 16;
const BLOCK_SIZE: usize = 16;
const MAC_SIZE: usize = 32;
const TIMESTAMP_SIZE: usize = 8;
const HEADER_SIZE: usize = 1 + TIMESTAMP_SIZE + IV_SIZE;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The key does not decode to 32 bytes of base64url
    #[error("{0}")]
    InvalidKey(String),

    /// Wrong key, tampered or truncated token
    #[error("invalid token")]
    Decryption,
}

/// A Fernet cipher bound to one master key
pub struct Fernet {
    signer: HmacSha256,
    encryption_key: Zeroizing<[u8; KEY_SIZE]>,
}

impl Fernet {
    pub fn new(key: &MasterKey) -> Result<Self, CodecError> {
        let raw = Zeroizing::new(
            URL_SAFE
                .decode(key.as_bytes())
                .map_err(|_| CodecError::InvalidKey("key must be url-safe base64".to_string()))?,
        );
        if raw.len() != 2 * KEY_SIZE {
            return Err(CodecError::InvalidKey(format!(
                "key must decode to {} bytes, got {}",
                2 * KEY_SIZE,
                raw.len()
            )));
        }

        let signer = <HmacSha256 as Mac>::new_from_slice(&raw[..KEY_SIZE])
            .map_err(|e| CodecError::InvalidKey(e.to_string()))?;
        let mut encryption_key = Zeroizing::new([0u8; KEY_SIZE]);
        encryption_key.copy_from_slice(&raw[KEY_SIZE..]);

        Ok(Self {
            signer,
            encryption_key,
        })
    }

    /// Encrypt `plaintext` into a base64url token. A fresh IV is drawn for
    /// every call, so equal inputs never produce equal tokens.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut iv);
        let timestamp = chrono::Utc::now().timestamp().max(0) as u64;
        self.encrypt_with(plaintext, iv, timestamp)
    }

    fn encrypt_with(&self, plaintext: &[u8], iv: [u8; IV_SIZE], timestamp: u64) -> Vec<u8> {
        let ciphertext = Aes128CbcEnc::new(&(*self.encryption_key).into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut token = Vec::with_capacity(HEADER_SIZE + ciphertext.len() + MAC_SIZE);
        token.push(VERSION);
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(&iv);
        token.extend_from_slice(&ciphertext);

        let tag = self.mac(&token).finalize().into_bytes();
        token.extend_from_slice(&tag);

        trace!(plaintext_len = plaintext.len(), token_len = token.len(), "Encrypted payload");
        URL_SAFE.encode(&token).into_bytes()
    }

    /// Verify and decrypt a base64url token. Nothing is returned unless the
    /// HMAC checks out.
    pub fn decrypt(&self, token: &[u8]) -> Result<Vec<u8>, CodecError> {
        let data = URL_SAFE.decode(token).map_err(|_| CodecError::Decryption)?;

        if data.len() < HEADER_SIZE + BLOCK_SIZE + MAC_SIZE || data[0] != VERSION {
            trace!(token_len = data.len(), "Malformed token");
            return Err(CodecError::Decryption);
        }

        let (signed, tag) = data.split_at(data.len() - MAC_SIZE);
        self.mac(signed)
            .verify_slice(tag)
            .map_err(|_| CodecError::Decryption)?;

        let ciphertext = &signed[HEADER_SIZE..];
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CodecError::Decryption);
        }

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&signed[1 + TIMESTAMP_SIZE..HEADER_SIZE]);

        Aes128CbcDec::new(&(*self.encryption_key).into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CodecError::Decryption)
    }

    fn mac(&self, data: &[u8]) -> HmacSha256 {
        let mut mac = self.signer.clone();
        mac.update(data);
        mac
    }
}

/// Encrypt `plaintext` with `key`
pub fn encrypt(key: &MasterKey, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
    Ok(Fernet::new(key)?.encrypt(plaintext))
}

/// Decrypt a token produced by [`encrypt`]
pub fn decrypt(key: &MasterKey, token: &[u8]) -> Result<Vec<u8>, CodecError> {
    Fernet::new(key)?.decrypt(token)
}
