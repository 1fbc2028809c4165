/// Crypto
///
/// Logic to seal and open the `{data, hmac, iv}` envelopes carried in
/// relay publish frames. AES-256-CBC with PKCS#7 padding over the full
/// 32-byte session key, authenticated with HMAC-SHA256 over
/// `ciphertext || iv`.
///
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::constants::IV_LENGTH;
use crate::error::{Error, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// One encrypted message as it travels inside a relay frame payload.
/// All three fields are lowercase hex.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EncryptionEnvelope {
    pub data: String,
    pub hmac: String,
    pub iv: String,
}

impl EncryptionEnvelope {
    /// Seal `plaintext` with a fresh random IV.
    pub fn encrypt(plaintext: &[u8], key: &[u8; 32]) -> Result<EncryptionEnvelope> {
        let mut iv = [0u8; IV_LENGTH];
        OsRng.fill_bytes(&mut iv);

        let cipher = Aes256CbcEnc::new_from_slices(key, &iv)
            .map_err(|_| Error::DecryptionFailed)?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let hmac = compute_hmac(key, &ciphertext, &iv)?;

        Ok(EncryptionEnvelope {
            data: hex::encode(ciphertext),
            hmac: hex::encode(hmac),
            iv: hex::encode(iv),
        })
    }

    /// Verify the envelope MAC and decrypt. The MAC is checked before any
    /// AES work and compared in constant time; a mismatch means the relay
    /// delivered garbage or someone tampered with the message.
    pub fn decrypt(&self, key: &[u8; 32]) -> Result<Vec<u8>> {
        let ciphertext = hex::decode(&self.data)?;
        let iv = hex::decode(&self.iv)?;
        let tag = hex::decode(&self.hmac)?;

        let mut mac = HmacSha256::new_from_slice(key).map_err(|_| Error::Unknown)?;
        mac.update(&ciphertext);
        mac.update(&iv);
        mac.verify_slice(&tag).map_err(|_| Error::HmacMismatch)?;

        let cipher = Aes256CbcDec::new_from_slices(key, &iv)
            .map_err(|_| Error::DecryptionFailed)?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| Error::DecryptionFailed)
    }
}

fn compute_hmac(key: &[u8; 32], ciphertext: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| Error::Unknown)?;
    mac.update(ciphertext);
    mac.update(iv);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> [u8; 32] {
        let mut key = [0u8; 32];
        for (i, b) in key.iter_mut().enumerate() {
            *b = i as u8;
        }
        key
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = key();
        let plaintext = br#"{"id":42,"jsonrpc":"2.0","method":"wc_sessionRequest"}"#;

        let envelope = EncryptionEnvelope::encrypt(plaintext, &key).unwrap();
        assert_eq!(envelope.iv.len(), IV_LENGTH * 2);
        assert_eq!(envelope.hmac.len(), 64);
        // hex fields must be lowercase on the wire
        assert_eq!(envelope.data, envelope.data.to_lowercase());

        let opened = envelope.decrypt(&key).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_tampered_data_fails_hmac() {
        let key = key();
        let mut envelope = EncryptionEnvelope::encrypt(b"payload", &key).unwrap();

        let mut bytes = hex::decode(&envelope.data).unwrap();
        bytes[0] ^= 0x01;
        envelope.data = hex::encode(bytes);

        assert_eq!(envelope.decrypt(&key), Err(Error::HmacMismatch));
    }

    #[test]
    fn test_tampered_iv_fails_hmac() {
        let key = key();
        let mut envelope = EncryptionEnvelope::encrypt(b"payload", &key).unwrap();

        let mut iv = hex::decode(&envelope.iv).unwrap();
        iv[IV_LENGTH - 1] ^= 0x80;
        envelope.iv = hex::encode(iv);

        assert_eq!(envelope.decrypt(&key), Err(Error::HmacMismatch));
    }

    #[test]
    fn test_tampered_hmac_rejected() {
        let key = key();
        let mut envelope = EncryptionEnvelope::encrypt(b"payload", &key).unwrap();

        let mut tag = hex::decode(&envelope.hmac).unwrap();
        let last = tag.len() - 1;
        tag[last] ^= 0xff;
        envelope.hmac = hex::encode(tag);

        assert_eq!(envelope.decrypt(&key), Err(Error::HmacMismatch));
    }

    #[test]
    fn test_wrong_key_fails_hmac() {
        let envelope = EncryptionEnvelope::encrypt(b"payload", &key()).unwrap();
        let other = [0xaa; 32];
        assert_eq!(envelope.decrypt(&other), Err(Error::HmacMismatch));
    }

    #[test]
    fn test_envelope_json_shape() {
        let envelope = EncryptionEnvelope::encrypt(b"x", &key()).unwrap();
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json.get("data").is_some());
        assert!(json.get("hmac").is_some());
        assert!(json.get("iv").is_some());
        let back: EncryptionEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, envelope);
    }
}
