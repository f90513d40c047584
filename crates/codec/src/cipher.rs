//! AES-256-CBC encryption and decryption of individual string fields.
//!
//! The card field travels encrypted inside JSON and XML documents and in
//! the clear inside delimited text, so both directions run through here.
//!
//! # Token format
//!
//! ```text
//! <lowercase-hex IV>:<lowercase-hex ciphertext>
//! ```
//!
//! The token is opaque to every other module; nothing outside this file
//! splits it except on the `:` separator.
//!
//! # Known weakness — constant KDF salt
//!
//! The key is derived with scrypt over a **constant, hardcoded salt**, so
//! every invocation with the same passphrase derives the same key. This is
//! kept deliberately: tokens must interoperate bit-for-bit with documents
//! produced by the service this one replaces. Callers must not rely on
//! salt uniqueness for anything beyond passphrase secrecy. No
//! authentication tag is produced or checked either — tampering is not
//! detected, it merely garbles the plaintext.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use scrypt::Params;
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-CBC initialisation vector (one block).
pub const IV_LEN: usize = 16;

/// Constant scrypt salt — see the module docs before touching this.
const KDF_SALT: &[u8] = b"salt";

/// scrypt cost parameters matching the reference implementation
/// (N = 2^14, r = 8, p = 1).
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Errors produced by the field cipher.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The encrypted token has no `:` separator.
    #[error("encrypted token is missing the ':' separator")]
    MissingSeparator,

    /// The IV or ciphertext half of the token is not valid hex.
    #[error("encrypted token contains malformed hex")]
    MalformedHex,

    /// The decoded IV is not exactly [`IV_LEN`] bytes.
    #[error("invalid IV length: expected {IV_LEN} bytes, got {0}")]
    InvalidIvLength(usize),

    /// The decoded ciphertext is not a whole number of cipher blocks.
    #[error("ciphertext length {0} is not a multiple of the cipher block size")]
    InvalidCiphertextLength(usize),

    /// PKCS#7 unpadding failed — wrong passphrase or corrupted token.
    #[error("decryption failed: bad padding")]
    BadPadding,

    /// The decrypted bytes are not valid UTF-8.
    #[error("decrypted field is not valid UTF-8")]
    InvalidUtf8,

    /// scrypt rejected its parameters or output length.
    #[error("key derivation failed")]
    KeyDerivation,
}

/// Derive the fixed-length AES key from a caller-supplied passphrase.
fn derive_key(passphrase: &str) -> Result<[u8; KEY_LEN], CipherError> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
        .map_err(|_| CipherError::KeyDerivation)?;
    let mut key = [0u8; KEY_LEN];
    scrypt::scrypt(passphrase.as_bytes(), KDF_SALT, &params, &mut key)
        .map_err(|_| CipherError::KeyDerivation)?;
    Ok(key)
}

/// Encrypt a plaintext field, producing a self-contained `iv:ciphertext` token.
///
/// A fresh random IV is generated per call; an IV is never reused, so two
/// encryptions of the same plaintext under the same passphrase produce
/// different tokens.
///
/// # Errors
///
/// Returns [`CipherError::KeyDerivation`] if scrypt fails (unreachable with
/// the compiled-in parameters).
pub fn encrypt(plaintext: &str, passphrase: &str) -> Result<String, CipherError> {
    let key = derive_key(passphrase)?;

    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    Ok(format!("{}:{}", hex::encode(iv), hex::encode(ciphertext)))
}

/// Decrypt an `iv:ciphertext` token back to the plaintext field.
///
/// The token is split on the first `:`; the IV half is reconstructed and
/// the same key derived from `passphrase`.
///
/// # Errors
///
/// Returns a [`CipherError`] if the token has no separator, either half is
/// malformed hex, the IV or ciphertext length is invalid for the cipher's
/// block size, or unpadding fails (which is how a wrong passphrase usually
/// surfaces).
pub fn decrypt(token: &str, passphrase: &str) -> Result<String, CipherError> {
    let (iv_hex, cipher_hex) = token.split_once(':').ok_or(CipherError::MissingSeparator)?;

    let iv_bytes = hex::decode(iv_hex).map_err(|_| CipherError::MalformedHex)?;
    let iv: [u8; IV_LEN] = iv_bytes
        .try_into()
        .map_err(|bad: Vec<u8>| CipherError::InvalidIvLength(bad.len()))?;

    let ciphertext = hex::decode(cipher_hex).map_err(|_| CipherError::MalformedHex)?;
    if ciphertext.is_empty() || ciphertext.len() % IV_LEN != 0 {
        return Err(CipherError::InvalidCiphertextLength(ciphertext.len()));
    }

    let key = derive_key(passphrase)?;
    let plaintext = Aes256CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| CipherError::BadPadding)?;

    String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSPHRASE: &str = "mypassword123";

    #[test]
    fn encrypt_decrypt_round_trip() {
        let token = encrypt("1234", PASSPHRASE).unwrap();
        assert_eq!(decrypt(&token, PASSPHRASE).unwrap(), "1234");
    }

    #[test]
    fn round_trips_non_ascii() {
        let token = encrypt("tarjeta nº 4111-ñ", PASSPHRASE).unwrap();
        assert_eq!(decrypt(&token, PASSPHRASE).unwrap(), "tarjeta nº 4111-ñ");
    }

    #[test]
    fn token_shape_is_hex_colon_hex() {
        let token = encrypt("4111111111111111", PASSPHRASE).unwrap();
        let (iv, ct) = token.split_once(':').unwrap();
        assert_eq!(iv.len(), IV_LEN * 2);
        assert!(ct.len() >= IV_LEN * 2);
        assert!(iv.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(ct.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn fresh_iv_per_call() {
        let a = encrypt("1234", PASSPHRASE).unwrap();
        let b = encrypt("1234", PASSPHRASE).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_passphrase_never_recovers_plaintext() {
        let token = encrypt("1234", PASSPHRASE).unwrap();
        match decrypt(&token, "otherpassword") {
            Ok(garbled) => assert_ne!(garbled, "1234"),
            Err(_) => {}
        }
    }

    #[test]
    fn rejects_token_without_separator() {
        assert!(matches!(
            decrypt("deadbeef", PASSPHRASE),
            Err(CipherError::MissingSeparator)
        ));
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(matches!(
            decrypt("zzzz:deadbeef", PASSPHRASE),
            Err(CipherError::MalformedHex)
        ));
    }

    #[test]
    fn rejects_short_iv() {
        assert!(matches!(
            decrypt("deadbeef:00112233445566778899aabbccddeeff", PASSPHRASE),
            Err(CipherError::InvalidIvLength(4))
        ));
    }

    #[test]
    fn rejects_partial_block_ciphertext() {
        let token = format!("{}:{}", "00".repeat(IV_LEN), "aa".repeat(IV_LEN - 1));
        assert!(matches!(
            decrypt(&token, PASSPHRASE),
            Err(CipherError::InvalidCiphertextLength(15))
        ));
    }

    #[test]
    fn splits_on_first_separator_only() {
        // A plaintext containing ':' must survive the round trip; only the
        // first separator in the token is structural.
        let token = encrypt("a:b:c", PASSPHRASE).unwrap();
        assert_eq!(decrypt(&token, PASSPHRASE).unwrap(), "a:b:c");
    }
}
