//! Passphrase encryption of result files.
//!
//! Layout of an encrypted file: `salt (16) || nonce (12) || ciphertext || tag (16)`.
//! The AES-256-GCM key is derived from the passphrase with scrypt
//! (N = 2^15, r = 8, p = 1).

use log::info;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use scrypt::Params;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils::error::AppResult;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Extension appended to encrypted files
pub const ENCRYPTED_EXTENSION: &str = "enc";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("ciphertext too short")]
    TooShort,

    #[error("random number generator failure")]
    Rng,

    #[error("key derivation failed")]
    Key,

    #[error("encryption failed")]
    Seal,

    #[error("decryption failed: wrong passphrase or corrupted data")]
    Open,
}

fn derive_key(passphrase: &str, salt: &[u8]) -> Result<LessSafeKey, CryptoError> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN).map_err(|_| CryptoError::Key)?;
    let mut key = [0u8; KEY_LEN];
    scrypt::scrypt(passphrase.as_bytes(), salt, &params, &mut key).map_err(|_| CryptoError::Key)?;
    let unbound = UnboundKey::new(&AES_256_GCM, &key).map_err(|_| CryptoError::Key)?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under a fresh random salt and nonce
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
    let rng = SystemRandom::new();

    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt).map_err(|_| CryptoError::Rng)?;
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill(&mut nonce).map_err(|_| CryptoError::Rng)?;

    let key = derive_key(passphrase, &salt)?;
    let mut sealed = plaintext.to_vec();
    key.seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut sealed)
        .map_err(|_| CryptoError::Seal)?;

    let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + sealed.len());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Reverse [`encrypt`]
pub fn decrypt(data: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
    if data.len() < SALT_LEN + NONCE_LEN {
        return Err(CryptoError::TooShort);
    }
    let (salt, rest) = data.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_key(passphrase, salt)?;
    let nonce = Nonce::try_assume_unique_for_key(nonce).map_err(|_| CryptoError::TooShort)?;
    let mut buffer = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(nonce, Aad::empty(), &mut buffer)
        .map_err(|_| CryptoError::Open)?;
    Ok(plaintext.to_vec())
}

/// Replace `path` with an encrypted `<path>.enc` and return the new path
pub fn encrypt_file(path: &Path, passphrase: &str) -> AppResult<PathBuf> {
    let plaintext = fs::read(path)?;
    let encrypted = encrypt(&plaintext, passphrase)?;

    let mut target = path.as_os_str().to_owned();
    target.push(".");
    target.push(ENCRYPTED_EXTENSION);
    let target = PathBuf::from(target);

    fs::write(&target, encrypted)?;
    fs::remove_file(path)?;
    info!("Encrypted {} -> {}", path.display(), target.display());
    Ok(target)
}

/// Decrypt `input` into `output`
pub fn decrypt_file(input: &Path, output: &Path, passphrase: &str) -> AppResult<()> {
    let data = fs::read(input)?;
    let plaintext = decrypt(&data, passphrase)?;
    fs::write(output, plaintext)?;
    info!("Decrypted {} -> {}", input.display(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrypt_recovers_plaintext() {
        let data = b"SrcIP,DstIP,Protocol\n10.0.0.1,10.0.0.2,TCP\n";
        let encrypted = encrypt(data, "hunter2").unwrap();

        assert_eq!(encrypted.len(), SALT_LEN + NONCE_LEN + data.len() + 16);
        assert_eq!(decrypt(&encrypted, "hunter2").unwrap(), data.to_vec());
    }

    #[test]
    fn test_decrypts_scrypt_aes_gcm_layout() {
        // salt 00..0f, nonce 64..6f, scrypt(N=2^15, r=8, p=1) key, AES-256-GCM
        let hex = "000102030405060708090a0b0c0d0e0f6465666768696a6b6c6d6e6f\
                   029797e4eebfee326ee681bc4208d33a710b13082ae6502af2e27a3a";
        let data: Vec<u8> = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
            .collect();

        assert_eq!(decrypt(&data, "packetsentry").unwrap(), b"Duration_ms\n".to_vec());
    }

    #[test]
    fn test_wrong_passphrase() {
        let encrypted = encrypt(b"flows", "right").unwrap();
        assert_eq!(decrypt(&encrypted, "wrong"), Err(CryptoError::Open));
    }

    #[test]
    fn test_too_short() {
        assert_eq!(decrypt(&[0u8; 10], "key"), Err(CryptoError::TooShort));
        assert_eq!(decrypt(&[0u8; SALT_LEN + NONCE_LEN], "key"), Err(CryptoError::Open));
    }

    #[test]
    fn test_fresh_salt_per_call() {
        let a = encrypt(b"same", "key").unwrap();
        let b = encrypt(b"same", "key").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_encrypt_file_replaces_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        fs::write(&path, "Duration_ms\n1.000\n").unwrap();

        let encrypted = encrypt_file(&path, "key").unwrap();
        assert_eq!(encrypted, dir.path().join("features.csv.enc"));
        assert!(!path.exists());

        let restored = dir.path().join("restored.csv");
        decrypt_file(&encrypted, &restored, "key").unwrap();
        assert_eq!(fs::read_to_string(restored).unwrap(), "Duration_ms\n1.000\n");
    }
}
