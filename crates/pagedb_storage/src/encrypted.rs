//! Password-protected file store wrapper.
//!
//! ## Security Model
//!
//! - Every file is encrypted as a whole with AES-256-GCM
//! - File structure: `nonce (12 bytes) || ciphertext || tag (16 bytes)`
//! - A fresh random nonce is drawn for every write
//! - The key is derived from the password with HKDF-SHA256 and a random salt
//! - Keys are zeroized on drop
//!
//! The salt and an encrypted check token live in [`KEY_FILE`], which is
//! stored in plain form so the password can be verified before anything
//! else is decrypted.

use crate::error::{StorageError, StorageResult};
use crate::store::FileStore;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use parking_lot::RwLock;
use rand::RngCore;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;
/// Size of the password salt in bytes.
pub const SALT_SIZE: usize = 16;
/// Name of the plain file holding the salt and password check token.
pub const KEY_FILE: &str = "secure.key";

const KEY_INFO: &[u8] = b"pagedb-encryption-key-v1";
const CHECK_TOKEN: &[u8] = b"pagedb-key-check";

/// Encryption key for AES-256-GCM.
///
/// The key is automatically zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(StorageError::encryption(format!(
                "invalid key size: expected {KEY_SIZE}, got {}",
                bytes.len()
            )));
        }
        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Derives a key from a password using HKDF-SHA256.
    ///
    /// # Errors
    ///
    /// Returns an error if key expansion fails.
    pub fn derive_from_password(password: &[u8], salt: &[u8]) -> StorageResult<Self> {
        use hkdf::Hkdf;
        use sha2::Sha256;

        let hk = Hkdf::<Sha256>::new(Some(salt), password);
        let mut bytes = [0u8; KEY_SIZE];
        hk.expand(KEY_INFO, &mut bytes)
            .map_err(|_| StorageError::encryption("HKDF expand failed"))?;
        Ok(Self { bytes })
    }

    /// Returns the key as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

struct Cipher {
    aes: Aes256Gcm,
}

impl Cipher {
    fn new(key: &EncryptionKey) -> Self {
        let aes = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
        Self { aes }
    }

    fn encrypt(&self, plaintext: &[u8]) -> StorageResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let ciphertext = self
            .aes
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| StorageError::encryption("encryption error"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend(ciphertext);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8]) -> StorageResult<Vec<u8>> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(StorageError::encryption("ciphertext too short"));
        }
        let (nonce, body) = data.split_at(NONCE_SIZE);
        self.aes
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| StorageError::encryption("decryption error"))
    }
}

/// A file store that encrypts every file of an inner store.
///
/// The wrapper is transparent: while unsecured it passes bytes through
/// untouched, and once secured every read and write goes through AES-256-GCM.
///
/// # Example
///
/// ```rust
/// use pagedb_storage::{FileStore, InMemoryStore, SecureStore};
///
/// let store = SecureStore::open(InMemoryStore::new(), None).unwrap();
/// store.write("a.pg", b"secret").unwrap();
/// store.secure("hunter2").unwrap();
/// assert_eq!(store.read("a.pg").unwrap().unwrap(), b"secret");
/// assert_ne!(store.inner().read("a.pg").unwrap().unwrap(), b"secret");
/// ```
pub struct SecureStore<S: FileStore> {
    inner: S,
    cipher: RwLock<Option<Cipher>>,
}

impl<S: FileStore> SecureStore<S> {
    /// Wraps a store, unlocking it when it is already secured.
    ///
    /// A password given for a plain store secures it.
    ///
    /// # Errors
    ///
    /// Returns `PasswordRequired` when the store is secured and no password
    /// is given, and `InvalidPassword` when the password is wrong.
    pub fn open(inner: S, password: Option<&str>) -> StorageResult<Self> {
        let store = Self {
            inner,
            cipher: RwLock::new(None),
        };
        match (store.inner.read(KEY_FILE)?, password) {
            (Some(key_file), Some(password)) => {
                let cipher = unlock(&key_file, password)?;
                *store.cipher.write() = Some(cipher);
            }
            (Some(_), None) => return Err(StorageError::PasswordRequired),
            (None, Some(password)) => store.secure(password)?,
            (None, None) => {}
        }
        Ok(store)
    }

    /// Returns the wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns true if files are encrypted at rest.
    #[must_use]
    pub fn is_secured(&self) -> bool {
        self.cipher.read().is_some()
    }

    /// Encrypts every file under a key derived from `password`.
    ///
    /// # Errors
    ///
    /// Returns `AlreadySecured` if the store is already encrypted.
    pub fn secure(&self, password: &str) -> StorageResult<()> {
        let mut guard = self.cipher.write();
        if guard.is_some() {
            return Err(StorageError::AlreadySecured);
        }
        let (cipher, key_file) = new_key(password)?;
        self.rewrite(None, Some(&cipher))?;
        self.inner.write(KEY_FILE, &key_file)?;
        *guard = Some(cipher);
        debug!("store secured");
        Ok(())
    }

    /// Decrypts every file and removes the password.
    ///
    /// # Errors
    ///
    /// Returns `NotSecured` for a plain store and `InvalidPassword` when the
    /// password does not match.
    pub fn loose(&self, password: &str) -> StorageResult<()> {
        let mut guard = self.cipher.write();
        let current = self.verify((*guard).as_ref(), password)?;
        self.rewrite(Some(&current), None)?;
        self.inner.delete(KEY_FILE)?;
        *guard = None;
        debug!("store loosened");
        Ok(())
    }

    /// Re-encrypts every file under a new password.
    ///
    /// # Errors
    ///
    /// Returns `NotSecured` for a plain store and `InvalidPassword` when
    /// `old` does not match.
    pub fn change_password(&self, old: &str, new: &str) -> StorageResult<()> {
        let mut guard = self.cipher.write();
        let current = self.verify((*guard).as_ref(), old)?;
        let (cipher, key_file) = new_key(new)?;
        self.rewrite(Some(&current), Some(&cipher))?;
        self.inner.write(KEY_FILE, &key_file)?;
        *guard = Some(cipher);
        debug!("store password changed");
        Ok(())
    }

    fn verify(&self, active: Option<&Cipher>, password: &str) -> StorageResult<Cipher> {
        if active.is_none() {
            return Err(StorageError::NotSecured);
        }
        let key_file = self
            .inner
            .read(KEY_FILE)?
            .ok_or(StorageError::NotSecured)?;
        unlock(&key_file, password)
    }

    fn rewrite(&self, from: Option<&Cipher>, to: Option<&Cipher>) -> StorageResult<()> {
        for name in self.inner.list()? {
            if name == KEY_FILE {
                continue;
            }
            let Some(data) = self.inner.read(&name)? else {
                continue;
            };
            let plain = match from {
                Some(cipher) => cipher.decrypt(&data)?,
                None => data,
            };
            let stored = match to {
                Some(cipher) => cipher.encrypt(&plain)?,
                None => plain,
            };
            self.inner.write(&name, &stored)?;
        }
        Ok(())
    }
}

fn new_key(password: &str) -> StorageResult<(Cipher, Vec<u8>)> {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    let key = EncryptionKey::derive_from_password(password.as_bytes(), &salt)?;
    let cipher = Cipher::new(&key);

    let mut key_file = salt.to_vec();
    key_file.extend(cipher.encrypt(CHECK_TOKEN)?);
    Ok((cipher, key_file))
}

fn unlock(key_file: &[u8], password: &str) -> StorageResult<Cipher> {
    if key_file.len() < SALT_SIZE {
        return Err(StorageError::encryption("key file too short"));
    }
    let (salt, check) = key_file.split_at(SALT_SIZE);
    let key = EncryptionKey::derive_from_password(password.as_bytes(), salt)?;
    let cipher = Cipher::new(&key);
    match cipher.decrypt(check) {
        Ok(token) if token == CHECK_TOKEN => Ok(cipher),
        _ => Err(StorageError::InvalidPassword),
    }
}

impl<S: FileStore> FileStore for SecureStore<S> {
    fn read(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        let Some(data) = self.inner.read(name)? else {
            return Ok(None);
        };
        match self.cipher.read().as_ref() {
            Some(cipher) => cipher.decrypt(&data).map(Some),
            None => Ok(Some(data)),
        }
    }

    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        if name == KEY_FILE {
            return Err(StorageError::invalid_name(name));
        }
        match self.cipher.read().as_ref() {
            Some(cipher) => self.inner.write(name, &cipher.encrypt(data)?),
            None => self.inner.write(name, data),
        }
    }

    fn delete(&self, name: &str) -> StorageResult<bool> {
        self.inner.delete(name)
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        self.inner.exists(name)
    }

    fn size(&self, name: &str) -> StorageResult<Option<u64>> {
        self.inner.size(name)
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let mut names = self.inner.list()?;
        names.retain(|name| name != KEY_FILE);
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use std::sync::Arc;

    #[test]
    fn plain_store_passes_through() {
        let store = SecureStore::open(InMemoryStore::new(), None).unwrap();
        store.write("a.pg", b"plain").unwrap();
        assert!(!store.is_secured());
        assert_eq!(store.inner().read("a.pg").unwrap().unwrap(), b"plain");
    }

    #[test]
    fn secure_encrypts_existing_files() {
        let store = SecureStore::open(InMemoryStore::new(), None).unwrap();
        store.write("a.pg", b"secret rows").unwrap();
        store.secure("pw").unwrap();

        let raw = store.inner().read("a.pg").unwrap().unwrap();
        assert_eq!(raw.len(), b"secret rows".len() + NONCE_SIZE + TAG_SIZE);
        assert_eq!(store.read("a.pg").unwrap().unwrap(), b"secret rows");
        assert_eq!(store.list().unwrap(), vec!["a.pg"]);
    }

    #[test]
    fn reopen_requires_correct_password() {
        let inner = Arc::new(InMemoryStore::new());
        {
            let store = SecureStore::open(Arc::clone(&inner), Some("pw")).unwrap();
            store.write("a.pg", b"data").unwrap();
        }

        assert!(matches!(
            SecureStore::open(Arc::clone(&inner), None),
            Err(StorageError::PasswordRequired)
        ));
        assert!(matches!(
            SecureStore::open(Arc::clone(&inner), Some("wrong")),
            Err(StorageError::InvalidPassword)
        ));

        let store = SecureStore::open(inner, Some("pw")).unwrap();
        assert_eq!(store.read("a.pg").unwrap().unwrap(), b"data");
    }

    #[test]
    fn loose_restores_plain_files() {
        let store = SecureStore::open(InMemoryStore::new(), Some("pw")).unwrap();
        store.write("a.pg", b"data").unwrap();

        assert!(matches!(store.loose("bad"), Err(StorageError::InvalidPassword)));
        store.loose("pw").unwrap();

        assert!(!store.is_secured());
        assert!(!store.inner().exists(KEY_FILE).unwrap());
        assert_eq!(store.inner().read("a.pg").unwrap().unwrap(), b"data");
    }

    #[test]
    fn change_password_rekeys() {
        let inner = Arc::new(InMemoryStore::new());
        let store = SecureStore::open(Arc::clone(&inner), Some("old")).unwrap();
        store.write("a.pg", b"data").unwrap();
        store.change_password("old", "new").unwrap();
        drop(store);

        assert!(SecureStore::open(Arc::clone(&inner), Some("old")).is_err());
        let store = SecureStore::open(inner, Some("new")).unwrap();
        assert_eq!(store.read("a.pg").unwrap().unwrap(), b"data");
    }

    #[test]
    fn secure_twice_fails() {
        let store = SecureStore::open(InMemoryStore::new(), Some("pw")).unwrap();
        assert!(matches!(store.secure("pw"), Err(StorageError::AlreadySecured)));
    }

    #[test]
    fn derive_is_deterministic() {
        let a = EncryptionKey::derive_from_password(b"pw", b"salt").unwrap();
        let b = EncryptionKey::derive_from_password(b"pw", b"salt").unwrap();
        let c = EncryptionKey::derive_from_password(b"pw", b"other").unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }
}
