//! Local keystore for ML-KEM-512 keypairs
//!
//! A durable, process-local store keyed by researcher identifier. The
//! secret half never leaves this process; only the public half is ever
//! uploaded. Logout does not wipe the store: a lost keystore means
//! permanent loss of decrypt capability for shares addressed to that key,
//! so nothing here deletes entries.

use crate::Result;
use sealdrop_crypto::{KyberKeyPair, KyberPublicKey, KyberSecretKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// Capability to store and fetch an identity's keypair
pub trait Keystore: Send + Sync {
    /// Fetch the keypair for an identity, if one exists
    fn get(&self, identifier: &str) -> Result<Option<KyberKeyPair>>;

    /// Persist a keypair for an identity, overwriting any previous entry
    fn put(&self, identifier: &str, keypair: &KyberKeyPair) -> Result<()>;

    /// Whether a keypair exists for this identity
    fn has(&self, identifier: &str) -> Result<bool> {
        Ok(self.get(identifier)?.is_some())
    }

    /// Fetch the keypair, generating and persisting a fresh one if absent.
    /// Implementations serialize this per store so two callers cannot race
    /// two keypairs into the same identity.
    fn get_or_generate(&self, identifier: &str) -> Result<KyberKeyPair>;
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredKeyPair {
    researcher_id: String,
    public_key: String,
    secret_key: String,
}

fn encode_keypair(identifier: &str, keypair: &KyberKeyPair) -> StoredKeyPair {
    StoredKeyPair {
        researcher_id: identifier.to_string(),
        public_key: keypair.public_key().to_base64(),
        secret_key: keypair.secret_key().to_base64(),
    }
}

fn decode_keypair(stored: &StoredKeyPair) -> Result<KyberKeyPair> {
    let public = KyberPublicKey::from_base64(&stored.public_key)?;
    let secret = KyberSecretKey::from_base64(&stored.secret_key)?;
    Ok(KyberKeyPair::from_parts(public, secret))
}

/// File-backed keystore: one JSON document per identity under a directory.
///
/// Entry files are named by a hash of the identifier so arbitrary
/// identifier characters never reach the filesystem.
pub struct FileKeystore {
    dir: PathBuf,
    // Serializes check-then-generate so one identity gets one keypair
    lock: Mutex<()>,
}

impl FileKeystore {
    /// Open a keystore rooted at `dir`, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    fn entry_path(&self, identifier: &str) -> PathBuf {
        let digest = Sha256::digest(identifier.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(&digest[..16])))
    }

    fn read_entry(&self, identifier: &str) -> Result<Option<KyberKeyPair>> {
        let path = self.entry_path(identifier);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredKeyPair = serde_json::from_str(&json)?;
        Ok(Some(decode_keypair(&stored)?))
    }

    fn write_entry(&self, identifier: &str, keypair: &KyberKeyPair) -> Result<()> {
        let path = self.entry_path(identifier);
        let json = serde_json::to_string_pretty(&encode_keypair(identifier, keypair))?;

        // Write-then-rename so a crash never leaves a torn entry
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl Keystore for FileKeystore {
    fn get(&self, identifier: &str) -> Result<Option<KyberKeyPair>> {
        let _guard = self.lock.lock().expect("keystore lock poisoned");
        self.read_entry(identifier)
    }

    fn put(&self, identifier: &str, keypair: &KyberKeyPair) -> Result<()> {
        let _guard = self.lock.lock().expect("keystore lock poisoned");
        self.write_entry(identifier, keypair)
    }

    fn get_or_generate(&self, identifier: &str) -> Result<KyberKeyPair> {
        let _guard = self.lock.lock().expect("keystore lock poisoned");
        if let Some(existing) = self.read_entry(identifier)? {
            return Ok(existing);
        }
        let keypair = KyberKeyPair::generate()?;
        self.write_entry(identifier, &keypair)?;
        Ok(keypair)
    }
}

/// In-memory keystore for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryKeystore {
    entries: Mutex<HashMap<String, StoredKeyPair>>,
}

impl MemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Keystore for MemoryKeystore {
    fn get(&self, identifier: &str) -> Result<Option<KyberKeyPair>> {
        let entries = self.entries.lock().expect("keystore lock poisoned");
        entries.get(identifier).map(decode_keypair).transpose()
    }

    fn put(&self, identifier: &str, keypair: &KyberKeyPair) -> Result<()> {
        let mut entries = self.entries.lock().expect("keystore lock poisoned");
        entries.insert(identifier.to_string(), encode_keypair(identifier, keypair));
        Ok(())
    }

    fn get_or_generate(&self, identifier: &str) -> Result<KyberKeyPair> {
        let mut entries = self.entries.lock().expect("keystore lock poisoned");
        if let Some(stored) = entries.get(identifier) {
            return decode_keypair(stored);
        }
        let keypair = KyberKeyPair::generate()?;
        entries.insert(identifier.to_string(), encode_keypair(identifier, &keypair));
        Ok(keypair)
    }
}
