//! Wallet — the credential store for enrolled identities.
//!
//! Keyed by label, unique per store. When constructed with a directory,
//! every identity is written to its own `<label>.id` JSON file on `put`
//! and the full set is reloaded on open, so issued credentials survive
//! process restarts. `clear` wipes the store — the documented remedy
//! when the CA has been restarted and previously issued certificates
//! are no longer valid.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use convene_core::identity::{Identity, IdentityRole};

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("identity \"{0}\" already exists in the wallet")]
    DuplicateIdentity(String),
    #[error(
        "identity \"{0}\" not found in the wallet — re-run enrollment; \
         if the CA was restarted, clear the wallet first"
    )]
    IdentityNotFound(String),
    #[error("wallet I/O failed at {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("corrupt identity file {0}: {1}")]
    Corrupt(PathBuf, serde_json::Error),
}

/// On-disk form of an identity. Key material is hex-encoded; the file
/// itself is the secret, so the wallet directory should be private.
#[derive(Serialize, Deserialize)]
struct IdentityRecord {
    label: String,
    msp_id: String,
    role: IdentityRole,
    certificate: String,
    private_key: String,
}

impl IdentityRecord {
    fn from_identity(identity: &Identity) -> Self {
        Self {
            label: identity.label.clone(),
            msp_id: identity.msp_id.clone(),
            role: identity.role,
            certificate: hex::encode(&identity.certificate),
            private_key: hex::encode(identity.private_key()),
        }
    }

    fn into_identity(self, path: &PathBuf) -> Result<Identity, WalletError> {
        let certificate = hex::decode(&self.certificate)
            .map_err(|e| corrupt(path, &format!("certificate: {e}")))?;
        let private_key = hex::decode(&self.private_key)
            .map_err(|e| corrupt(path, &format!("private key: {e}")))?;
        Ok(Identity::new(
            self.label,
            Bytes::from(certificate),
            private_key,
            self.msp_id,
            self.role,
        ))
    }
}

fn corrupt(path: &PathBuf, msg: &str) -> WalletError {
    WalletError::Corrupt(
        path.clone(),
        serde_json::Error::io(std::io::Error::new(std::io::ErrorKind::InvalidData, msg)),
    )
}

/// Credential store: label → identity, optionally backed by a directory.
///
/// Safe under concurrent readers; writes to the same label are serialized
/// by the map's entry lock so a partially written identity is never
/// observable.
pub struct Wallet {
    identities: Arc<DashMap<String, Identity>>,
    persist_dir: Arc<Option<PathBuf>>,
}

impl Wallet {
    /// Purely in-memory wallet. Identities vanish with the process.
    pub fn in_memory() -> Self {
        Self {
            identities: Arc::new(DashMap::new()),
            persist_dir: Arc::new(None),
        }
    }

    /// Open a wallet backed by `dir`, creating it if missing and loading
    /// every `*.id` file found there.
    pub fn open(dir: PathBuf) -> Result<Self, WalletError> {
        std::fs::create_dir_all(&dir).map_err(|e| WalletError::Io(dir.clone(), e))?;
        let wallet = Self {
            identities: Arc::new(DashMap::new()),
            persist_dir: Arc::new(Some(dir.clone())),
        };

        let entries = std::fs::read_dir(&dir).map_err(|e| WalletError::Io(dir.clone(), e))?;
        let mut loaded = 0usize;
        for entry in entries {
            let entry = entry.map_err(|e| WalletError::Io(dir.clone(), e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("id") {
                continue;
            }
            let text =
                std::fs::read_to_string(&path).map_err(|e| WalletError::Io(path.clone(), e))?;
            let record: IdentityRecord =
                serde_json::from_str(&text).map_err(|e| WalletError::Corrupt(path.clone(), e))?;
            let identity = record.into_identity(&path)?;
            wallet.identities.insert(identity.label.clone(), identity);
            loaded += 1;
        }
        if loaded > 0 {
            tracing::info!(count = loaded, path = %dir.display(), "loaded wallet identities");
        }
        Ok(wallet)
    }

    /// Store an identity under its label.
    ///
    /// Fails with [`WalletError::DuplicateIdentity`] if the label is
    /// taken and `overwrite` is false. The durable write happens before
    /// the in-memory insert; on write failure nothing changes.
    pub fn put(&self, identity: Identity, overwrite: bool) -> Result<(), WalletError> {
        use dashmap::mapref::entry::Entry;

        let label = identity.label.clone();
        match self.identities.entry(label.clone()) {
            Entry::Occupied(mut slot) => {
                if !overwrite {
                    return Err(WalletError::DuplicateIdentity(label));
                }
                self.persist(&identity)?;
                slot.insert(identity);
            }
            Entry::Vacant(slot) => {
                self.persist(&identity)?;
                slot.insert(identity);
            }
        }
        tracing::info!(label = %label, "identity stored in wallet");
        Ok(())
    }

    /// Retrieve an identity by label.
    pub fn get(&self, label: &str) -> Result<Identity, WalletError> {
        self.identities
            .get(label)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| WalletError::IdentityNotFound(label.to_string()))
    }

    pub fn exists(&self, label: &str) -> bool {
        self.identities.contains_key(label)
    }

    /// Remove an identity. Returns whether it was present.
    pub fn remove(&self, label: &str) -> Result<bool, WalletError> {
        let removed = self.identities.remove(label).is_some();
        if removed {
            if let Some(dir) = self.persist_dir.as_ref() {
                let path = dir.join(format!("{label}.id"));
                match std::fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(WalletError::Io(path, e)),
                }
            }
        }
        Ok(removed)
    }

    /// Labels currently in the store, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut labels: Vec<String> =
            self.identities.iter().map(|e| e.key().clone()).collect();
        labels.sort();
        labels
    }

    /// Drop every identity, on disk included. The recovery path after a
    /// CA restart invalidates previously issued certificates.
    pub fn clear(&self) -> Result<(), WalletError> {
        let labels = self.list();
        for label in &labels {
            self.remove(label)?;
        }
        if !labels.is_empty() {
            tracing::warn!(count = labels.len(), "wallet cleared");
        }
        Ok(())
    }

    fn persist(&self, identity: &Identity) -> Result<(), WalletError> {
        let dir = match self.persist_dir.as_ref() {
            Some(d) => d,
            None => return Ok(()),
        };
        let path = dir.join(format!("{}.id", identity.label));
        let record = IdentityRecord::from_identity(identity);
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| WalletError::Corrupt(path.clone(), e))?;
        std::fs::write(&path, json).map_err(|e| WalletError::Io(path, e))
    }
}

impl Clone for Wallet {
    fn clone(&self) -> Self {
        Self {
            identities: self.identities.clone(),
            persist_dir: self.persist_dir.clone(),
        }
    }
}
