//! Durable client registry.
//!
//! A JSON document keyed by client id (string form of the numeric platform
//! id), loaded once at startup and rewritten wholesale on every mutation.
//! Single running instance assumed; there is no file locking.

use std::{
    collections::BTreeMap,
    fs,
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use crate::{domain::ClientId, tagging, Result};

/// One client record. Field order matches the stored document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Display handle; empty when the client has none.
    pub username: String,
    pub name: String,
    pub code: String,
}

/// Profile fields captured from an inbound message. Only used when the
/// record does not exist yet.
#[derive(Clone, Debug)]
pub struct ClientProfile {
    pub username: Option<String>,
    pub name: String,
}

#[derive(Debug)]
pub struct ClientRegistry {
    path: PathBuf,
    clients: BTreeMap<String, ClientRecord>,
}

impl ClientRegistry {
    /// Read the full registry from `path`. A missing document yields an
    /// empty registry; a malformed one is a startup fault for the caller.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                clients: BTreeMap::new(),
            });
        }

        let txt = fs::read_to_string(&path)?;
        let clients = serde_json::from_str(&txt)?;
        Ok(Self { path, clients })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn get(&self, id: &ClientId) -> Option<&ClientRecord> {
        self.clients.get(&id.storage_key())
    }

    /// Return the existing record, or create one with the default code and
    /// persist immediately. Profile fields of an existing record are never
    /// touched.
    pub fn get_or_create(&mut self, id: &ClientId, profile: &ClientProfile) -> Result<ClientRecord> {
        let key = id.storage_key();
        if let Some(rec) = self.clients.get(&key) {
            return Ok(rec.clone());
        }

        let rec = ClientRecord {
            username: profile.username.clone().unwrap_or_default(),
            name: profile.name.clone(),
            code: tagging::DEFAULT_CODE.to_string(),
        };
        self.clients.insert(key, rec.clone());
        self.save()?;
        Ok(rec)
    }

    /// Overwrite the code verbatim (no format validation) and persist.
    /// Returns the updated record, or `None` for an unknown client.
    pub fn set_code(&mut self, id: &ClientId, code: &str) -> Result<Option<ClientRecord>> {
        let key = id.storage_key();
        let Some(rec) = self.clients.get_mut(&key) else {
            return Ok(None);
        };

        rec.code = code.to_string();
        let updated = rec.clone();
        self.save()?;
        Ok(Some(updated))
    }

    /// Rewrite the whole document, human-readable.
    pub fn save(&self) -> Result<()> {
        let txt = serde_json::to_string_pretty(&self.clients)?;
        fs::write(&self.path, txt)?;
        Ok(())
    }
}
