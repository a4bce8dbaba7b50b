use std::collections::HashMap;
use std::sync::RwLock;

use super::IdentityStore;
use crate::cert::Certificate;
use crate::error::{IdentityKitError, Result};
use crate::identity::Identity;
use crate::key::{KeyAttributes, KeyType, PrivateKey, PublicKey};
use crate::matcher;

/// In-memory identity store.
///
/// Keys live only as long as the store does. It stands in for a platform
/// key store on hosts without one, and in tests.
#[derive(Default)]
pub struct MemoryIdentityStore {
    keys: RwLock<HashMap<String, PrivateKey>>,
    certificates: RwLock<Vec<(String, Certificate)>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a key created elsewhere under `tag`.
    ///
    /// Fails with [`IdentityKitError::StorageError`] if the tag is taken.
    pub fn import_key(&self, tag: &str, key: PrivateKey) -> Result<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| lock_error("write", "keys"))?;
        if keys.contains_key(tag) {
            return Err(IdentityKitError::StorageError(format!(
                "a key is already stored under tag {tag:?}"
            )));
        }
        log::info!("stored {}-bit key under tag {tag:?}", key.bits());
        keys.insert(tag.to_string(), key);
        Ok(())
    }

    /// Number of certificates stored under `label`.
    pub fn certificate_count(&self, label: &str) -> Result<usize> {
        let certificates = self
            .certificates
            .read()
            .map_err(|_| lock_error("read", "certificates"))?;
        Ok(certificates.iter().filter(|(l, _)| l == label).count())
    }

    fn private_key(&self, tag: &str) -> Result<Option<PrivateKey>> {
        let keys = self
            .keys
            .read()
            .map_err(|_| lock_error("read", "keys"))?;
        Ok(keys.get(tag).cloned())
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn store_certificate(&self, certificate: &Certificate, label: &str) -> Result<()> {
        let mut certificates = self
            .certificates
            .write()
            .map_err(|_| lock_error("write", "certificates"))?;
        if certificates
            .iter()
            .any(|(l, c)| l == label && c == certificate)
        {
            log::debug!("certificate already stored under label {label:?}");
            return Ok(());
        }
        certificates.push((label.to_string(), certificate.clone()));
        log::info!("stored certificate under label {label:?}");
        Ok(())
    }

    fn find_identity(&self, tag: &str) -> Result<Option<Identity>> {
        let Some(private_key) = self.private_key(tag)? else {
            return Ok(None);
        };
        let certificates = self
            .certificates
            .read()
            .map_err(|_| lock_error("read", "certificates"))?;
        for (label, certificate) in certificates.iter() {
            match matcher::matches(&private_key, certificate) {
                Ok(true) => {
                    return Ok(Some(Identity {
                        private_key,
                        certificate: certificate.clone(),
                    }));
                }
                Ok(false) => {}
                Err(e) => log::debug!("skipping certificate under label {label:?}: {e}"),
            }
        }
        log::debug!("no stored certificate matches the key under tag {tag:?}");
        Ok(None)
    }

    fn find_public_key(&self, tag: &str) -> Result<Option<PublicKey>> {
        Ok(self.private_key(tag)?.map(|key| key.public_key()))
    }

    fn generate_key(&self, attributes: &KeyAttributes) -> Result<PublicKey> {
        let taken = self
            .keys
            .read()
            .map_err(|_| lock_error("read", "keys"))?
            .contains_key(&attributes.tag);
        if attributes.permanent && taken {
            return Err(IdentityKitError::StorageError(format!(
                "a key is already stored under tag {:?}",
                attributes.tag
            )));
        }
        // The tag may be taken while the key is generated; import_key checks again.
        let private_key = match attributes.key_type {
            KeyType::Rsa => PrivateKey::generate_rsa(attributes.size)?,
        };
        let public_key = private_key.public_key();
        if attributes.permanent {
            self.import_key(&attributes.tag, private_key)?;
        } else {
            log::debug!(
                "generated ephemeral {}-bit key for tag {:?}",
                attributes.size,
                attributes.tag
            );
        }
        Ok(public_key)
    }

    fn delete_certificate(&self, label: &str) -> Result<()> {
        let mut certificates = self
            .certificates
            .write()
            .map_err(|_| lock_error("write", "certificates"))?;
        let before = certificates.len();
        certificates.retain(|(l, _)| l != label);
        let removed = before - certificates.len();
        if removed > 0 {
            log::info!("deleted {removed} certificate(s) under label {label:?}");
        }
        Ok(())
    }

    fn delete_key(&self, tag: &str) -> Result<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| lock_error("write", "keys"))?;
        if keys.remove(tag).is_some() {
            log::info!("deleted key under tag {tag:?}");
        }
        Ok(())
    }
}

fn lock_error(mode: &str, what: &str) -> IdentityKitError {
    IdentityKitError::StorageError(format!("failed to acquire {mode} lock on {what}"))
}
