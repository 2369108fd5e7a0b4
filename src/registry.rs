//! Registered Lightning Addresses
//!
//! The registry is loaded once at startup and never mutated afterwards.
//! On disk it is a directory holding two files per user:
//!
//! - `user/<name>`: `{"UserName", "MinAmtMsat", "MaxAmtMsat", "NodeType"}`
//! - `node/<name>`: connection parameters for that `NodeType`
//!
//! A broken record does not stop startup. The user stays registered as
//! corrupted, so requests get a stable error instead of "not registered".

use crate::backend::{create_backend, InvoiceBackend, NodeBackendConfig};
use crate::error::{ConfigError, LnurlError};
use crate::lnurl::{is_valid_username, PaymentAddress};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const USER_DIR: &str = "user";
const NODE_DIR: &str = "node";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UserRecord {
    user_name: String,
    max_amt_msat: u64,
    min_amt_msat: u64,
    node_type: String,
}

/// An address and the backend that issues its invoices.
pub struct Registration {
    address: PaymentAddress,
    backend: Result<Arc<dyn InvoiceBackend>, LnurlError>,
}

impl Registration {
    pub fn new(address: PaymentAddress, backend: Arc<dyn InvoiceBackend>) -> Self {
        Self {
            address,
            backend: Ok(backend),
        }
    }

    /// An address whose metadata is servable but whose backend failed to load.
    pub fn without_backend(address: PaymentAddress, error: LnurlError) -> Self {
        Self {
            address,
            backend: Err(error),
        }
    }

    pub fn address(&self) -> &PaymentAddress {
        &self.address
    }

    pub fn backend(&self) -> Result<&Arc<dyn InvoiceBackend>, LnurlError> {
        self.backend.as_ref().map_err(Clone::clone)
    }
}

enum Entry {
    Registered(Registration),
    Corrupted(ConfigError),
}

#[derive(Default)]
pub struct Registry {
    entries: HashMap<String, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: Registration) {
        let username = registration.address.username().to_string();
        self.entries.insert(username, Entry::Registered(registration));
    }

    pub fn mark_corrupted(&mut self, username: impl Into<String>, error: ConfigError) {
        self.entries.insert(username.into(), Entry::Corrupted(error));
    }

    pub fn lookup(&self, username: &str) -> Result<&Registration, LnurlError> {
        match self.entries.get(username) {
            Some(Entry::Registered(registration)) => Ok(registration),
            Some(Entry::Corrupted(error)) => Err(error.clone().into()),
            None => Err(ConfigError::UnregisteredUser(username.to_string()).into()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load every user under `dir` and build its backend with `client`.
    ///
    /// Fails only when the `user/` directory itself cannot be listed.
    pub fn load_dir(
        dir: &Path,
        domain: &str,
        client: &Client,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let user_dir = dir.join(USER_DIR);
        let entries = std::fs::read_dir(&user_dir).map_err(|e| {
            ConfigError::Registry(format!("Failed to read {}: {}", user_dir.display(), e))
        })?;

        let mut registry = Registry::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                ConfigError::Registry(format!("Failed to read {}: {}", user_dir.display(), e))
            })?;
            let file_name = entry.file_name();
            let Some(username) = file_name.to_str().filter(|name| is_valid_username(name)) else {
                warn!("Skipping registry entry with invalid username: {:?}", file_name);
                continue;
            };

            match load_user(dir, username, domain, client, timeout) {
                Ok(registration) => {
                    if let Err(e) = registration.backend() {
                        warn!("Backend for {} unavailable: {}", username, e);
                    }
                    registry.register(registration);
                }
                Err(e) => {
                    warn!("User record for {} is corrupted: {}", username, e);
                    registry.mark_corrupted(username, e);
                }
            }
        }

        info!("Loaded {} addresses from {}", registry.len(), dir.display());
        Ok(registry)
    }
}

fn load_user(
    dir: &Path,
    username: &str,
    domain: &str,
    client: &Client,
    timeout: Duration,
) -> Result<Registration, ConfigError> {
    let user_path = dir.join(USER_DIR).join(username);
    let bytes = std::fs::read(&user_path)
        .map_err(|e| ConfigError::CorruptedConfig(format!("{}: {}", user_path.display(), e)))?;
    let record: UserRecord = serde_json::from_slice(&bytes)
        .map_err(|e| ConfigError::CorruptedConfig(format!("{}: {}", user_path.display(), e)))?;
    if record.user_name != username {
        return Err(ConfigError::CorruptedConfig(format!(
            "{} names user {:?}",
            user_path.display(),
            record.user_name
        )));
    }

    let address = PaymentAddress::new(username, domain, record.min_amt_msat, record.max_amt_msat)?;

    let node_path = dir.join(NODE_DIR).join(username);
    let backend = std::fs::read(&node_path)
        .map_err(|e| {
            LnurlError::from(ConfigError::CorruptedConfig(format!("{}: {}", node_path.display(), e)))
        })
        .and_then(|payload| NodeBackendConfig::from_tagged(&record.node_type, &payload))
        .and_then(|config| create_backend(config, client, timeout).map_err(LnurlError::from));

    Ok(match backend {
        Ok(backend) => Registration::new(address, backend),
        Err(e) => Registration::without_backend(address, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NodeType;
    use crate::error::BackendError;
    use tempfile::TempDir;

    fn write(dir: &Path, sub: &str, name: &str, contents: &str) {
        std::fs::create_dir_all(dir.join(sub)).unwrap();
        std::fs::write(dir.join(sub).join(name), contents).unwrap();
    }

    fn user(name: &str, node_type: &str) -> String {
        format!(
            r#"{{"UserName": "{}", "MinAmtMsat": 10000, "MaxAmtMsat": 10000000000, "NodeType": "{}"}}"#,
            name, node_type
        )
    }

    fn load(dir: &TempDir) -> Registry {
        Registry::load_dir(dir.path(), "example.com", &Client::new(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn loads_registered_user_with_backend() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), USER_DIR, "alice", &user("alice", "LNBits"));
        write(
            dir.path(),
            NODE_DIR,
            "alice",
            r#"{"host": "https://lnbits.example.com", "key": "k"}"#,
        );

        let registry = load(&dir);
        let registration = registry.lookup("alice").unwrap();
        assert_eq!(registration.address().identifier(), "alice@example.com");
        assert_eq!(registration.address().min_amount_msat(), 10_000);
        assert_eq!(registration.backend().unwrap().node_type(), NodeType::LnBits);
    }

    #[test]
    fn unregistered_user() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(USER_DIR)).unwrap();
        let err = load(&dir).lookup("zed").err().unwrap();
        assert_eq!(err.reason(), "username is not registered");
    }

    #[test]
    fn corrupted_user_record_stays_registered_as_corrupted() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), USER_DIR, "bob", "{not json");
        write(dir.path(), USER_DIR, "eve", &user("mallory", "LND"));

        let registry = load(&dir);
        for name in ["bob", "eve"] {
            let err = registry.lookup(name).err().unwrap();
            assert!(matches!(err, LnurlError::Config(ConfigError::CorruptedConfig(_))));
            assert_eq!(err.reason(), "user details corrupted");
        }
    }

    #[test]
    fn broken_node_config_only_disables_backend() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), USER_DIR, "carol", &user("carol", "Phoenix"));
        write(dir.path(), NODE_DIR, "carol", "{}");
        write(dir.path(), USER_DIR, "dave", &user("dave", "LND"));

        let registry = load(&dir);

        let carol = registry.lookup("carol").unwrap();
        assert!(matches!(
            carol.backend().err().unwrap(),
            LnurlError::Backend(BackendError::UnknownNodeType(_))
        ));

        let dave = registry.lookup("dave").unwrap();
        assert_eq!(dave.address().username(), "dave");
        assert!(matches!(
            dave.backend().err().unwrap(),
            LnurlError::Config(ConfigError::CorruptedConfig(_))
        ));
    }

    #[test]
    fn invalid_file_names_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), USER_DIR, "Alice", &user("Alice", "LND"));
        assert!(load(&dir).is_empty());
    }

    #[test]
    fn missing_user_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Registry::load_dir(dir.path(), "example.com", &Client::new(), Duration::from_secs(5)),
            Err(ConfigError::Registry(_))
        ));
    }
}
