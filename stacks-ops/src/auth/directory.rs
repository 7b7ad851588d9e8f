//! Staff directory lookups
//!
//! Signing in fills a user's name, contact details and supervisor from the
//! directory. The shipped source is a TOML file of entries:
//!
//! ```toml
//! [[users]]
//! username = "jdoe"
//! name = "Jane Doe"
//! email = "jdoe@library.test"
//! title = "Librarian"
//! phone = "602-555-0100"
//! supervisor = "asmith"
//! ```

use serde::Deserialize;
use stacks_common::db::User;
use stacks_common::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub trait DirectoryService: Send + Sync {
    /// Fill directory attributes into `user`, matched by username
    fn lookup_by_username(&self, user: User) -> User;
}

/// Directory that knows nobody; users keep whatever they already have
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDirectory;

impl DirectoryService for NullDirectory {
    fn lookup_by_username(&self, user: User) -> User {
        user
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryEntry {
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Supervisor's username
    #[serde(default)]
    pub supervisor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    users: Vec<DirectoryEntry>,
}

/// Directory entries loaded from a TOML file, keyed by lowercase username
#[derive(Debug, Clone, Default)]
pub struct TomlDirectory {
    entries: HashMap<String, DirectoryEntry>,
}

impl TomlDirectory {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: DirectoryFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid directory file: {}", e)))?;

        let entries = file
            .users
            .into_iter()
            .map(|entry| (entry.username.to_lowercase(), entry))
            .collect();

        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let directory = Self::from_toml_str(&content)?;
        info!(
            "Loaded {} directory entries from {}",
            directory.entries.len(),
            path.display()
        );
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DirectoryService for TomlDirectory {
    fn lookup_by_username(&self, mut user: User) -> User {
        let Some(username) = user.username.as_deref() else {
            return user;
        };

        let Some(entry) = self.entries.get(&username.to_lowercase()) else {
            debug!(username = %username, "No directory entry");
            return user;
        };

        user.name = entry.name.clone().or(user.name);
        user.email = entry.email.clone().or(user.email);
        user.title = entry.title.clone().or(user.title);
        user.phone = entry.phone.clone().or(user.phone);
        user.supervisor_username = entry.supervisor.clone();
        user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTORY: &str = r#"
        [[users]]
        username = "JDoe"
        name = "Jane Doe"
        email = "jdoe@library.test"
        supervisor = "boss"

        [[users]]
        username = "boss"
        name = "The Boss"
    "#;

    #[test]
    fn test_lookup_fills_known_user() {
        let directory = TomlDirectory::from_toml_str(DIRECTORY).unwrap();
        assert_eq!(directory.len(), 2);

        let user = User {
            username: Some("jdoe".to_string()),
            title: Some("Clerk".to_string()),
            ..Default::default()
        };
        let user = directory.lookup_by_username(user);

        assert_eq!(user.name.as_deref(), Some("Jane Doe"));
        assert_eq!(user.email.as_deref(), Some("jdoe@library.test"));
        assert_eq!(user.title.as_deref(), Some("Clerk"));
        assert_eq!(user.supervisor_username.as_deref(), Some("boss"));
    }

    #[test]
    fn test_unknown_user_is_unchanged() {
        let directory = TomlDirectory::from_toml_str(DIRECTORY).unwrap();
        let user = User {
            username: Some("stranger".to_string()),
            ..Default::default()
        };
        assert_eq!(directory.lookup_by_username(user.clone()), user);
        assert_eq!(NullDirectory.lookup_by_username(user.clone()), user);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let err = TomlDirectory::from_toml_str("users = 3").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
