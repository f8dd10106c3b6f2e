//! Password table

use std::collections::HashMap;

use rh_core::HubConfig;

/// Known SSH users and their passwords
#[derive(Debug, Default, Clone)]
pub struct UserTable {
    passwords: HashMap<String, String>,
}

impl UserTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the users declared in the configuration
    pub fn from_config(config: &HubConfig) -> Self {
        let mut table = Self::new();
        for (name, entry) in &config.users {
            table.insert(name.clone(), entry.password.clone());
        }
        table
    }

    /// Add or replace a user
    pub fn insert(&mut self, user: impl Into<String>, password: impl Into<String>) {
        self.passwords.insert(user.into(), password.into());
    }

    /// Whether `password` is the one declared for `user`
    ///
    /// Names and passwords are compared exactly.
    pub fn verify(&self, user: &str, password: &str) -> bool {
        self.passwords
            .get(user)
            .is_some_and(|expected| expected == password)
    }

    /// Number of users
    pub fn len(&self) -> usize {
        self.passwords.len()
    }

    /// Check if no users are declared
    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify() {
        let mut users = UserTable::new();
        users.insert("admin", "hunter2");

        assert!(users.verify("admin", "hunter2"));
        assert!(!users.verify("admin", "Hunter2"));
        assert!(!users.verify("Admin", "hunter2"));
        assert!(!users.verify("guest", "hunter2"));
        assert!(!users.verify("admin", ""));
    }

    #[test]
    fn test_from_config() {
        let mut config = HubConfig::default();
        config.add_user("alice", "a");
        config.add_user("bob", "b");

        let users = UserTable::from_config(&config);
        assert_eq!(users.len(), 2);
        assert!(users.verify("alice", "a"));
        assert!(users.verify("bob", "b"));
        assert!(!users.verify("alice", "b"));
    }

    #[test]
    fn test_empty_table_rejects_everyone() {
        let users = UserTable::new();
        assert!(users.is_empty());
        assert!(!users.verify("", ""));
    }
}
