//! Fixture data model persisted in `test-data.json`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier substrings marking a record as ephemeral
pub const EPHEMERAL_MARKERS: [&str; 2] = ["temp_", "temp-"];

/// True when an identifier carries an ephemeral marker
pub fn is_ephemeral(id: &str) -> bool {
    EPHEMERAL_MARKERS.iter().any(|marker| id.contains(marker))
}

/// Fixture identity usable for login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestUser {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Lookup tag (`admin`, `user`, `tempuser`), not an enforced enum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

/// Remote host fixture, one per worker IP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMachine {
    pub name: String,
    pub ip: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datastore: Option<String>,
}

/// Repository fixture owned by exactly one machine (by name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRepository {
    pub name: String,
    pub machine: String,
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// User created during a run; survives across test files via the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub activated: bool,
}

/// Aggregate root persisted as the single source of truth
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestData {
    #[serde(default)]
    pub users: Vec<TestUser>,
    #[serde(default)]
    pub machines: Vec<TestMachine>,
    #[serde(default)]
    pub repositories: Vec<TestRepository>,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub created_users: Vec<CreatedUser>,
}

/// Counts of records removed by [`TestData::remove_ephemeral`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub users: usize,
    pub machines: usize,
    pub repositories: usize,
    pub created_users: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.users + self.machines + self.repositories + self.created_users
    }
}

impl TestData {
    /// Drop every ephemeral user/machine/repository and clear `created_users`
    pub fn remove_ephemeral(&mut self) -> CleanupReport {
        let before = (
            self.users.len(),
            self.machines.len(),
            self.repositories.len(),
        );

        self.users.retain(|u| !is_ephemeral(&u.email));
        self.machines.retain(|m| !is_ephemeral(&m.name));
        self.repositories.retain(|r| !is_ephemeral(&r.name));

        let report = CleanupReport {
            users: before.0 - self.users.len(),
            machines: before.1 - self.machines.len(),
            repositories: before.2 - self.repositories.len(),
            created_users: self.created_users.len(),
        };
        self.created_users.clear();
        report
    }

    /// Insert or refresh a created user, keyed by email
    pub fn upsert_created_user(&mut self, email: &str, password: &str, activated: bool) {
        let record = CreatedUser {
            email: email.to_string(),
            password: password.to_string(),
            created_at: Utc::now(),
            activated,
        };

        match self.created_users.iter_mut().find(|u| u.email == email) {
            Some(existing) => *existing = record,
            None => self.created_users.push(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(name: &str) -> TestMachine {
        TestMachine {
            name: name.to_string(),
            ip: "10.0.0.1".to_string(),
            user: "runner".to_string(),
            password: String::new(),
            team: "Private Team".to_string(),
            datastore: None,
        }
    }

    #[test]
    fn test_is_ephemeral() {
        assert!(is_ephemeral("temp_user_1700000000000@example.com"));
        assert!(is_ephemeral("temp-machine-1700000000000"));
        assert!(!is_ephemeral("machine-1"));
        assert!(!is_ephemeral("tempuser@example.com"));
    }

    #[test]
    fn test_remove_ephemeral_keeps_fixtures() {
        let mut data = TestData {
            machines: vec![machine("machine-1"), machine("temp-machine-42")],
            ..Default::default()
        };
        data.upsert_created_user("a@x.com", "p", false);

        let report = data.remove_ephemeral();
        assert_eq!(report.machines, 1);
        assert_eq!(report.created_users, 1);
        assert_eq!(report.total(), 2);
        assert_eq!(data.machines, vec![machine("machine-1")]);
        assert!(data.created_users.is_empty());
    }

    #[test]
    fn test_upsert_created_user_replaces() {
        let mut data = TestData::default();
        data.upsert_created_user("a@x.com", "p1", false);
        data.upsert_created_user("b@x.com", "p", false);
        data.upsert_created_user("a@x.com", "p2", true);

        assert_eq!(data.created_users.len(), 2);
        assert_eq!(data.created_users[0].password, "p2");
        assert!(data.created_users[0].activated);
    }

    #[test]
    fn test_serialized_shape_is_camel_case() {
        let mut data = TestData::default();
        data.upsert_created_user("a@x.com", "p", true);
        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("createdUsers").is_some());
        assert!(json["createdUsers"][0].get("createdAt").is_some());
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let data: TestData = serde_json::from_str(r#"{"users": []}"#).unwrap();
        assert!(data.machines.is_empty());
        assert!(data.created_users.is_empty());
    }
}
