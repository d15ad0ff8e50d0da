//! Test Data Manager: owner of the persisted fixture store

use chrono::Utc;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use ward_core::{Result, WardConfig, WardError};

use crate::generate::unique_stamp;
use crate::model::{CleanupReport, CreatedUser, TestData, TestMachine, TestRepository, TestUser};
use crate::overrides::{apply_env_overrides, default_test_data, EnvOverrides};
use crate::store::FixtureStore;

const STORE_FILE: &str = "test-data.json";
const TEMP_USER_PASSWORD: &str = "temppassword123";
const TEMP_REPO_VERSION: &str = "1.0.0";
const TEMP_DATASTORE: &str = "/mnt/datastore";

/// Fixture data access with override-on-read semantics
///
/// Every operation reads the whole document, applies [`apply_env_overrides`]
/// and, for mutations, writes the whole document back.
#[derive(Debug, Clone)]
pub struct TestDataManager {
    data_dir: PathBuf,
    store: FixtureStore,
    overrides: EnvOverrides,
}

impl TestDataManager {
    pub fn new(data_dir: impl Into<PathBuf>, overrides: EnvOverrides) -> Self {
        let data_dir = data_dir.into();
        let store = FixtureStore::new(data_dir.join(STORE_FILE));
        Self {
            data_dir,
            store,
            overrides,
        }
    }

    /// Manager rooted at the configured data directory
    pub fn from_config(config: &WardConfig) -> Self {
        Self::new(
            config.settings.paths.data_dir.clone(),
            EnvOverrides::from(config),
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store_path(&self) -> &Path {
        self.store.path()
    }

    /// Read the store, creating it from the environment on first access
    pub fn load_test_data(&self) -> Result<TestData> {
        let mut data = match self.store.load() {
            Ok(Some(data)) => data,
            Ok(None) => self.initialize()?,
            Err(e @ WardError::Serialization(_)) => {
                warn!(
                    "Fixture store {} is corrupt ({}), re-initializing",
                    self.store.path().display(),
                    e
                );
                self.initialize()?
            }
            Err(e) => return Err(e),
        };

        apply_env_overrides(&mut data, &self.overrides);
        Ok(data)
    }

    fn initialize(&self) -> Result<TestData> {
        let data = default_test_data(&self.overrides);
        self.store.save(&data)?;
        info!("📁 Initialized fixture data at {}", self.store.path().display());
        Ok(data)
    }

    fn update<T>(&self, f: impl FnOnce(&mut TestData) -> Result<T>) -> Result<T> {
        let mut data = self.load_test_data()?;
        let out = f(&mut data)?;
        self.store.save(&data)?;
        Ok(out)
    }

    /// User with the given role tag
    pub fn get_user(&self, role: &str) -> Result<TestUser> {
        self.load_test_data()?
            .users
            .into_iter()
            .find(|u| u.role.as_deref() == Some(role))
            .ok_or_else(|| WardError::not_found("user", format!("role: {}", role)))
    }

    pub fn get_random_user(&self) -> Result<TestUser> {
        self.load_test_data()?
            .users
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| WardError::not_found("user", "any role"))
    }

    /// Named machine, or the first one when `name` is `None`
    pub fn get_machine(&self, name: Option<&str>) -> Result<TestMachine> {
        let machines = self.load_test_data()?.machines;
        match name {
            Some(name) => machines
                .into_iter()
                .find(|m| m.name == name)
                .ok_or_else(|| WardError::not_found("machine", format!("name: {}", name))),
            None => machines
                .into_iter()
                .next()
                .ok_or_else(|| WardError::not_found("machine", "any name")),
        }
    }

    /// Named repository, or the first one when `name` is `None`
    pub fn get_repository(&self, name: Option<&str>) -> Result<TestRepository> {
        let repositories = self.load_test_data()?.repositories;
        match name {
            Some(name) => repositories
                .into_iter()
                .find(|r| r.name == name)
                .ok_or_else(|| WardError::not_found("repository", format!("name: {}", name))),
            None => repositories
                .into_iter()
                .next()
                .ok_or_else(|| WardError::not_found("repository", "any name")),
        }
    }

    /// Team at `index`, falling back to the first team
    pub fn get_team(&self, index: usize) -> Result<String> {
        let teams = self.load_test_data()?.teams;
        teams
            .get(index)
            .or_else(|| teams.first())
            .cloned()
            .ok_or_else(|| WardError::not_found("team", format!("index: {}", index)))
    }

    pub fn get_random_team(&self) -> Result<String> {
        self.load_test_data()?
            .teams
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| WardError::not_found("team", "any index"))
    }

    pub fn get_all_test_data(&self) -> Result<TestData> {
        self.load_test_data()
    }

    /// Ephemeral user; not persisted until passed to [`Self::add_user`]
    pub fn create_temporary_user(&self, role: Option<&str>, team: Option<&str>) -> TestUser {
        let stamp = unique_stamp();
        TestUser {
            email: format!("temp_user_{}@example.com", stamp),
            password: TEMP_USER_PASSWORD.to_string(),
            first_name: Some("Temp".to_string()),
            last_name: Some(format!("User{}", stamp)),
            role: Some(role.unwrap_or(crate::ROLE_USER).to_string()),
            team: Some(team.unwrap_or(&self.overrides.team_name).to_string()),
        }
    }

    /// Ephemeral machine reusing the first fixture machine's connection details
    pub fn create_temporary_machine(&self, team: Option<&str>) -> Result<TestMachine> {
        let first = self.get_machine(None)?;
        Ok(TestMachine {
            name: format!("temp-machine-{}", unique_stamp()),
            ip: first.ip,
            user: first.user,
            password: first.password,
            team: team.unwrap_or(&self.overrides.team_name).to_string(),
            datastore: Some(TEMP_DATASTORE.to_string()),
        })
    }

    /// Ephemeral repository on `machine`, or on the first fixture machine
    pub fn create_temporary_repository(
        &self,
        machine: Option<&str>,
        team: Option<&str>,
    ) -> Result<TestRepository> {
        let machine = match machine {
            Some(name) => name.to_string(),
            None => self.get_machine(None)?.name,
        };
        Ok(TestRepository {
            name: format!("temp-repo-{}", unique_stamp()),
            machine,
            team: team.unwrap_or(&self.overrides.team_name).to_string(),
            version: Some(TEMP_REPO_VERSION.to_string()),
        })
    }

    pub fn add_user(&self, user: TestUser) -> Result<()> {
        self.update(|data| {
            data.users.push(user);
            Ok(())
        })
    }

    pub fn add_machine(&self, machine: TestMachine) -> Result<()> {
        self.update(|data| {
            data.machines.push(machine);
            Ok(())
        })
    }

    pub fn add_repository(&self, repository: TestRepository) -> Result<()> {
        self.update(|data| {
            data.repositories.push(repository);
            Ok(())
        })
    }

    /// Upsert by email, refreshing `created_at`
    pub fn add_created_user(&self, email: &str, password: &str, activated: bool) -> Result<()> {
        self.update(|data| {
            data.upsert_created_user(email, password, activated);
            Ok(())
        })?;
        debug!("Recorded created user {} (activated: {})", email, activated);
        Ok(())
    }

    /// Record for `email`, or the most recently appended one when `None`
    pub fn get_created_user(&self, email: Option<&str>) -> Result<CreatedUser> {
        let created = self.load_test_data()?.created_users;
        match email {
            Some(email) => created
                .into_iter()
                .find(|u| u.email == email)
                .ok_or_else(|| WardError::not_found("created user", format!("email: {}", email))),
            None => created
                .into_iter()
                .last()
                .ok_or_else(|| WardError::not_found("created user", "any email")),
        }
    }

    pub fn update_created_user_activation(&self, email: &str, activated: bool) -> Result<()> {
        self.update(|data| {
            let user = data
                .created_users
                .iter_mut()
                .find(|u| u.email == email)
                .ok_or_else(|| WardError::not_found("created user", format!("email: {}", email)))?;
            user.activated = activated;
            Ok(())
        })
    }

    /// Remove by email; absent emails are ignored
    pub fn remove_created_user(&self, email: &str) -> Result<()> {
        self.update(|data| {
            data.created_users.retain(|u| u.email != email);
            Ok(())
        })
    }

    /// Drop ephemeral entries and clear created users
    pub fn cleanup(&self) -> Result<CleanupReport> {
        let report = self.update(|data| Ok(data.remove_ephemeral()))?;
        info!("🧹 Removed {} ephemeral fixture records", report.total());
        Ok(report)
    }

    /// Parse an arbitrary JSON fixture file
    pub fn load_test_data_from_file(&self, path: impl AsRef<Path>) -> Result<serde_json::Value> {
        let path = path.as_ref();
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()));

        parsed.map_err(|e| {
            WardError::Other(format!(
                "Failed to load test data from {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Write `<data_dir>/results/<name>_<timestamp>.json`
    pub fn save_test_results(&self, test_name: &str, results: &serde_json::Value) -> Result<PathBuf> {
        let dir = self.data_dir.join("results");
        std::fs::create_dir_all(&dir)?;

        let stamp = Utc::now()
            .format("%Y-%m-%dT%H-%M-%S-%3fZ")
            .to_string();
        let path = dir.join(format!("{}_{}.json", test_name, stamp));
        std::fs::write(&path, serde_json::to_string_pretty(results)?)?;

        info!("💾 Test results saved: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ROLE_ADMIN, ROLE_USER};
    use tempfile::tempdir;
    use ward_core::testing::{config_from, sample_config, sample_environment};

    #[test]
    fn test_first_access_initializes_store() {
        let dir = tempdir().unwrap();
        let manager = TestDataManager::from_config(&sample_config(dir.path()));
        assert!(!manager.store_path().exists());

        let data = manager.load_test_data().unwrap();
        assert!(manager.store_path().exists());
        assert_eq!(data.machines.len(), 2);
        assert_eq!(data.teams, vec!["Private Team".to_string()]);
    }

    #[test]
    fn test_get_user_reflects_current_environment() {
        let dir = tempdir().unwrap();
        let stale = sample_environment()
            .with("ADMIN_USER_EMAIL", "old-admin@example.com")
            .with("ADMIN_USER_PASSWORD", "old-pw");
        TestDataManager::from_config(&config_from(&stale, dir.path()))
            .load_test_data()
            .unwrap();

        let manager = TestDataManager::from_config(&sample_config(dir.path()));
        let admin = manager.get_user(ROLE_ADMIN).unwrap();
        assert_eq!(admin.email, "admin@example.com");
        assert_eq!(admin.password, "admin-pw");
    }

    #[test]
    fn test_system_admin_variant_naming() {
        let dir = tempdir().unwrap();
        let env = sample_environment()
            .without("ADMIN_USER_EMAIL")
            .without("ADMIN_USER_PASSWORD")
            .with("SYSTEM_ADMIN_EMAIL", "root@example.com")
            .with("SYSTEM_ADMIN_PASSWORD", "root-pw");
        let manager = TestDataManager::from_config(&config_from(&env, dir.path()));

        assert_eq!(manager.get_user(ROLE_ADMIN).unwrap().email, "root@example.com");
    }

    #[test]
    fn test_lookup_misses_name_the_key() {
        let dir = tempdir().unwrap();
        let manager = TestDataManager::from_config(&sample_config(dir.path()));

        let err = manager.get_user("auditor").unwrap_err();
        assert!(err.to_string().contains("auditor"));
        let err = manager.get_machine(Some("machine-9")).unwrap_err();
        assert!(err.to_string().contains("machine-9"));
        assert!(manager.get_repository(Some("nope")).is_err());
        assert!(manager.get_created_user(None).is_err());
    }

    #[test]
    fn test_get_machine_and_repository_defaults() {
        let dir = tempdir().unwrap();
        let manager = TestDataManager::from_config(&sample_config(dir.path()));

        assert_eq!(manager.get_machine(None).unwrap().name, "machine-1");
        assert_eq!(manager.get_machine(Some("machine-2")).unwrap().ip, "10.0.0.12");
        assert_eq!(manager.get_repository(None).unwrap().name, "test-repo");
        assert_eq!(manager.get_team(5).unwrap(), "Private Team");
        assert_eq!(manager.get_random_team().unwrap(), "Private Team");
        let random = manager.get_random_user().unwrap();
        assert!(random.role.is_some());
    }

    #[test]
    fn test_temporary_machines_are_distinct_but_share_connection() {
        let dir = tempdir().unwrap();
        let manager = TestDataManager::from_config(&sample_config(dir.path()));

        let a = manager.create_temporary_machine(None).unwrap();
        let b = manager.create_temporary_machine(Some("Other Team")).unwrap();

        assert_ne!(a.name, b.name);
        assert_eq!(a.ip, b.ip);
        assert_eq!(a.user, b.user);
        assert_eq!(a.ip, "10.0.0.11");
        assert_eq!(a.team, "Private Team");
        assert_eq!(b.team, "Other Team");
    }

    #[test]
    fn test_temporary_entities_are_ephemeral() {
        let dir = tempdir().unwrap();
        let manager = TestDataManager::from_config(&sample_config(dir.path()));

        let user = manager.create_temporary_user(None, None);
        let repo = manager.create_temporary_repository(None, None).unwrap();
        assert!(crate::is_ephemeral(&user.email));
        assert!(crate::is_ephemeral(&repo.name));
        assert_eq!(user.role.as_deref(), Some(ROLE_USER));
        assert_eq!(repo.machine, "machine-1");
    }

    #[test]
    fn test_add_created_user_upserts() {
        let dir = tempdir().unwrap();
        let manager = TestDataManager::from_config(&sample_config(dir.path()));

        manager.add_created_user("a@x.com", "p", false).unwrap();
        manager.add_created_user("a@x.com", "p2", true).unwrap();

        let all = manager.get_all_test_data().unwrap().created_users;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].password, "p2");
        assert!(all[0].activated);
    }

    #[test]
    fn test_created_user_lifecycle() {
        let dir = tempdir().unwrap();
        let manager = TestDataManager::from_config(&sample_config(dir.path()));

        manager.add_created_user("a@x.com", "p", false).unwrap();
        manager.add_created_user("b@x.com", "p", false).unwrap();
        assert_eq!(manager.get_created_user(None).unwrap().email, "b@x.com");

        manager.update_created_user_activation("a@x.com", true).unwrap();
        assert!(manager.get_created_user(Some("a@x.com")).unwrap().activated);
        assert!(manager.update_created_user_activation("c@x.com", true).is_err());

        manager.remove_created_user("b@x.com").unwrap();
        assert_eq!(manager.get_created_user(None).unwrap().email, "a@x.com");
    }

    #[test]
    fn test_cleanup_removes_only_ephemeral() {
        let dir = tempdir().unwrap();
        let manager = TestDataManager::from_config(&sample_config(dir.path()));

        manager
            .add_machine(manager.create_temporary_machine(None).unwrap())
            .unwrap();
        manager.add_user(manager.create_temporary_user(None, None)).unwrap();
        manager
            .add_repository(manager.create_temporary_repository(None, None).unwrap())
            .unwrap();
        manager.add_created_user("a@x.com", "p", true).unwrap();

        let report = manager.cleanup().unwrap();
        assert_eq!(report.machines, 1);
        assert_eq!(report.users, 1);
        assert_eq!(report.repositories, 1);
        assert_eq!(report.created_users, 1);

        let data = manager.get_all_test_data().unwrap();
        assert_eq!(data.machines.len(), 2);
        assert_eq!(data.users.len(), 2);
        assert_eq!(data.repositories.len(), 1);
        assert!(data.created_users.is_empty());
    }

    #[test]
    fn test_corrupt_store_is_reinitialized() {
        let dir = tempdir().unwrap();
        let manager = TestDataManager::from_config(&sample_config(dir.path()));
        std::fs::create_dir_all(manager.data_dir()).unwrap();
        std::fs::write(manager.store_path(), "{ truncated").unwrap();

        let data = manager.load_test_data().unwrap();
        assert_eq!(data.users.len(), 2);
    }

    #[test]
    fn test_load_test_data_from_file() {
        let dir = tempdir().unwrap();
        let manager = TestDataManager::from_config(&sample_config(dir.path()));

        let path = dir.path().join("extra.json");
        std::fs::write(&path, r#"{"plans": ["basic"]}"#).unwrap();
        let value = manager.load_test_data_from_file(&path).unwrap();
        assert_eq!(value["plans"][0], "basic");

        let err = manager
            .load_test_data_from_file(dir.path().join("missing.json"))
            .unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_save_test_results() {
        let dir = tempdir().unwrap();
        let manager = TestDataManager::from_config(&sample_config(dir.path()));

        let path = manager
            .save_test_results("login", &serde_json::json!({"ok": true}))
            .unwrap();
        assert!(path.starts_with(manager.data_dir().join("results")));
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("login_"));
    }
}
