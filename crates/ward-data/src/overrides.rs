//! Environment override pass applied on every read
//!
//! Environment always wins: credentials of the env-managed roles, the team name
//! and the connection details of fixture machines are overwritten from the
//! current configuration each time the store is loaded. Hand edits to these
//! fields in `test-data.json` are clobbered on the next read.

use ward_core::{Account, WardConfig};

use crate::model::{is_ephemeral, TestData, TestMachine, TestRepository, TestUser};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";
pub const ROLE_TEMP_USER: &str = "tempuser";

const DEFAULT_DATASTORE: &str = "/mnt/datastore";
const DEFAULT_REPO_VERSION: &str = "1.0.0";

/// Environment-sourced values that override persisted fixture data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOverrides {
    pub admin: Account,
    pub user: Account,
    pub temp_user: Option<Account>,
    pub team_name: String,
    pub machine_ips: Vec<String>,
    pub machine_user: String,
    pub machine_password: String,
    pub repo_name: String,
}

impl From<&WardConfig> for EnvOverrides {
    fn from(config: &WardConfig) -> Self {
        Self {
            admin: config.admin.clone(),
            user: config.user.clone(),
            temp_user: config.temp_user.clone(),
            team_name: config.team_name.clone(),
            machine_ips: config.worker_ips.clone(),
            machine_user: config.machine_user.clone(),
            machine_password: config.machine_password.clone(),
            repo_name: config.repo_name.clone(),
        }
    }
}

impl EnvOverrides {
    fn machine(&self, index: usize, ip: &str) -> TestMachine {
        TestMachine {
            name: format!("machine-{}", index + 1),
            ip: ip.to_string(),
            user: self.machine_user.clone(),
            password: self.machine_password.clone(),
            team: self.team_name.clone(),
            datastore: Some(DEFAULT_DATASTORE.to_string()),
        }
    }

    fn managed_users(&self) -> Vec<(&'static str, &Account, Option<(&'static str, &'static str)>)> {
        let mut users = vec![
            (ROLE_ADMIN, &self.admin, Some(("Admin", "User"))),
            (ROLE_USER, &self.user, Some(("Test", "User"))),
        ];
        if let Some(temp) = &self.temp_user {
            users.push((ROLE_TEMP_USER, temp, Some(("Temp", "User"))));
        }
        users
    }
}

/// Full default fixture set synthesized from the environment
pub fn default_test_data(overrides: &EnvOverrides) -> TestData {
    let users = overrides
        .managed_users()
        .into_iter()
        .map(|(role, account, names)| TestUser {
            email: account.email.clone(),
            password: account.password.clone(),
            first_name: names.map(|(first, _)| first.to_string()),
            last_name: names.map(|(_, last)| last.to_string()),
            role: Some(role.to_string()),
            team: Some(overrides.team_name.clone()),
        })
        .collect();

    let machines: Vec<TestMachine> = overrides
        .machine_ips
        .iter()
        .enumerate()
        .map(|(i, ip)| overrides.machine(i, ip))
        .collect();

    let repositories = vec![TestRepository {
        name: overrides.repo_name.clone(),
        machine: machines
            .first()
            .map(|m| m.name.clone())
            .unwrap_or_else(|| "machine-1".to_string()),
        team: overrides.team_name.clone(),
        version: Some(DEFAULT_REPO_VERSION.to_string()),
    }];

    TestData {
        users,
        machines,
        repositories,
        teams: vec![overrides.team_name.clone()],
        created_users: Vec::new(),
    }
}

/// Merge environment values into loaded data (pure, no I/O)
pub fn apply_env_overrides(data: &mut TestData, overrides: &EnvOverrides) {
    for (role, account, names) in overrides.managed_users() {
        match data
            .users
            .iter_mut()
            .find(|u| u.role.as_deref() == Some(role))
        {
            Some(user) => {
                user.email = account.email.clone();
                user.password = account.password.clone();
                user.team = Some(overrides.team_name.clone());
            }
            None => data.users.push(TestUser {
                email: account.email.clone(),
                password: account.password.clone(),
                first_name: names.map(|(first, _)| first.to_string()),
                last_name: names.map(|(_, last)| last.to_string()),
                role: Some(role.to_string()),
                team: Some(overrides.team_name.clone()),
            }),
        }
    }

    if data.teams.first() != Some(&overrides.team_name) {
        data.teams.retain(|t| t != &overrides.team_name);
        data.teams.insert(0, overrides.team_name.clone());
    }

    // Positional overwrite over fixture machines only; ephemeral ones keep their copy.
    let mut fixture_count = 0;
    for machine in data.machines.iter_mut().filter(|m| !is_ephemeral(&m.name)) {
        if let Some(ip) = overrides.machine_ips.get(fixture_count) {
            machine.ip = ip.clone();
            machine.user = overrides.machine_user.clone();
            machine.password = overrides.machine_password.clone();
            machine.team = overrides.team_name.clone();
        }
        fixture_count += 1;
    }
    for (i, ip) in overrides.machine_ips.iter().enumerate().skip(fixture_count) {
        data.machines.push(overrides.machine(i, ip));
    }
}
