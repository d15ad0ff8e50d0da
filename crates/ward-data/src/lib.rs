//! # ward-data
//!
//! Deterministic, environment-driven fixture data for console tests.
//!
//! The store is a single JSON document (`test-data.json`) owned by
//! [`TestDataManager`]. Every read re-applies the environment override pass
//! ([`apply_env_overrides`]) so switching deployments never requires deleting
//! the persisted file.

mod generate;
mod manager;
mod model;
mod overrides;
mod store;

pub use generate::{generate_random_string, generate_test_email, generate_unique_id, unique_stamp};
pub use manager::TestDataManager;
pub use model::{
    is_ephemeral, CleanupReport, CreatedUser, TestData, TestMachine, TestRepository, TestUser,
    EPHEMERAL_MARKERS,
};
pub use overrides::{apply_env_overrides, default_test_data, EnvOverrides, ROLE_ADMIN, ROLE_TEMP_USER, ROLE_USER};
pub use store::FixtureStore;
