//! Domain types and pure logic for the BeautyLink marketplace: provider
//! search, booking lists, the beta-test tracker and the admin dashboard.
//!
//! Nothing in this crate touches the network or the database; those live in
//! `beautylink-db` and `beautylink-remote`.

pub mod app_config;
pub mod beta;
pub mod bookings;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod local_store;
pub mod providers;
pub mod services;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{CatalogError, ConfigError, DataError};
pub use local_store::{LocalStore, LocalStoreError};
pub use services::{load_services, ServiceConfig, ServicesFile};
