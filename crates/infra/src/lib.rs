//! Infrastructure layer: the endorsement record store and configuration.

pub mod config;
pub mod store;

pub use config::{CONFIG_ENV_VAR, EngineConfig};
pub use store::{EndorsementStore, InMemoryEndorsementStore, StoreError, StoredEndorsement};
