//! Core types and the scheduled calendar cache for the hentedag pickup tracker.

/// Settings loaded from the TOML configuration file.
pub mod config;
/// Layout-independent extraction chain and strategy trait.
pub mod extract;
/// Norwegian weekday/month tables and the date parser built on them.
pub mod locale;
/// Domain models shared by the core and the providers.
pub mod model;
/// Bundle of ports and strategies implementing one provider.
pub mod plugin;
/// Traits describing the provider interfaces and the shared error type.
pub mod ports;
/// Next-pickup queries over a schedule.
pub mod query;
/// Holiday exception reconciliation.
pub mod reconcile;
/// Household identifier resolution chain.
pub mod resolver;
/// Scheduled cache and status facade used by clients.
pub mod service;

pub use config::*;
pub use extract::*;
pub use locale::*;
pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use query::*;
pub use reconcile::*;
pub use resolver::*;
pub use service::*;
