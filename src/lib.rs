//! rxmigrate: RxJS 5 to 6 source migration
//!
//! Rewrites TypeScript sources that use the patched-prototype style of
//! RxJS 5 into the RxJS 6 style: operator chains become `.pipe(...)` calls,
//! static factories become standalone functions, deprecated import paths
//! and symbols are updated, and duplicate imports are merged. Rules run as
//! passes over a parsed tree and are repeated until the text stops changing.

// Core infrastructure - re-exported from rxmigrate-core
pub use rxmigrate_core::error;
pub use rxmigrate_core::output;
pub use rxmigrate_core::patch;
pub use rxmigrate_core::text;
pub use rxmigrate_core::types;

// TypeScript front end
pub use rxmigrate_ts as ts;

// Configuration and fixed tables
pub mod config;
pub mod prelude;
pub mod tables;

// Rules
pub mod chain;
pub mod collapse;
pub mod factory;
pub mod import_path;
pub mod registry;
pub mod stream;

// Passes and the fixed-point driver
pub mod driver;
pub mod pass;

pub use config::{MigrationConfig, RuleToggles};
pub use driver::{migrate_source, Migration, Round};
pub use pass::{run_pass, PassContext};
