pub mod args;
pub mod auth;
pub mod browser;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod export;
pub mod extract;
pub mod filter;
pub mod interact;
pub mod locator;
pub mod logging;
pub mod navigate;
pub mod record;
pub mod retry;
pub mod schema;
pub mod status;
pub mod targets;
#[doc(hidden)]
pub mod testing;
pub mod theme;

// Re-export the run entry points at crate root for convenience
pub use auth::Credentials;
pub use engine::{Engine, HarvestRequest, RunOutcome, RunReport};
pub use error::{HarvestError, Issue, Severity};
