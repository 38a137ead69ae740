//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → Client (token env fallback, validation)
//!     → handed to RequestExecutor / UploadOrchestrator / PageIterator
//! ```
//!
//! # Design Decisions
//! - Config is an explicit value passed at construction; there is no global client state
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ApiConfig, ClientConfig, ObservabilityConfig, PaginationConfig, RetryConfig, UploadConfig,
};
pub use validation::{validate_config, ConfigIssue};
