//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod credential;
pub mod error;
pub mod extract;
pub mod remote;
pub mod token;

#[allow(unused_imports)]
pub use config::{ApricotConfig, BackendKind, validate_config_key, validate_config_value};
#[allow(unused_imports)]
pub use credential::{AuthContext, CredentialSpec, InfrastructureRecord};
#[allow(unused_imports)]
pub use error::{AccessError, AuthError, ConfigError, RegistryError, Secret};
#[allow(unused_imports)]
pub use extract::{VmDescriptor, VmRecord, VmSecretBundle, extract_descriptors, extract_secrets};
#[allow(unused_imports)]
pub use remote::{RemoteOperation, RemoteTarget, TransferDirection};
#[allow(unused_imports)]
pub use token::{BearerToken, TokenStatus, check_token};
