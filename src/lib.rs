//! Core library for the drawbridge stack synthesiser.
//!
//! The crate loads typed deployment configuration, resolves a pre-existing
//! RDS database's network placement through a lookup seam, and declares a
//! CloudFormation stack for a bastion host that can reach it (load config →
//! look up database → declare resources → render template). All provisioning
//! is delegated to CloudFormation; this crate only produces the declarative
//! artifact.

pub mod aws;
pub mod config;
pub mod fs;
pub mod lookup;
pub mod stack;
pub mod synth;
pub mod template;
pub mod test_support;
pub mod user_data;

pub use aws::AwsNetworkLookup;
pub use config::{ConfigError, Deployment, DeploymentConfig};
pub use lookup::{DbNetworkDetails, DbRecord, LookupError, LookupFuture, NetworkLookup};
pub use synth::{SynthError, SynthOrchestrator, Synthesis};
pub use template::{Export, Output, Resource, Template};
pub use user_data::{UserDataError, expand_tilde, resolve_user_data};
