//! Configuration loading via `ortho-config`.

use ipnet::Ipv4Net;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::user_data::{UserDataError, resolve_user_data};

/// Default AWS region when none is configured.
pub const DEFAULT_REGION: &str = "us-west-2";
/// Default inbound port for the bastion host.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Deployment configuration derived from environment variables and
/// configuration files.
///
/// Values are raw as loaded; [`DeploymentConfig::resolve`] applies defaults
/// and validation once, producing an immutable [`Deployment`].
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "DRAWBRIDGE")]
pub struct DeploymentConfig {
    /// Project identifier. Restricted to lowercase letters, digits, hyphen,
    /// and underscore; used as the stack-name prefix.
    pub project: String,
    /// Client the deployment belongs to. Used to tag generated resources.
    pub client: String,
    /// Stage of deployment (for example `dev` or `prod`). Used as the
    /// stack-name suffix. Defaults to the invoking user's name.
    pub stage: Option<String>,
    /// Primary contact for the stack. Used to tag generated resources.
    /// Defaults to the invoking user's name.
    pub owner: Option<String>,
    /// AWS account used for deployment.
    pub aws_account: String,
    /// AWS region used for deployment. Defaults to `us-west-2`.
    #[ortho_config(default = DEFAULT_REGION.to_owned())]
    pub aws_region: String,
    /// Instance identifier of the database the bastion must reach.
    pub db_instance_identifier: String,
    /// Comma-separated IPv4 CIDRs allowed inbound SSH access to the bastion
    /// host. Defaults to an empty allowlist.
    pub ipv4_allowlist: Option<String>,
    /// Path to a bootstrap script embedded into the instance on first boot.
    pub user_data_file: Option<String>,
    /// Inbound port for the bastion host. Defaults to 22.
    pub ssh_port: Option<u16>,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(
        description: &'static str,
        env_var: &'static str,
        toml_key: &'static str,
    ) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl DeploymentConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to drawbridge.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("drawbridge")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields. Error messages include
    /// guidance on how to provide missing values via environment variables or
    /// configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required field is empty or the project
    /// identifier uses a forbidden character.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.project,
            &FieldMetadata::new("project identifier", "DRAWBRIDGE_PROJECT", "project"),
        )?;
        validate_project(&self.project)?;
        Self::require_field(
            &self.client,
            &FieldMetadata::new("client name", "DRAWBRIDGE_CLIENT", "client"),
        )?;
        Self::require_field(
            &self.aws_account,
            &FieldMetadata::new("AWS account id", "DRAWBRIDGE_AWS_ACCOUNT", "aws_account"),
        )?;
        Self::require_field(
            &self.aws_region,
            &FieldMetadata::new("AWS region", "DRAWBRIDGE_AWS_REGION", "aws_region"),
        )?;
        Self::require_field(
            &self.db_instance_identifier,
            &FieldMetadata::new(
                "database instance identifier",
                "DRAWBRIDGE_DB_INSTANCE_IDENTIFIER",
                "db_instance_identifier",
            ),
        )?;
        Ok(())
    }

    /// Resolves the raw configuration into an immutable [`Deployment`].
    ///
    /// Defaults are applied exactly once here: stage and owner fall back to
    /// the invoking user, the allowlist is parsed fail-fast, and the
    /// bootstrap script is read from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails, an allowlist entry is
    /// not a valid IPv4 CIDR, or the user-data file cannot be read.
    pub fn resolve(&self) -> Result<Deployment, ConfigError> {
        self.validate()?;

        let stage = resolve_identity(self.stage.as_deref(), "stage", "DRAWBRIDGE_STAGE")?;
        let owner = resolve_identity(self.owner.as_deref(), "owner", "DRAWBRIDGE_OWNER")?;
        let ipv4_allowlist = parse_allowlist(self.ipv4_allowlist.as_deref())?;
        let user_data = resolve_user_data(self.user_data_file.as_deref())?;

        Ok(Deployment {
            project: self.project.clone(),
            client: self.client.clone(),
            stage,
            owner,
            aws_account: self.aws_account.clone(),
            aws_region: self.aws_region.clone(),
            db_instance_identifier: self.db_instance_identifier.clone(),
            ipv4_allowlist,
            user_data,
            ssh_port: self.ssh_port.unwrap_or(DEFAULT_SSH_PORT),
        })
    }
}

/// Fully resolved deployment parameters.
///
/// Constructed once per invocation by [`DeploymentConfig::resolve`] and never
/// mutated afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Deployment {
    /// Project identifier used as the stack-name prefix.
    pub project: String,
    /// Client the deployment belongs to.
    pub client: String,
    /// Stage of deployment, resolved to the invoking user when unset.
    pub stage: String,
    /// Primary contact, resolved to the invoking user when unset.
    pub owner: String,
    /// Target AWS account id.
    pub aws_account: String,
    /// Target AWS region.
    pub aws_region: String,
    /// Instance identifier of the target database.
    pub db_instance_identifier: String,
    /// Source networks allowed inbound access to the bastion host.
    pub ipv4_allowlist: Vec<Ipv4Net>,
    /// Bootstrap script content, read at resolution time.
    pub user_data: Option<String>,
    /// Inbound port for the bastion host.
    pub ssh_port: u16,
}

impl Deployment {
    /// Returns the CloudFormation stack name, `{project}-{stage}-db-bastion`.
    #[must_use]
    pub fn stack_name(&self) -> String {
        format!("{}-{}-db-bastion", self.project, self.stage)
    }
}

fn validate_project(value: &str) -> Result<(), ConfigError> {
    let valid = value
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidProject {
            value: value.to_owned(),
        })
    }
}

fn resolve_identity(
    configured: Option<&str>,
    toml_key: &'static str,
    env_var: &'static str,
) -> Result<String, ConfigError> {
    if let Some(value) = configured
        && !value.trim().is_empty()
    {
        return Ok(value.to_owned());
    }
    current_user().ok_or_else(|| {
        ConfigError::MissingField(format!(
            "missing {toml_key} and no invoking user found: set {env_var} or add {toml_key} to drawbridge.toml"
        ))
    })
}

/// Returns the invoking user's name from `USER` or `USERNAME`, when set.
#[must_use]
pub fn current_user() -> Option<String> {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty())
}

fn parse_allowlist(raw: Option<&str>) -> Result<Vec<Ipv4Net>, ConfigError> {
    let Some(list) = raw else {
        return Ok(Vec::new());
    };

    let mut networks = Vec::new();
    for entry in list.split(',') {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        let network = trimmed
            .parse::<Ipv4Net>()
            .map_err(|err| ConfigError::InvalidCidr {
                entry: trimmed.to_owned(),
                message: err.to_string(),
            })?;
        networks.push(network);
    }
    Ok(networks)
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Raised when the project identifier uses characters outside
    /// `[a-z0-9_-]`.
    #[error(
        "invalid project identifier `{value}`: only lowercase letters, digits, hyphen, and underscore are allowed"
    )]
    InvalidProject {
        /// Offending project identifier.
        value: String,
    },
    /// Raised when an allowlist entry is not an IPv4 CIDR.
    #[error("invalid IPv4 allowlist entry `{entry}`: {message}")]
    InvalidCidr {
        /// Offending allowlist entry.
        entry: String,
        /// Parser message describing the failure.
        message: String,
    },
    /// Raised when the bootstrap script cannot be resolved.
    #[error("user-data resolution failed: {0}")]
    UserData(#[from] UserDataError),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
