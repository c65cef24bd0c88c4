//! Provider-agnostic lookup of the target database's network placement.
//!
//! The synthesiser needs two facts from the cloud before it can declare
//! anything: where the database lives (VPC, security group, port) and which
//! subnet in that VPC is publicly reachable. The [`NetworkLookup`] trait is
//! the seam between that question and the AWS SDK, so the cardinality and
//! extraction rules stay pure and testable.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Snapshot of one database record as reported by the provider.
///
/// Providers map their SDK response types into this plain shape before the
/// extraction rules run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DbRecord {
    /// VPC id from the database's subnet group, when present.
    pub vpc_id: Option<String>,
    /// Security group ids attached to the database, in provider order.
    pub security_group_ids: Vec<String>,
    /// Listening port from the database endpoint, when present.
    pub port: Option<i32>,
    /// Hostname from the database endpoint, when present.
    pub endpoint_address: Option<String>,
}

/// Network placement of the target database.
///
/// Produced by a single remote query and consumed immediately to construct
/// access rules; never persisted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DbNetworkDetails {
    /// VPC the database is placed in.
    pub vpc_id: String,
    /// First security group attached to the database.
    pub security_group_id: String,
    /// Port the database listens on.
    pub port: u16,
    /// Hostname of the database endpoint, surfaced as an operator output.
    pub endpoint_address: String,
}

impl DbNetworkDetails {
    /// Extracts the network details from a lookup response.
    ///
    /// Exactly one record must be present; zero or several records is a
    /// fatal precondition failure reporting the observed count. The record
    /// must carry a VPC id, at least one security group, and an endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Cardinality`] when the record count is not 1,
    /// [`LookupError::MissingAttribute`] when a required attribute is
    /// absent, or [`LookupError::InvalidPort`] when the reported port does
    /// not fit a TCP port.
    pub fn from_records(
        identifier: &str,
        mut records: Vec<DbRecord>,
    ) -> Result<Self, LookupError> {
        if records.len() != 1 {
            return Err(LookupError::Cardinality {
                identifier: identifier.to_owned(),
                count: records.len(),
            });
        }
        let record = records.remove(0);

        let vpc_id = record.vpc_id.filter(|id| !id.is_empty()).ok_or_else(|| {
            LookupError::missing_attribute(identifier, "subnet-group VPC id")
        })?;
        let security_group_id = record
            .security_group_ids
            .into_iter()
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| LookupError::missing_attribute(identifier, "VPC security group"))?;
        let raw_port = record
            .port
            .ok_or_else(|| LookupError::missing_attribute(identifier, "endpoint port"))?;
        let port = u16::try_from(raw_port).map_err(|_| LookupError::InvalidPort {
            identifier: identifier.to_owned(),
            port: raw_port,
        })?;
        let endpoint_address = record
            .endpoint_address
            .filter(|address| !address.is_empty())
            .ok_or_else(|| LookupError::missing_attribute(identifier, "endpoint address"))?;

        Ok(Self {
            vpc_id,
            security_group_id,
            port,
            endpoint_address,
        })
    }
}

/// Errors raised while looking up the database's network placement.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum LookupError {
    /// Raised when the identifier matches other than exactly one database.
    #[error("expected exactly 1 database instance matching `{identifier}`, found {count}")]
    Cardinality {
        /// Identifier used for the query.
        identifier: String,
        /// Number of records actually returned.
        count: usize,
    },
    /// Raised when the matched record lacks a required attribute.
    #[error("database `{identifier}` has no {attribute}")]
    MissingAttribute {
        /// Identifier used for the query.
        identifier: String,
        /// Human-readable name of the missing attribute.
        attribute: String,
    },
    /// Raised when the reported endpoint port is not a valid TCP port.
    #[error("database `{identifier}` reports invalid port {port}")]
    InvalidPort {
        /// Identifier used for the query.
        identifier: String,
        /// Port value as reported by the provider.
        port: i32,
    },
    /// Raised when the database's VPC has no publicly reachable subnet.
    #[error("no public subnet found in VPC {vpc_id}")]
    NoPublicSubnet {
        /// VPC searched for a public subnet.
        vpc_id: String,
    },
    /// Wrapper for provider level failures. Not handled locally; there is no
    /// retry policy.
    #[error("provider error: {message}")]
    Provider {
        /// Message returned by the provider SDK.
        message: String,
    },
}

impl LookupError {
    fn missing_attribute(identifier: &str, attribute: &str) -> Self {
        Self::MissingAttribute {
            identifier: identifier.to_owned(),
            attribute: attribute.to_owned(),
        }
    }
}

/// Future returned by lookup operations.
pub type LookupFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LookupError>> + Send + 'a>>;

/// Minimal interface implemented by cloud lookups.
pub trait NetworkLookup {
    /// Resolves the database identified by `identifier` to its network
    /// placement.
    fn database<'a>(&'a self, identifier: &'a str) -> LookupFuture<'a, DbNetworkDetails>;

    /// Returns the id of a publicly reachable subnet inside `vpc_id`.
    fn public_subnet<'a>(&'a self, vpc_id: &'a str) -> LookupFuture<'a, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DbRecord {
        DbRecord {
            vpc_id: Some(String::from("vpc-1")),
            security_group_ids: vec![String::from("sg-1"), String::from("sg-2")],
            port: Some(5432),
            endpoint_address: Some(String::from("orders-db.abc123.us-west-2.rds.amazonaws.com")),
        }
    }

    #[test]
    fn from_records_extracts_single_record_verbatim() {
        let details = DbNetworkDetails::from_records("orders-db", vec![record()])
            .unwrap_or_else(|err| panic!("single record extracts: {err}"));
        assert_eq!(details.vpc_id, "vpc-1");
        assert_eq!(details.security_group_id, "sg-1");
        assert_eq!(details.port, 5432);
        assert_eq!(
            details.endpoint_address,
            "orders-db.abc123.us-west-2.rds.amazonaws.com"
        );
    }

    #[test]
    fn from_records_rejects_zero_records_with_count() {
        let err = DbNetworkDetails::from_records("orders-db", Vec::new())
            .expect_err("zero records must fail");
        assert_eq!(
            err,
            LookupError::Cardinality {
                identifier: String::from("orders-db"),
                count: 0,
            }
        );
        assert!(err.to_string().contains("found 0"), "message: {err}");
    }

    #[test]
    fn from_records_rejects_multiple_records_with_count() {
        let err = DbNetworkDetails::from_records("orders-db", vec![record(), record(), record()])
            .expect_err("multiple records must fail");
        assert!(
            matches!(err, LookupError::Cardinality { count: 3, .. }),
            "unexpected error: {err}"
        );
        assert!(err.to_string().contains("found 3"), "message: {err}");
    }

    #[test]
    fn from_records_requires_vpc_id() {
        let err = DbNetworkDetails::from_records(
            "orders-db",
            vec![DbRecord {
                vpc_id: None,
                ..record()
            }],
        )
        .expect_err("missing VPC must fail");
        assert!(
            matches!(err, LookupError::MissingAttribute { ref attribute, .. } if attribute.contains("VPC")),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn from_records_requires_a_security_group() {
        let err = DbNetworkDetails::from_records(
            "orders-db",
            vec![DbRecord {
                security_group_ids: Vec::new(),
                ..record()
            }],
        )
        .expect_err("missing security group must fail");
        assert!(matches!(err, LookupError::MissingAttribute { .. }));
    }

    #[test]
    fn from_records_rejects_out_of_range_port() {
        let err = DbNetworkDetails::from_records(
            "orders-db",
            vec![DbRecord {
                port: Some(-1),
                ..record()
            }],
        )
        .expect_err("negative port must fail");
        assert!(
            matches!(err, LookupError::InvalidPort { port: -1, .. }),
            "unexpected error: {err}"
        );
    }
}
