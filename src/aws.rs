//! AWS implementation of the network lookup.
//!
//! One `DescribeDBInstances` call resolves the database, one
//! `DescribeSubnets` call finds a publicly reachable subnet in its VPC. SDK
//! failures (auth, throttling, missing permissions) are folded into
//! [`LookupError::Provider`] and propagate uncaught; there is no retry
//! policy.

use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::types::Filter;
use aws_sdk_rds::types::DbInstance;

use crate::lookup::{DbNetworkDetails, DbRecord, LookupError, LookupFuture, NetworkLookup};

/// Lookup backed by the AWS RDS and EC2 APIs.
#[derive(Clone, Debug)]
pub struct AwsNetworkLookup {
    rds: aws_sdk_rds::Client,
    ec2: aws_sdk_ec2::Client,
}

impl AwsNetworkLookup {
    /// Builds clients for the given region from the ambient credential chain.
    pub async fn connect(region: &str) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_owned()))
            .load()
            .await;
        Self {
            rds: aws_sdk_rds::Client::new(&shared),
            ec2: aws_sdk_ec2::Client::new(&shared),
        }
    }
}

impl NetworkLookup for AwsNetworkLookup {
    fn database<'a>(&'a self, identifier: &'a str) -> LookupFuture<'a, DbNetworkDetails> {
        Box::pin(async move {
            let response = self
                .rds
                .describe_db_instances()
                .db_instance_identifier(identifier)
                .send()
                .await
                .map_err(provider_error)?;

            let records: Vec<DbRecord> =
                response.db_instances().iter().map(snapshot_record).collect();
            DbNetworkDetails::from_records(identifier, records)
        })
    }

    fn public_subnet<'a>(&'a self, vpc_id: &'a str) -> LookupFuture<'a, String> {
        Box::pin(async move {
            let response = self
                .ec2
                .describe_subnets()
                .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
                .filters(
                    Filter::builder()
                        .name("map-public-ip-on-launch")
                        .values("true")
                        .build(),
                )
                .send()
                .await
                .map_err(provider_error)?;

            let subnet_ids: Vec<String> = response
                .subnets()
                .iter()
                .filter_map(|subnet| subnet.subnet_id().map(str::to_owned))
                .collect();
            pick_public_subnet(subnet_ids, vpc_id)
        })
    }
}

/// Chooses one subnet from the candidates returned by the API.
///
/// The API returns subnets in no particular order; the lexicographically
/// smallest id is taken so repeated synth runs place the host identically.
fn pick_public_subnet(mut subnet_ids: Vec<String>, vpc_id: &str) -> Result<String, LookupError> {
    subnet_ids.sort();
    subnet_ids
        .into_iter()
        .next()
        .ok_or_else(|| LookupError::NoPublicSubnet {
            vpc_id: vpc_id.to_owned(),
        })
}

fn snapshot_record(db: &DbInstance) -> DbRecord {
    DbRecord {
        vpc_id: db
            .db_subnet_group()
            .and_then(|group| group.vpc_id().map(str::to_owned)),
        security_group_ids: db
            .vpc_security_groups()
            .iter()
            .filter_map(|membership| membership.vpc_security_group_id().map(str::to_owned))
            .collect(),
        port: db.endpoint().and_then(aws_sdk_rds::types::Endpoint::port),
        endpoint_address: db
            .endpoint()
            .and_then(|endpoint| endpoint.address().map(str::to_owned)),
    }
}

fn provider_error<E>(err: E) -> LookupError
where
    E: std::error::Error + 'static,
{
    LookupError::Provider {
        message: aws_sdk_rds::error::DisplayErrorContext(err).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_rds::types::{DbSubnetGroup, Endpoint, VpcSecurityGroupMembership};

    #[test]
    fn snapshot_record_maps_sdk_fields() {
        let db = DbInstance::builder()
            .db_subnet_group(DbSubnetGroup::builder().vpc_id("vpc-1").build())
            .vpc_security_groups(
                VpcSecurityGroupMembership::builder()
                    .vpc_security_group_id("sg-1")
                    .build(),
            )
            .vpc_security_groups(
                VpcSecurityGroupMembership::builder()
                    .vpc_security_group_id("sg-2")
                    .build(),
            )
            .endpoint(
                Endpoint::builder()
                    .address("orders-db.abc123.us-west-2.rds.amazonaws.com")
                    .port(5432)
                    .build(),
            )
            .build();

        let record = snapshot_record(&db);
        assert_eq!(record.vpc_id.as_deref(), Some("vpc-1"));
        assert_eq!(record.security_group_ids, vec!["sg-1", "sg-2"]);
        assert_eq!(record.port, Some(5432));
        assert_eq!(
            record.endpoint_address.as_deref(),
            Some("orders-db.abc123.us-west-2.rds.amazonaws.com")
        );
    }

    #[test]
    fn snapshot_record_tolerates_sparse_instances() {
        let record = snapshot_record(&DbInstance::builder().build());
        assert_eq!(record, DbRecord::default());
    }

    #[test]
    fn pick_public_subnet_takes_the_smallest_id() {
        let ids = vec![
            String::from("subnet-c"),
            String::from("subnet-a"),
            String::from("subnet-b"),
        ];
        assert_eq!(pick_public_subnet(ids, "vpc-1"), Ok(String::from("subnet-a")));
    }

    #[test]
    fn pick_public_subnet_accepts_a_single_candidate() {
        let ids = vec![String::from("subnet-only")];
        assert_eq!(
            pick_public_subnet(ids, "vpc-1"),
            Ok(String::from("subnet-only"))
        );
    }

    #[test]
    fn pick_public_subnet_fails_without_candidates() {
        assert_eq!(
            pick_public_subnet(Vec::new(), "vpc-42"),
            Err(LookupError::NoPublicSubnet {
                vpc_id: String::from("vpc-42"),
            })
        );
    }
}
