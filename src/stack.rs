//! Declares the bastion-host resource graph.
//!
//! Given a resolved [`Deployment`] and the database's network placement,
//! this module emits the full declarative resource set: security group and
//! access rules, Session Manager role, the instance itself, and an Elastic
//! IP, plus the named outputs operators consume after deployment. Nothing
//! here creates a resource; CloudFormation owns ordering and lifecycle.

use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::config::Deployment;
use crate::lookup::DbNetworkDetails;
use crate::template::{Template, base64, get_att, reference};

/// Logical id of the bastion's own security group.
pub const SECURITY_GROUP_ID: &str = "BastionSecurityGroup";
/// Logical id of the ingress rule added to the database's security group.
pub const DB_INGRESS_ID: &str = "DatabaseIngressFromBastion";
/// Logical id of the Session Manager role.
pub const ROLE_ID: &str = "BastionRole";
/// Logical id of the instance profile wrapping the role.
pub const INSTANCE_PROFILE_ID: &str = "BastionInstanceProfile";
/// Logical id of the Elastic IP attached to the bastion host.
pub const EIP_ID: &str = "BastionIp";
/// Base logical id of the bastion instance; a user-data digest suffix is
/// appended when a bootstrap script is configured.
pub const INSTANCE_BASE_ID: &str = "BastionHost";

/// Instance type for the bastion host. Smallest burstable type; the host
/// only relays connections.
pub const INSTANCE_TYPE: &str = "t3.nano";

/// SSM parameter resolving to the latest Amazon Linux 2 AMI at deploy time.
pub const AMI_PARAMETER: &str =
    "/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2";

/// Returns the instance's logical id for the given bootstrap script.
///
/// When a script is present the id carries a digest of its content, so a
/// content change renames the resource and forces CloudFormation to replace
/// the instance.
#[must_use]
pub fn instance_logical_id(user_data: Option<&str>) -> String {
    user_data.map_or_else(
        || INSTANCE_BASE_ID.to_owned(),
        |content| {
            let digest = Sha256::digest(content.as_bytes());
            let suffix: String = digest
                .iter()
                .take(4)
                .map(|byte| format!("{byte:02x}"))
                .collect();
            format!("{INSTANCE_BASE_ID}{suffix}")
        },
    )
}

/// Declares the complete bastion stack for `deployment`.
///
/// `subnet_id` must identify a publicly reachable subnet inside the
/// database's VPC; the caller obtains it from the network lookup.
#[must_use]
pub fn declare(
    deployment: &Deployment,
    db: &DbNetworkDetails,
    subnet_id: &str,
) -> Template {
    let stack_name = deployment.stack_name();
    let mut template = Template::new(format!(
        "Bastion host with access to RDS instance {} ({stack_name})",
        deployment.db_instance_identifier
    ));

    template.add_resource(
        SECURITY_GROUP_ID,
        "AWS::EC2::SecurityGroup",
        security_group_properties(deployment, db),
    );
    template.add_resource(
        DB_INGRESS_ID,
        "AWS::EC2::SecurityGroupIngress",
        db_ingress_properties(db),
    );
    template.add_resource(ROLE_ID, "AWS::IAM::Role", role_properties(deployment));
    template.add_resource(
        INSTANCE_PROFILE_ID,
        "AWS::IAM::InstanceProfile",
        json!({ "Roles": [reference(ROLE_ID)] }),
    );

    let instance_id = instance_logical_id(deployment.user_data.as_deref());
    template.add_resource(
        instance_id.clone(),
        "AWS::EC2::Instance",
        instance_properties(deployment, subnet_id, &stack_name),
    );
    template.add_resource(
        EIP_ID,
        "AWS::EC2::EIP",
        json!({ "Domain": "vpc", "InstanceId": reference(&instance_id) }),
    );

    template.add_output(
        "BastionInstanceId",
        "Instance id of the bastion host",
        reference(&instance_id),
        Some(String::from("bastion-instance-id")),
    );
    template.add_output(
        "BastionPublicIp",
        "Public IPv4 address of the bastion host",
        get_att(&instance_id, "PublicIp"),
        Some(String::from("bastion-instance-public-ip")),
    );
    template.add_output(
        "BastionPublicDnsName",
        "Public DNS name of the bastion host",
        get_att(&instance_id, "PublicDnsName"),
        Some(String::from("bastion-public-dns-name")),
    );
    template.add_output(
        "DatabaseHostname",
        "Hostname of the target database",
        json!(db.endpoint_address),
        Some(String::from("db-host")),
    );

    template
}

fn security_group_properties(deployment: &Deployment, db: &DbNetworkDetails) -> Value {
    let ingress: Vec<Value> = deployment
        .ipv4_allowlist
        .iter()
        .map(|network| {
            json!({
                "CidrIp": network.to_string(),
                "IpProtocol": "tcp",
                "FromPort": deployment.ssh_port,
                "ToPort": deployment.ssh_port,
                "Description": "SSH access",
            })
        })
        .collect();

    json!({
        "GroupDescription": format!("Bastion host security group ({})", deployment.stack_name()),
        "VpcId": db.vpc_id,
        "SecurityGroupIngress": ingress,
        "SecurityGroupEgress": [{
            "DestinationSecurityGroupId": db.security_group_id,
            "IpProtocol": "tcp",
            "FromPort": db.port,
            "ToPort": db.port,
            "Description": "Allow connection from bastion host",
        }],
        "Tags": resource_tags(deployment),
    })
}

fn db_ingress_properties(db: &DbNetworkDetails) -> Value {
    json!({
        "GroupId": db.security_group_id,
        "SourceSecurityGroupId": get_att(SECURITY_GROUP_ID, "GroupId"),
        "IpProtocol": "tcp",
        "FromPort": db.port,
        "ToPort": db.port,
        "Description": "Allow connection from bastion host",
    })
}

fn role_properties(deployment: &Deployment) -> Value {
    json!({
        "AssumeRolePolicyDocument": {
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Service": "ec2.amazonaws.com" },
                "Action": "sts:AssumeRole",
            }],
        },
        "Policies": [{
            "PolicyName": "session-manager-access",
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Action": [
                        "ssmmessages:*",
                        "ssm:UpdateInstanceInformation",
                        "ec2messages:*",
                    ],
                    "Resource": "*",
                }],
            },
        }],
        "Tags": resource_tags(deployment),
    })
}

fn instance_properties(deployment: &Deployment, subnet_id: &str, stack_name: &str) -> Value {
    let mut tags = vec![json!({ "Key": "Name", "Value": stack_name })];
    if let Value::Array(base) = resource_tags(deployment) {
        tags.extend(base);
    }

    let mut properties = json!({
        "InstanceType": INSTANCE_TYPE,
        "ImageId": format!("{{{{resolve:ssm:{AMI_PARAMETER}}}}}"),
        "SubnetId": subnet_id,
        "SecurityGroupIds": [get_att(SECURITY_GROUP_ID, "GroupId")],
        "IamInstanceProfile": reference(INSTANCE_PROFILE_ID),
        "Tags": tags,
    });

    if let Some(content) = deployment.user_data.as_deref()
        && let Value::Object(map) = &mut properties
    {
        map.insert(String::from("UserData"), base64(json!(content)));
    }

    properties
}

fn resource_tags(deployment: &Deployment) -> Value {
    json!([
        { "Key": "Project", "Value": deployment.project },
        { "Key": "Owner", "Value": deployment.owner },
        { "Key": "Client", "Value": deployment.client },
        { "Key": "Stack", "Value": deployment.stage },
    ])
}
