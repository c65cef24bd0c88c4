//! Minimal declarative CloudFormation template model.
//!
//! The synthesiser only ever *describes* resources; creation, diffing, and
//! lifecycle are owned by CloudFormation. This module keeps that description
//! independent of configuration and lookup logic: a [`Template`] is a plain
//! value that renders to deterministic JSON.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};

/// A declarative CloudFormation template.
///
/// Resources and outputs are keyed by logical id in sorted maps so repeated
/// synth runs render byte-identical artifacts.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Template {
    /// Template format version understood by CloudFormation.
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: String,
    /// Human-readable template description.
    #[serde(rename = "Description")]
    description: String,
    /// Declared resources, keyed by logical id.
    #[serde(rename = "Resources")]
    resources: BTreeMap<String, Resource>,
    /// Named outputs for operator consumption.
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    outputs: BTreeMap<String, Output>,
}

/// One declared resource.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Resource {
    /// CloudFormation resource type, for example `AWS::EC2::Instance`.
    #[serde(rename = "Type")]
    pub kind: String,
    /// Resource properties as inert JSON.
    #[serde(rename = "Properties")]
    pub properties: Value,
}

/// One named output value.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Output {
    /// Human-readable description of the output.
    #[serde(rename = "Description")]
    pub description: String,
    /// Output value, usually an intrinsic.
    #[serde(rename = "Value")]
    pub value: Value,
    /// Cross-stack export, when the value is shared.
    #[serde(rename = "Export", skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
}

/// Cross-stack export name for an output.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Export {
    /// Exported name, unique per region and account.
    #[serde(rename = "Name")]
    pub name: String,
}

impl Template {
    /// Creates an empty template with the given description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: String::from("2010-09-09"),
            description: description.into(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Declares a resource under `logical_id`, replacing any previous
    /// declaration with the same id.
    pub fn add_resource(
        &mut self,
        logical_id: impl Into<String>,
        kind: impl Into<String>,
        properties: Value,
    ) {
        self.resources.insert(
            logical_id.into(),
            Resource {
                kind: kind.into(),
                properties,
            },
        );
    }

    /// Declares a named output, optionally exported for other stacks.
    pub fn add_output(
        &mut self,
        logical_id: impl Into<String>,
        description: impl Into<String>,
        value: Value,
        export_name: Option<String>,
    ) {
        self.outputs.insert(
            logical_id.into(),
            Output {
                description: description.into(),
                value,
                export: export_name.map(|name| Export { name }),
            },
        );
    }

    /// Returns the resource declared under `logical_id`, if any.
    #[must_use]
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    /// Returns all declared resources keyed by logical id.
    #[must_use]
    pub const fn resources(&self) -> &BTreeMap<String, Resource> {
        &self.resources
    }

    /// Returns all declared outputs keyed by logical id.
    #[must_use]
    pub const fn outputs(&self) -> &BTreeMap<String, Output> {
        &self.outputs
    }

    /// Renders the template as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error when serialisation fails.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Returns a `Ref` intrinsic pointing at `logical_id`.
#[must_use]
pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// Returns an `Fn::GetAtt` intrinsic for `attribute` of `logical_id`.
#[must_use]
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// Wraps a value in an `Fn::Base64` intrinsic.
#[must_use]
pub fn base64(value: Value) -> Value {
    json!({ "Fn::Base64": value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_produces_expected_shape() {
        let mut template = Template::new("test stack");
        template.add_resource(
            "Thing",
            "AWS::EC2::EIP",
            json!({ "InstanceId": reference("Host") }),
        );
        template.add_output(
            "ThingId",
            "id of the thing",
            reference("Thing"),
            Some(String::from("thing-id")),
        );

        let rendered = template
            .render()
            .unwrap_or_else(|err| panic!("render: {err}"));
        let value: Value = serde_json::from_str(&rendered)
            .unwrap_or_else(|err| panic!("round-trip parse: {err}"));

        assert_eq!(
            value.pointer("/AWSTemplateFormatVersion"),
            Some(&json!("2010-09-09"))
        );
        assert_eq!(
            value.pointer("/Resources/Thing/Type"),
            Some(&json!("AWS::EC2::EIP"))
        );
        assert_eq!(
            value.pointer("/Resources/Thing/Properties/InstanceId/Ref"),
            Some(&json!("Host"))
        );
        assert_eq!(
            value.pointer("/Outputs/ThingId/Export/Name"),
            Some(&json!("thing-id"))
        );
    }

    #[test]
    fn outputs_are_omitted_when_empty() {
        let template = Template::new("no outputs");
        let rendered = template
            .render()
            .unwrap_or_else(|err| panic!("render: {err}"));
        assert!(!rendered.contains("Outputs"), "rendered: {rendered}");
    }

    #[test]
    fn intrinsics_render_canonical_forms() {
        assert_eq!(get_att("Host", "PublicIp"), json!({ "Fn::GetAtt": ["Host", "PublicIp"] }));
        assert_eq!(
            base64(json!("#!/bin/sh")),
            json!({ "Fn::Base64": "#!/bin/sh" })
        );
    }
}
