use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// anything that can be written into the `Resources` section
/// of a cloudformation template.
pub trait CfnResource {
    /// the cloudformation type, eg: `AWS::S3::Bucket`
    fn type_string(&self) -> &'static str;
    /// the `Properties` object of this resource.
    fn properties(&self) -> Value;
    /// checked during synthesis, before the resource is written
    /// into the template. Return a human readable reason on failure.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
    Snapshot,
}

pub struct Resource {
    /// logical id of the resource within the template.
    pub name: String,
    pub properties: Box<dyn CfnResource>,
    /// explicit dependencies. Most dependencies are implied by
    /// references inside of the properties, so this is rarely needed.
    pub depends_on: Vec<String>,
    /// applied as both DeletionPolicy and UpdateReplacePolicy.
    pub deletion_policy: Option<DeletionPolicy>,
}

impl Resource {
    pub fn new<S: Into<String>>(name: S, properties: impl CfnResource + 'static) -> Self {
        Self {
            name: name.into(),
            properties: Box::new(properties),
            depends_on: vec![],
            deletion_policy: None,
        }
    }

    pub fn retain(mut self) -> Self {
        self.deletion_policy = Some(DeletionPolicy::Retain);
        self
    }

    pub fn depends_on<S: Into<String>>(mut self, logical_id: S) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    pub fn to_saved(&self) -> SavedResource {
        SavedResource {
            ty: self.properties.type_string().to_string(),
            properties: self.properties.properties(),
            depends_on: self.depends_on.clone(),
            deletion_policy: self.deletion_policy,
            update_replace_policy: self.deletion_policy,
        }
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("type", &self.properties.type_string())
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SavedResource {
    #[serde(rename = "Type")]
    pub ty: String,
    #[serde(rename = "Properties", default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
    #[serde(
        rename = "DependsOn",
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub depends_on: Vec<String>,
    #[serde(rename = "DeletionPolicy", default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    #[serde(rename = "UpdateReplacePolicy", default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,
}

// DependsOn may be written either as a single string or a list
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub ty: String,
    #[serde(rename = "Default", default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceOutput {
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Value")]
    pub value: Value,
}

impl ResourceOutput {
    pub fn new<S: Into<String>>(description: S, value: Value) -> Self {
        Self { description: description.into(), value }
    }
}

/// A cloudformation template. Maps are ordered so that the same
/// declaration always serializes to the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub version: String,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Parameters", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,
    #[serde(rename = "Resources", default)]
    pub resources: BTreeMap<String, SavedResource>,
    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, ResourceOutput>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: None,
            parameters: Default::default(),
            resources: Default::default(),
            outputs: Default::default(),
        }
    }
}

impl Template {
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    // we make it pretty so if a user needs to look at the stack in the console, it looks nice
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn resource(&self, logical_id: &str) -> Option<&SavedResource> {
        self.resources.get(logical_id)
    }

    pub fn resources_of_type<'a>(&'a self, ty: &'a str) -> impl Iterator<Item = (&'a String, &'a SavedResource)> + 'a {
        self.resources.iter().filter(move |(_, r)| r.ty == ty)
    }
}
