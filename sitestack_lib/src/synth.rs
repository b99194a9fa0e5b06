use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::graph::{GraphError, NodeKind, ResourceGraph};
use crate::overrides::{OverrideError, PropertyOverride};
use crate::template::{Parameter, Resource, ResourceOutput, Template};

#[derive(Debug, Error)]
pub enum StackError {
    #[error("Invalid stack name {name:?}\nMust only consist of alphanumeric characters and hyphens, Must start with an alphabetical character, and cannot be longer than 128 characters.")]
    InvalidStackName { name: String },
    #[error("{0}")]
    InvalidLogicalId(String),
    #[error("Logical id '{0}' is used by more than one resource or parameter")]
    DuplicateLogicalId(String),
    #[error("Validation failed on resource '{resource}'\n{message}")]
    Validation { resource: String, message: String },
    #[error(transparent)]
    Override(#[from] OverrideError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// something that runs after the stack is applied. Only its place
/// in the dependency graph is known here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionNode {
    pub name: String,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Default)]
pub struct StackInput {
    pub stack_name: String,
    pub description: Option<String>,
    pub parameters: BTreeMap<String, Parameter>,
    pub resources: Vec<Resource>,
    pub outputs: BTreeMap<String, ResourceOutput>,
    /// raw patches applied to the template after every resource
    /// has been written into it.
    pub overrides: Vec<PropertyOverride>,
    pub actions: Vec<ActionNode>,
}

#[derive(Debug, Clone)]
pub struct Synthesized {
    pub stack_name: String,
    pub template: Template,
    pub graph: ResourceGraph,
    /// every parameter, resource, and action, dependencies first.
    pub order: Vec<String>,
}

impl Synthesized {
    pub fn template_body(&self) -> Result<String, serde_json::Error> {
        self.template.to_json_pretty()
    }
}

pub fn verify_resource_name(resource_name: &str) -> Result<(), StackError> {
    if resource_name.len() > 255 {
        return Err(StackError::InvalidLogicalId(format!("Invalid resource name {:?}\nmust be less than 255 characters", resource_name)));
    }
    if resource_name.is_empty() {
        return Err(StackError::InvalidLogicalId(format!("Invalid resource name {:?}\nMust contain at least 1 character", resource_name)));
    }
    if !resource_name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StackError::InvalidLogicalId(format!("Invalid resource name {:?}\nMust contain only alphanumeric characters [A-Za-z0-9]", resource_name)));
    }
    Ok(())
}

// A stack name can contain only alphanumeric characters (case sensitive) and hyphens.
// It must start with an alphabetical character and can't be longer than 128 characters.
pub fn validate_stack_name(stack_name: &str) -> Result<String, StackError> {
    let invalid = || StackError::InvalidStackName { name: stack_name.to_string() };
    let mut chars = stack_name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return Err(invalid()),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid());
    }
    if stack_name.len() > 128 {
        return Err(invalid());
    }
    Ok(stack_name.to_string())
}

fn validate_resources_to_template(input: &StackInput) -> Result<Template, StackError> {
    let mut out_template = Template {
        description: input.description.clone(),
        parameters: input.parameters.clone(),
        outputs: input.outputs.clone(),
        ..Default::default()
    };
    for name in input.parameters.keys() {
        verify_resource_name(name)?;
    }
    for resource in input.resources.iter() {
        verify_resource_name(&resource.name)?;
        if let Err(message) = resource.properties.validate() {
            return Err(StackError::Validation { resource: resource.name.clone(), message });
        }
        if out_template.parameters.contains_key(&resource.name) {
            return Err(StackError::DuplicateLogicalId(resource.name.clone()));
        }
        let saved = resource.to_saved();
        if out_template.resources.insert(resource.name.clone(), saved).is_some() {
            return Err(StackError::DuplicateLogicalId(resource.name.clone()));
        }
    }
    Ok(out_template)
}

/// turns a stack declaration into a template plus the order
/// in which everything in it must be applied.
pub fn synthesize(input: &StackInput) -> Result<Synthesized, StackError> {
    let stack_name = validate_stack_name(&input.stack_name)?;
    let mut template = validate_resources_to_template(input)?;
    for patch in input.overrides.iter() {
        patch.apply(&mut template)?;
    }

    let mut graph = ResourceGraph::from_template(&template)?;
    for action in input.actions.iter() {
        graph.add_node(&action.name, NodeKind::Action, action.depends_on.iter().cloned())?;
    }
    let order = graph.topological_order()?;
    debug!(stack = %stack_name, ?order, "resolved apply order");

    Ok(Synthesized { stack_name, template, graph, order })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intrinsics::get_ref;
    use crate::template::CfnResource;
    use serde_json::{json, Value};

    struct Fake {
        props: Value,
        valid: bool,
    }

    impl CfnResource for Fake {
        fn type_string(&self) -> &'static str {
            "Custom::Fake"
        }
        fn properties(&self) -> Value {
            self.props.clone()
        }
        fn validate(&self) -> Result<(), String> {
            if self.valid { Ok(()) } else { Err("nope".into()) }
        }
    }

    fn fake(props: Value) -> Fake {
        Fake { props, valid: true }
    }

    #[test]
    fn stack_names_are_validated() {
        assert!(validate_stack_name("my-stack-1").is_ok());
        assert!(validate_stack_name("1stack").is_err());
        assert!(validate_stack_name("my_stack").is_err());
        assert!(validate_stack_name("").is_err());
        assert!(validate_stack_name(&"a".repeat(129)).is_err());
    }

    #[test]
    fn logical_ids_must_be_alphanumeric() {
        assert!(verify_resource_name("Bucket1").is_ok());
        assert!(verify_resource_name("bucket-1").is_err());
        assert!(verify_resource_name("").is_err());
    }

    #[test]
    fn synth_orders_resources_and_actions() {
        let input = StackInput {
            stack_name: "test".into(),
            resources: vec![
                Resource::new("Second", fake(json!({ "Target": get_ref("First") }))),
                Resource::new("First", fake(json!({}))),
            ],
            actions: vec![ActionNode { name: "Upload".into(), depends_on: vec!["Second".into()] }],
            ..Default::default()
        };
        let out = synthesize(&input).unwrap();
        assert_eq!(out.order, vec!["First", "Second", "Upload"]);
        assert_eq!(out.graph.kind("Upload"), Some(NodeKind::Action));
        assert_eq!(out.template.resources["First"].ty, "Custom::Fake");
    }

    #[test]
    fn failed_validation_names_the_resource() {
        let input = StackInput {
            stack_name: "test".into(),
            resources: vec![Resource::new("Bad", Fake { props: json!({}), valid: false })],
            ..Default::default()
        };
        let err = synthesize(&input).unwrap_err();
        assert_eq!(err.to_string(), "Validation failed on resource 'Bad'\nnope");
    }

    #[test]
    fn duplicate_logical_ids_are_rejected() {
        let input = StackInput {
            stack_name: "test".into(),
            resources: vec![
                Resource::new("Same", fake(json!({}))),
                Resource::new("Same", fake(json!({}))),
            ],
            ..Default::default()
        };
        assert!(matches!(synthesize(&input), Err(StackError::DuplicateLogicalId(_))));
    }

    #[test]
    fn dangling_references_are_rejected() {
        let input = StackInput {
            stack_name: "test".into(),
            resources: vec![Resource::new("A", fake(json!({ "X": get_ref("Ghost") })))],
            ..Default::default()
        };
        assert!(matches!(synthesize(&input), Err(StackError::Graph(GraphError::UnknownReference { .. }))));
    }

    #[test]
    fn synthesis_is_deterministic() {
        let build = || StackInput {
            stack_name: "test".into(),
            resources: vec![
                Resource::new("B", fake(json!({ "Z": 1, "A": get_ref("A") }))),
                Resource::new("A", fake(json!({}))).retain(),
            ],
            ..Default::default()
        };
        let one = synthesize(&build()).unwrap().template_body().unwrap();
        let two = synthesize(&build()).unwrap().template_body().unwrap();
        assert_eq!(one, two);
    }
}
