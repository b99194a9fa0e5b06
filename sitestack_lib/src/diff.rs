use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value;

use crate::template::{SavedResource, Template};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    /// same type, different settings. Lists the top level keys that changed.
    Modified { properties: Vec<String> },
    /// the resource type changed, so cloudformation has to recreate it.
    Replaced { old_type: String, new_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceChange {
    pub logical_id: String,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateDiff {
    pub resources: Vec<ResourceChange>,
    /// names of parameters that were added, removed, or changed.
    pub parameters: Vec<String>,
    /// names of outputs that were added, removed, or changed.
    pub outputs: Vec<String>,
}

impl TemplateDiff {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.parameters.is_empty() && self.outputs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len() + self.parameters.len() + self.outputs.len()
    }
}

impl fmt::Display for TemplateDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "There were no differences");
        }
        for change in self.resources.iter() {
            match &change.kind {
                ChangeKind::Added => writeln!(f, "[+] {}", change.logical_id)?,
                ChangeKind::Removed => writeln!(f, "[-] {}", change.logical_id)?,
                ChangeKind::Modified { properties } => {
                    writeln!(f, "[~] {} ({})", change.logical_id, properties.join(", "))?
                }
                ChangeKind::Replaced { old_type, new_type } => {
                    writeln!(f, "[-/+] {} ({old_type} -> {new_type})", change.logical_id)?
                }
            }
        }
        for name in self.parameters.iter() {
            writeln!(f, "[~] Parameter {name}")?;
        }
        for name in self.outputs.iter() {
            writeln!(f, "[~] Output {name}")?;
        }
        Ok(())
    }
}

fn changed_keys<V: PartialEq>(old: &BTreeMap<String, V>, new: &BTreeMap<String, V>) -> Vec<String> {
    let names: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    names.into_iter()
        .filter(|name| old.get(*name) != new.get(*name))
        .cloned()
        .collect()
}

fn changed_properties(old: &SavedResource, new: &SavedResource) -> Vec<String> {
    let mut out = match (&old.properties, &new.properties) {
        (Value::Object(a), Value::Object(b)) => {
            let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
            keys.into_iter().filter(|k| a.get(*k) != b.get(*k)).cloned().collect()
        }
        (a, b) if a != b => vec!["Properties".to_string()],
        _ => vec![],
    };
    if old.depends_on != new.depends_on {
        out.push("DependsOn".to_string());
    }
    if old.deletion_policy != new.deletion_policy {
        out.push("DeletionPolicy".to_string());
    }
    if old.update_replace_policy != new.update_replace_policy {
        out.push("UpdateReplacePolicy".to_string());
    }
    out
}

/// what would change if `new` replaced `old` as the deployed template.
pub fn diff_templates(old: &Template, new: &Template) -> TemplateDiff {
    let mut resources = vec![];
    let ids: BTreeSet<&String> = old.resources.keys().chain(new.resources.keys()).collect();
    for id in ids {
        let kind = match (old.resources.get(id), new.resources.get(id)) {
            (None, Some(_)) => ChangeKind::Added,
            (Some(_), None) => ChangeKind::Removed,
            (Some(a), Some(b)) if a.ty != b.ty => ChangeKind::Replaced {
                old_type: a.ty.clone(),
                new_type: b.ty.clone(),
            },
            (Some(a), Some(b)) => {
                let properties = changed_properties(a, b);
                if properties.is_empty() {
                    continue;
                }
                ChangeKind::Modified { properties }
            }
            (None, None) => continue,
        };
        resources.push(ResourceChange { logical_id: id.clone(), kind });
    }
    TemplateDiff {
        resources,
        parameters: changed_keys(&old.parameters, &new.parameters),
        outputs: changed_keys(&old.outputs, &new.outputs),
    }
}
