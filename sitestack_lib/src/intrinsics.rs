use std::collections::BTreeSet;

use serde_json::{json, Value};

pub const ACCOUNT_ID: &str = "AWS::AccountId";

/// { "Ref": "logical_id" }
pub fn get_ref(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// { "Fn::GetAtt": ["logical_id", "attribute"] }
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// { "Fn::Sub": "..." }
pub fn sub<S: Into<String>>(s: S) -> Value {
    json!({ "Fn::Sub": s.into() })
}

/// pseudo parameters such as `AWS::AccountId` are provided by
/// cloudformation and are never declared in a template.
pub fn is_pseudo_parameter(name: &str) -> bool {
    name.starts_with("AWS::")
}

/// every logical id (resource or parameter) that `value` refers to
/// via Ref, Fn::GetAtt, or Fn::Sub.
pub fn referenced_ids(value: &Value) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_references(value, &mut out);
    out
}

fn collect_references(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    if !is_pseudo_parameter(target) {
                        out.insert(target.clone());
                    }
                    return;
                }
                if let Some(att) = map.get("Fn::GetAtt") {
                    match att {
                        Value::Array(parts) => {
                            if let Some(Value::String(target)) = parts.first() {
                                out.insert(target.clone());
                            }
                            for part in parts.iter().skip(1) {
                                collect_references(part, out);
                            }
                        }
                        // short form: "Logical.Attribute"
                        Value::String(s) => {
                            if let Some((target, _)) = s.split_once('.') {
                                out.insert(target.to_string());
                            }
                        }
                        other => collect_references(other, out),
                    }
                    return;
                }
                if let Some(sub_value) = map.get("Fn::Sub") {
                    match sub_value {
                        Value::String(s) => sub_references(s, &[], out),
                        Value::Array(parts) => {
                            let vars = parts.get(1).and_then(Value::as_object);
                            let local: Vec<&str> = vars
                                .map(|v| v.keys().map(String::as_str).collect())
                                .unwrap_or_default();
                            if let Some(Value::String(s)) = parts.first() {
                                sub_references(s, &local, out);
                            }
                            if let Some(vars) = vars {
                                for v in vars.values() {
                                    collect_references(v, out);
                                }
                            }
                        }
                        other => collect_references(other, out),
                    }
                    return;
                }
            }
            for v in map.values() {
                collect_references(v, out);
            }
        }
        _ => {}
    }
}

/// parses `${Name}` and `${Name.Attr}` placeholders.
/// `${!Literal}` is an escape and refers to nothing.
fn sub_references(s: &str, local_vars: &[&str], out: &mut BTreeSet<String>) {
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let end = match after.find('}') {
            Some(e) => e,
            None => return,
        };
        let placeholder = after[..end].trim();
        rest = &after[end + 1..];
        if placeholder.starts_with('!') || placeholder.is_empty() {
            continue;
        }
        let target = placeholder.split('.').next().unwrap_or(placeholder);
        if is_pseudo_parameter(target) || local_vars.contains(&target) {
            continue;
        }
        out.insert(target.to_string());
    }
}
