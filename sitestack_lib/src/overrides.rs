use serde_json::{Map, Value};
use thiserror::Error;

use crate::template::Template;

#[derive(Debug, Error, PartialEq)]
pub enum OverrideError {
    #[error("Property override targets unknown resource '{0}'")]
    UnknownResource(String),
    #[error("Property override on '{logical_id}' has an empty path")]
    EmptyPath { logical_id: String },
    #[error("Property override path '{path}': index {index} is out of bounds for a list of {len} items")]
    IndexOutOfBounds { path: String, index: usize, len: usize },
    #[error("Property override path '{path}': '{segment}' does not address an object or a list")]
    NotAContainer { path: String, segment: String },
}

/// A raw patch applied to a resource's `Properties` after the template
/// has been synthesized. Used for settings that the typed resource
/// builders do not expose.
///
/// `path` is dot separated. Numeric segments index into lists that already exist,
/// any other missing segment is created as an object.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyOverride {
    pub logical_id: String,
    pub path: String,
    pub value: Value,
}

impl PropertyOverride {
    pub fn new<S1: Into<String>, S2: Into<String>>(logical_id: S1, path: S2, value: Value) -> Self {
        Self { logical_id: logical_id.into(), path: path.into(), value }
    }

    pub fn apply(&self, template: &mut Template) -> Result<(), OverrideError> {
        let resource = template.resources.get_mut(&self.logical_id)
            .ok_or_else(|| OverrideError::UnknownResource(self.logical_id.clone()))?;
        let segments: Vec<&str> = self.path.split('.').filter(|s| !s.is_empty()).collect();
        let (last, parents) = segments.split_last()
            .ok_or_else(|| OverrideError::EmptyPath { logical_id: self.logical_id.clone() })?;

        let mut current = &mut resource.properties;
        for segment in parents {
            current = self.step(current, segment)?;
        }
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        match current {
            Value::Object(map) => {
                map.insert(last.to_string(), self.value.clone());
            }
            Value::Array(items) => {
                let index = self.index(last, items.len())?;
                items[index] = self.value.clone();
            }
            _ => {
                return Err(OverrideError::NotAContainer { path: self.path.clone(), segment: last.to_string() });
            }
        }
        Ok(())
    }

    fn step<'a>(&self, current: &'a mut Value, segment: &str) -> Result<&'a mut Value, OverrideError> {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        match current {
            Value::Object(map) => Ok(map.entry(segment.to_string()).or_insert(Value::Null)),
            Value::Array(items) => {
                let index = self.index(segment, items.len())?;
                Ok(&mut items[index])
            }
            _ => Err(OverrideError::NotAContainer { path: self.path.clone(), segment: segment.to_string() }),
        }
    }

    fn index(&self, segment: &str, len: usize) -> Result<usize, OverrideError> {
        let index: usize = segment.parse()
            .map_err(|_| OverrideError::NotAContainer { path: self.path.clone(), segment: segment.to_string() })?;
        if index >= len {
            return Err(OverrideError::IndexOutOfBounds { path: self.path.clone(), index, len });
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::SavedResource;
    use serde_json::json;

    fn template_with(properties: Value) -> Template {
        let mut t = Template::default();
        t.resources.insert("Dist".into(), SavedResource {
            ty: "AWS::CloudFront::Distribution".into(),
            properties,
            ..Default::default()
        });
        t
    }

    #[test]
    fn writes_into_existing_list_element() {
        let mut t = template_with(json!({
            "DistributionConfig": { "Origins": [{ "Id": "origin1" }] }
        }));
        PropertyOverride::new("Dist", "DistributionConfig.Origins.0.OriginAccessControlId", json!({"Fn::GetAtt": ["Oac", "Id"]}))
            .apply(&mut t).unwrap();
        assert_eq!(
            t.resources["Dist"].properties["DistributionConfig"]["Origins"][0]["OriginAccessControlId"],
            json!({"Fn::GetAtt": ["Oac", "Id"]})
        );
        assert_eq!(t.resources["Dist"].properties["DistributionConfig"]["Origins"][0]["Id"], "origin1");
    }

    #[test]
    fn creates_missing_objects() {
        let mut t = template_with(Value::Null);
        PropertyOverride::new("Dist", "A.B.C", json!(1)).apply(&mut t).unwrap();
        assert_eq!(t.resources["Dist"].properties, json!({"A": {"B": {"C": 1}}}));
    }

    #[test]
    fn out_of_bounds_index_is_an_error() {
        let mut t = template_with(json!({ "DistributionConfig": { "Origins": [] } }));
        let err = PropertyOverride::new("Dist", "DistributionConfig.Origins.0.X", json!("y"))
            .apply(&mut t).unwrap_err();
        assert_eq!(err, OverrideError::IndexOutOfBounds {
            path: "DistributionConfig.Origins.0.X".into(), index: 0, len: 0,
        });
    }

    #[test]
    fn unknown_resource_is_an_error() {
        let mut t = template_with(json!({}));
        let err = PropertyOverride::new("Nope", "A", json!(1)).apply(&mut t).unwrap_err();
        assert_eq!(err, OverrideError::UnknownResource("Nope".into()));
    }
}
