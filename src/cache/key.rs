//! Normalized cache keys
//!
//! A key is a resource plus its filter parameters. Parameters are kept in a sorted
//! map with normalized names, so two keys built from the same filters in any order
//! compare and hash equal.

use crate::types::PersonId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const PERSON_PARAM: &str = "person_id";

/// Server resource backing a paginated view
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Assets,
    People,
    UnassignedFaces,
    FaceProgress,
    Named(String),
}

impl Resource {
    pub fn as_str(&self) -> &str {
        match self {
            Resource::Assets => "assets",
            Resource::People => "people",
            Resource::UnassignedFaces => "unassigned_faces",
            Resource::FaceProgress => "face_progress",
            Resource::Named(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    resource: Resource,
    params: BTreeMap<String, ParamValue>,
}

impl CacheKey {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            params: BTreeMap::new(),
        }
    }

    /// Build a key from unordered parameter pairs.
    pub fn from_params<I, K, V>(resource: Resource, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ParamValue>,
    {
        params
            .into_iter()
            .fold(Self::new(resource), |key, (k, v)| key.with_param(k.as_ref(), v))
    }

    /// Add a filter parameter. Names are trimmed and lowercased; blank text values
    /// are dropped so an empty filter equals an absent one.
    pub fn with_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        let name = name.trim().to_ascii_lowercase();
        let value = match value.into() {
            ParamValue::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    self.params.remove(&name);
                    return self;
                }
                ParamValue::Text(text.to_string())
            }
            other => other,
        };
        self.params.insert(name, value);
        self
    }

    /// The default, unfiltered gallery view
    pub fn gallery() -> Self {
        Self::new(Resource::Assets)
    }

    pub fn person_assets(person_id: PersonId) -> Self {
        Self::new(Resource::Assets).with_param(PERSON_PARAM, person_id)
    }

    pub fn people() -> Self {
        Self::new(Resource::People)
    }

    pub fn unassigned_faces() -> Self {
        Self::new(Resource::UnassignedFaces)
    }

    pub fn face_progress() -> Self {
        Self::new(Resource::FaceProgress)
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    /// Person this view is filtered to, if any
    pub fn person_scope(&self) -> Option<PersonId> {
        match self.params.get(PERSON_PARAM) {
            Some(ParamValue::Int(id)) => Some(*id),
            Some(ParamValue::Text(text)) => text.parse().ok(),
            _ => None,
        }
    }

    /// Person lists and face aggregates whose content is derived server-side
    pub fn is_person_aggregate(&self) -> bool {
        matches!(
            self.resource,
            Resource::People | Resource::UnassignedFaces | Resource::FaceProgress
        )
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource.as_str())?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, k, v)?;
        }
        Ok(())
    }
}
