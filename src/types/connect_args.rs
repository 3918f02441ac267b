use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CredentialsError, Result};

/// Extra keyword arguments handed verbatim to a dialect's connect call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ConnectArgs(BTreeMap<String, Value>);

impl ConnectArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(wrong_type(key, "a string")),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(wrong_type(key, "a boolean")),
        }
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .map(Some)
                .ok_or_else(|| wrong_type(key, "a non-negative integer")),
        }
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| wrong_type(key, "a number")),
        }
    }

    /// Fails on the first key not listed in `allowed`.
    pub fn ensure_only(&self, allowed: &[&str]) -> Result<()> {
        match self.keys().find(|key| !allowed.contains(key)) {
            Some(key) => Err(CredentialsError::InvalidConnectArg {
                key: key.to_string(),
                reason: format!("not accepted by this dialect (expected one of {:?})", allowed),
            }),
            None => Ok(()),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ConnectArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

fn wrong_type(key: &str, expected: &str) -> CredentialsError {
    CredentialsError::InvalidConnectArg {
        key: key.to_string(),
        reason: format!("expected {}", expected),
    }
}
