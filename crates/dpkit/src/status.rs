use alloc::string::String;

use hashbrown::DefaultHashBuilder;
use indexmap::IndexMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The value of a schema code.
///
/// The same shape describes both the last known value of a schema code and a
/// live update published by a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    /// Schema code.
    pub code: String,
    /// Current value.
    pub value: Value,
}

impl Status {
    /// Creates a [`Status`].
    #[must_use]
    #[inline]
    pub fn new(code: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            code: code.into(),
            value: value.into(),
        }
    }
}

/// A live update published by a device.
pub type StatusUpdate = Status;

/// A command sent to a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Schema code.
    pub code: String,
    /// Value to write.
    pub value: Value,
}

impl Command {
    /// Creates a [`Command`].
    #[must_use]
    #[inline]
    pub fn new(code: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            code: code.into(),
            value: value.into(),
        }
    }
}

/// The last known values of a device, indexed by schema code.
///
/// Codes preserve the order in which they were first reported.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMap(IndexMap<String, Value, DefaultHashBuilder>);

impl Default for StatusMap {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusMap {
    /// Creates an empty [`StatusMap`].
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self(IndexMap::with_hasher(DefaultHashBuilder::default()))
    }

    /// Stores a [`Status`], returning the previous value of its code.
    #[inline]
    pub fn update(&mut self, status: Status) -> Option<Value> {
        self.0.insert(status.code, status.value)
    }

    /// Returns the [`Status`] of a code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<Status> {
        self.0
            .get_key_value(code)
            .map(|(code, value)| Status::new(code.clone(), value.clone()))
    }

    /// Returns the value of a code.
    #[must_use]
    #[inline]
    pub fn value(&self, code: &str) -> Option<&Value> {
        self.0.get(code)
    }

    /// Returns the number of stored codes.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether the map is empty.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over codes and values.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(code, value)| (code.as_str(), value))
    }
}

impl FromIterator<Status> for StatusMap {
    fn from_iter<I: IntoIterator<Item = Status>>(iter: I) -> Self {
        let mut map = Self::new();
        for status in iter {
            let _ = map.update(status);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use serde_json::json;

    use crate::deserialize;

    use super::{Command, Status, StatusMap};

    #[test]
    fn test_status_list() {
        let statuses: Vec<Status> = deserialize(json!([
            { "code": "switch", "value": true },
            { "code": "percent_state", "value": 40 },
            { "code": "colour_data", "value": "{\"h\":10,\"s\":500,\"v\":800}" },
        ]));

        let mut map: StatusMap = statuses.into_iter().collect();
        assert_eq!(map.len(), 3);
        assert_eq!(map.value("switch"), Some(&json!(true)));
        assert_eq!(map.get("percent_state"), Some(Status::new("percent_state", 40)));
        assert!(map.get("control").is_none());

        assert_eq!(
            map.update(Status::new("percent_state", 60)),
            Some(json!(40))
        );
        assert_eq!(
            map.iter().map(|(code, _)| code).collect::<Vec<_>>(),
            ["switch", "percent_state", "colour_data"]
        );
    }

    #[test]
    fn test_command() {
        assert_eq!(
            Command::new("control", "open"),
            deserialize::<Command>(json!({ "code": "control", "value": "open" }))
        );
    }
}
