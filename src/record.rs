use ldap3::SearchEntry;
use std::collections::HashMap;
use std::fmt;

/// A field value read off a directory object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    Multi(Vec<String>),
}

impl Value {
    /// Collapse a container holding exactly one value down to that value
    pub fn unwrap_single(self) -> Value {
        match self {
            Value::Multi(mut values) if values.len() == 1 => {
                Value::Scalar(values.remove(0))
            }
            value => value,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Scalar(value) => write!(f, "{}", value),
            Value::Multi(values) => write!(f, "{}", values.join("; ")),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(values: Vec<String>) -> Self {
        Value::Multi(values)
    }
}

/// Anything whose fields can be looked up by name at run time
///
/// Unknown fields are `None`, never an error.
pub trait Record {
    fn get(&self, field: &str) -> Option<Value>;

    /// Text shown for a field in tables and sheets; absent fields show as
    /// the empty string
    fn display(&self, field: &str) -> String {
        self.get(field)
            .map(|value| value.unwrap_single().to_string())
            .unwrap_or_default()
    }
}

impl Record for HashMap<String, Value> {
    fn get(&self, field: &str) -> Option<Value> {
        HashMap::get(self, field).cloned()
    }
}

/// An object returned by a directory search
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryEntry {
    /// Distinguished name
    pub dn: String,
    /// Attribute values keyed by the name the server returned
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        DirectoryEntry { dn: dn.into(), attrs: HashMap::new() }
    }

    /// Builder used mostly by tests and fakes
    pub fn with(mut self, name: impl Into<String>, values: &[&str]) -> Self {
        let values = values.iter().map(|value| value.to_string()).collect();
        self.attrs.insert(name.into(), values);
        self
    }

    /// Attribute names are case-insensitive in LDAP
    pub fn attr(&self, name: &str) -> Option<&Vec<String>> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values)
    }
}

impl Record for DirectoryEntry {
    fn get(&self, field: &str) -> Option<Value> {
        if field.eq_ignore_ascii_case("dn") || field.eq_ignore_ascii_case("distinguishedName") {
            return Some(Value::Scalar(self.dn.clone()));
        }
        self.attr(field).cloned().map(Value::Multi)
    }
}

impl From<SearchEntry> for DirectoryEntry {
    fn from(entry: SearchEntry) -> Self {
        DirectoryEntry { dn: entry.dn, attrs: entry.attrs }
    }
}
