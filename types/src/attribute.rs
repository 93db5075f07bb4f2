//! Free-form node attributes (`Key:Value` pairs).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::TypesError;

/// A single key/value attribute advertised in a node descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAttribute {
    pub key: String,
    pub value: String,
}

impl NodeAttribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse a `Key:Value` string.
    ///
    /// The first unescaped `:` separates key from value. A backslash escapes
    /// the following character, so `\:` yields a literal colon. Both parts
    /// must be non-empty.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let invalid = |reason: &str| TypesError::InvalidAttribute {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut key = String::new();
        let mut value = String::new();
        let mut in_value = false;
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            let target = if in_value { &mut value } else { &mut key };
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => target.push(escaped),
                    None => return Err(invalid("dangling escape")),
                },
                ':' if !in_value => in_value = true,
                other => target.push(other),
            }
        }

        if !in_value {
            return Err(invalid("missing ':' separator"));
        }
        if key.is_empty() {
            return Err(invalid("empty key"));
        }
        if value.is_empty() {
            return Err(invalid("empty value"));
        }

        Ok(Self { key, value })
    }
}

impl fmt::Display for NodeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.key.replace('\\', "\\\\").replace(':', "\\:"),
            self.value.replace('\\', "\\\\")
        )
    }
}

/// Parse a list of `Key:Value` strings, rejecting duplicate keys.
pub fn parse_attributes<S: AsRef<str>>(raw: &[S]) -> Result<Vec<NodeAttribute>, TypesError> {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut attributes = Vec::with_capacity(raw.len());

    for item in raw {
        let attribute = NodeAttribute::parse(item.as_ref())?;
        if !seen.insert(attribute.key.clone()) {
            return Err(TypesError::DuplicateAttribute(attribute.key));
        }
        attributes.push(attribute);
    }

    Ok(attributes)
}
