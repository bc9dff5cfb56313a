//! Composite resource identifiers.
//!
//! Resources that live under a parent (a variable under a project, a key
//! under an organization and project) get a local ID made by joining their
//! identifying segments with a delimiter. Parent slugs may legitimately
//! contain the delimiter, so decomposition anchors the other segments at the
//! ends of the string and lets one segment absorb whatever is left over.
//!
//! ```
//! use circleci_provider::id::{compose, decompose};
//!
//! let id = compose('/', &["my.project", "DEPLOY_TOKEN"]).unwrap();
//! assert_eq!(id, "my.project/DEPLOY_TOKEN");
//!
//! let parts = decompose('/', "team/api/DEPLOY_TOKEN", &["project", "name"]).unwrap();
//! assert_eq!(parts["project"], "team/api");
//! assert_eq!(parts["name"], "DEPLOY_TOKEN");
//! ```

use std::collections::HashMap;

use crate::error::{ProviderError, Result};

/// Join `segments` with `delimiter`. Segments are not escaped.
pub fn compose<S: AsRef<str>>(delimiter: char, segments: &[S]) -> Result<String> {
    if segments.is_empty() {
        return Err(ProviderError::MalformedId(
            "cannot compose an id from zero segments".to_string(),
        ));
    }

    let sep = delimiter.to_string();
    Ok(segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(sep.as_str()))
}

/// Split `id` into the named `fields`; `fields[0]` is the parent and absorbs
/// any extra delimiter-separated tokens.
pub fn decompose(delimiter: char, id: &str, fields: &[&str]) -> Result<HashMap<String, String>> {
    split(delimiter, id, fields, 0)
}

/// The shape of one resource type's composite ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdLayout {
    delimiter: char,
    fields: &'static [&'static str],
    absorbing: usize,
}

impl IdLayout {
    /// A layout whose first field absorbs overflow.
    pub const fn new(delimiter: char, fields: &'static [&'static str]) -> Self {
        Self {
            delimiter,
            fields,
            absorbing: 0,
        }
    }

    /// Let the field at `index` absorb overflow instead of the first one.
    ///
    /// Fields before it take one token each from the front of the ID, fields
    /// after it one token each from the back.
    pub const fn absorbing(mut self, index: usize) -> Self {
        self.absorbing = index;
        self
    }

    /// The expected form, e.g. `ORGANIZATION.PROJECT.TYPE.FINGERPRINT`.
    pub fn shape(&self) -> String {
        shape(self.delimiter, self.fields)
    }

    /// Compose an ID from one value per field.
    pub fn compose<S: AsRef<str>>(&self, segments: &[S]) -> Result<String> {
        if segments.len() != self.fields.len() {
            return Err(ProviderError::MalformedId(format!(
                "expected {} id segments ({}), got {}",
                self.fields.len(),
                self.shape(),
                segments.len()
            )));
        }
        compose(self.delimiter, segments)
    }

    /// Decompose an ID into its named fields.
    pub fn decompose(&self, id: &str) -> Result<HashMap<String, String>> {
        split(self.delimiter, id, self.fields, self.absorbing)
    }
}

fn shape(delimiter: char, fields: &[&str]) -> String {
    let sep = delimiter.to_string();
    fields
        .iter()
        .map(|f| f.to_uppercase())
        .collect::<Vec<_>>()
        .join(sep.as_str())
}

fn split(
    delimiter: char,
    id: &str,
    fields: &[&str],
    absorbing: usize,
) -> Result<HashMap<String, String>> {
    let malformed = || {
        ProviderError::MalformedId(format!(
            "error computing the id \"{}\". Please make sure the ID is in the form {}",
            id,
            shape(delimiter, fields)
        ))
    };

    if fields.is_empty() || absorbing >= fields.len() {
        return Err(malformed());
    }

    let tokens: Vec<&str> = id.split(delimiter).collect();
    if tokens.len() < 2 || tokens.len() < fields.len() {
        return Err(malformed());
    }

    let trailing = fields.len() - absorbing - 1;
    let tail_start = tokens.len() - trailing;

    let sep = delimiter.to_string();
    let mut out = HashMap::with_capacity(fields.len());
    for (field, token) in fields[..absorbing].iter().zip(&tokens) {
        out.insert(field.to_string(), token.to_string());
    }
    out.insert(
        fields[absorbing].to_string(),
        tokens[absorbing..tail_start].join(sep.as_str()),
    );
    for (field, token) in fields[absorbing + 1..].iter().zip(&tokens[tail_start..]) {
        out.insert(field.to_string(), token.to_string());
    }

    if out.values().any(String::is_empty) {
        return Err(malformed());
    }

    Ok(out)
}
