//! Typed access into unstructured Kubernetes documents.
//!
//! Resource bodies arrive as JSON, so a [`Document`] is a `serde_json::Value`.
//! Every lookup goes through [`DocumentExt`] and yields `None` when a node is
//! missing or has the wrong shape, instead of failing at runtime.

use serde_json::{Map, Value};

/// A resource body: scalar, sequence or string-keyed mapping.
pub type Document = Value;

/// Annotation kubectl and Argo CD use to store the previously applied manifest.
pub const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

/// Safe, shape-checked accessors for [`Document`].
pub trait DocumentExt {
    /// Walk a path of mapping keys. Absent if any step is not a mapping or
    /// lacks the key.
    fn path(&self, keys: &[&str]) -> Option<&Value>;

    /// Like [`path`](Self::path) but treats an explicit `null` as absent.
    fn non_null_at(&self, keys: &[&str]) -> Option<&Value> {
        self.path(keys).filter(|v| !v.is_null())
    }

    fn mapping_at(&self, keys: &[&str]) -> Option<&Map<String, Value>> {
        self.path(keys).and_then(Value::as_object)
    }

    fn sequence_at(&self, keys: &[&str]) -> Option<&Vec<Value>> {
        self.path(keys).and_then(Value::as_array)
    }

    fn str_at(&self, keys: &[&str]) -> Option<&str> {
        self.path(keys).and_then(Value::as_str)
    }

    /// Remove the value at `keys`, returning it. Parents are never created.
    fn remove_path(&mut self, keys: &[&str]) -> Option<Value>;

    /// String annotation `metadata.annotations[key]`.
    fn annotation(&self, key: &str) -> Option<&str> {
        self.str_at(&["metadata", "annotations", key])
    }

    fn name(&self) -> Option<&str> {
        self.str_at(&["metadata", "name"])
    }

    fn namespace(&self) -> Option<&str> {
        self.str_at(&["metadata", "namespace"])
    }

    fn api_version(&self) -> Option<&str> {
        self.str_at(&["apiVersion"])
    }

    fn kind(&self) -> Option<&str> {
        self.str_at(&["kind"])
    }
}

impl DocumentExt for Value {
    fn path(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .try_fold(self, |node, key| node.as_object()?.get(*key))
    }

    fn remove_path(&mut self, keys: &[&str]) -> Option<Value> {
        let (last, parents) = keys.split_last()?;
        let mut node = self;
        for key in parents {
            node = node.as_object_mut()?.get_mut(*key)?;
        }
        node.as_object_mut()?.remove(*last)
    }
}

/// Decode a JSON-encoded document as the platform transmits it.
///
/// An empty string and the literal `null` both mean "no object".
pub fn parse_embedded(raw: &str) -> Result<Option<Document>, serde_json::Error> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(raw)?;
    Ok(if value.is_null() { None } else { Some(value) })
}

/// Extract and decode the last-applied annotation of a live object.
///
/// A missing annotation is `Ok(None)`; a present but undecodable one is an error
/// so the caller can decide how loudly to complain.
pub fn last_applied_of(live: &Document) -> Result<Option<Document>, serde_json::Error> {
    match live.annotation(LAST_APPLIED_ANNOTATION) {
        Some(raw) => parse_embedded(raw),
        None => Ok(None),
    }
}
