//! Label sets
//!
//! A [`LabelSet`] maps label names to values with unique names. It keeps
//! insertion order so that a series encodes its labels in a stable order
//! within a single push. On the JSON side it is a plain object, which is what
//! both the import endpoint and the query API speak.

use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};

use crate::remote_write::Label;

/// Ordered, name-unique collection of labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    inner: Vec<Label>,
}

impl LabelSet {
    /// Create an empty [`LabelSet`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`. An existing label is overwritten in place, a new
    /// one is appended.
    pub fn set<N, V>(&mut self, name: N, value: V)
    where
        N: Into<String> + AsRef<str>,
        V: Into<String>,
    {
        if let Some(label) = self.inner.iter_mut().find(|l| l.name == name.as_ref()) {
            label.value = value.into();
            return;
        }
        self.inner.push(Label {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Value of the label `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    /// Whether a label called `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|l| l.name == name)
    }

    /// Remove the label `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.inner.iter().position(|l| l.name == name)?;
        Some(self.inner.remove(idx).value)
    }

    /// Remove and return every label for which `f` holds, preserving order.
    pub fn extract_if<F>(&mut self, mut f: F) -> Vec<Label>
    where
        F: FnMut(&Label) -> bool,
    {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.inner.len());
        for label in self.inner.drain(..) {
            if f(&label) {
                taken.push(label);
            } else {
                kept.push(label);
            }
        }
        self.inner = kept;
        taken
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether there are no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|l| (l.name.as_str(), l.value.as_str()))
    }

    /// The labels in wire form.
    #[must_use]
    pub fn as_slice(&self) -> &[Label] {
        &self.inner
    }
}

impl<N, V> FromIterator<(N, V)> for LabelSet
where
    N: Into<String> + AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut set = LabelSet::new();
        for (name, value) in iter {
            set.set(name, value);
        }
        set
    }
}

impl<const N: usize> From<[(&str, &str); N]> for LabelSet {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<LabelSet> for Vec<Label> {
    fn from(set: LabelSet) -> Self {
        set.inner
    }
}

impl Serialize for LabelSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.inner.len()))?;
        for label in &self.inner {
            map.serialize_entry(&label.name, &label.value)?;
        }
        map.end()
    }
}

struct LabelSetVisitor;

impl<'de> Visitor<'de> for LabelSetVisitor {
    type Value = LabelSet;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of label names to label values")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut set = LabelSet {
            inner: Vec::with_capacity(access.size_hint().unwrap_or(0)),
        };
        while let Some((name, value)) = access.next_entry::<String, String>()? {
            set.set(name, value);
        }
        Ok(set)
    }
}

impl<'de> Deserialize<'de> for LabelSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(LabelSetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use proptest::{collection, prelude::*};

    use super::LabelSet;

    #[test]
    fn set_same_name_overwrites() {
        let mut set = LabelSet::from([("job", "api")]);
        set.set("job", "db");
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("job"), Some("db"));
    }

    #[test]
    fn set_new_name_appends() {
        let mut set = LabelSet::from([("job", "api")]);
        set.set("instance", "a:9100");
        assert_eq!(set.len(), 2);
        let names: Vec<&str> = set.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["job", "instance"]);
    }

    #[test]
    fn extract_if_keeps_order_of_the_rest() {
        let mut set = LabelSet::from([("a", "1"), ("g_b", "2"), ("c", "3"), ("g_d", "4")]);
        let taken = set.extract_if(|l| l.name.starts_with("g_"));
        assert_eq!(taken.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![("a", "1"), ("c", "3")]);
    }

    #[test]
    fn json_object_round_trip() {
        let set: LabelSet =
            serde_json::from_str(r#"{"__name__":"cpu","job":"node"}"#).expect("failed to decode");
        assert_eq!(set.get("__name__"), Some("cpu"));
        let s = serde_json::to_string(&set).expect("failed to encode");
        assert_eq!(s, r#"{"__name__":"cpu","job":"node"}"#);
    }

    proptest! {
        #[test]
        fn names_stay_unique(pairs in collection::vec(("[a-c]{1,2}", "[a-z]{0,4}"), 0..32)) {
            let set: LabelSet = pairs.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
            let mut names: Vec<&str> = set.iter().map(|(n, _)| n).collect();
            let total = names.len();
            names.sort_unstable();
            names.dedup();
            prop_assert_eq!(names.len(), total);
            for (name, _) in &pairs {
                let last = pairs.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v.as_str());
                prop_assert_eq!(set.get(name), last);
            }
        }
    }
}
