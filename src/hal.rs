//! Wire-level hypermedia convention used by the Matchday server.
//!
//! Every resource carries a `_links` map (name → `{href}`) and collection
//! resources carry an `_embedded` map (collection name → array of records).
//! Older server versions place the record array directly under the bare
//! collection name, so lookups probe both shapes and prefer the wrapped one.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::PageCursor;

/// A named hypermedia reference to a related resource.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub href: String,
}

/// The `_links` map of a resource.
///
/// Backed by a `BTreeMap` so iteration order is deterministic. Entries that
/// do not carry a string `href` (e.g. curie arrays) are dropped on decode
/// rather than failing the whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links(BTreeMap<String, Link>);

impl Links {
    pub fn get(&self, name: &str) -> Option<&Link> {
        self.0.get(name)
    }

    pub fn href(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|l| l.href.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Link)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Links {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let links = raw
            .into_iter()
            .filter_map(|(name, value)| {
                let href = value.get("href")?.as_str()?.to_owned();
                Some((name, Link { href }))
            })
            .collect();
        Ok(Links(links))
    }
}

impl FromIterator<(String, Link)> for Links {
    fn from_iter<I: IntoIterator<Item = (String, Link)>>(iter: I) -> Self {
        Links(iter.into_iter().collect())
    }
}

/// A decoded hypermedia document: typed links plus raw embedded records.
///
/// Records stay as `serde_json::Value` here; the builders in [`crate::build`]
/// turn them into domain entities.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    #[serde(rename = "_links", default)]
    links: Links,
    #[serde(rename = "_embedded", default)]
    embedded: Map<String, Value>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl Document {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.get(name)
    }

    pub fn href(&self, name: &str) -> Option<&str> {
        self.links.href(name)
    }

    /// The embedded record array named `name`.
    ///
    /// Probes `_embedded.<name>` first, then a bare top-level `<name>` array;
    /// an empty slice when neither shape is present.
    pub fn embedded(&self, name: &str) -> &[Value] {
        if let Some(records) = self.embedded.get(name).and_then(Value::as_array) {
            return records;
        }
        self.rest
            .get(name)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A nested hypermedia block stored under a top-level key, e.g. the root
    /// document's `featuredEvents`.
    pub fn sub_document(&self, name: &str) -> Option<Document> {
        let value = self.rest.get(name)?.clone();
        Document::from_value(value).ok()
    }

    /// Continuation cursor from `_links.next`; `None` on the final page.
    pub fn next(&self) -> Option<PageCursor> {
        self.links.href("next").map(|href| PageCursor { href: href.to_owned() })
    }
}
