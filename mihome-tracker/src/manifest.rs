//! Ad-hoc install manifest schema.
//!
//! The CDN serves one property list per build. Only a handful of keys are
//! consumed:
//!
//! ```text
//! items[]
//!   metadata
//!     bundle-identifier   "com.xiaomi.mihome.dailybuild"
//!     bundle-version      "8.1.2"
//!   assets[]
//!     kind                "software-package"
//!     url                 "https://.../MiHome.ipa"
//! ```
//!
//! The document is read as an untyped [`plist::Value`] and each item is
//! picked apart on its own. A missing key or a value of unexpected type reads
//! as absent, so one odd item never hides a valid one next to it. Only a body
//! that is not a property list at all fails to parse.

use std::io::Cursor;

use plist::{Dictionary, Value};

/// Asset kind pointing at the installable package.
pub const SOFTWARE_PACKAGE_KIND: &str = "software-package";

/// A parsed manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub items: Vec<ManifestItem>,
}

/// The fields of one item the prober needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestItem {
    /// `metadata.bundle-identifier`, empty when absent.
    pub bundle_identifier: String,
    /// `metadata.bundle-version`, empty when absent.
    pub bundle_version: String,
    /// URL of the first `software-package` asset. An empty URL counts as
    /// absent.
    pub package_url: Option<String>,
}

impl Manifest {
    /// Parse a binary or XML property list.
    pub fn parse(bytes: &[u8]) -> Result<Self, plist::Error> {
        let root = Value::from_reader(Cursor::new(bytes))?;

        let items = root
            .as_dictionary()
            .and_then(|root| root.get("items"))
            .and_then(Value::as_array)
            .map(|items| items.iter().map(ManifestItem::from_value).collect())
            .unwrap_or_default();

        Ok(Self { items })
    }

    /// Items whose bundle identifier matches exactly.
    pub fn items_for<'a>(
        &'a self,
        bundle_identifier: &'a str,
    ) -> impl Iterator<Item = &'a ManifestItem> + 'a {
        self.items
            .iter()
            .filter(move |item| item.bundle_identifier == bundle_identifier)
    }
}

impl ManifestItem {
    fn from_value(value: &Value) -> Self {
        let item = value.as_dictionary();
        let metadata = item
            .and_then(|item| item.get("metadata"))
            .and_then(Value::as_dictionary);

        let package_url = item
            .and_then(|item| item.get("assets"))
            .and_then(Value::as_array)
            .and_then(|assets| {
                assets
                    .iter()
                    .filter_map(Value::as_dictionary)
                    .find(|asset| string(Some(asset), "kind") == Some(SOFTWARE_PACKAGE_KIND))
            })
            .and_then(|asset| string(Some(asset), "url"))
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        Self {
            bundle_identifier: string(metadata, "bundle-identifier")
                .unwrap_or_default()
                .to_string(),
            bundle_version: string(metadata, "bundle-version")
                .unwrap_or_default()
                .to_string(),
            package_url,
        }
    }
}

fn string<'a>(dict: Option<&'a Dictionary>, key: &str) -> Option<&'a str> {
    dict.and_then(|dict| dict.get(key)).and_then(Value::as_string)
}

/// Manifest builders for tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use plist::{Dictionary, Value};

    use super::SOFTWARE_PACKAGE_KIND;

    /// A dictionary value from key/value pairs.
    pub(crate) fn dict(entries: Vec<(&str, Value)>) -> Value {
        let mut dict = Dictionary::new();
        for (key, value) in entries {
            dict.insert(key.to_string(), value);
        }
        Value::Dictionary(dict)
    }

    /// A string value.
    pub(crate) fn text(s: &str) -> Value {
        Value::String(s.to_string())
    }

    /// An item with the given metadata and `(kind, url)` assets.
    pub(crate) fn item(
        bundle_identifier: &str,
        bundle_version: &str,
        assets: &[(&str, &str)],
    ) -> Value {
        let assets = assets
            .iter()
            .map(|(kind, url)| dict(vec![("kind", text(kind)), ("url", text(url))]))
            .collect();

        dict(vec![
            (
                "metadata",
                dict(vec![
                    ("bundle-identifier", text(bundle_identifier)),
                    ("bundle-version", text(bundle_version)),
                ]),
            ),
            ("assets", Value::Array(assets)),
        ])
    }

    /// An item with one software-package asset.
    pub(crate) fn package_item(
        bundle_identifier: &str,
        bundle_version: &str,
        url: &str,
    ) -> Value {
        item(bundle_identifier, bundle_version, &[(SOFTWARE_PACKAGE_KIND, url)])
    }

    /// An XML manifest listing `items`.
    pub(crate) fn manifest_xml(items: Vec<Value>) -> Vec<u8> {
        let mut out = Vec::new();
        dict(vec![("items", Value::Array(items))])
            .to_writer_xml(&mut out)
            .unwrap();
        out
    }
}
