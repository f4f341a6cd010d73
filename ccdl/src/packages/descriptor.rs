//! Build descriptor documents.
//!
//! A descriptor is the JSON document the applications endpoint returns for a
//! build. Only the package list is interpreted; the full document is kept so
//! it can be written next to the packages unchanged.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{FetchError, FetchResult};

/// Endpoint serving build descriptors, selected by the build GUID header.
pub const DESCRIPTOR_URL: &str = "https://cdn-ffc.oobesaas.adobe.com/core/v3/applications";

/// Locale gate on a package.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// Free text such as `"[installLanguage]==en_US || [installLanguage]==fr_FR"`.
    Text(String),
    /// Explicit list of locale tags.
    List(Vec<String>),
    /// Anything else the service sends; matched against its JSON text.
    Other(Value),
}

impl Condition {
    /// An empty condition gates nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Other(value) => matches!(value, Value::Null | Value::Bool(false)),
        }
    }

    /// Whether `locale` appears in the condition.
    ///
    /// Text is matched by substring, lists by membership. This is not an
    /// expression evaluator: `en` matches any condition mentioning `en_US`.
    pub fn mentions(&self, locale: &str) -> bool {
        match self {
            Self::Text(text) => text.contains(locale),
            Self::List(items) => items.iter().any(|i| i == locale),
            Self::Other(value) => value.to_string().contains(locale),
        }
    }
}

/// One downloadable file of a build.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Package {
    /// Path relative to the CDN origin, or an absolute URL.
    #[serde(rename = "Path")]
    pub path: String,

    #[serde(rename = "Type", default)]
    pub kind: Option<String>,

    #[serde(rename = "Condition", default)]
    pub condition: Option<Condition>,

    #[serde(rename = "PackageName", default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PackageList {
    #[serde(rename = "Package", default)]
    package: Vec<Package>,
}

#[derive(Debug, Clone, Deserialize)]
struct DescriptorBody {
    #[serde(rename = "Packages")]
    packages: PackageList,
}

/// A parsed descriptor together with the document it came from.
#[derive(Debug, Clone)]
pub struct Descriptor {
    raw: Value,
    packages: Vec<Package>,
}

impl Descriptor {
    /// Parse a descriptor document. `source_name` identifies it in errors.
    pub fn parse(bytes: &[u8], source_name: &str) -> FetchResult<Self> {
        let malformed = |reason: String| FetchError::MalformedPayload {
            what: "build descriptor",
            source_name: source_name.to_string(),
            reason,
        };

        let raw: Value = serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;
        let body = DescriptorBody::deserialize(&raw).map_err(|e| malformed(e.to_string()))?;

        Ok(Self {
            raw,
            packages: body.packages.package,
        })
    }

    /// Packages in document order.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// The document as compact JSON.
    pub fn to_compact_json(&self) -> String {
        self.raw.to_string()
    }
}
