//! Product model built from the catalog.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Catalog schema version, selecting both the endpoint path and the parse
/// rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UrlVersion {
    V4,
    V5,
    #[default]
    V6,
}

impl UrlVersion {
    /// The number used in the endpoint path and the cache layout.
    pub fn number(&self) -> u8 {
        match self {
            Self::V4 => 4,
            Self::V5 => 5,
            Self::V6 => 6,
        }
    }
}

impl fmt::Display for UrlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

impl FromStr for UrlVersion {
    type Err = String;

    /// Accepts `v4`, `4`, `V6` and so on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix(['v', 'V'])
            .unwrap_or(trimmed);
        match digits {
            "4" => Ok(Self::V4),
            "5" => Ok(Self::V5),
            "6" => Ok(Self::V6),
            _ => Err(format!("unknown catalog version '{}' (expected v4, v5 or v6)", s)),
        }
    }
}

/// A dependency declared by a build: another product at a base version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub code: String,
    pub version: String,
}

/// One buildable version of a product on one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub code: String,
    pub base_version: String,
    pub version: String,
    pub platform: String,
    /// Build GUID, or a manifest path for the reader family. Empty when the
    /// catalog declares none.
    pub build_id: String,
    pub dependencies: Vec<Dependency>,
    pub locales: Vec<String>,
}

impl BuildRecord {
    /// Whether a descriptor can be fetched for this build.
    pub fn has_build(&self) -> bool {
        !self.build_id.is_empty()
    }

    /// Whether the build ships in `locale`.
    pub fn supports_locale(&self, locale: &str) -> bool {
        self.locales.iter().any(|l| l == locale)
    }

    fn is_selectable(&self, allowed: &[String]) -> bool {
        self.has_build() && allowed.iter().any(|p| *p == self.platform)
    }
}

/// A product and its versions in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub code: String,
    pub display_name: String,
    /// Not listed in the primary channel.
    pub hidden: bool,
    versions: Vec<BuildRecord>,
}

impl CatalogEntry {
    pub fn new(code: impl Into<String>, display_name: impl Into<String>, hidden: bool) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
            hidden,
            versions: Vec::new(),
        }
    }

    /// All version slots in insertion order.
    pub fn versions(&self) -> impl Iterator<Item = &BuildRecord> {
        self.versions.iter()
    }

    /// The record stored under version key `version`.
    pub fn version(&self, version: &str) -> Option<&BuildRecord> {
        self.versions.iter().find(|r| r.version == version)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Store `record` under its version key. An existing slot is overwritten
    /// in place and keeps its position.
    pub fn upsert(&mut self, record: BuildRecord) {
        match self.versions.iter_mut().find(|r| r.version == record.version) {
            Some(slot) => *slot = record,
            None => self.versions.push(record),
        }
    }

    /// Versions that have a build on one of the `allowed` platforms.
    pub fn selectable_versions(&self, allowed: &[String]) -> Vec<&BuildRecord> {
        self.versions
            .iter()
            .filter(|r| r.is_selectable(allowed))
            .collect()
    }

    /// The version offered when the user names none.
    pub fn default_version(&self, allowed: &[String]) -> Option<&BuildRecord> {
        self.versions.iter().find(|r| r.is_selectable(allowed))
    }
}

/// Parsed product catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    cdn: String,
    products: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// An empty catalog served from `cdn`.
    pub fn new(cdn: impl Into<String>) -> Self {
        Self {
            cdn: cdn.into(),
            ..Default::default()
        }
    }

    /// Origin that package and manifest paths are relative to.
    pub fn cdn(&self) -> &str {
        &self.cdn
    }

    pub fn product(&self, code: &str) -> Option<&CatalogEntry> {
        self.index.get(code).map(|&i| &self.products[i])
    }

    /// All products in first-seen order.
    pub fn products(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.products.iter()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Shorthand for `product(code)?.version(version)`.
    pub fn build(&self, code: &str, version: &str) -> Option<&BuildRecord> {
        self.product(code).and_then(|p| p.version(version))
    }

    /// Products worth offering: listed in the primary channel and buildable
    /// on one of the `allowed` platforms.
    pub fn visible_products(&self, allowed: &[String]) -> Vec<&CatalogEntry> {
        self.products
            .iter()
            .filter(|p| !p.hidden && !p.selectable_versions(allowed).is_empty())
            .collect()
    }

    /// The entry for `code`, created with the given name and visibility if
    /// this is its first appearance.
    pub fn entry_or_insert(
        &mut self,
        code: &str,
        display_name: &str,
        hidden: bool,
    ) -> &mut CatalogEntry {
        let index = match self.index.get(code) {
            Some(&i) => i,
            None => {
                self.products
                    .push(CatalogEntry::new(code, display_name, hidden));
                let i = self.products.len() - 1;
                self.index.insert(code.to_string(), i);
                i
            }
        };
        &mut self.products[index]
    }
}
