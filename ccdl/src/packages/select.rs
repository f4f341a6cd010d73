//! Choosing which packages of a build to download.

use super::descriptor::Package;

/// Install language that selects every package.
pub const ALL_LANGUAGES: &str = "ALL";

/// Package type that is always selected.
pub const CORE_TYPE: &str = "core";

/// Languages the selection is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// Requested install language, or `ALL`.
    pub language: String,
    /// The operating system's language, also accepted by conditions.
    pub os_language: Option<String>,
}

impl SelectionCriteria {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            os_language: None,
        }
    }

    pub fn with_os_language(mut self, language: impl Into<String>) -> Self {
        self.os_language = Some(language.into());
        self
    }

    fn accepts(&self, package: &Package) -> bool {
        if self.language == ALL_LANGUAGES {
            return true;
        }
        match &package.condition {
            None => true,
            Some(condition) if condition.is_empty() => true,
            Some(condition) => {
                condition.mentions(&self.language)
                    || self
                        .os_language
                        .as_deref()
                        .is_some_and(|os| condition.mentions(os))
            }
        }
    }
}

/// Packages chosen from one descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection<'a> {
    /// Selected packages in document order.
    pub packages: Vec<&'a Package>,
    pub core_count: usize,
    pub non_core_count: usize,
}

impl Selection<'_> {
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

fn is_core(package: &Package) -> bool {
    package.kind.as_deref() == Some(CORE_TYPE)
}

/// Select the core packages plus the language packages `criteria` asks for.
pub fn select_packages<'a>(packages: &'a [Package], criteria: &SelectionCriteria) -> Selection<'a> {
    let mut selection = Selection::default();

    for package in packages {
        if is_core(package) {
            selection.core_count += 1;
        } else if criteria.accepts(package) {
            selection.non_core_count += 1;
        } else {
            continue;
        }
        selection.packages.push(package);
    }

    selection
}
