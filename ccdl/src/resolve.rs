//! Dependency resolution.
//!
//! Turns a chosen build into the ordered list of builds to fetch: the build
//! itself followed by one build per declared dependency. A dependency names a
//! product and a base version; the first build of that product with the same
//! base version on an allowed platform wins, else the first build with that
//! base version on any platform. Records without a build id never match.

use tracing::debug;

use crate::catalog::{BuildRecord, Catalog};
use crate::error::{FetchError, FetchResult};

/// One build to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub code: String,
    pub version: String,
    pub build_id: String,
}

/// Builds to fetch, primary product first, dependencies in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFetchPlan {
    entries: Vec<PlanEntry>,
}

impl ResolvedFetchPlan {
    /// The primary product.
    pub fn primary(&self) -> &PlanEntry {
        &self.entries[0]
    }

    /// The dependencies, in the order the primary build declares them.
    pub fn dependencies(&self) -> &[PlanEntry] {
        &self.entries[1..]
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a plan holds at least the primary product.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve `primary` and its dependencies against `catalog`.
pub fn resolve(
    catalog: &Catalog,
    primary: &BuildRecord,
    allowed: &[String],
) -> FetchResult<ResolvedFetchPlan> {
    let mut entries = Vec::with_capacity(primary.dependencies.len() + 1);
    entries.push(PlanEntry {
        code: primary.code.clone(),
        version: primary.version.clone(),
        build_id: primary.build_id.clone(),
    });

    for dependency in &primary.dependencies {
        let unresolved = || FetchError::UnresolvedDependency {
            code: dependency.code.clone(),
            version: dependency.version.clone(),
        };

        let product = catalog.product(&dependency.code).ok_or_else(unresolved)?;
        let mut matching = product
            .versions()
            .filter(|r| r.base_version == dependency.version && r.has_build())
            .peekable();
        let first = matching.peek().copied().ok_or_else(unresolved)?;
        let chosen = matching
            .find(|r| allowed.contains(&r.platform))
            .unwrap_or(first);

        debug!(
            code = %dependency.code,
            version = %dependency.version,
            platform = %chosen.platform,
            build_id = %chosen.build_id,
            "Resolved dependency"
        );
        entries.push(PlanEntry {
            code: dependency.code.clone(),
            version: dependency.version.clone(),
            build_id: chosen.build_id.clone(),
        });
    }

    Ok(ResolvedFetchPlan { entries })
}
