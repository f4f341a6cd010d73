//! Drives a complete retrieval run.
//!
//! A run goes through these stages:
//! 1. Resolve the chosen build and its dependencies into a fetch plan
//! 2. Prepare the installer bundle, if a destination was given
//! 3. Fetch every build descriptor and stage it as `application.json`
//! 4. Select and fetch each build's packages into its product directory
//! 5. Write `driver.xml` and finish the bundle
//!
//! The reader family skips all of this: its build id points at a manifest
//! naming one disk image, which is downloaded as-is.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::bundle::{bundle_name, BundleLayout, InstallerBundle};
use crate::catalog::{BuildRecord, Catalog, CatalogEntry, READER_FAMILY_CODE};
use crate::driver::DriverManifest;
use crate::error::{FetchError, FetchResult};
use crate::packages::{select_packages, Descriptor, SelectionCriteria};
use crate::resolve::{resolve, PlanEntry};
use crate::retriever::{Materialized, Retriever};

/// File each product directory carries its descriptor in.
pub const DESCRIPTOR_FILENAME: &str = "application.json";

/// Path of the disk image inside a reader-family manifest.
const ASSET_PATH: &str = "asset_list/asset/asset_path";

/// What to retrieve.
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub product: &'a CatalogEntry,
    pub build: &'a BuildRecord,
    pub criteria: SelectionCriteria,
    /// Where to assemble the installer. `None` only fills the cache.
    pub destination: Option<PathBuf>,
}

/// Packages fetched for one build of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductReport {
    pub code: String,
    pub version: String,
    pub core_packages: usize,
    pub non_core_packages: usize,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// One entry per plan entry, primary first.
    pub products: Vec<ProductReport>,
    /// Bundle root to run, when a bundle was assembled.
    pub bundle: Option<PathBuf>,
    /// The disk image of a reader-family run.
    pub asset: Option<Materialized>,
}

/// Runs fetch plans against one catalog.
pub struct Orchestrator<'a> {
    retriever: &'a Retriever,
    catalog: &'a Catalog,
    allowed: &'a [String],
}

impl<'a> Orchestrator<'a> {
    pub fn new(retriever: &'a Retriever, catalog: &'a Catalog, allowed: &'a [String]) -> Self {
        Self {
            retriever,
            catalog,
            allowed,
        }
    }

    /// Retrieve everything `request` needs, assembling it with `bundle`.
    pub fn run(
        &self,
        request: &FetchRequest<'_>,
        bundle: &dyn InstallerBundle,
    ) -> FetchResult<RunReport> {
        if request.build.code == READER_FAMILY_CODE {
            return self.run_single_image(request);
        }

        let plan = resolve(self.catalog, request.build, self.allowed)?;
        info!(
            code = %request.build.code,
            version = %request.build.version,
            language = %request.criteria.language,
            builds = plan.len(),
            "Resolved fetch plan"
        );

        let layout = match &request.destination {
            Some(destination) => {
                let name = bundle_name(
                    &request.build.code,
                    &request.build.version,
                    &request.criteria.language,
                    &request.build.platform,
                );
                info!(%name, "Creating installer bundle");
                Some(bundle.prepare(destination, &name)?)
            }
            None => None,
        };

        info!("Preparing");
        let mut descriptors = Vec::with_capacity(plan.len());
        for entry in plan.entries() {
            info!(code = %entry.code, version = %entry.version, build_id = %entry.build_id, "Retrieving descriptor");
            let descriptor = self.retriever.fetch_descriptor(&entry.build_id)?;
            if let Some(layout) = &layout {
                stage_descriptor(&layout.product_dir(&entry.code), &descriptor)?;
            }
            descriptors.push(descriptor);
        }

        info!("Downloading");
        let mut report = RunReport::default();
        for (entry, descriptor) in plan.entries().iter().zip(&descriptors) {
            let product_dir = layout.as_ref().map(|l| l.product_dir(&entry.code));
            report
                .products
                .push(self.fetch_packages(entry, descriptor, &request.criteria, product_dir.as_deref())?);
        }
        info!("Package retrieval finished");

        if let Some(layout) = layout {
            report.bundle = Some(self.finish_bundle(request, bundle, &layout)?);
        }
        Ok(report)
    }

    fn fetch_packages(
        &self,
        entry: &PlanEntry,
        descriptor: &Descriptor,
        criteria: &SelectionCriteria,
        product_dir: Option<&Path>,
    ) -> FetchResult<ProductReport> {
        let selection = select_packages(descriptor.packages(), criteria);
        info!(
            code = %entry.code,
            version = %entry.version,
            "Selected {} core packages and {} non-core packages",
            selection.core_count,
            selection.non_core_count
        );

        for package in &selection.packages {
            info!(code = %entry.code, path = %package.path, "Retrieving package");
            self.retriever
                .fetch_package_file(self.catalog.cdn(), &package.path, product_dir, None)?;
        }

        Ok(ProductReport {
            code: entry.code.clone(),
            version: entry.version.clone(),
            core_packages: selection.core_count,
            non_core_packages: selection.non_core_count,
        })
    }

    fn finish_bundle(
        &self,
        request: &FetchRequest<'_>,
        bundle: &dyn InstallerBundle,
        layout: &BundleLayout,
    ) -> FetchResult<PathBuf> {
        let manifest = DriverManifest::new(
            request.product,
            request.build,
            request.criteria.language.clone(),
            bundle.install_dir(),
        );
        let root = bundle.finalize(layout, &manifest)?;
        info!(path = %root.display(), "Installer bundle ready");
        Ok(root)
    }

    /// Download the single disk image a reader-family manifest points at.
    fn run_single_image(&self, request: &FetchRequest<'_>) -> FetchResult<RunReport> {
        let build = request.build;
        let manifest = self
            .retriever
            .fetch_manifest(self.catalog.cdn(), &build.build_id)?;
        let asset_path = manifest
            .find(ASSET_PATH)
            .map(|e| e.text())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                FetchError::CatalogStructure(format!(
                    "manifest {} has no {}",
                    build.build_id, ASSET_PATH
                ))
            })?;

        let name = format!("{}_{}_{}.dmg", build.code, build.version, build.platform);
        info!(code = %build.code, version = %build.version, %name, "Retrieving disk image");

        let placed = self.retriever.fetch_package_file(
            self.catalog.cdn(),
            asset_path,
            request.destination.as_deref(),
            Some(&name),
        )?;
        if let Some(path) = placed.destination() {
            info!(path = %path.display(), "Installer retrieved");
        }

        Ok(RunReport {
            asset: Some(placed),
            ..Default::default()
        })
    }
}

/// Write a descriptor into `product_dir` as compact JSON.
fn stage_descriptor(product_dir: &Path, descriptor: &Descriptor) -> FetchResult<()> {
    fs::create_dir_all(product_dir).map_err(|e| FetchError::io(product_dir, e))?;
    let path = product_dir.join(DESCRIPTOR_FILENAME);
    fs::write(&path, descriptor.to_compact_json()).map_err(|e| FetchError::io(&path, e))
}
