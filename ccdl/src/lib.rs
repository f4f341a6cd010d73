//! ccdl - offline package retrieval for the Creative Cloud catalog
//!
//! This library resolves an application against the vendor's product catalog,
//! downloads its packages and those of its dependencies through a persistent
//! cache, and lays them out as an installer bundle the vendor's installer
//! agent can consume.
//!
//! # Pipeline
//!
//! ```text
//! Retriever::fetch_catalog ──► Catalog ──► resolve ──► ResolvedFetchPlan
//!                                                          │
//!                        Orchestrator::run ◄───────────────┘
//!                          ├── fetch_descriptor ──► select_packages
//!                          ├── fetch_package_file (cache ──► bundle)
//!                          └── InstallerBundle::finalize (driver.xml)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ccdl::{
//!     bundle_for, FetchRequest, HttpTransport, Orchestrator, PlatformSelection,
//!     Retriever, RetrieverConfig, SelectionCriteria, TargetOs, Arch, UrlVersion,
//! };
//!
//! # fn main() -> ccdl::FetchResult<()> {
//! let config = RetrieverConfig::new().with_cache_dir("/tmp/ccdl-cache");
//! let transport = Arc::new(HttpTransport::new(config.timeout)?);
//! let retriever = Retriever::new(transport, &config)?;
//!
//! let platforms = PlatformSelection::new(TargetOs::MacOs, Arch::Arm64)?;
//! let catalog = retriever.fetch_catalog(UrlVersion::V6, &platforms.family, &platforms.allowed)?;
//!
//! let product = catalog.product("PHSP").expect("in catalog");
//! let build = product.default_version(&platforms.allowed).expect("buildable");
//! let request = FetchRequest {
//!     product,
//!     build,
//!     criteria: SelectionCriteria::new("en_US"),
//!     destination: Some("/tmp/out".into()),
//! };
//! let bundle = bundle_for(platforms.os);
//! Orchestrator::new(&retriever, &catalog, &platforms.allowed).run(&request, bundle.as_ref())?;
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod locale;
pub mod logging;
pub mod orchestrator;
pub mod packages;
pub mod platform;
pub mod resolve;
pub mod retriever;
pub mod transfer;

pub use bundle::{bundle_for, bundle_name, BundleLayout, InstallerBundle, MacAppBundle, WindowsBundle};
pub use catalog::{BuildRecord, Catalog, CatalogEntry, Dependency, UrlVersion};
pub use config::{ConfigFile, RetrieverConfig};
pub use driver::DriverManifest;
pub use error::{FetchError, FetchResult};
pub use orchestrator::{FetchRequest, Orchestrator, ProductReport, RunReport};
pub use packages::{SelectionCriteria, ALL_LANGUAGES};
pub use platform::{Arch, PlatformSelection, TargetOs};
pub use resolve::{resolve, PlanEntry, ResolvedFetchPlan};
pub use retriever::{Materialized, Retriever};
pub use transfer::{HttpTransport, TransferProgress, Transport};
