//! Cache-aware retrieval of catalogs, descriptors, manifests and packages.
//!
//! Every document goes through the same path:
//!
//! ```text
//! cache path? ──no──► fetch_text ──► parse (malformed: fatal)
//!      │yes
//!      ▼
//! valid cached copy? ──yes──► parse ──ok──► done
//!      │no                      │malformed
//!      │◄───── evict ◄──────────┘
//!      ▼
//! fetch_to_file ──► parse (malformed: evict, fatal)
//! ```
//!
//! Package files are downloaded into the cache and then copied into the
//! product directory, or downloaded straight into the product directory when
//! caching is off.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{CacheStore, Resource};
use crate::catalog::{catalog_url, parse_catalog, Catalog, UrlVersion, XmlElement};
use crate::config::RetrieverConfig;
use crate::error::{FetchError, FetchResult};
use crate::packages::{Descriptor, DESCRIPTOR_URL};
use crate::transfer::{ClientHeaders, HeaderSet, TransferEngine, TransferProgress, Transport};

/// Where a package file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
    /// Copied from the cache into the product directory.
    Copied(PathBuf),
    /// The product directory already held a file of the same size.
    Unchanged(PathBuf),
    /// Downloaded directly into the product directory.
    Direct(PathBuf),
    /// Only the cache was filled; no product directory was given.
    CacheOnly(PathBuf),
    /// Neither a cache nor a product directory; nothing was transferred.
    Skipped,
}

impl Materialized {
    /// Path of the file in the product directory, if one was written.
    pub fn destination(&self) -> Option<&Path> {
        match self {
            Self::Copied(p) | Self::Unchanged(p) | Self::Direct(p) => Some(p),
            Self::CacheOnly(_) | Self::Skipped => None,
        }
    }
}

/// Fetches and caches everything a run needs.
#[derive(Debug)]
pub struct Retriever {
    engine: TransferEngine,
    cache: CacheStore,
    headers: ClientHeaders,
}

impl Retriever {
    /// Create a retriever over `transport` configured by `config`.
    ///
    /// Fails when the configured authorization value is not a valid header.
    pub fn new(transport: Arc<dyn Transport>, config: &RetrieverConfig) -> FetchResult<Self> {
        Ok(Self {
            engine: TransferEngine::new(transport, config),
            cache: CacheStore::new(config.cache_dir.clone()),
            headers: ClientHeaders::new(config.auth.as_deref())?,
        })
    }

    /// Report file transfer progress to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn TransferProgress>) -> Self {
        self.engine = self.engine.with_progress(progress);
        self
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Fetch and parse the catalog.
    ///
    /// The catalog is requested (and cached) for `request_platforms`, the full
    /// platform family, and parsed against the narrower `allowed` set.
    pub fn fetch_catalog(
        &self,
        url_version: UrlVersion,
        request_platforms: &[String],
        allowed: &[String],
    ) -> FetchResult<Catalog> {
        let url = catalog_url(url_version, request_platforms);
        let resource = Resource::Catalog {
            url_version,
            platforms: request_platforms,
        };

        info!(%url_version, "Loading product catalog");
        let catalog = self.fetch_document(&url, self.headers.service(), &resource, |bytes, source| {
            let root = parse_xml(bytes, "catalog", source)?;
            parse_catalog(&root, url_version, allowed)
        })?;
        info!(products = catalog.len(), cdn = catalog.cdn(), "Catalog loaded");
        Ok(catalog)
    }

    /// Fetch the descriptor of one build.
    pub fn fetch_descriptor(&self, build_id: &str) -> FetchResult<Descriptor> {
        let resource = Resource::Descriptor { build_id };
        let headers = self.headers.descriptor(build_id)?;
        self.fetch_document(DESCRIPTOR_URL, &headers, &resource, Descriptor::parse)
    }

    /// Fetch an XML manifest stored under the CDN origin.
    pub fn fetch_manifest(&self, cdn: &str, path: &str) -> FetchResult<XmlElement> {
        let (url, cdn_path) = locate(cdn, path);
        let resource = Resource::PackageFile { path: &cdn_path };
        self.fetch_document(&url, self.headers.service(), &resource, |bytes, source| {
            parse_xml(bytes, "manifest", source)
        })
    }

    /// Fetch one package file and place it in `product_dir`.
    ///
    /// `path` is relative to `cdn` or an absolute URL. The file keeps its
    /// remote name unless `name` is given.
    pub fn fetch_package_file(
        &self,
        cdn: &str,
        path: &str,
        product_dir: Option<&Path>,
        name: Option<&str>,
    ) -> FetchResult<Materialized> {
        let (url, cdn_path) = locate(cdn, path);
        let name = match name {
            Some(name) => name.to_string(),
            None => remote_file_name(&cdn_path)?,
        };
        let cached = self.cache.path_for(&Resource::PackageFile { path: &cdn_path })?;
        let headers = self.headers.download();

        match (cached, product_dir) {
            (Some(cached), Some(dir)) => {
                self.engine.fetch_to_file(&url, &cached, headers)?;
                materialize(&cached, &dir.join(&name))
            }
            (Some(cached), None) => {
                self.engine.fetch_to_file(&url, &cached, headers)?;
                Ok(Materialized::CacheOnly(cached))
            }
            (None, Some(dir)) => {
                let dest = dir.join(&name);
                self.engine.fetch_to_file(&url, &dest, headers)?;
                Ok(Materialized::Direct(dest))
            }
            (None, None) => {
                debug!(%url, "No cache or destination; not downloading");
                Ok(Materialized::Skipped)
            }
        }
    }

    /// Load a document from the cache or the network and parse it.
    ///
    /// A cached copy that fails to parse is deleted and fetched once more; a
    /// fresh copy that fails to parse is fatal.
    fn fetch_document<T>(
        &self,
        url: &str,
        headers: &HeaderSet,
        resource: &Resource<'_>,
        parse: impl Fn(&[u8], &str) -> FetchResult<T>,
    ) -> FetchResult<T> {
        let Some(path) = self.cache.path_for(resource)? else {
            let text = self.engine.fetch_text(url, headers)?;
            return parse(text.as_bytes(), url);
        };
        if let Some(bytes) = self.cache.read_valid(&path, resource.format())? {
            match parse(&bytes, &path.display().to_string()) {
                Ok(value) => return Ok(value),
                Err(e @ FetchError::MalformedPayload { .. }) => {
                    warn!(path = %path.display(), error = %e, "Discarding unusable cache entry");
                    self.cache.evict(&path)?;
                }
                Err(e) => return Err(e),
            }
        }

        self.engine.fetch_to_file(url, &path, headers)?;
        let bytes = fs::read(&path).map_err(|e| FetchError::io(&path, e))?;
        parse(&bytes, url).inspect_err(|e| {
            if matches!(e, FetchError::MalformedPayload { .. }) {
                self.cache.evict(&path).ok();
            }
        })
    }
}

fn parse_xml(bytes: &[u8], what: &'static str, source: &str) -> FetchResult<XmlElement> {
    XmlElement::parse(bytes).map_err(|reason| FetchError::MalformedPayload {
        what,
        source_name: source.to_string(),
        reason,
    })
}

/// Resolve a package path into its URL and its path under the CDN origin.
fn locate(cdn: &str, path: &str) -> (String, String) {
    if path.starts_with("http") {
        (path.to_string(), url_path(path).to_string())
    } else {
        (format!("{}{}", cdn, path), path.to_string())
    }
}

/// The path part of an absolute URL, starting at its first `/`.
fn url_path(url: &str) -> &str {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[after_scheme..].find('/') {
        Some(i) => &url[after_scheme + i..],
        None => "/",
    }
}

fn remote_file_name(path: &str) -> FetchResult<String> {
    let without_query = path.split('?').next().unwrap_or_default();
    without_query
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| FetchError::InvalidCacheKey(path.to_string()))
}

/// Copy a cached file into place unless a same-size copy is already there.
fn materialize(cached: &Path, dest: &Path) -> FetchResult<Materialized> {
    let cached_size = fs::metadata(cached)
        .map_err(|e| FetchError::io(cached, e))?
        .len();

    if let Ok(existing) = fs::metadata(dest) {
        if existing.is_file() && existing.len() == cached_size {
            debug!(path = %dest.display(), "Already in place, skipping");
            return Ok(Materialized::Unchanged(dest.to_path_buf()));
        }
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| FetchError::io(parent, e))?;
    }
    fs::copy(cached, dest).map_err(|e| FetchError::io(dest, e))?;
    Ok(Materialized::Copied(dest.to_path_buf()))
}
