//! Deterministic on-disk locations for fetched artifacts.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use super::validate::{validate, ArtifactFormat};
use crate::catalog::UrlVersion;
use crate::error::{FetchError, FetchResult};

/// Directory holding cached catalogs.
const CATALOG_DIR: &str = "_products";

/// Directory holding cached build descriptors.
const DESCRIPTOR_DIR: &str = "_applications";

/// A remote resource that can be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource<'a> {
    /// The product catalog for a schema version and platform set.
    Catalog {
        url_version: UrlVersion,
        platforms: &'a [String],
    },
    /// The JSON descriptor of one build.
    Descriptor { build_id: &'a str },
    /// A file under the CDN origin, keyed by its path.
    PackageFile { path: &'a str },
}

impl Resource<'_> {
    /// Path of this resource relative to the cache root.
    pub fn relative_path(&self) -> FetchResult<PathBuf> {
        match self {
            Resource::Catalog {
                url_version,
                platforms,
            } => {
                let mut sorted: Vec<&str> = platforms.iter().map(String::as_str).collect();
                sorted.sort_unstable();
                if sorted.is_empty() || sorted.iter().any(|p| !is_plain_segment(p)) {
                    return Err(FetchError::InvalidCacheKey(format!(
                        "platform set {:?}",
                        platforms
                    )));
                }
                Ok(Path::new(CATALOG_DIR)
                    .join(url_version.number().to_string())
                    .join(format!("{}.xml", sorted.join("_"))))
            }
            Resource::Descriptor { build_id } => {
                if !is_plain_segment(build_id) {
                    return Err(FetchError::InvalidCacheKey(format!(
                        "build id {:?}",
                        build_id
                    )));
                }
                Ok(Path::new(DESCRIPTOR_DIR).join(format!("{}.json", build_id)))
            }
            Resource::PackageFile { path } => package_relative_path(path),
        }
    }

    /// How a cached copy of this resource is validated.
    pub fn format(&self) -> ArtifactFormat {
        match self {
            Resource::Catalog { .. } => ArtifactFormat::Xml,
            Resource::Descriptor { .. } => ArtifactFormat::Json,
            Resource::PackageFile { path } => ArtifactFormat::for_path(Path::new(path)),
        }
    }
}

fn is_plain_segment(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\'])
}

/// Map a CDN path such as `/products/PHSP/x.zip?v=1` onto a relative path,
/// refusing anything that would escape the cache root.
fn package_relative_path(path: &str) -> FetchResult<PathBuf> {
    let path = path.split('?').next().unwrap_or_default();
    let mut relative = PathBuf::new();

    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(FetchError::InvalidCacheKey(path.to_string()));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(FetchError::InvalidCacheKey(path.to_string()));
    }
    Ok(relative)
}

/// Persistent cache of fetched artifacts.
///
/// Entries are never evicted. A corrupt entry is deleted when read so the
/// caller can fetch it again.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    root: Option<PathBuf>,
}

impl CacheStore {
    /// Create a store rooted at `root`; `None` disables caching.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// A store that caches nothing.
    pub fn disabled() -> Self {
        Self { root: None }
    }

    /// The cache root, if caching is enabled.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.root.is_some()
    }

    /// Where `resource` lives in the cache.
    ///
    /// Creates the containing directory but not the file. Returns `None` when
    /// caching is disabled.
    pub fn path_for(&self, resource: &Resource<'_>) -> FetchResult<Option<PathBuf>> {
        let Some(root) = &self.root else {
            return Ok(None);
        };

        let path = root.join(resource.relative_path()?);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FetchError::io(parent, e))?;
        }
        Ok(Some(path))
    }

    /// Read a cached file if it exists and passes validation.
    ///
    /// An invalid file is deleted and `None` is returned.
    pub fn read_valid(&self, path: &Path, format: ArtifactFormat) -> FetchResult<Option<Vec<u8>>> {
        if !path.is_file() {
            return Ok(None);
        }

        if validate(path, format) {
            debug!(path = %path.display(), "Cache hit");
            let bytes = fs::read(path).map_err(|e| FetchError::io(path, e))?;
            return Ok(Some(bytes));
        }

        warn!(path = %path.display(), ?format, "Removing invalid cache entry");
        self.evict(path)?;
        Ok(None)
    }

    /// Delete a cache entry if present.
    pub fn evict(&self, path: &Path) -> FetchResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FetchError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn platforms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_disabled_store_has_no_paths() {
        let store = CacheStore::disabled();
        let path = store
            .path_for(&Resource::Descriptor { build_id: "abc" })
            .unwrap();
        assert!(path.is_none());
        assert!(!store.is_enabled());
    }

    #[test]
    fn test_catalog_path_sorts_platforms() {
        let list = platforms(&["osx10-64", "macuniversal", "osx10"]);
        let resource = Resource::Catalog {
            url_version: UrlVersion::V6,
            platforms: &list,
        };
        assert_eq!(
            resource.relative_path().unwrap(),
            PathBuf::from("_products/6/macuniversal_osx10_osx10-64.xml")
        );
        assert_eq!(resource.format(), ArtifactFormat::Xml);
    }

    #[test]
    fn test_catalog_path_independent_of_platform_order() {
        let a = platforms(&["win64", "win32"]);
        let b = platforms(&["win32", "win64"]);
        let path_a = Resource::Catalog {
            url_version: UrlVersion::V5,
            platforms: &a,
        }
        .relative_path()
        .unwrap();
        let path_b = Resource::Catalog {
            url_version: UrlVersion::V5,
            platforms: &b,
        }
        .relative_path()
        .unwrap();
        assert_eq!(path_a, path_b);
    }

    #[test]
    fn test_descriptor_path() {
        let resource = Resource::Descriptor {
            build_id: "6f1d8a3e-guid",
        };
        assert_eq!(
            resource.relative_path().unwrap(),
            PathBuf::from("_applications/6f1d8a3e-guid.json")
        );
        assert_eq!(resource.format(), ArtifactFormat::Json);
    }

    #[test]
    fn test_descriptor_rejects_path_separators() {
        let resource = Resource::Descriptor {
            build_id: "../escape",
        };
        assert!(matches!(
            resource.relative_path(),
            Err(FetchError::InvalidCacheKey(_))
        ));
    }

    #[test]
    fn test_package_file_path() {
        let resource = Resource::PackageFile {
            path: "/products/PHSP/22.0/Core.zip?sig=1",
        };
        assert_eq!(
            resource.relative_path().unwrap(),
            PathBuf::from("products/PHSP/22.0/Core.zip")
        );
        assert_eq!(resource.format(), ArtifactFormat::Zip);
    }

    #[test]
    fn test_package_file_rejects_parent_dir() {
        let resource = Resource::PackageFile {
            path: "/products/../../etc/passwd",
        };
        assert!(resource.relative_path().is_err());
        assert!(Resource::PackageFile { path: "/" }.relative_path().is_err());
    }

    #[test]
    fn test_path_for_creates_parent_only() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(Some(temp.path().to_path_buf()));

        let path = store
            .path_for(&Resource::PackageFile {
                path: "/a/b/c.bin",
            })
            .unwrap()
            .unwrap();

        assert_eq!(path, temp.path().join("a/b/c.bin"));
        assert!(temp.path().join("a/b").is_dir());
        assert!(!path.exists());
    }

    #[test]
    fn test_read_valid_evicts_corrupt_json() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(Some(temp.path().to_path_buf()));
        let path = store
            .path_for(&Resource::Descriptor { build_id: "g" })
            .unwrap()
            .unwrap();
        fs::write(&path, b"{\"Packages\": ").unwrap();

        let read = store.read_valid(&path, ArtifactFormat::Json).unwrap();
        assert!(read.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_read_valid_returns_bytes() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(Some(temp.path().to_path_buf()));
        let path = temp.path().join("doc.json");
        fs::write(&path, b"{}").unwrap();

        let read = store.read_valid(&path, ArtifactFormat::Json).unwrap();
        assert_eq!(read.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_read_valid_missing_file() {
        let store = CacheStore::disabled();
        let read = store
            .read_valid(Path::new("/nonexistent/file.xml"), ArtifactFormat::Xml)
            .unwrap();
        assert!(read.is_none());
    }
}
