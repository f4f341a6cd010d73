//! Installer bundle layouts.
//!
//! A bundle is the directory tree handed to the vendor's installer agent: the
//! downloaded packages of every product under a `products` directory, plus the
//! `driver.xml` describing what to install. Launcher scripts and icons are
//! left to the caller.
//!
//! ```text
//! macOS                                   Windows
//! <dest>/<name>.app/                      <dest>/<name>/
//!   Contents/Resources/products/            products/
//!     driver.xml                              driver.xml
//!     <CODE>/application.json                 <CODE>/application.json
//!     <CODE>/*.zip                            <CODE>/*.zip
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::driver::DriverManifest;
use crate::error::{FetchError, FetchResult};
use crate::platform::TargetOs;

/// Directories of a prepared bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    /// What the user runs or opens to install.
    pub root: PathBuf,
    /// Where product directories and `driver.xml` go.
    pub products_dir: PathBuf,
}

impl BundleLayout {
    /// Directory for one product's packages.
    pub fn product_dir(&self, code: &str) -> PathBuf {
        self.products_dir.join(code)
    }
}

/// Builds the on-disk installer structure for one target OS.
pub trait InstallerBundle: Send + Sync {
    /// Installation directory written into `driver.xml`.
    fn install_dir(&self) -> &str;

    /// Create the directory skeleton for bundle `name` under `destination`.
    fn prepare(&self, destination: &Path, name: &str) -> FetchResult<BundleLayout>;

    /// Write `manifest` into the bundle and return the bundle root.
    fn finalize(&self, layout: &BundleLayout, manifest: &DriverManifest) -> FetchResult<PathBuf> {
        manifest.write_to(&layout.products_dir)?;
        Ok(layout.root.clone())
    }
}

fn create_layout(root: PathBuf, products_dir: PathBuf) -> FetchResult<BundleLayout> {
    fs::create_dir_all(&products_dir).map_err(|e| FetchError::io(&products_dir, e))?;
    Ok(BundleLayout { root, products_dir })
}

/// macOS application bundle.
#[derive(Debug, Clone, Default)]
pub struct MacAppBundle;

impl InstallerBundle for MacAppBundle {
    fn install_dir(&self) -> &str {
        "/Applications"
    }

    fn prepare(&self, destination: &Path, name: &str) -> FetchResult<BundleLayout> {
        let root = destination.join(format!("{}.app", name));
        let products_dir = root.join("Contents").join("Resources").join("products");
        create_layout(root, products_dir)
    }
}

/// Plain directory bundle for Windows.
#[derive(Debug, Clone, Default)]
pub struct WindowsBundle;

impl InstallerBundle for WindowsBundle {
    fn install_dir(&self) -> &str {
        "C:\\Program Files\\Adobe"
    }

    fn prepare(&self, destination: &Path, name: &str) -> FetchResult<BundleLayout> {
        let root = destination.join(name);
        let products_dir = root.join("products");
        create_layout(root, products_dir)
    }
}

/// The bundle implementation for `os`.
pub fn bundle_for(os: TargetOs) -> Box<dyn InstallerBundle> {
    match os {
        TargetOs::MacOs => Box::new(MacAppBundle),
        TargetOs::Windows => Box::new(WindowsBundle),
    }
}

/// Name of the bundle for one product build.
pub fn bundle_name(code: &str, version: &str, language: &str, platform: &str) -> String {
    format!("Install_{}_{}-{}-{}", code, version, language, platform)
}
