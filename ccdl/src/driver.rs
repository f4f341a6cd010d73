//! The `driver.xml` document read by the vendor's installer agent.
//!
//! The agent matches on exact tag names, nesting and indentation, so the
//! document is rendered from a fixed template rather than through an XML
//! writer.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use xml::escape::escape_str_pcdata;

use crate::catalog::{BuildRecord, CatalogEntry, Dependency};
use crate::error::{FetchError, FetchResult};

/// File name the installer agent looks for.
pub const DRIVER_FILENAME: &str = "driver.xml";

/// Everything the installer agent needs to install one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverManifest {
    pub display_name: String,
    pub code: String,
    pub version: String,
    pub platform: String,
    pub dependencies: Vec<Dependency>,
    pub install_dir: String,
    pub language: String,
}

impl DriverManifest {
    /// Describe `build` of `product` for installation in `language`.
    pub fn new(
        product: &CatalogEntry,
        build: &BuildRecord,
        language: impl Into<String>,
        install_dir: impl Into<String>,
    ) -> Self {
        Self {
            display_name: product.display_name.clone(),
            code: build.code.clone(),
            version: build.version.clone(),
            platform: build.platform.clone(),
            dependencies: build.dependencies.clone(),
            install_dir: install_dir.into(),
            language: language.into(),
        }
    }

    /// Render the document.
    pub fn render(&self) -> String {
        let dependencies = self
            .dependencies
            .iter()
            .map(|d| {
                let code = escape_str_pcdata(&d.code);
                format!(
                    "\n            <Dependency>\n                <SAPCode>{code}</SAPCode>\n                <BaseVersion>{version}</BaseVersion>\n                <EsdDirectory>./{code}</EsdDirectory>\n            </Dependency>\n",
                    code = code,
                    version = escape_str_pcdata(&d.version),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let code = escape_str_pcdata(&self.code);
        format!(
            "<DriverInfo>
    <ProductInfo>
        <Name>Adobe {name}</Name>
        <SAPCode>{code}</SAPCode>
        <CodexVersion>{version}</CodexVersion>
        <Platform>{platform}</Platform>
        <EsdDirectory>./{code}</EsdDirectory>
        <Dependencies>{dependencies}</Dependencies>
    </ProductInfo>
    <RequestInfo>
        <InstallDir>{install_dir}</InstallDir>
        <InstallLanguage>{language}</InstallLanguage>
    </RequestInfo>
</DriverInfo>
",
            name = escape_str_pcdata(&self.display_name),
            code = code,
            version = escape_str_pcdata(&self.version),
            platform = escape_str_pcdata(&self.platform),
            dependencies = dependencies,
            install_dir = escape_str_pcdata(&self.install_dir),
            language = escape_str_pcdata(&self.language),
        )
    }

    /// Write the document into `dir` as `driver.xml`.
    pub fn write_to(&self, dir: &Path) -> FetchResult<PathBuf> {
        let path = dir.join(DRIVER_FILENAME);
        info!(path = %path.display(), "Generating driver.xml");
        fs::write(&path, self.render()).map_err(|e| FetchError::io(&path, e))?;
        Ok(path)
    }
}
