//! Catalog XML to product model.
//!
//! The walk, per schema version:
//!
//! ```text
//! [channels/]channel              hidden unless name="ccm"
//!   cdn/secure                    CDN origin (first channel)
//!   products/product              @id, @version, displayName
//!     platforms/platform          @id
//!       languageSet               @baseVersion, @buildGuid
//!         dependencies/dependency sapCode, baseVersion
//!         locales/locale          @name
//! ```
//!
//! The reader family takes its version from the licensing info and its build
//! id from the manifest URL instead.

use tracing::debug;

use super::model::{BuildRecord, Catalog, Dependency, UrlVersion};
use super::xml::XmlElement;
use crate::error::{FetchError, FetchResult};

/// Name of the channel whose products are offered to users.
pub const PRIMARY_CHANNEL: &str = "ccm";

/// Product code of the reader/signing family, which is distributed as a
/// single disk image rather than a package set.
pub const READER_FAMILY_CODE: &str = "APRO";

fn structure(what: String) -> FetchError {
    FetchError::CatalogStructure(what)
}

fn required_attr<'a>(element: &'a XmlElement, name: &str) -> FetchResult<&'a str> {
    element
        .attr(name)
        .ok_or_else(|| structure(format!("<{}> has no '{}' attribute", element.name(), name)))
}

fn required_child<'a>(element: &'a XmlElement, path: &str) -> FetchResult<&'a XmlElement> {
    element
        .find(path)
        .ok_or_else(|| structure(format!("<{}> has no {}", element.name(), path)))
}

/// Build the product model from a parsed catalog document.
///
/// `allowed` drives the platform tie-break: once a version slot holds a record
/// for an allowed platform, the remaining platforms of that product node are
/// ignored.
pub fn parse_catalog(
    root: &XmlElement,
    url_version: UrlVersion,
    allowed: &[String],
) -> FetchResult<Catalog> {
    let prefix = match url_version {
        UrlVersion::V6 => "channels/",
        UrlVersion::V4 | UrlVersion::V5 => "",
    };

    let cdn = required_child(root, &format!("{}channel/cdn/secure", prefix))?.text();
    let mut catalog = Catalog::new(cdn);

    for channel in root.find_all(&format!("{}channel", prefix)) {
        let hidden = channel.attr("name") != Some(PRIMARY_CHANNEL);

        for product in channel.find_all("products/product") {
            let code = required_attr(product, "id")?;
            let nominal_version = required_attr(product, "version")?;
            let display_name = required_child(product, "displayName")?.text();
            let entry = catalog.entry_or_insert(code, display_name, hidden);

            for platform in product.find_all("platforms/platform") {
                let record = parse_platform(root, platform, code, nominal_version, url_version)?;

                if let Some(existing) = entry.version(&record.version) {
                    if allowed.contains(&existing.platform) {
                        break;
                    }
                }
                entry.upsert(record);
            }
        }
    }

    debug!(products = catalog.len(), cdn = catalog.cdn(), "Parsed catalog");
    Ok(catalog)
}

fn parse_platform(
    root: &XmlElement,
    platform: &XmlElement,
    code: &str,
    nominal_version: &str,
    url_version: UrlVersion,
) -> FetchResult<BuildRecord> {
    let platform_id = required_attr(platform, "id")?;
    let language_set = required_child(platform, "languageSet")?;

    let dependencies = language_set
        .find_all("dependencies/dependency")
        .into_iter()
        .map(|d| {
            Ok(Dependency {
                code: required_child(d, "sapCode")?.text().to_string(),
                version: required_child(d, "baseVersion")?.text().to_string(),
            })
        })
        .collect::<FetchResult<Vec<_>>>()?;

    let locales = language_set
        .find_all("locales/locale")
        .into_iter()
        .filter_map(|l| l.attr("name"))
        .map(str::to_string)
        .collect();

    let (base_version, version, build_id) = if code == READER_FAMILY_CODE {
        let version = match url_version {
            UrlVersion::V4 | UrlVersion::V5 => required_child(language_set, "nglLicensingInfo/appVersion")?
                .text()
                .to_string(),
            UrlVersion::V6 => licensed_version(root, code, nominal_version)?
                .unwrap_or_else(|| nominal_version.to_string()),
        };
        let manifest = required_child(language_set, "urls/manifestURL")?.text();
        (nominal_version.to_string(), version, manifest.to_string())
    } else {
        (
            required_attr(language_set, "baseVersion")?.to_string(),
            nominal_version.to_string(),
            language_set.attr("buildGuid").unwrap_or_default().to_string(),
        )
    };

    Ok(BuildRecord {
        code: code.to_string(),
        base_version,
        version,
        platform: platform_id.to_string(),
        build_id,
        dependencies,
        locales,
    })
}

/// Look up the licensed application version in the top-level `builds` list.
fn licensed_version(root: &XmlElement, code: &str, version: &str) -> FetchResult<Option<String>> {
    root.find_all("builds/build")
        .into_iter()
        .find(|b| b.attr("id") == Some(code) && b.attr("version") == Some(version))
        .map(|b| required_child(b, "nglLicensingInfo/appVersion").map(|v| v.text().to_string()))
        .transpose()
}
