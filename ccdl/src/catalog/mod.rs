//! Product catalog: endpoint, document tree and product model.
//!
//! # Architecture
//!
//! ```text
//! catalog XML bytes
//!         │
//!         ▼
//! XmlElement::parse ──► parse_catalog(root, UrlVersion, allowed)
//!                               │
//!                               ▼
//!                  Catalog { cdn, products: [CatalogEntry] }
//!                                              └── versions: [BuildRecord]
//! ```

mod model;
mod parser;
mod xml;

pub use model::{BuildRecord, Catalog, CatalogEntry, Dependency, UrlVersion};
pub use parser::{parse_catalog, PRIMARY_CHANNEL, READER_FAMILY_CODE};
pub use xml::XmlElement;

/// Base of the catalog service.
const CATALOG_BASE_URL: &str = "https://prod-rel-ffc-ccm.oobesaas.adobe.com/adobe-ffc-external/core";

/// Catalog endpoint for a schema version and platform list.
pub fn catalog_url(url_version: UrlVersion, platforms: &[String]) -> String {
    format!(
        "{}/v{}/products/all?_type=xml&channel=ccm&channel=sti&platform={}&productType=Desktop",
        CATALOG_BASE_URL,
        url_version.number(),
        platforms.join(",")
    )
}
