//! Integration tests for the retrieval pipeline.
//!
//! These tests run the complete flow against an in-memory transport:
//! - catalog download → product model → fetch plan
//! - descriptor and package retrieval through the cache
//! - bundle assembly with `application.json` and `driver.xml`
//! - the single-image path of the reader family
//!
//! Run with: `cargo test --test pipeline_integration`

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use ccdl::catalog::catalog_url;
use ccdl::packages::DESCRIPTOR_URL;
use ccdl::transfer::{HeaderSet, Transport, TransportError, TransportResponse, BUILD_GUID_HEADER};
use ccdl::{
    FetchError, FetchRequest, MacAppBundle, Materialized, Orchestrator, Retriever,
    RetrieverConfig, SelectionCriteria, UrlVersion,
};

// ============================================================================
// Helpers
// ============================================================================

const CDN: &str = "https://ccmdl.test";

/// Serves canned bodies, routing descriptor requests by build GUID.
#[derive(Default)]
struct FakeCdn {
    routes: HashMap<String, Vec<u8>>,
    gets: Mutex<Vec<String>>,
}

impl FakeCdn {
    fn key(url: &str, headers: &HeaderSet) -> String {
        match headers.get(BUILD_GUID_HEADER) {
            Some(guid) => format!("{}#{}", url, guid),
            None => url.to_string(),
        }
    }

    fn serve(&mut self, url: &str, body: impl Into<Vec<u8>>) {
        self.routes.insert(url.to_string(), body.into());
    }

    fn serve_descriptor(&mut self, guid: &str, body: &str) {
        self.routes
            .insert(format!("{}#{}", DESCRIPTOR_URL, guid), body.as_bytes().to_vec());
    }

    fn get_count(&self) -> usize {
        self.gets.lock().unwrap().len()
    }

    fn lookup(&self, url: &str, headers: &HeaderSet) -> Result<&Vec<u8>, TransportError> {
        self.routes
            .get(&Self::key(url, headers))
            .ok_or_else(|| TransportError::Fatal(format!("404 {}", url)))
    }
}

impl Transport for FakeCdn {
    fn head(&self, url: &str, headers: &HeaderSet) -> Result<Option<u64>, TransportError> {
        self.lookup(url, headers).map(|b| Some(b.len() as u64))
    }

    fn get(&self, url: &str, headers: &HeaderSet) -> Result<TransportResponse, TransportError> {
        self.gets.lock().unwrap().push(Self::key(url, headers));
        let body = self.lookup(url, headers)?.clone();
        Ok(TransportResponse {
            status: 200,
            content_length: Some(body.len() as u64),
            body: Box::new(Cursor::new(body)),
        })
    }
}

fn zip_bytes(name: &str, data: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file(name, options).unwrap();
    writer.write_all(data).unwrap();
    writer.finish().unwrap().into_inner()
}

fn mac_family() -> Vec<String> {
    ["macuniversal", "macarm64", "osx10-64", "osx10"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn arm_allowed() -> Vec<String> {
    vec!["macuniversal".to_string(), "macarm64".to_string()]
}

const CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<productsResponse>
  <channels>
    <channel name="ccm">
      <cdn><secure>https://ccmdl.test</secure></cdn>
      <products>
        <product id="PHSP" version="25.0">
          <displayName>Photoshop</displayName>
          <platforms>
            <platform id="macarm64">
              <languageSet baseVersion="25.0" buildGuid="guid-phsp-arm">
                <dependencies>
                  <dependency><sapCode>COSY</sapCode><baseVersion>5.0</baseVersion></dependency>
                </dependencies>
                <locales><locale name="en_US"/><locale name="de_DE"/></locales>
              </languageSet>
            </platform>
            <platform id="osx10-64">
              <languageSet baseVersion="25.0" buildGuid="guid-phsp-intel"/>
            </platform>
          </platforms>
        </product>
        <product id="APRO" version="24.0">
          <displayName>Acrobat</displayName>
          <platforms>
            <platform id="macuniversal">
              <languageSet><urls><manifestURL>/acrobat/manifest.xml</manifestURL></urls></languageSet>
            </platform>
          </platforms>
        </product>
      </products>
    </channel>
    <channel name="sti">
      <products>
        <product id="COSY" version="5.0.1">
          <displayName>Core Sync</displayName>
          <platforms>
            <platform id="osx10-64">
              <languageSet baseVersion="5.0" buildGuid="guid-cosy-intel"/>
            </platform>
          </platforms>
        </product>
        <product id="COSY" version="5.0.2">
          <displayName>Core Sync</displayName>
          <platforms>
            <platform id="macarm64">
              <languageSet baseVersion="5.0" buildGuid="guid-cosy-arm"/>
            </platform>
          </platforms>
        </product>
      </products>
    </channel>
  </channels>
  <builds>
    <build id="APRO" version="24.0">
      <nglLicensingInfo><appVersion>24.001.2</appVersion></nglLicensingInfo>
    </build>
  </builds>
</productsResponse>"#;

const PHSP_DESCRIPTOR: &str = r#"{
  "SAPCode": "PHSP",
  "Packages": {
    "Package": [
      {"PackageName": "Core", "Path": "/phsp/Core.zip", "Type": "core"},
      {"PackageName": "German", "Path": "/phsp/de_DE.bin", "Condition": "[installLanguage]==de_DE"},
      {"PackageName": "English", "Path": "/phsp/en_US.bin", "Condition": "[installLanguage]==en_US"},
      {"PackageName": "Shared", "Path": "/phsp/shared.bin"}
    ]
  }
}"#;

const COSY_DESCRIPTOR: &str =
    r#"{"Packages":{"Package":[{"Path":"/cosy/CoreSync.bin","Type":"core"}]}}"#;

fn fake_cdn() -> FakeCdn {
    let mut cdn = FakeCdn::default();
    cdn.serve(&catalog_url(UrlVersion::V6, &mac_family()), CATALOG);
    cdn.serve_descriptor("guid-phsp-arm", PHSP_DESCRIPTOR);
    cdn.serve_descriptor("guid-cosy-arm", COSY_DESCRIPTOR);
    cdn.serve(
        &format!("{}/phsp/Core.zip", CDN),
        zip_bytes("core.bin", &[1u8; 4096]),
    );
    cdn.serve(&format!("{}/phsp/de_DE.bin", CDN), vec![2u8; 100]);
    cdn.serve(&format!("{}/phsp/en_US.bin", CDN), vec![3u8; 100]);
    cdn.serve(&format!("{}/phsp/shared.bin", CDN), vec![4u8; 100]);
    cdn.serve(&format!("{}/cosy/CoreSync.bin", CDN), vec![5u8; 300]);
    cdn.serve(
        &format!("{}/acrobat/manifest.xml", CDN),
        "<manifest><asset_list><asset><asset_path>https://dl.test/acrobat/Acrobat.dmg</asset_path></asset></asset_list></manifest>",
    );
    cdn.serve("https://dl.test/acrobat/Acrobat.dmg", vec![9u8; 512]);
    cdn
}

fn config(cache: &Path) -> RetrieverConfig {
    RetrieverConfig::new()
        .with_cache_dir(cache)
        .with_retry_count(2)
        .with_retry_delay(Duration::ZERO)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_full_run_builds_mac_bundle() {
    let cache = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let cdn = Arc::new(fake_cdn());
    let retriever = Retriever::new(cdn.clone(), &config(cache.path())).unwrap();

    let catalog = retriever
        .fetch_catalog(UrlVersion::V6, &mac_family(), &arm_allowed())
        .unwrap();
    let product = catalog.product("PHSP").unwrap();
    let build = product.default_version(&arm_allowed()).unwrap();
    assert_eq!(build.build_id, "guid-phsp-arm");

    let request = FetchRequest {
        product,
        build,
        criteria: SelectionCriteria::new("en_US"),
        destination: Some(dest.path().to_path_buf()),
    };
    let report = Orchestrator::new(&retriever, &catalog, &arm_allowed())
        .run(&request, &MacAppBundle)
        .unwrap();

    let root = dest.path().join("Install_PHSP_25.0-en_US-macarm64.app");
    assert_eq!(report.bundle.as_deref(), Some(root.as_path()));

    let products = root.join("Contents/Resources/products");
    assert!(products.join("PHSP/Core.zip").is_file());
    assert!(products.join("PHSP/en_US.bin").is_file());
    assert!(products.join("PHSP/shared.bin").is_file());
    assert!(!products.join("PHSP/de_DE.bin").exists());
    assert!(products.join("COSY/CoreSync.bin").is_file());

    let staged = fs::read_to_string(products.join("COSY/application.json")).unwrap();
    assert_eq!(staged, COSY_DESCRIPTOR);

    let driver = fs::read_to_string(products.join("driver.xml")).unwrap();
    assert!(driver.contains("<Name>Adobe Photoshop</Name>"));
    assert!(driver.contains("<Platform>macarm64</Platform>"));
    assert!(driver.contains("<BaseVersion>5.0</BaseVersion>"));
    assert!(driver.contains("<InstallDir>/Applications</InstallDir>"));

    let counts: Vec<_> = report
        .products
        .iter()
        .map(|p| (p.code.as_str(), p.core_packages, p.non_core_packages))
        .collect();
    assert_eq!(counts, vec![("PHSP", 1, 2), ("COSY", 1, 0)]);
}

#[test]
fn test_second_run_is_served_from_cache() {
    let cache = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let cdn = Arc::new(fake_cdn());

    let run = || {
        let retriever = Retriever::new(cdn.clone(), &config(cache.path())).unwrap();
        let catalog = retriever
            .fetch_catalog(UrlVersion::V6, &mac_family(), &arm_allowed())
            .unwrap();
        let product = catalog.product("PHSP").unwrap();
        let build = product.version("25.0").unwrap();
        let request = FetchRequest {
            product,
            build,
            criteria: SelectionCriteria::new("ALL"),
            destination: Some(dest.path().to_path_buf()),
        };
        Orchestrator::new(&retriever, &catalog, &arm_allowed())
            .run(&request, &MacAppBundle)
            .unwrap()
    };

    let first = run();
    let gets_after_first = cdn.get_count();
    let second = run();

    assert_eq!(first, second);
    assert_eq!(cdn.get_count(), gets_after_first);
    assert_eq!(second.products[0].non_core_packages, 3);
}

#[test]
fn test_reader_family_downloads_single_image() {
    let cache = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let cdn = Arc::new(fake_cdn());
    let retriever = Retriever::new(cdn, &config(cache.path())).unwrap();

    let catalog = retriever
        .fetch_catalog(UrlVersion::V6, &mac_family(), &arm_allowed())
        .unwrap();
    let product = catalog.product("APRO").unwrap();
    let build = product.version("24.001.2").unwrap();
    assert_eq!(build.base_version, "24.0");

    let request = FetchRequest {
        product,
        build,
        criteria: SelectionCriteria::new("ALL"),
        destination: Some(dest.path().to_path_buf()),
    };
    let report = Orchestrator::new(&retriever, &catalog, &arm_allowed())
        .run(&request, &MacAppBundle)
        .unwrap();

    let image = dest.path().join("APRO_24.001.2_macuniversal.dmg");
    assert_eq!(report.asset, Some(Materialized::Copied(image.clone())));
    assert_eq!(fs::read(&image).unwrap(), vec![9u8; 512]);
    assert!(report.bundle.is_none());
    assert!(cache.path().join("acrobat/manifest.xml").is_file());
}

#[test]
fn test_corrupt_archive_aborts_run() {
    let cache = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let mut cdn = fake_cdn();
    let mut broken = zip_bytes("core.bin", &[1u8; 4096]);
    let middle = broken.len() / 2;
    broken.truncate(middle);
    cdn.serve(&format!("{}/phsp/Core.zip", CDN), broken);
    let retriever = Retriever::new(Arc::new(cdn), &config(cache.path())).unwrap();

    let catalog = retriever
        .fetch_catalog(UrlVersion::V6, &mac_family(), &arm_allowed())
        .unwrap();
    let product = catalog.product("PHSP").unwrap();
    let request = FetchRequest {
        product,
        build: product.version("25.0").unwrap(),
        criteria: SelectionCriteria::new("en_US"),
        destination: Some(dest.path().to_path_buf()),
    };
    let result = Orchestrator::new(&retriever, &catalog, &arm_allowed()).run(&request, &MacAppBundle);

    assert!(matches!(result, Err(FetchError::CorruptArchive { .. })));
    assert!(!cache.path().join("phsp/Core.zip").exists());
}

#[test]
fn test_run_without_destination_only_fills_cache() {
    let cache = TempDir::new().unwrap();
    let cdn = Arc::new(fake_cdn());
    let retriever = Retriever::new(cdn, &config(cache.path())).unwrap();

    let catalog = retriever
        .fetch_catalog(UrlVersion::V6, &mac_family(), &arm_allowed())
        .unwrap();
    let product = catalog.product("PHSP").unwrap();
    let request = FetchRequest {
        product,
        build: product.version("25.0").unwrap(),
        criteria: SelectionCriteria::new("de_DE"),
        destination: None,
    };
    let report = Orchestrator::new(&retriever, &catalog, &arm_allowed())
        .run(&request, &MacAppBundle)
        .unwrap();

    assert!(report.bundle.is_none());
    assert!(cache.path().join("phsp/de_DE.bin").is_file());
    assert!(!cache.path().join("phsp/en_US.bin").exists());
    assert!(cache.path().join("_applications/guid-cosy-arm.json").is_file());
}
