//! ccdl CLI - build offline installers from the Creative Cloud catalog
//!
//! Lists the catalog's products, or retrieves one product with its
//! dependencies into an installer bundle:
//!
//! ```text
//! ccdl --list
//! ccdl -s PHSP -l en_US -d ~/Downloads --cache ~/.cache/ccdl
//! ```

mod error;
mod progress;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use ccdl::catalog::{BuildRecord, Catalog, CatalogEntry, READER_FAMILY_CODE};
use ccdl::locale::{detect_os_locale, normalize_locale, DEFAULT_LOCALE};
use ccdl::logging::init_logging;
use ccdl::{
    bundle_for, Arch, ConfigFile, FetchRequest, HttpTransport, Orchestrator, PlatformSelection,
    Retriever, RetrieverConfig, SelectionCriteria, TargetOs, UrlVersion, ALL_LANGUAGES,
};

use error::CliError;
use progress::BarProgress;

/// Exit status after Ctrl-C.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Parser)]
#[command(name = "ccdl", version, about = "Build offline installers from the Creative Cloud catalog")]
struct Args {
    /// Target OS (macos, windows). Defaults to the running OS.
    #[arg(long)]
    os: Option<String>,

    /// Target architecture (arm64, x64, x86). Defaults to the running CPU.
    #[arg(long)]
    arch: Option<String>,

    /// Install language, e.g. en_US, or ALL for every language.
    #[arg(short = 'l', long)]
    language: Option<String>,

    /// Operating system language also accepted by package conditions.
    #[arg(short = 'o', long)]
    os_language: Option<String>,

    /// Product code, e.g. PHSP for Photoshop.
    #[arg(short = 's', long)]
    sap_code: Option<String>,

    /// Product version. Defaults to the newest available build.
    #[arg(short = 'v', long)]
    app_version: Option<String>,

    /// Directory to create the installer in. Without it only the cache is filled.
    #[arg(short = 'd', long)]
    destination: Option<PathBuf>,

    /// Catalog version (v4, v5, v6).
    #[arg(short = 'u', long)]
    url_version: Option<String>,

    /// Authorization header value.
    #[arg(short = 'A', long)]
    auth: Option<String>,

    /// Cache directory for catalogs, descriptors and packages.
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Configuration file (defaults to <config dir>/ccdl/config.ini).
    #[arg(long)]
    config: Option<PathBuf>,

    /// List available products and exit.
    #[arg(long)]
    list: bool,

    /// More log output (-vv style repetition allowed).
    #[arg(long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = ctrlc::set_handler(|| {
        eprintln!();
        eprintln!("Interrupted, exiting");
        process::exit(INTERRUPTED_EXIT_CODE);
    }) {
        warn!(error = %e, "Failed to set interrupt handler");
    }

    if let Err(e) = run(args) {
        error!(error = %e, "Run failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let file = match &args.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    let mut config = file.apply(RetrieverConfig::default());
    if let Some(cache) = &args.cache {
        config = config.with_cache_dir(cache);
    }
    if let Some(auth) = &args.auth {
        config = config.with_auth(auth);
    }

    let url_version = match &args.url_version {
        Some(v) => v.parse::<UrlVersion>().map_err(CliError::Config)?,
        None => file.url_version.unwrap_or_default(),
    };
    let os = match &args.os {
        Some(os) => os.parse()?,
        None => TargetOs::current()?,
    };
    let arch = match &args.arch {
        Some(arch) => arch.parse()?,
        None => Arch::current()?,
    };
    let platforms = PlatformSelection::new(os, arch)?;
    info!(%os, allowed = ?platforms.allowed, "Target platforms");

    let listing_only = args.list || args.sap_code.is_none();
    if !listing_only && args.destination.is_none() && config.cache_dir.is_none() {
        return Err(CliError::Config(
            "nothing to do: pass --destination, --cache or both".to_string(),
        ));
    }

    let transport = Arc::new(HttpTransport::new(config.timeout)?);
    let retriever = Retriever::new(transport, &config)?.with_progress(Arc::new(BarProgress::new()));
    let catalog = retriever.fetch_catalog(url_version, &platforms.family, &platforms.allowed)?;

    let code = match args.sap_code.as_deref() {
        Some(code) if !args.list => code.to_uppercase(),
        _ => {
            print_products(&catalog, &platforms.allowed);
            return Ok(());
        }
    };

    let product = catalog
        .product(&code)
        .ok_or_else(|| CliError::NotFound(format!("Product {} not found in catalog", code)))?;
    let build = choose_version(product, args.app_version.as_deref(), &platforms.allowed)?;

    let criteria = if build.code == READER_FAMILY_CODE {
        SelectionCriteria::new(ALL_LANGUAGES)
    } else {
        let detected = detect_os_locale();
        let os_languages: Vec<&str> = [args.os_language.as_deref(), detected.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        let language = choose_language(build, args.language.as_deref(), &os_languages)?;
        let criteria = SelectionCriteria::new(language);
        match args.os_language.as_deref() {
            Some(os) => criteria.with_os_language(normalize_locale(os)),
            None => criteria,
        }
    };

    println!("sapCode: {}", build.code);
    println!("version: {}", build.version);
    println!("installLanguage: {}", criteria.language);

    let request = FetchRequest {
        product,
        build,
        criteria,
        destination: args.destination.clone(),
    };
    let bundle = bundle_for(platforms.os);
    let report = Orchestrator::new(&retriever, &catalog, &platforms.allowed)
        .run(&request, bundle.as_ref())?;

    for product in &report.products {
        println!(
            "[{}_{}] {} core packages, {} non-core packages",
            product.code, product.version, product.core_packages, product.non_core_packages
        );
    }
    if let Some(root) = &report.bundle {
        println!();
        println!("Package successfully created. Run {} to install.", root.display());
    }
    if let Some(path) = report.asset.as_ref().and_then(|a| a.destination()) {
        println!();
        println!("Installer retrieved. Open {} to install.", path.display());
    }
    Ok(())
}

fn print_products(catalog: &Catalog, allowed: &[String]) {
    let visible = catalog.visible_products(allowed);
    println!();
    for product in &visible {
        let pad = 10usize.saturating_sub(product.code.len());
        println!("  [{}]{}{}", product.code, " ".repeat(pad), product.display_name);
    }
    println!();
    println!("{} products found. CDN: {}", visible.len(), catalog.cdn());
}

/// The requested version, or the default one.
fn choose_version<'a>(
    product: &'a CatalogEntry,
    requested: Option<&str>,
    allowed: &[String],
) -> Result<&'a BuildRecord, CliError> {
    if let Some(version) = requested {
        return product.version(version).ok_or_else(|| {
            CliError::NotFound(format!("Version {} of {} not found", version, product.code))
        });
    }

    for build in product.selectable_versions(allowed).iter().rev() {
        println!(
            "{} Platform: {} - {}",
            product.display_name, build.platform, build.version
        );
    }
    product.default_version(allowed).ok_or_else(|| {
        CliError::NotFound(format!(
            "No version of {} is available for {}",
            product.code,
            allowed.join(", ")
        ))
    })
}

/// The install language: the requested one if offered, else the first
/// offered OS language, else the default language.
fn choose_language(
    build: &BuildRecord,
    requested: Option<&str>,
    os_languages: &[&str],
) -> Result<String, CliError> {
    let offered = |language: &str| language == ALL_LANGUAGES || build.supports_locale(language);

    if let Some(requested) = requested {
        let language = normalize_locale(requested);
        if offered(language.as_str()) {
            return Ok(language);
        }
        return Err(CliError::NotFound(format!(
            "Language {} not available. Available: {}, {}",
            language,
            build.locales.join(", "),
            ALL_LANGUAGES
        )));
    }

    os_languages
        .iter()
        .copied()
        .chain(std::iter::once(DEFAULT_LOCALE))
        .map(normalize_locale)
        .find(|l| offered(l.as_str()))
        .ok_or_else(|| {
            CliError::NotFound(format!(
                "No default language available; choose one of {}, {}",
                build.locales.join(", "),
                ALL_LANGUAGES
            ))
        })
}
