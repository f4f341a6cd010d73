//! Target operating systems and the catalog platform ids they accept.
//!
//! The catalog is always requested for an OS's whole platform family; the
//! architecture narrows that to the platforms a build may be taken from.

use std::fmt;
use std::str::FromStr;

use crate::error::{FetchError, FetchResult};

const MAC_PLATFORMS: [&str; 4] = ["macuniversal", "macarm64", "osx10-64", "osx10"];
const WINDOWS_PLATFORMS: [&str; 2] = ["win64", "win32"];

/// Operating system an installer is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOs {
    MacOs,
    Windows,
}

impl TargetOs {
    /// The OS this binary runs on.
    pub fn current() -> FetchResult<Self> {
        std::env::consts::OS.parse()
    }

    /// Every catalog platform id of this OS.
    pub fn platform_family(&self) -> Vec<String> {
        let family: &[&str] = match self {
            Self::MacOs => &MAC_PLATFORMS,
            Self::Windows => &WINDOWS_PLATFORMS,
        };
        family.iter().map(|p| p.to_string()).collect()
    }
}

impl FromStr for TargetOs {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "darwin" | "macos" | "mac" | "osx" => Ok(Self::MacOs),
            "windows" | "win" => Ok(Self::Windows),
            _ => Err(FetchError::Config(format!("unsupported target OS '{}'", s))),
        }
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MacOs => write!(f, "macos"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// CPU architecture an installer is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Arm64,
    X64,
    X86,
}

impl Arch {
    /// The architecture this binary runs on.
    pub fn current() -> FetchResult<Self> {
        std::env::consts::ARCH.parse()
    }
}

impl FromStr for Arch {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "arm64" | "arm" | "aarch64" => Ok(Self::Arm64),
            "x86_64" | "x64" | "amd64" | "intel" | "win64" => Ok(Self::X64),
            "x86" | "i386" | "i686" | "win32" => Ok(Self::X86),
            _ => Err(FetchError::Config(format!("unsupported architecture '{}'", s))),
        }
    }
}

/// The platform ids used for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSelection {
    pub os: TargetOs,
    pub arch: Arch,
    /// Requested from the catalog service.
    pub family: Vec<String>,
    /// Accepted when choosing builds.
    pub allowed: Vec<String>,
}

impl PlatformSelection {
    pub fn new(os: TargetOs, arch: Arch) -> FetchResult<Self> {
        let family = os.platform_family();
        let pick = |indices: &[usize]| -> Vec<String> {
            indices.iter().map(|&i| family[i].clone()).collect()
        };

        let allowed = match (os, arch) {
            (TargetOs::MacOs, Arch::Arm64) => pick(&[0, 1]),
            (TargetOs::MacOs, Arch::X64) => pick(&[0, 2, 3]),
            (TargetOs::Windows, Arch::X64) => pick(&[0, 1]),
            (TargetOs::Windows, Arch::X86) => pick(&[1]),
            _ => {
                return Err(FetchError::Config(format!(
                    "no {} packages for {:?}",
                    os, arch
                )))
            }
        };

        Ok(Self {
            os,
            arch,
            family,
            allowed,
        })
    }
}
