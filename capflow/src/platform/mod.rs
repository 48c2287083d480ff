//! Platform gate.
//!
//! Checks that the host satisfies an operation set's declared target before
//! any implementation runs. A mismatch is fatal and never goes through the
//! fallback chain.

use crate::errors::EnvironmentMismatch;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Description of an execution host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system, e.g. `linux`, `macos`, `windows`.
    pub os: String,
    /// OS family, e.g. `unix`, `windows`.
    pub family: String,
    /// CPU architecture, e.g. `x86_64`, `aarch64`.
    pub arch: String,
}

impl Platform {
    /// Creates a platform description. Values are normalized to lowercase.
    #[must_use]
    pub fn new(os: impl AsRef<str>, family: impl AsRef<str>, arch: impl AsRef<str>) -> Self {
        Self {
            os: normalize_os(os.as_ref()),
            family: family.as_ref().trim().to_ascii_lowercase(),
            arch: arch.as_ref().trim().to_ascii_lowercase(),
        }
    }

    /// Detects the platform this process runs on.
    #[must_use]
    pub fn current() -> Self {
        Self::new(
            std::env::consts::OS,
            std::env::consts::FAMILY,
            std::env::consts::ARCH,
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.os, self.arch, self.family)
    }
}

fn normalize_os(os: &str) -> String {
    let os = os.trim().to_ascii_lowercase();
    match os.as_str() {
        "darwin" | "osx" | "macosx" => "macos".to_string(),
        "win32" | "win64" => "windows".to_string(),
        _ => os,
    }
}

/// A declared target environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlatformRequirement {
    /// Any host.
    Any,
    /// Any OS of the given family (`unix`, `windows`).
    Family {
        /// Required family.
        family: String,
    },
    /// A specific OS, optionally on a specific architecture.
    Os {
        /// Required OS.
        os: String,
        /// Required architecture, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arch: Option<String>,
    },
}

impl PlatformRequirement {
    /// Requires an OS family.
    #[must_use]
    pub fn family(family: impl AsRef<str>) -> Self {
        Self::Family {
            family: family.as_ref().trim().to_ascii_lowercase(),
        }
    }

    /// Requires an OS on any architecture.
    #[must_use]
    pub fn os(os: impl AsRef<str>) -> Self {
        Self::Os {
            os: normalize_os(os.as_ref()),
            arch: None,
        }
    }

    /// Requires an OS on a specific architecture.
    #[must_use]
    pub fn os_arch(os: impl AsRef<str>, arch: impl AsRef<str>) -> Self {
        Self::Os {
            os: normalize_os(os.as_ref()),
            arch: Some(arch.as_ref().trim().to_ascii_lowercase()),
        }
    }

    /// Returns true if `platform` satisfies this requirement.
    #[must_use]
    pub fn is_satisfied_by(&self, platform: &Platform) -> bool {
        match self {
            Self::Any => true,
            Self::Family { family } => family.eq_ignore_ascii_case(&platform.family),
            Self::Os { os, arch } => {
                normalize_os(os) == platform.os
                    && arch
                        .as_ref()
                        .map_or(true, |a| a.eq_ignore_ascii_case(&platform.arch))
            }
        }
    }
}

impl Default for PlatformRequirement {
    fn default() -> Self {
        Self::Any
    }
}

impl fmt::Display for PlatformRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any platform"),
            Self::Family { family } => write!(f, "{family} family"),
            Self::Os { os, arch: None } => write!(f, "{os}"),
            Self::Os { os, arch: Some(arch) } => write!(f, "{os}/{arch}"),
        }
    }
}

/// Validates the host against a declared requirement.
#[derive(Debug, Clone)]
pub struct PlatformGate {
    current: Platform,
}

impl PlatformGate {
    /// Creates a gate for the detected host platform.
    #[must_use]
    pub fn detect() -> Self {
        Self::for_platform(Platform::current())
    }

    /// Creates a gate that treats `platform` as the host.
    #[must_use]
    pub fn for_platform(platform: Platform) -> Self {
        Self { current: platform }
    }

    /// Returns the platform this gate checks against.
    #[must_use]
    pub fn current(&self) -> &Platform {
        &self.current
    }

    /// Fails with `EnvironmentMismatch` when the host does not satisfy `required`.
    pub fn check_environment(&self, required: &PlatformRequirement) -> Result<(), EnvironmentMismatch> {
        if required.is_satisfied_by(&self.current) {
            Ok(())
        } else {
            tracing::warn!(
                current = %self.current,
                required = %required,
                "Platform gate rejected execution"
            );
            Err(EnvironmentMismatch::new(self.current.clone(), required.clone()))
        }
    }
}

impl Default for PlatformGate {
    fn default() -> Self {
        Self::detect()
    }
}

/// Checks the detected host platform against `required`.
pub fn check_environment(required: &PlatformRequirement) -> Result<(), EnvironmentMismatch> {
    PlatformGate::detect().check_environment(required)
}
