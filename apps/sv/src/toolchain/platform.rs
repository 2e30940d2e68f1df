//! Platform detection.
//!
//! Go distributions are named after `GOOS`/`GOARCH`, which differ from Rust's
//! target names in a few places (`macos` is `darwin`, `x86_64` is `amd64`).

use anyhow::{Result, bail};
use std::fmt;

/// The host platform in Go's naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    os: &'static str,
    arch: &'static str,
}

impl Platform {
    /// Detects the platform this binary was compiled for.
    ///
    /// # Errors
    ///
    /// Returns an error if Go publishes no binary distribution for the host.
    pub fn detect() -> Result<Self> {
        Self::from_rust(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Maps Rust `target_os`/`target_arch` names to Go's.
    ///
    /// # Errors
    ///
    /// Returns an error for an OS or architecture Go does not ship for.
    pub fn from_rust(os: &str, arch: &str) -> Result<Self> {
        let go_os = match os {
            "linux" => "linux",
            "macos" => "darwin",
            "windows" => "windows",
            "freebsd" => "freebsd",
            _ => bail!("Unsupported operating system: {os}"),
        };
        let go_arch = match arch {
            "x86_64" => "amd64",
            "x86" => "386",
            "aarch64" => "arm64",
            "arm" => "armv6l",
            "loongarch64" => "loong64",
            "powerpc64" => "ppc64le",
            "riscv64" => "riscv64",
            "s390x" => "s390x",
            _ => bail!("Unsupported architecture: {arch}"),
        };
        Ok(Self {
            os: go_os,
            arch: go_arch,
        })
    }

    #[must_use = "returns the OS name without side effects"]
    pub fn os(self) -> &'static str {
        self.os
    }

    #[must_use = "returns the architecture name without side effects"]
    pub fn arch(self) -> &'static str {
        self.arch
    }

    #[must_use = "returns platform check result without side effects"]
    pub fn is_windows(self) -> bool {
        self.os == "windows"
    }

    /// Archive suffix Go publishes for this platform.
    #[must_use = "returns the extension string without side effects"]
    pub fn archive_extension(self) -> &'static str {
        if self.is_windows() { "zip" } else { "tar.gz" }
    }

    /// Returns `.exe` on Windows, empty string elsewhere.
    #[must_use = "returns the extension string without side effects"]
    pub fn executable_extension(self) -> &'static str {
        if self.is_windows() { ".exe" } else { "" }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
