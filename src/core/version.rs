//! core::version
//!
//! Installed git version and feature gating.
//!
//! `git --version` prints `git version 2.39.2` (optionally with vendor
//! suffixes such as `.windows.1` or `(Apple Git-143)`). The numeric part is
//! read as `MAJOR.MINOR[.PATCH][-PRERELEASE]`, missing components default to
//! zero, and the result is compared with `semver` ordering, so a pre-release
//! sorts below the same release without one.
//!
//! An unparseable version is represented as [`GitVersion::unknown`] and is
//! lower than every gated feature.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use semver::{Prerelease, Version};

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?(?:-([0-9A-Za-z][0-9A-Za-z.-]*))?")
        .expect("static regex")
});

/// Minimum version for `git init --initial-branch`.
pub const INITIAL_BRANCH_MIN: (u64, u64, u64) = (2, 28, 0);
/// Minimum version for `git push --force-if-includes`.
pub const FORCE_IF_INCLUDES_MIN: (u64, u64, u64) = (2, 30, 0);
/// Minimum version for `rev-parse --show-superproject-working-tree`.
pub const SUPERPROJECT_MIN: (u64, u64, u64) = (2, 13, 0);

/// Version of the git executable the runner drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitVersion {
    raw: String,
    parsed: Option<Version>,
}

impl GitVersion {
    /// Parse the output of `git --version` (or a bare version string).
    pub fn parse(output: &str) -> Self {
        let raw = output.trim().to_string();
        let parsed = VERSION_RE.captures(&raw).and_then(|caps| {
            let num = |i: usize| -> Option<u64> {
                caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
            };
            let mut version = Version::new(num(1)?, num(2)?, num(3)?);
            if let Some(pre) = caps.get(4) {
                version.pre = Prerelease::new(pre.as_str()).ok()?;
            }
            Some(version)
        });
        Self { raw, parsed }
    }

    /// A version that satisfies no gate.
    pub fn unknown() -> Self {
        Self {
            raw: String::new(),
            parsed: None,
        }
    }

    /// The raw `--version` text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The parsed semantic version, if any.
    pub fn version(&self) -> Option<&Version> {
        self.parsed.as_ref()
    }

    /// True when the installed version is at least `major.minor.patch`.
    pub fn at_least(&self, (major, minor, patch): (u64, u64, u64)) -> bool {
        match &self.parsed {
            Some(v) => *v >= Version::new(major, minor, patch),
            None => false,
        }
    }

    pub fn supports_initial_branch(&self) -> bool {
        self.at_least(INITIAL_BRANCH_MIN)
    }

    pub fn supports_force_if_includes(&self) -> bool {
        self.at_least(FORCE_IF_INCLUDES_MIN)
    }

    pub fn supports_superproject(&self) -> bool {
        self.at_least(SUPERPROJECT_MIN)
    }
}

impl fmt::Display for GitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parsed {
            Some(v) => write!(f, "{v}"),
            None => f.write_str("unknown"),
        }
    }
}
