use std::fmt;

pub const EXPORTER_NAME: &str = "dockex";

/// Version details shown by `--version` and on the landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub commit: &'static str,
    pub build_date: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: EXPORTER_NAME,
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("DOCKEX_GIT_COMMIT").unwrap_or("unknown"),
            build_date: option_env!("DOCKEX_BUILD_DATE").unwrap_or("1970-01-01T00:00:00Z"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "CommitID: {}", self.commit)?;
        writeln!(f, "BuildDate: {}", self.build_date)?;
        writeln!(f, "Platform: {}/{}", self.os, self.arch)
    }
}
