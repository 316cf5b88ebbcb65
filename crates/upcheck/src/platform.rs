//! Environment information reported to the update server.

/// Provides the platform name and version sent with every check.
pub trait EnvironmentInfo: Send + Sync {
    /// Platform identifier, e.g. `libadblockplus` or `linux-x86_64`.
    fn platform(&self) -> String;

    /// Version of the platform.
    fn platform_version(&self) -> String;
}

/// Fixed environment values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticEnvironment {
    platform: String,
    platform_version: String,
}

impl StaticEnvironment {
    pub fn new(platform: impl Into<String>, platform_version: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            platform_version: platform_version.into(),
        }
    }

    /// Environment describing the machine this crate was built for.
    pub fn host() -> Self {
        Self::new(current_platform(), env!("CARGO_PKG_VERSION"))
    }
}

impl EnvironmentInfo for StaticEnvironment {
    fn platform(&self) -> String {
        self.platform.clone()
    }

    fn platform_version(&self) -> String {
        self.platform_version.clone()
    }
}

/// Get the current platform string.
///
/// Returns a string like "windows-x86_64", "macos-aarch64", "linux-x86_64".
pub fn current_platform() -> String {
    let os = if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "android") {
        "android"
    } else {
        "unknown"
    };

    let arch = if cfg!(target_arch = "x86_64") {
        "x86_64"
    } else if cfg!(target_arch = "aarch64") {
        "aarch64"
    } else if cfg!(target_arch = "x86") {
        "x86"
    } else if cfg!(target_arch = "arm") {
        "arm"
    } else {
        "unknown"
    };

    format!("{}-{}", os, arch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_environment() {
        let env = StaticEnvironment::new("libadblockplus", "1.0");
        assert_eq!(env.platform(), "libadblockplus");
        assert_eq!(env.platform_version(), "1.0");
    }

    #[test]
    fn test_host_environment() {
        let env = StaticEnvironment::host();
        assert_eq!(env.platform(), current_platform());
        assert!(!env.platform_version().is_empty());
    }

    #[test]
    fn test_current_platform_format() {
        let platform = current_platform();
        assert_eq!(platform.split('-').count(), 2, "{platform}");
    }
}
