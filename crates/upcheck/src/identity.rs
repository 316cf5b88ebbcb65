//! Identity of the application asking for updates.

use serde::{Deserialize, Serialize};

/// Immutable snapshot of the caller's identity.
///
/// Supplied once by the embedding application and shared by every check
/// for the lifetime of the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    /// Name of the library or add-on being updated
    pub name: String,
    /// Currently installed version (dotted numeric)
    pub version: String,
    /// Identifier of the host application
    pub application: String,
    /// Version of the host application
    #[serde(rename = "application_version", alias = "applicationVersion")]
    pub application_version: String,
    /// Whether this is a development build (selects the devbuild update URL)
    #[serde(default)]
    pub development_build: bool,
}

impl AppIdentity {
    /// Create a release-build identity.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        application: impl Into<String>,
        application_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            application: application.into(),
            application_version: application_version.into(),
            development_build: false,
        }
    }

    /// Mark the identity as a development build.
    pub fn with_development_build(mut self, development_build: bool) -> Self {
        self.development_build = development_build;
        self
    }

    /// Manifest key that applies to any host application.
    pub fn generic_scope_key(&self) -> String {
        self.name.clone()
    }

    /// Manifest key that applies only to this host application.
    pub fn application_scope_key(&self) -> String {
        format!("{}/{}", self.name, self.application)
    }
}
