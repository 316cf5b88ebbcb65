//! Update-check request URL construction.
//!
//! The base address comes from a channel-specific template stored in the
//! preferences. `%NAME%` and `%TYPE%` are substituted from an ordered list of
//! placeholders, then the identity, platform and rollout parameters are
//! appended as `&key=value` pairs in a fixed order.

use serde::{Deserialize, Serialize};

use crate::error::UpdateError;
use crate::identity::AppIdentity;
use crate::platform::EnvironmentInfo;
use crate::prefs::{PreferenceStore, UPDATE_URL_DEVBUILD, UPDATE_URL_RELEASE};
use crate::rollout::RolloutState;

/// What started a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckTrigger {
    /// Explicitly requested by the user or embedding application
    Manual,
    /// Fired by the scheduler's interval timer
    Automatic,
}

impl std::fmt::Display for CheckTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Automatic => write!(f, "automatic"),
        }
    }
}

/// Values substituted for `%TYPE%`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTypeCodes {
    #[serde(default = "default_manual_code")]
    pub manual: String,
    #[serde(default = "default_automatic_code")]
    pub automatic: String,
}

impl Default for CheckTypeCodes {
    fn default() -> Self {
        Self {
            manual: default_manual_code(),
            automatic: default_automatic_code(),
        }
    }
}

impl CheckTypeCodes {
    pub fn code_for(&self, trigger: CheckTrigger) -> &str {
        match trigger {
            CheckTrigger::Manual => &self.manual,
            CheckTrigger::Automatic => &self.automatic,
        }
    }
}

fn default_manual_code() -> String {
    "1".to_string()
}

fn default_automatic_code() -> String {
    "0".to_string()
}

const NAME_PLACEHOLDER: &str = "%NAME%";
const TYPE_PLACEHOLDER: &str = "%TYPE%";

/// Renders check-request URLs.
#[derive(Debug, Clone, Default)]
pub struct UrlBuilder {
    codes: CheckTypeCodes,
}

impl UrlBuilder {
    pub fn new(codes: CheckTypeCodes) -> Self {
        Self { codes }
    }

    /// Preference key holding the template for this identity's build channel.
    pub fn template_key(identity: &AppIdentity) -> &'static str {
        if identity.development_build {
            UPDATE_URL_DEVBUILD
        } else {
            UPDATE_URL_RELEASE
        }
    }

    /// Look up the template for this identity in the preference store.
    pub fn template(
        prefs: &dyn PreferenceStore,
        identity: &AppIdentity,
    ) -> Result<String, UpdateError> {
        let key = Self::template_key(identity);
        match prefs.get_string(key) {
            Some(template) if !template.is_empty() => Ok(template),
            _ => Err(UpdateError::MissingPreference(key.to_string())),
        }
    }

    /// Render the request URL from an already resolved template.
    pub fn build(
        &self,
        template: &str,
        identity: &AppIdentity,
        environment: &dyn EnvironmentInfo,
        rollout: &RolloutState,
        trigger: CheckTrigger,
    ) -> String {
        let placeholders = [
            (NAME_PLACEHOLDER, identity.name.as_str()),
            (TYPE_PLACEHOLDER, self.codes.code_for(trigger)),
        ];
        let mut url = substitute(template, &placeholders);

        let platform = environment.platform();
        let platform_version = environment.platform_version();
        let download_count = rollout.download_count.to_string();
        let params = [
            ("addonName", identity.name.as_str()),
            ("addonVersion", identity.version.as_str()),
            ("application", identity.application.as_str()),
            ("applicationVersion", identity.application_version.as_str()),
            ("platform", platform.as_str()),
            ("platformVersion", platform_version.as_str()),
            ("lastVersion", rollout.last_version.as_str()),
            ("downloadCount", download_count.as_str()),
        ];
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }
        url
    }
}

/// Replace every occurrence of each placeholder in a single left-to-right
/// pass. At each position the first matching placeholder in list order wins;
/// substituted values are copied verbatim and never rescanned.
fn substitute(template: &str, placeholders: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(ch) = rest.chars().next() {
        match placeholders
            .iter()
            .find(|(placeholder, _)| rest.starts_with(placeholder))
        {
            Some((placeholder, value)) => {
                out.push_str(value);
                rest = &rest[placeholder.len()..];
            }
            None => {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::StaticEnvironment;
    use crate::prefs::MemoryPreferences;

    fn identity() -> AppIdentity {
        AppIdentity::new("1", "3", "4", "2")
    }

    #[test]
    fn test_manual_url() {
        let builder = UrlBuilder::default();
        let env = StaticEnvironment::new("libadblockplus", "1.0");
        let url = builder.build(
            "https://example.com/%NAME%/update.json?type=%TYPE%",
            &identity(),
            &env,
            &RolloutState::default(),
            CheckTrigger::Manual,
        );
        assert_eq!(
            url,
            "https://example.com/1/update.json?type=1\
             &addonName=1&addonVersion=3&application=4&applicationVersion=2\
             &platform=libadblockplus&platformVersion=1.0&lastVersion=0&downloadCount=0"
        );
    }

    #[test]
    fn test_automatic_code() {
        let builder = UrlBuilder::new(CheckTypeCodes {
            manual: "1".to_string(),
            automatic: "7".to_string(),
        });
        let env = StaticEnvironment::new("p", "v");
        let url = builder.build(
            "https://x/?type=%TYPE%",
            &identity(),
            &env,
            &RolloutState::default(),
            CheckTrigger::Automatic,
        );
        assert!(url.starts_with("https://x/?type=7&"));
    }

    #[test]
    fn test_all_occurrences_replaced() {
        let builder = UrlBuilder::default();
        let env = StaticEnvironment::new("p", "v");
        let url = builder.build(
            "https://x/%NAME%/%NAME%?t=%TYPE%&t2=%TYPE%",
            &identity(),
            &env,
            &RolloutState::default(),
            CheckTrigger::Manual,
        );
        assert!(url.starts_with("https://x/1/1?t=1&t2=1&"));
    }

    #[test]
    fn test_name_containing_placeholder_is_not_rescanned_as_name() {
        let builder = UrlBuilder::default();
        let env = StaticEnvironment::new("p", "v");
        let mut id = identity();
        id.name = "%NAME%".to_string();
        let url = builder.build(
            "https://x/%NAME%",
            &id,
            &env,
            &RolloutState::default(),
            CheckTrigger::Manual,
        );
        assert!(url.starts_with("https://x/%NAME%&addonName=%NAME%"));
    }

    #[test]
    fn test_substituted_value_is_not_rescanned() {
        let placeholders = [(NAME_PLACEHOLDER, "%TYPE%"), (TYPE_PLACEHOLDER, "1")];
        assert_eq!(substitute("%NAME%-%TYPE%", &placeholders), "%TYPE%-1");
        assert_eq!(substitute("%%NAME%%", &placeholders), "%%TYPE%%");
        assert_eq!(substitute("no placeholders", &placeholders), "no placeholders");
    }

    #[test]
    fn test_rollout_parameters() {
        let builder = UrlBuilder::default();
        let env = StaticEnvironment::new("p", "v");
        let rollout = RolloutState {
            last_version: "3.1".to_string(),
            download_count: 4,
        };
        let url = builder.build("https://x/?", &identity(), &env, &rollout, CheckTrigger::Manual);
        assert!(url.ends_with("&lastVersion=3.1&downloadCount=4"));
    }

    #[test]
    fn test_template_selection() {
        let prefs = MemoryPreferences::empty()
            .with(UPDATE_URL_RELEASE, "release")
            .with(UPDATE_URL_DEVBUILD, "devbuild");
        let release = identity();
        let devbuild = identity().with_development_build(true);
        assert_eq!(UrlBuilder::template(&prefs, &release).unwrap(), "release");
        assert_eq!(UrlBuilder::template(&prefs, &devbuild).unwrap(), "devbuild");
    }

    #[test]
    fn test_missing_template() {
        let prefs = MemoryPreferences::empty();
        let result = UrlBuilder::template(&prefs, &identity());
        assert!(matches!(result, Err(UpdateError::MissingPreference(key)) if key == UPDATE_URL_RELEASE));
    }
}
