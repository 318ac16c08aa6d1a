//! Shared User-Agent string for tracker API clients.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/crossupload";

/// Default User-Agent for tracker API requests (identifies the tool and version).
#[must_use]
pub(crate) fn default_api_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("crossupload/{version} (+{PROJECT_UA_URL})")
}
