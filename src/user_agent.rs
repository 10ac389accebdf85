//! User-Agent string for media requests.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/media-export";

/// Default User-Agent for media requests (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("media-export/{version} (+{PROJECT_UA_URL})")
}
