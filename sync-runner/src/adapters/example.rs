//! Example API: credential exchange on `auth`, payloads on `post`.
//!
//! Endpoints and credentials come entirely from the `example_api_settings`
//! record; only the host has a built-in default.

use crate::types::AdapterProfile;

pub const PROJECT: &str = "example";
pub const DEFAULT_HOST: &str = "https://example.com";

pub fn profile() -> AdapterProfile {
    AdapterProfile {
        project: PROJECT.to_string(),
        default_host: DEFAULT_HOST.to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile() {
        let profile = profile();
        assert_eq!(profile.adapter_name(), "example_api");
        assert_eq!(profile.settings_name(), "example_api_settings");
        assert_eq!(profile.default_host, "https://example.com");
        assert!(profile.default_endpoints.is_empty());
        assert!(profile.credential_fields.is_empty());
    }
}
