pub mod example;
pub mod token_api;

use crate::types::AdapterProfile;

/// Profiles of the adapters compiled into this binary.
pub fn builtin_profiles() -> Vec<AdapterProfile> {
    vec![example::profile()]
}
