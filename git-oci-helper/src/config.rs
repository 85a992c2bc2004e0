//! Startup configuration (spec §6.1 supplement): the registry address is
//! carried entirely in the remote URL, so there is no on-disk config file —
//! this is just the environment-variable wiring a binary's `main` reads
//! once, the way `radicle::Profile::load()` is loaded once in the teacher's
//! `main.rs`.

use log::Level;

const TOKEN_VAR: &str = "GIT_OCI_TOKEN";
const LOG_VAR: &str = "GIT_OCI_LOG";

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub token: Option<String>,
    pub default_level: Option<Level>,
}

impl Config {
    /// Reads [`TOKEN_VAR`] and [`LOG_VAR`] from the environment. Missing or
    /// unparsable values are silently absent, not an error: both fall back
    /// to sane defaults (no auth, `Error` level) at the call site.
    pub fn from_env() -> Self {
        Self {
            token: std::env::var(TOKEN_VAR).ok().filter(|s| !s.is_empty()),
            default_level: std::env::var(LOG_VAR).ok().and_then(|s| s.parse().ok()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_has_no_token_or_level() {
        let config = Config::default();
        assert!(config.token.is_none());
        assert!(config.default_level.is_none());
    }
}
