//! Staff authentication
//!
//! Sign-in goes through the directory handshake (see `middleware`), ends in
//! a server-side session, and leaves a `CurrentUser` on every request.

pub mod claims;
pub mod directory;
pub mod middleware;
pub mod sessions;

pub use claims::{Claims, CurrentUser};
pub use directory::{DirectoryService, NullDirectory, TomlDirectory};
pub use middleware::authenticate;

use stacks_common::config::AuthConfig;

/// Cookie holding the directory handshake id while sign-in is in flight
pub const AUTH_ID_COOKIE: &str = "stacks_ops_auth_id";

/// Authentication settings resolved once at startup
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    /// Handshake URL with `{0}` for the id and `{1}` for the discriminator;
    /// `None` disables authentication
    pub redirect_url: Option<String>,
    pub timeout_minutes: i64,
    pub domain_name: Option<String>,
    pub cache_discriminator: String,
}

impl AuthSettings {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            redirect_url: config.redirect_template().map(String::from),
            timeout_minutes: config.timeout_minutes(),
            domain_name: config
                .domain_name
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from),
            cache_discriminator: config.cache_discriminator().to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.redirect_url.is_some()
    }

    /// Where to send the browser for handshake `id`
    pub fn handshake_url(&self, id: &str) -> Option<String> {
        self.redirect_url
            .as_deref()
            .map(|template| template.replace("{0}", id).replace("{1}", &self.cache_discriminator))
    }

    /// Strip a leading `DOMAIN\` (or any one-character separator) from a
    /// directory username
    pub fn strip_domain<'a>(&self, username: &'a str) -> &'a str {
        let Some(domain) = self.domain_name.as_deref() else {
            return username;
        };

        let has_prefix = username
            .get(..domain.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(domain));

        if has_prefix {
            let mut rest = username[domain.len()..].chars();
            rest.next();
            let stripped = rest.as_str();
            if !stripped.is_empty() {
                return stripped;
            }
        }
        username
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AuthSettings {
        AuthSettings {
            redirect_url: Some("https://sso.library.test/auth?id={0}&app={1}".to_string()),
            timeout_minutes: 2,
            domain_name: Some("LIBRARY".to_string()),
            cache_discriminator: "ops".to_string(),
        }
    }

    #[test]
    fn test_handshake_url_fills_placeholders() {
        assert_eq!(
            settings().handshake_url("abc").as_deref(),
            Some("https://sso.library.test/auth?id=abc&app=ops")
        );
        assert!(AuthSettings::default().handshake_url("abc").is_none());
    }

    #[test]
    fn test_strip_domain() {
        let settings = settings();
        assert_eq!(settings.strip_domain("LIBRARY\\jdoe"), "jdoe");
        assert_eq!(settings.strip_domain("library/jdoe"), "jdoe");
        assert_eq!(settings.strip_domain("jdoe"), "jdoe");
        assert_eq!(AuthSettings::default().strip_domain("LIBRARY\\jdoe"), "LIBRARY\\jdoe");
    }

    #[test]
    fn test_from_config_treats_blank_url_as_disabled() {
        let config = AuthConfig {
            redirect_url: Some("  ".to_string()),
            ..Default::default()
        };
        let settings = AuthSettings::from_config(&config);
        assert!(!settings.is_enabled());
        assert_eq!(settings.timeout_minutes, 2);
    }
}
