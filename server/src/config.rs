use anyhow::{Context, Result, anyhow};
use products_crm::auth::AuthConfig;
use products_crm::lifecycle::LifecyclePolicy;

const MIN_SECRET_LEN: usize = 32;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub cors_allowed_origins: Vec<String>,
    pub login_path: String,
    pub lifecycle: LifecyclePolicy,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("AUTH_SECRET").context("AUTH_SECRET missing")?;
        if jwt_secret.trim().len() < MIN_SECRET_LEN {
            return Err(anyhow!(
                "AUTH_SECRET must be at least {MIN_SECRET_LEN} characters"
            ));
        }

        let session_ttl_minutes = match lookup("SESSION_TTL_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|minutes| *minutes > 0)
                .ok_or_else(|| anyhow!("invalid SESSION_TTL_MINUTES: {raw}"))?,
            None => 120,
        };

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        let login_path = lookup("LOGIN_PATH")
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| "/login".into());
        if !login_path.starts_with('/') {
            return Err(anyhow!("LOGIN_PATH must be an absolute path: {login_path}"));
        }

        let refresh_tier_without_service = match lookup("TIER_REFRESH_WITHOUT_SERVICE") {
            Some(raw) => parse_flag(&raw)
                .ok_or_else(|| anyhow!("invalid TIER_REFRESH_WITHOUT_SERVICE: {raw}"))?,
            None => true,
        };

        Ok(Self {
            auth: AuthConfig {
                jwt_secret: jwt_secret.trim().to_string(),
                session_ttl_minutes,
            },
            cors_allowed_origins,
            login_path,
            lifecycle: LifecyclePolicy {
                refresh_tier_without_service,
            },
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("AUTH_SECRET", SECRET)]).unwrap();
        assert_eq!(config.auth.session_ttl_minutes, 120);
        assert_eq!(config.login_path, "/login");
        assert!(config.cors_allowed_origins.is_empty());
        assert!(config.lifecycle.refresh_tier_without_service);
    }

    #[test]
    fn secret_is_required_and_long_enough() {
        assert!(load(&[]).is_err());
        assert!(load(&[("AUTH_SECRET", "short")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("AUTH_SECRET", SECRET),
            ("SESSION_TTL_MINUTES", "30"),
            ("CORS_ALLOWED_ORIGINS", "http://a.test, ,http://b.test"),
            ("LOGIN_PATH", "/accounts/login/"),
            ("TIER_REFRESH_WITHOUT_SERVICE", "off"),
        ])
        .unwrap();
        assert_eq!(config.auth.session_ttl_minutes, 30);
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert_eq!(config.login_path, "/accounts/login/");
        assert!(!config.lifecycle.refresh_tier_without_service);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(load(&[("AUTH_SECRET", SECRET), ("SESSION_TTL_MINUTES", "0")]).is_err());
        assert!(load(&[("AUTH_SECRET", SECRET), ("TIER_REFRESH_WITHOUT_SERVICE", "maybe")]).is_err());
        assert!(load(&[("AUTH_SECRET", SECRET), ("LOGIN_PATH", "login")]).is_err());
    }
}
