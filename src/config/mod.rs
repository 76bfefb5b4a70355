use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Stand-in secret used by `Settings::default()`. Never accepted at startup.
pub const PLACEHOLDER_JWT_SECRET: &str = "change-me-in-production";

/// Tokens are minted by the identity provider and signed with a shared
/// HS256 secret. We never issue tokens ourselves.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: Option<String>,
    pub admin_role: String,
}

impl AuthConfig {
    /// Rejects a missing, blank or placeholder signing secret.
    pub fn check_secret(&self) -> Result<(), ConfigError> {
        let secret = self.jwt_secret.trim();
        if secret.is_empty() || secret == PLACEHOLDER_JWT_SECRET {
            return Err(ConfigError::Message(
                "auth.jwt_secret must be set (ROSTER__AUTH__JWT_SECRET)".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            username: None,
            password: None,
            from_address: "noreply@localhost".to_string(),
            from_name: "Roster".to_string(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("database.url", "sqlite://roster.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.admin_role", "admin")?
            .set_default("email.enabled", false)?
            .set_default("email.smtp_host", "localhost")?
            .set_default("email.smtp_port", 587)?
            .set_default("email.from_address", "noreply@localhost")?
            .set_default("email.from_name", "Roster")?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with ROSTER__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("ROSTER").separator("__"))

            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.auth.check_secret()?;

        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://roster.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                jwt_secret: PLACEHOLDER_JWT_SECRET.to_string(),
                issuer: None,
                admin_role: "admin".to_string(),
            },
            email: EmailConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            issuer: None,
            admin_role: "admin".to_string(),
        }
    }

    #[test]
    fn placeholder_or_blank_secret_is_rejected() {
        assert!(auth(PLACEHOLDER_JWT_SECRET).check_secret().is_err());
        assert!(auth("").check_secret().is_err());
        assert!(auth("   ").check_secret().is_err());
        assert!(Settings::default().auth.check_secret().is_err());
    }

    #[test]
    fn real_secret_is_accepted() {
        assert!(auth("f3b9c2d7e1a84c5b").check_secret().is_ok());
    }
}
