use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    pub port: u16,
    pub site_base_url_path: String,
    /// Base URL used to build the links sent in confirmation mails.
    pub frontend_url: String,
    #[serde(default)]
    pub fs_root_dir: std::path::PathBuf,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_key: String,
    #[serde(default = "default_token_lifetime_days")]
    pub token_lifetime_days: i64,
    #[serde(default = "default_max_failed_access_attempts")]
    pub max_failed_access_attempts: i32,
    #[serde(default = "default_lockout_minutes")]
    pub lockout_minutes: i64,
    #[serde(default = "default_email_token_lifetime_hours")]
    pub email_token_lifetime_hours: i64,
}

fn default_token_lifetime_days() -> i64 {
    30
}

fn default_max_failed_access_attempts() -> i32 {
    3
}

fn default_lockout_minutes() -> i64 {
    5
}

fn default_email_token_lifetime_hours() -> i64 {
    24
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LocalizedMail {
    pub subject: String,
    /// `{link}` is replaced with the confirmation URL.
    pub body: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MailConfig {
    #[serde(default = "default_mail_en")]
    pub en: LocalizedMail,
    #[serde(default = "default_mail_es")]
    pub es: LocalizedMail,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            en: default_mail_en(),
            es: default_mail_es(),
        }
    }
}

impl MailConfig {
    pub fn for_language(&self, language: &str) -> &LocalizedMail {
        if language.to_ascii_lowercase().starts_with("es") {
            &self.es
        } else {
            &self.en
        }
    }
}

fn default_mail_en() -> LocalizedMail {
    LocalizedMail {
        subject: "Fantasy - Account confirmation".to_owned(),
        body: "<h1>Fantasy - Account confirmation</h1>\
               <p>To enable your account, please click 'Confirm Email':</p>\
               <b><a href={link}>Confirm Email</a></b>"
            .to_owned(),
    }
}

fn default_mail_es() -> LocalizedMail {
    LocalizedMail {
        subject: "Fantasy - Confirmación de cuenta".to_owned(),
        body: "<h1>Fantasy - Confirmación de cuenta</h1>\
               <p>Para habilitar el usuario, por favor hacer clic en 'Confirmar Email':</p>\
               <b><a href={link}>Confirmar Email</a></b>"
            .to_owned(),
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Directory holding `{Country}.png` flags for the national teams.
    #[serde(default)]
    pub flags_dir: Option<std::path::PathBuf>,
    #[serde(default = "default_demo_password")]
    pub demo_password: String,
    #[serde(default = "default_true")]
    pub reconcile_predictions: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            flags_dir: None,
            demo_password: default_demo_password(),
            reconcile_predictions: true,
        }
    }
}

fn default_demo_password() -> String {
    "123456".to_owned()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server_config: ServerConfig,
    pub auth_config: AuthConfig,
    #[serde(default)]
    pub mail_config: MailConfig,
    #[serde(default)]
    pub seed_config: SeedConfig,
    pub db_path: String,
}

pub enum Insecure {
    Deny,
    Allow,
}

pub const MIN_JWT_KEY_LEN: usize = 32;

pub fn validate(cfg: &Config, insecure: Insecure) -> Result<(), String> {
    if cfg.auth_config.jwt_key.is_empty() {
        return Err("auth_config.jwt_key must not be empty".to_owned());
    }
    if cfg.auth_config.token_lifetime_days <= 0 {
        return Err("auth_config.token_lifetime_days must be positive".to_owned());
    }
    if cfg.auth_config.max_failed_access_attempts <= 0 {
        return Err("auth_config.max_failed_access_attempts must be positive".to_owned());
    }
    if cfg.seed_config.enabled && !(6..=20).contains(&cfg.seed_config.demo_password.len()) {
        return Err("seed_config.demo_password must be 6 to 20 characters long".to_owned());
    }
    match insecure {
        Insecure::Allow => {}
        Insecure::Deny => {
            if cfg.auth_config.jwt_key.len() < MIN_JWT_KEY_LEN {
                return Err(format!(
                    "auth_config.jwt_key must be at least {MIN_JWT_KEY_LEN} bytes in secure mode"
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE: &str = r#"
        db_path = "sqlite::memory:"

        [server_config]
        port = 8080
        site_base_url_path = ""
        frontend_url = "http://localhost:8080"

        [auth_config]
        jwt_key = "short"
    "#;

    #[test]
    fn defaults_are_filled_in() {
        let cfg: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.auth_config.token_lifetime_days, 30);
        assert_eq!(cfg.auth_config.max_failed_access_attempts, 3);
        assert_eq!(cfg.auth_config.email_token_lifetime_hours, 24);
        assert!(!cfg.seed_config.enabled);
        assert!(cfg.seed_config.reconcile_predictions);
        assert!(cfg.mail_config.en.body.contains("{link}"));
    }

    #[test]
    fn short_jwt_key_needs_insecure() {
        let cfg: Config = toml::from_str(SAMPLE).unwrap();
        assert!(validate(&cfg, Insecure::Deny).is_err());
        assert!(validate(&cfg, Insecure::Allow).is_ok());
    }

    #[test]
    fn spanish_mail_is_picked_by_prefix() {
        let mail = MailConfig::default();
        assert!(mail.for_language("es-AR").subject.contains("Confirmación"));
        assert!(mail.for_language("en").subject.contains("confirmation"));
        assert!(mail.for_language("").subject.contains("confirmation"));
    }
}
