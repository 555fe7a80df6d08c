use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    pub verification_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from_name: String,
    pub support_email: String,
    pub tech_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub main_db_path: String,
    pub event_db_path: String,
    pub backup_dir: String,
    pub qr_dir: String,
    pub base_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_i64_or(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "mundra"),
            access_ttl_minutes: env_i64_or("JWT_ACCESS_TTL_MINUTES", 3 * 60),
            refresh_ttl_minutes: env_i64_or("JWT_REFRESH_TTL_MINUTES", 7 * 24 * 60),
            verification_ttl_minutes: env_i64_or("VERIFICATION_TOKEN_EXPIRE_MINUTES", 120),
        };
        let mail = MailConfig {
            from_name: env_or("MAIL_FROM_NAME", "Tech - MUNSociety MPSTME"),
            support_email: env_or("SUPPORT_EMAIL", "contact@munsocietympstme.com"),
            tech_email: env_or("TECH_EMAIL", "technology@munsocietympstme.com"),
        };
        Ok(Self {
            main_db_path: env_or("MAIN_DB_PATH", "databases/main.db"),
            event_db_path: env_or("EVENT_DB_PATH", "databases/mm.db"),
            backup_dir: env_or("BACKUP_DIR", "backups"),
            qr_dir: env_or("QR_DIR", "qrcodes"),
            base_url: env_or("BASE_URL", "http://localhost:8000"),
            jwt,
            mail,
        })
    }
}
