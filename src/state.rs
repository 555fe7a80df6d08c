use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::db;
use crate::mail::{LogMailer, Mailer};
use crate::qr::{QrGenerator, SvgQrGenerator};

#[derive(Clone)]
pub struct AppState {
    pub main_db: SqlitePool,
    pub event_db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
    pub qr: Arc<dyn QrGenerator>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let main_db = db::connect(&config.main_db_path).await?;
        let event_db = db::connect(&config.event_db_path).await?;
        db::init_main_schema(&main_db).await?;
        db::init_event_schema(&event_db).await?;

        Ok(Self {
            main_db,
            event_db,
            config,
            mailer: Arc::new(LogMailer),
            qr: Arc::new(SvgQrGenerator),
        })
    }

    /// In-memory state for tests: both stores on private SQLite memory
    /// databases with the schema applied, log-only mail, real QR rendering.
    pub async fn fake() -> Self {
        use sqlx::sqlite::SqlitePoolOptions;

        let main_db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory main store");
        let event_db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory event store");
        db::init_main_schema(&main_db).await.expect("main schema");
        db::init_event_schema(&event_db).await.expect("event schema");

        let tmp = std::env::temp_dir().join("mundra-test");
        let config = Arc::new(AppConfig {
            main_db_path: ":memory:".into(),
            event_db_path: ":memory:".into(),
            backup_dir: tmp.join("backups").to_string_lossy().into_owned(),
            qr_dir: tmp.join("qrcodes").to_string_lossy().into_owned(),
            base_url: "http://localhost:8000".into(),
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                issuer: "mundra-test".into(),
                access_ttl_minutes: 180,
                refresh_ttl_minutes: 7 * 24 * 60,
                verification_ttl_minutes: 120,
            },
            mail: crate::config::MailConfig {
                from_name: "test".into(),
                support_email: "support@test.local".into(),
                tech_email: "tech@test.local".into(),
            },
        });

        Self {
            main_db,
            event_db,
            config,
            mailer: Arc::new(LogMailer),
            qr: Arc::new(SvgQrGenerator),
        }
    }
}
