use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

/// Open (creating if missing) one of the SQLite stores.
pub async fn connect(path: &str) -> anyhow::Result<SqlitePool> {
    ensure_parent_dir(path)?;
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("open sqlite store at {path}"))?;
    Ok(pool)
}

/// Schema for the main store: admins, users, delegates.
///
/// `delegates.email` carries a UNIQUE constraint so create-if-absent is a
/// single atomic insert; the original relied on a check-then-insert that
/// raced under concurrent registrations.
pub async fn init_main_schema(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admins (
            email TEXT PRIMARY KEY NOT NULL,
            password TEXT NOT NULL
        )
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS delegates (
            id TEXT PRIMARY KEY NOT NULL,
            firstname TEXT NOT NULL,
            lastname TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            contact TEXT NOT NULL DEFAULT '',
            dateofbirth TEXT NOT NULL DEFAULT '',
            gender TEXT NOT NULL DEFAULT '',
            pastmuns TEXT NOT NULL DEFAULT '',
            verified BOOLEAN NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            email TEXT PRIMARY KEY NOT NULL,
            password TEXT NOT NULL,
            FOREIGN KEY(email) REFERENCES delegates(email)
                ON UPDATE CASCADE ON DELETE CASCADE
        )
        "#,
    )
    .execute(db)
    .await?;

    info!("main store schema ready");
    Ok(())
}

/// Schema for the event store: a snapshot of the delegate plus country,
/// committee and nine meal flags. Breakfast on day one defaults to taken.
pub async fn init_event_schema(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mm_delegates (
            id TEXT PRIMARY KEY NOT NULL,
            firstname TEXT NOT NULL,
            lastname TEXT NOT NULL,
            email TEXT NOT NULL,
            contact TEXT NOT NULL DEFAULT '',
            dateofbirth TEXT NOT NULL DEFAULT '',
            gender TEXT NOT NULL DEFAULT '',
            country TEXT NOT NULL DEFAULT '',
            committee TEXT NOT NULL DEFAULT '',
            d1_bf BOOLEAN NOT NULL DEFAULT 1,
            d1_lunch BOOLEAN NOT NULL DEFAULT 0,
            d1_hitea BOOLEAN NOT NULL DEFAULT 0,
            d2_bf BOOLEAN NOT NULL DEFAULT 0,
            d2_lunch BOOLEAN NOT NULL DEFAULT 0,
            d2_hitea BOOLEAN NOT NULL DEFAULT 0,
            d3_bf BOOLEAN NOT NULL DEFAULT 0,
            d3_lunch BOOLEAN NOT NULL DEFAULT 0,
            d3_hitea BOOLEAN NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(db)
    .await?;

    info!("event store schema ready");
    Ok(())
}

/// Snapshot both stores with `VACUUM INTO` and archive the snapshots into
/// `backup_db.zip` under `backup_dir`. Returns the archive path.
pub async fn backup_databases(
    main_db: &SqlitePool,
    event_db: &SqlitePool,
    backup_dir: &str,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(backup_dir).context("create backup dir")?;
    let main_snapshot = Path::new(backup_dir).join("backup.db");
    let event_snapshot = Path::new(backup_dir).join("mm_backup.db");
    let archive = Path::new(backup_dir).join("backup_db.zip");

    snapshot_into(main_db, &main_snapshot).await?;
    snapshot_into(event_db, &event_snapshot).await?;

    let archive_path = archive.clone();
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let file = std::fs::File::create(&archive_path).context("create backup archive")?;
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for snapshot in [&main_snapshot, &event_snapshot] {
            let name = snapshot
                .file_name()
                .and_then(|n| n.to_str())
                .context("snapshot file name")?;
            zip.start_file(name, options)?;
            zip.write_all(&std::fs::read(snapshot)?)?;
        }
        zip.finish()?;
        Ok(())
    })
    .await
    .context("backup task panicked")??;

    info!(archive = %archive.display(), "stores backed up and compressed");
    Ok(archive)
}

async fn snapshot_into(db: &SqlitePool, target: &Path) -> anyhow::Result<()> {
    // VACUUM INTO refuses to overwrite an existing file.
    if target.exists() {
        std::fs::remove_file(target).context("remove stale snapshot")?;
    }
    let quoted = target.to_string_lossy().replace('\'', "''");
    sqlx::query(&format!("VACUUM INTO '{quoted}'"))
        .execute(db)
        .await
        .context("vacuum into snapshot")?;
    Ok(())
}

fn ensure_parent_dir(file_path: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(file_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
