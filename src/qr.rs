use std::path::{Path, PathBuf};

use anyhow::Context;
use qrcode::{render::svg, QrCode};

/// QR image boundary: turns a payload (a delegate id) into image bytes.
pub trait QrGenerator: Send + Sync {
    fn generate(&self, payload: &str) -> anyhow::Result<Vec<u8>>;
}

/// Renders the payload as an SVG QR code.
pub struct SvgQrGenerator;

impl QrGenerator for SvgQrGenerator {
    fn generate(&self, payload: &str) -> anyhow::Result<Vec<u8>> {
        let code = QrCode::new(payload.as_bytes()).context("build qr code")?;
        let image = code
            .render::<svg::Color>()
            .min_dimensions(200, 200)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();
        Ok(image.into_bytes())
    }
}

pub fn image_path(qr_dir: &str, id: &str) -> PathBuf {
    Path::new(qr_dir).join(format!("{id}.svg"))
}

/// Fetch the cached QR image for an id, generating and caching it on miss.
/// All file access goes through tokio so a cache hit never blocks the
/// runtime thread serving it.
pub async fn fetch_or_generate(
    generator: &dyn QrGenerator,
    qr_dir: &str,
    id: &str,
) -> anyhow::Result<Vec<u8>> {
    let path = image_path(qr_dir, id);
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return tokio::fs::read(&path).await.context("read cached qr image");
    }
    let bytes = generator.generate(id)?;
    tokio::fs::create_dir_all(qr_dir)
        .await
        .context("create qr dir")?;
    tokio::fs::write(&path, &bytes).await.context("write qr image")?;
    Ok(bytes)
}
