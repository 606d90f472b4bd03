/// Export of rendered symbols.
///
/// Covers the four download formats, the `qrcode-<timestamp>.<ext>` naming scheme,
/// and the busy flag that keeps a second export from starting while one is running.
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use tracing::info;

use crate::encoder::Symbol;
use crate::error::ExportError;
use crate::pdf;

/// Default directory for exports.
pub const DEFAULT_OUTPUT_DIR: &str = "generated";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg,
    Svg,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpeg),
            "svg" => Ok(ExportFormat::Svg),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

/// `qrcode-YYYY-MM-DDTHH-MM-SS.<ext>`, in UTC.
pub fn export_filename(now: DateTime<Utc>, format: ExportFormat) -> String {
    format!(
        "qrcode-{}.{}",
        now.format("%Y-%m-%dT%H-%M-%S"),
        format.extension()
    )
}

/// Blends `image` over white, dropping the alpha channel.
pub fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let blend = |c: u8| ((c as u16 * a as u16 + 255 * (255 - a as u16)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Encodes the symbol in `format`.
pub fn encode<S: Symbol>(symbol: &S, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Png => {
            let mut out = Cursor::new(Vec::new());
            DynamicImage::ImageRgba8(symbol.to_image()).write_to(&mut out, ImageFormat::Png)?;
            Ok(out.into_inner())
        }
        ExportFormat::Jpeg => {
            let mut out = Cursor::new(Vec::new());
            DynamicImage::ImageRgb8(flatten_on_white(&symbol.to_image()))
                .write_to(&mut out, ImageFormat::Jpeg)?;
            Ok(out.into_inner())
        }
        ExportFormat::Svg => Ok(symbol.to_svg().into_bytes()),
        ExportFormat::Pdf => pdf::single_page(&symbol.to_image()),
    }
}

/// Busy/idle flag for the export surface.
#[derive(Debug, Clone, Default)]
pub struct ExportGate {
    busy: Arc<AtomicBool>,
}

/// Marks the gate busy for as long as it lives.
#[derive(Debug)]
pub struct ExportGuard {
    busy: Arc<AtomicBool>,
}

impl ExportGate {
    pub fn new() -> Self {
        ExportGate::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn try_acquire(&self) -> Result<ExportGuard, ExportError> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ExportError::Busy)?;
        Ok(ExportGuard {
            busy: self.busy.clone(),
        })
    }
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Encodes `symbol` and writes it to `dir` under a timestamped name.
///
/// # Arguments
///
/// * `gate` - Busy flag shared by all exports. Held until this call returns.
/// * `symbol` - The rendered symbol, or `None` when nothing is rendered yet.
/// * `format` - One of PNG, JPEG, SVG or PDF.
/// * `dir` - Target directory. Created when missing.
///
/// # Errors
///
/// * [`ExportError::Busy`] while another export holds `gate`.
/// * [`ExportError::NothingToExport`] when `symbol` is `None`.
/// * [`ExportError::Image`] or [`ExportError::Pdf`] when encoding fails.
/// * [`ExportError::Io`] when the directory or the file cannot be written.
///
/// The gate is released on every exit path.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
///
/// use qistudio::encoder::{Encoder, StyledEncoder};
/// use qistudio::export::{download, ExportFormat, ExportGate};
/// use qistudio::options::RenderOptions;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let symbol = StyledEncoder.create(&RenderOptions {
///     data: "Hello, World!".into(),
///     ..RenderOptions::default()
/// })?;
/// let gate = ExportGate::new();
/// let path = download(&gate, Some(&symbol), ExportFormat::Svg, Path::new("generated")).await?;
/// println!("saved {}", path.display());
/// # Ok(())
/// # }
/// ```
pub async fn download<S: Symbol>(
    gate: &ExportGate,
    symbol: Option<&S>,
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    let _guard = gate.try_acquire()?;
    let symbol = symbol.ok_or(ExportError::NothingToExport)?;

    let bytes = encode(symbol, format)?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(export_filename(Utc::now(), format));
    tokio::fs::write(&path, &bytes).await?;

    info!(path = %path.display(), bytes = bytes.len(), %format, "QR code exported");
    Ok(path)
}
