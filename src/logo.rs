/// Logo upload handling.
///
/// A logo goes through three steps: validation of the MIME type and file size,
/// decoding, and a downscale to fit within 200x200 pixels. The result is a [`Logo`]
/// that the render options share by reference count, so dropping the options' handle
/// releases the image.
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::debug;

use crate::error::LogoError;

/// Largest accepted upload, in bytes.
pub const MAX_LOGO_BYTES: u64 = 5 * 1024 * 1024;
/// Logos are downscaled to fit within a square of this side.
pub const MAX_LOGO_DIMENSION: u32 = 200;

/// A decoded, downscaled logo image.
#[derive(Clone, PartialEq)]
pub struct Logo {
    png: Vec<u8>,
    image: RgbaImage,
}

impl fmt::Debug for Logo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logo")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

impl Logo {
    /// Builds a logo from an already decoded image, downscaling it when needed.
    pub fn from_image(image: DynamicImage) -> Result<Logo, LogoError> {
        let (width, height) = fit_within(
            image.width(),
            image.height(),
            MAX_LOGO_DIMENSION,
            MAX_LOGO_DIMENSION,
        );
        let image = if (width, height) != (image.width(), image.height()) {
            image.resize_exact(width, height, FilterType::Lanczos3)
        } else {
            image
        };

        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;
        Ok(Logo {
            png: png.into_inner(),
            image: image.to_rgba8(),
        })
    }

    /// Decodes an encoded image held in memory.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Encoded image data in any format the `image` crate can guess.
    ///
    /// # Errors
    ///
    /// Returns [`LogoError::Decode`] when the bytes are not a readable image.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use image::{ImageFormat, RgbaImage};
    /// use qistudio::logo::Logo;
    ///
    /// let mut png = Cursor::new(Vec::new());
    /// RgbaImage::new(400, 100).write_to(&mut png, ImageFormat::Png).unwrap();
    ///
    /// let logo = Logo::from_bytes(png.get_ref()).unwrap();
    /// assert_eq!((logo.width(), logo.height()), (200, 50));
    /// assert!(Logo::from_bytes(b"not an image").is_err());
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Result<Logo, LogoError> {
        Logo::from_image(image::load_from_memory(bytes)?)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    /// `data:image/png;base64,...` form of the logo, used when embedding in SVG.
    pub fn data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }
}

/// Rejects non-image MIME types and files above [`MAX_LOGO_BYTES`].
pub fn validate(mime: &str, size: u64) -> Result<(), LogoError> {
    if !mime.starts_with("image/") {
        return Err(LogoError::InvalidType(mime.to_string()));
    }
    if size > MAX_LOGO_BYTES {
        return Err(LogoError::TooLarge(format_file_size(size)));
    }
    Ok(())
}

/// Scales `(width, height)` down to fit `max_width` x `max_height`, keeping the
/// aspect ratio. Images that already fit are returned unchanged.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let (mut w, mut h) = (width as f64, height as f64);
    if w > h {
        if w > max_width as f64 {
            h = h * max_width as f64 / w;
            w = max_width as f64;
        }
    } else if h > max_height as f64 {
        w = w * max_height as f64 / h;
        h = max_height as f64;
    }
    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}

/// Formats a byte count as `Bytes`, `KB`, `MB` or `GB` with up to two decimals.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const SIZES: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let k = 1024f64;
    let i = ((bytes as f64).ln() / k.ln()).floor() as usize;
    let i = i.min(SIZES.len() - 1);
    let value = bytes as f64 / k.powi(i as i32);
    let mut text = format!("{value:.2}");
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    format!("{text} {}", SIZES[i])
}

/// A logo file chosen by the user, not yet validated.
#[derive(Debug, Clone)]
pub struct LogoUpload {
    pub path: PathBuf,
    pub mime: String,
    pub size: u64,
}

impl LogoUpload {
    /// Reads the file metadata and guesses the MIME type from the extension.
    pub fn inspect(path: impl AsRef<Path>) -> Result<LogoUpload, LogoError> {
        let path = path.as_ref().to_path_buf();
        let size = std::fs::metadata(&path)?.len();
        let mime = mime_guess::from_path(&path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();
        Ok(LogoUpload { path, mime, size })
    }

    pub fn validate(&self) -> Result<(), LogoError> {
        validate(&self.mime, self.size)
    }

    /// Reads, decodes and downscales the file. Blocking.
    pub fn load(&self) -> Result<Logo, LogoError> {
        let bytes = std::fs::read(&self.path)?;
        let logo = Logo::from_bytes(&bytes)?;
        debug!(
            path = %self.path.display(),
            width = logo.width(),
            height = logo.height(),
            "logo decoded"
        );
        Ok(logo)
    }

    /// Runs [`LogoUpload::load`] on the blocking pool.
    pub async fn load_async(self) -> Result<Logo, LogoError> {
        tokio::task::spawn_blocking(move || self.load())
            .await
            .map_err(|e| LogoError::Task(e.to_string()))?
    }
}
