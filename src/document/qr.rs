//! Profile QR codes.
//!
//! The encoded URL is part of what gets printed, so its shape must not change:
//! `{origin}/hr/employees/{id}`.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use thiserror::Error;

use crate::upload::to_data_uri;

pub const DEFAULT_QR_SIZE: u32 = 128;
const MAX_QR_PIXELS: u32 = 2048;
/// Light border the renderer draws on each side, in modules.
const QUIET_ZONE_MODULES: u32 = 4;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("failed to encode QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("failed to encode QR image: {0}")]
    Image(#[from] image::ImageError),
}

pub fn profile_url(origin: &str, employee_id: &str) -> String {
    format!("{}/hr/employees/{}", origin.trim_end_matches('/'), employee_id)
}

/// A rendered QR code. `size` is the display size; the bitmap holds
/// `pixel_size` pixels per side so it stays sharp when scaled up.
#[derive(Debug, Clone, PartialEq)]
pub struct QrImage {
    pub url: String,
    pub size: u32,
    pub pixel_size: u32,
    pub png: Vec<u8>,
    pub downloadable: bool,
}

impl QrImage {
    pub fn data_uri(&self) -> String {
        to_data_uri("image/png", &self.png)
    }

    pub fn downloadable(mut self, downloadable: bool) -> Self {
        self.downloadable = downloadable;
        self
    }

    pub fn download_filename(&self, employee_id: &str) -> String {
        format!(
            "qr-{}.png",
            sanitize_filename::sanitize(employee_id).replace(char::is_whitespace, "_")
        )
    }
}

#[derive(Debug, Clone)]
pub struct QrCodeProvider {
    origin: String,
}

impl QrCodeProvider {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn url_for(&self, employee_id: &str) -> String {
        profile_url(&self.origin, employee_id)
    }

    pub fn render(&self, employee_id: &str, size: u32) -> Result<QrImage, QrError> {
        self.render_scaled(employee_id, size, 1.0)
    }

    /// Renders with `pixel_ratio` bitmap pixels per display pixel.
    pub fn render_scaled(
        &self,
        employee_id: &str,
        size: u32,
        pixel_ratio: f32,
    ) -> Result<QrImage, QrError> {
        let size = size.clamp(32, MAX_QR_PIXELS);
        let url = self.url_for(employee_id);

        let code = QrCode::new(url.as_bytes())?;
        // Below one pixel per module the resize would drop whole modules.
        let pixel_size = ((size as f32 * pixel_ratio.max(1.0)).round() as u32)
            .min(MAX_QR_PIXELS)
            .max(module_span(&code));
        let rendered = code
            .render::<Luma<u8>>()
            .min_dimensions(pixel_size, pixel_size)
            .build();
        let exact = if rendered.width() == pixel_size {
            rendered
        } else {
            imageops::resize(&rendered, pixel_size, pixel_size, FilterType::Nearest)
        };

        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(exact).write_to(&mut png, ImageFormat::Png)?;

        Ok(QrImage {
            url,
            size,
            pixel_size,
            png: png.into_inner(),
            downloadable: false,
        })
    }
}

/// Side of the code in modules, quiet zone included.
fn module_span(code: &QrCode) -> u32 {
    code.width() as u32 + 2 * QUIET_ZONE_MODULES
}
