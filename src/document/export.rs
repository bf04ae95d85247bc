//! PDF export of profile documents.
//!
//! The document is laid out once as a continuous canvas, scaled to the page
//! width, and then cut into pages: page `k` shows the same canvas shifted up by
//! `(k - 1)` page heights. Each page is a crop window over one tall strip, not
//! a separate layout.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use image::{DynamicImage, Rgb, RgbImage, Rgba};
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject,
    IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Px, Rgb as PdfRgb,
};
use thiserror::Error;

use crate::document::layout::{layout_document, Canvas, CanvasItem, TextWeight, DEFAULT_SOURCE_WIDTH};
use crate::document::renderer::ProfileDocument;
use crate::upload::decode_data_uri;

pub const A4_WIDTH_PT: f32 = 595.28;
pub const A4_HEIGHT_PT: f32 = 841.89;
pub const MIN_PIXEL_RATIO: f32 = 2.0;
pub const EXPORT_EXTENSION: &str = "pdf";

// Leftovers smaller than this (float noise) never open a new page.
const PAGINATION_EPSILON: f32 = 0.01;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("une exportation est déjà en cours")]
    Busy,
    #[error("image illisible ({0})")]
    Image(String),
    #[error("échec de l'assemblage du PDF: {0}")]
    Pdf(String),
    #[error("échec de l'écriture du fichier: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    /// Width the document is laid out at, in source pixels.
    pub source_width: f32,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    /// Bitmap pixels per display pixel for generated images; never below 2.
    pub pixel_ratio: f32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            source_width: DEFAULT_SOURCE_WIDTH,
            page_width_pt: A4_WIDTH_PT,
            page_height_pt: A4_HEIGHT_PT,
            pixel_ratio: MIN_PIXEL_RATIO,
        }
    }
}

impl ExportOptions {
    pub fn with_pixel_ratio(mut self, ratio: f32) -> Self {
        self.pixel_ratio = ratio.max(MIN_PIXEL_RATIO);
        self
    }

    /// Points per source pixel.
    pub fn scale(&self) -> f32 {
        self.page_width_pt / self.source_width
    }
}

/// One output page: the canvas is drawn at `offset` (points, zero or negative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBand {
    pub number: usize,
    pub offset: f32,
}

impl PageBand {
    /// Whether `[top, bottom)` (in scaled canvas points) shows on this page.
    pub fn shows(&self, top: f32, bottom: f32, page_height: f32) -> bool {
        let top = top + self.offset;
        let bottom = bottom + self.offset;
        top < page_height && bottom >= 0.0
    }
}

/// Cuts a strip of `content_height` into pages of `page_height`.
///
/// Page 1 sits at offset 0; another page is added, one page height further up,
/// for as long as content remains below the current page.
pub fn paginate(content_height: f32, page_height: f32) -> Vec<PageBand> {
    let mut bands = vec![PageBand {
        number: 1,
        offset: 0.0,
    }];
    let mut remaining = content_height - page_height;
    while remaining > PAGINATION_EPSILON {
        let offset = -(bands.len() as f32) * page_height;
        bands.push(PageBand {
            number: bands.len() + 1,
            offset,
        });
        remaining -= page_height;
    }
    bands
}

/// `"Jean  Dupont"` -> `"Jean_Dupont.pdf"`.
pub fn export_filename(title: &str) -> String {
    let joined = title.split_whitespace().collect::<Vec<_>>().join("_");
    let safe = sanitize_filename::sanitize(joined);
    let stem = if safe.trim_matches(['_', '.']).is_empty() {
        "profil".to_string()
    } else {
        safe
    };
    format!("{}.{}", stem, EXPORT_EXTENSION)
}

#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl ExportedFile {
    pub fn mime_type(&self) -> &'static str {
        "application/pdf"
    }

    /// Writes the file into `dir` through a temporary file, so the target path
    /// only ever holds a complete document.
    pub fn persist_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(dir)?;
        let target = dir.join(&self.filename);
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&self.bytes)?;
        temp.persist(&target).map_err(|e| ExportError::Io(e.error))?;
        Ok(target)
    }
}

/// Clears the busy flag when dropped, whatever the outcome of the export.
pub struct ExportGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Exports one profile view's document; at most one export runs at a time.
#[derive(Debug, Default)]
pub struct ExportPipeline {
    busy: AtomicBool,
    options: ExportOptions,
}

impl ExportPipeline {
    pub fn new(options: ExportOptions) -> Self {
        Self {
            busy: AtomicBool::new(false),
            options,
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claims the pipeline, `None` when an export is already running.
    pub fn try_begin(&self) -> Option<ExportGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExportGuard { flag: &self.busy })
    }

    pub fn export(&self, doc: &ProfileDocument, title: &str) -> Result<ExportedFile, ExportError> {
        let Some(_guard) = self.try_begin() else {
            log::warn!("Export of '{}' ignored, another export is running", title);
            return Err(ExportError::Busy);
        };
        self.run(doc, title)
    }

    fn run(&self, doc: &ProfileDocument, title: &str) -> Result<ExportedFile, ExportError> {
        let canvas = layout_document(doc, self.options.source_width);
        let images = rasterize_images(&canvas)?;

        let scale = self.options.page_width_pt / canvas.width;
        let bands = paginate(canvas.height * scale, self.options.page_height_pt);
        log::debug!(
            "Exporting '{}': {:.0}px canvas, scale {:.4}, {} page(s)",
            title,
            canvas.height,
            scale,
            bands.len()
        );

        let bytes = assemble_pdf(&canvas, &images, &bands, scale, &self.options, title)?;
        let filename = export_filename(title);
        log::info!("Exported '{}' ({} pages, {} bytes)", filename, bands.len(), bytes.len());

        Ok(ExportedFile {
            filename,
            bytes,
            page_count: bands.len(),
        })
    }
}

/// Decodes every image on the canvas, flattened onto white.
fn rasterize_images(canvas: &Canvas) -> Result<HashMap<String, RgbImage>, ExportError> {
    let mut decoded = HashMap::new();
    for uri in canvas.images() {
        if decoded.contains_key(uri) {
            continue;
        }
        let (_, bytes) = decode_data_uri(uri)
            .ok_or_else(|| ExportError::Image("URI de données invalide".to_string()))?;
        let image = image::load_from_memory(&bytes).map_err(|e| ExportError::Image(e.to_string()))?;
        decoded.insert(uri.to_string(), flatten_on_white(&image));
    }
    Ok(decoded)
}

fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        rgb.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    rgb
}

fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

struct PageContext<'a> {
    layer: PdfLayerReference,
    regular: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
    band: PageBand,
    scale: f32,
    page_height: f32,
}

impl PageContext<'_> {
    /// Converts a canvas y (source pixels, top-down) to a PDF y (points, bottom-up).
    fn pdf_y(&self, canvas_y: f32) -> f32 {
        self.page_height - (canvas_y * self.scale + self.band.offset)
    }

    fn draw(&self, item: &CanvasItem, images: &HashMap<String, RgbImage>) {
        let x = |v: f32| pt_to_mm(v * self.scale);
        match item {
            CanvasItem::Text {
                x: left,
                y,
                size,
                weight,
                gray,
                text,
            } => {
                if text.is_empty() {
                    return;
                }
                let font = match weight {
                    TextWeight::Regular => self.regular,
                    TextWeight::Bold => self.bold,
                };
                let font_size = size * self.scale;
                let baseline = self.pdf_y(*y) - font_size * 0.8;
                self.layer
                    .set_fill_color(Color::Rgb(PdfRgb::new(*gray, *gray, *gray, None)));
                self.layer
                    .use_text(text.as_str(), font_size, x(*left), pt_to_mm(baseline), font);
            }
            CanvasItem::Rule { x: left, y, width } => {
                let py = self.pdf_y(*y);
                self.layer
                    .set_outline_color(Color::Rgb(PdfRgb::new(0.8, 0.8, 0.8, None)));
                self.layer.set_outline_thickness(0.5);
                self.layer.add_line(Line {
                    points: vec![
                        (Point::new(x(*left), pt_to_mm(py)), false),
                        (Point::new(x(*left + *width), pt_to_mm(py)), false),
                    ],
                    is_closed: false,
                });
            }
            CanvasItem::Image {
                x: left,
                y,
                width,
                height,
                data_uri,
            } => {
                if let Some(bitmap) = images.get(data_uri) {
                    self.draw_image(bitmap, *left, *y, *width, *height);
                }
            }
            CanvasItem::Initial {
                x: left,
                y,
                size,
                letter,
            } => {
                let top = self.pdf_y(*y);
                let bottom = self.pdf_y(*y + *size);
                let right = *left + *size;
                self.layer
                    .set_outline_color(Color::Rgb(PdfRgb::new(0.75, 0.75, 0.75, None)));
                self.layer.set_outline_thickness(1.0);
                self.layer.add_line(Line {
                    points: vec![
                        (Point::new(x(*left), pt_to_mm(top)), false),
                        (Point::new(x(right), pt_to_mm(top)), false),
                        (Point::new(x(right), pt_to_mm(bottom)), false),
                        (Point::new(x(*left), pt_to_mm(bottom)), false),
                    ],
                    is_closed: true,
                });

                let font_size = size * 0.5 * self.scale;
                let glyph_x = (*left + *size * 0.32) * self.scale;
                let baseline = (top + bottom) / 2.0 - font_size * 0.35;
                self.layer
                    .set_fill_color(Color::Rgb(PdfRgb::new(0.45, 0.45, 0.45, None)));
                self.layer
                    .use_text(letter.as_str(), font_size, pt_to_mm(glyph_x), pt_to_mm(baseline), self.bold);
            }
        }
    }

    // Fits the bitmap in the box, keeping its aspect ratio, anchored top-left.
    fn draw_image(&self, bitmap: &RgbImage, left: f32, top: f32, box_width: f32, box_height: f32) {
        let (px_width, px_height) = bitmap.dimensions();
        if px_width == 0 || px_height == 0 {
            return;
        }
        let aspect = px_width as f32 / px_height as f32;
        let (width, height) = if box_width / box_height > aspect {
            (box_height * aspect, box_height)
        } else {
            (box_width, box_width / aspect)
        };

        let width_pt = width * self.scale;
        let bottom_pt = self.pdf_y(top + height);
        let dpi = px_width as f32 * 72.0 / width_pt;

        let image = Image::from(ImageXObject {
            width: Px(px_width as usize),
            height: Px(px_height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: false,
            image_data: bitmap.as_raw().clone(),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });
        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(pt_to_mm(left * self.scale)),
                translate_y: Some(pt_to_mm(bottom_pt)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
    }
}

fn assemble_pdf(
    canvas: &Canvas,
    images: &HashMap<String, RgbImage>,
    bands: &[PageBand],
    scale: f32,
    options: &ExportOptions,
    title: &str,
) -> Result<Vec<u8>, ExportError> {
    let page_width = pt_to_mm(options.page_width_pt);
    let page_height = pt_to_mm(options.page_height_pt);
    let (doc, first_page, first_layer) = PdfDocument::new(title, page_width, page_height, "Layer 1");

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    for band in bands {
        let layer = if band.number == 1 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(page_width, page_height, "Layer 1");
            doc.get_page(page).get_layer(layer)
        };

        let page = PageContext {
            layer,
            regular: &regular,
            bold: &bold,
            band: *band,
            scale,
            page_height: options.page_height_pt,
        };

        for item in &canvas.items {
            if band.shows(item.top() * scale, item.bottom() * scale, options.page_height_pt) {
                page.draw(item, images);
            }
        }
    }

    doc.save_to_bytes().map_err(|e| ExportError::Pdf(e.to_string()))
}
