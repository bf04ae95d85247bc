//! Image upload policy shared by profile photos and template logos.
//!
//! Uploads are checked once, up front: size limit, an image format recognised
//! from the bytes themselves, and agreement with whatever type the client
//! declared. Accepted images are turned into data URIs.

use actix_multipart::Multipart;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::TryStreamExt;
use image::ImageFormat;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum UploadError {
    #[error("le fichier est vide")]
    Empty,
    #[error("le fichier dépasse la taille maximale de {max} octets ({actual} octets reçus)")]
    TooLarge { max: usize, actual: usize },
    #[error("format d'image non pris en charge (PNG, JPEG, GIF ou WebP attendu)")]
    UnsupportedType,
    #[error("le type déclaré '{declared}' ne correspond pas au contenu ({detected})")]
    TypeMismatch { declared: String, detected: String },
    #[error("formulaire invalide: {0}")]
    Multipart(String),
    #[error("aucun fichier reçu dans le champ 'file'")]
    MissingFile,
    #[error("image illisible ({0})")]
    Unreadable(String),
    #[error("l'image doit être fournie en data URI base64")]
    InvalidDataUri,
}

/// Raw upload as received from a client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Multipart form accepted by the photo and logo upload endpoints.
#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct ImageUploadForm {
    #[allow(unused)]
    pub file: Vec<u8>,
}

/// An upload that passed the policy.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedImage {
    pub mime_type: &'static str,
    pub data_uri: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ImagePolicy {
    pub max_bytes: usize,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            max_bytes: 2 * 1024 * 1024,
        }
    }
}

impl ImagePolicy {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn accept(&self, upload: &ImageUpload) -> Result<AcceptedImage, UploadError> {
        if upload.bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                max: self.max_bytes,
                actual: upload.bytes.len(),
            });
        }

        let detected = detect_image_mime(&upload.bytes).ok_or(UploadError::UnsupportedType)?;
        image::load_from_memory(&upload.bytes).map_err(|e| UploadError::Unreadable(e.to_string()))?;

        if let Some(declared) = declared_mime(upload) {
            if declared != detected && !(is_jpeg(&declared) && is_jpeg(detected)) {
                return Err(UploadError::TypeMismatch {
                    declared,
                    detected: detected.to_string(),
                });
            }
        }

        Ok(AcceptedImage {
            mime_type: detected,
            data_uri: to_data_uri(detected, &upload.bytes),
        })
    }

    /// Same checks for an image that arrives already encoded as a data URI.
    pub fn accept_data_uri(&self, uri: &str) -> Result<AcceptedImage, UploadError> {
        let (mime_type, bytes) = decode_data_uri(uri).ok_or(UploadError::InvalidDataUri)?;
        self.accept(&ImageUpload {
            filename: None,
            content_type: Some(mime_type),
            bytes,
        })
    }
}

/// Recognises the supported formats from their magic bytes.
pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

pub fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}

/// Splits a base64 data URI into its MIME type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = BASE64.decode(payload.trim()).ok()?;
    Some((mime.to_string(), bytes))
}

fn is_jpeg(mime: &str) -> bool {
    mime == "image/jpeg" || mime == "image/jpg" || mime == "image/pjpeg"
}

// Generic binary types say nothing useful, so they are not held against the upload.
fn declared_mime(upload: &ImageUpload) -> Option<String> {
    let from_header = upload
        .content_type
        .as_deref()
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    from_header.or_else(|| {
        let filename = upload.filename.as_deref()?;
        mime_guess::from_path(filename)
            .first()
            .map(|m| m.essence_str().to_string())
            .filter(|m| m != "application/octet-stream")
    })
}

/// Reads the `file` field of a multipart form into an [`ImageUpload`].
///
/// Reading stops as soon as the body exceeds `max_bytes`.
pub async fn read_image_field(
    mut payload: Multipart,
    max_bytes: usize,
) -> Result<ImageUpload, UploadError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        let Some(disposition) = field.content_disposition() else {
            continue;
        };
        if disposition.get_name() != Some("file") {
            continue;
        }

        let filename = disposition
            .get_filename()
            .map(|name| sanitize_filename::sanitize(name));
        let content_type = field.content_type().map(|m| m.essence_str().to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| UploadError::Multipart(e.to_string()))?
        {
            bytes.extend_from_slice(&chunk);
            if bytes.len() > max_bytes {
                return Err(UploadError::TooLarge {
                    max: max_bytes,
                    actual: bytes.len(),
                });
            }
        }

        return Ok(ImageUpload {
            filename,
            content_type,
            bytes,
        });
    }

    Err(UploadError::MissingFile)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    pub(crate) fn tiny_png() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 4, Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn upload(bytes: Vec<u8>, content_type: Option<&str>, filename: Option<&str>) -> ImageUpload {
        ImageUpload {
            filename: filename.map(str::to_string),
            content_type: content_type.map(str::to_string),
            bytes,
        }
    }

    #[test]
    fn test_png_is_accepted_as_data_uri() {
        let accepted = ImagePolicy::default()
            .accept(&upload(tiny_png(), Some("image/png"), Some("logo.png")))
            .unwrap();
        assert_eq!(accepted.mime_type, "image/png");
        assert!(accepted.data_uri.starts_with("data:image/png;base64,"));

        let (mime, bytes) = decode_data_uri(&accepted.data_uri).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, tiny_png());
    }

    #[test]
    fn test_oversized_upload_is_rejected() {
        let policy = ImagePolicy::new(16);
        let result = policy.accept(&upload(tiny_png(), Some("image/png"), None));
        assert!(matches!(result, Err(UploadError::TooLarge { max: 16, .. })));
    }

    #[test]
    fn test_non_image_is_rejected() {
        let result = ImagePolicy::default().accept(&upload(
            b"%PDF-1.7 not an image".to_vec(),
            Some("image/png"),
            None,
        ));
        assert_eq!(result, Err(UploadError::UnsupportedType));
    }

    #[test]
    fn test_declared_type_must_match_content() {
        let result = ImagePolicy::default().accept(&upload(tiny_png(), None, Some("photo.jpg")));
        assert!(matches!(result, Err(UploadError::TypeMismatch { .. })));
    }

    #[test]
    fn test_octet_stream_declaration_is_ignored() {
        let accepted = ImagePolicy::default()
            .accept(&upload(tiny_png(), Some("application/octet-stream"), None))
            .unwrap();
        assert_eq!(accepted.mime_type, "image/png");
    }

    #[test]
    fn test_empty_upload_is_rejected() {
        let result = ImagePolicy::default().accept(&upload(Vec::new(), None, None));
        assert_eq!(result, Err(UploadError::Empty));
    }

    #[test]
    fn test_truncated_image_is_rejected() {
        let mut bytes = tiny_png();
        bytes.truncate(20);
        let result = ImagePolicy::default().accept(&upload(bytes, Some("image/png"), None));
        assert!(matches!(result, Err(UploadError::Unreadable(_))));
    }

    #[test]
    fn test_data_uri_goes_through_the_same_policy() {
        let policy = ImagePolicy::default();
        let uri = to_data_uri("image/png", &tiny_png());
        assert_eq!(policy.accept_data_uri(&uri).unwrap().data_uri, uri);

        assert_eq!(
            policy.accept_data_uri("data:image/png;base64,AAAA"),
            Err(UploadError::UnsupportedType)
        );
        assert_eq!(
            policy.accept_data_uri("https://example.org/logo.png"),
            Err(UploadError::InvalidDataUri)
        );
        assert!(matches!(
            ImagePolicy::new(16).accept_data_uri(&uri),
            Err(UploadError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_non_base64_uri() {
        assert!(decode_data_uri("data:image/svg+xml,<svg/>").is_none());
        assert!(decode_data_uri("https://example.org/logo.png").is_none());
    }
}
