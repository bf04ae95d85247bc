use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse, Responder};
use log;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::document::export::ExportError;
use crate::document::html::render_html;
use crate::document::qr::DEFAULT_QR_SIZE;
use crate::document::renderer::ProfileDocument;
use crate::profile::routes::find_view;
use crate::{AppState, ErrorResponse};

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Json,
    Html,
}

#[derive(Deserialize, Debug, IntoParams)]
pub struct DocumentQuery {
    /// `json` (default) for the zone tree, `html` for the printable preview.
    #[serde(default)]
    pub format: DocumentFormat,
}

#[derive(Deserialize, Debug, IntoParams)]
pub struct QrQuery {
    /// Display size in pixels.
    pub size: Option<u32>,
    /// Serve as an attachment.
    #[serde(default)]
    pub download: bool,
}

fn attachment(filename: String) -> ContentDisposition {
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(filename)],
    }
}

#[utoipa::path(
    get,
    path = "/api/views/{view_id}/document",
    tag = "Documents",
    params(
        ("view_id" = Uuid, Path, description = "View ID"),
        DocumentQuery
    ),
    responses(
        (status = 200, description = "Rendered document, as JSON zones or an HTML fragment", body = ProfileDocument),
        (status = 404, description = "View not found or expired", body = ErrorResponse),
        (status = 500, description = "QR code generation failed", body = ErrorResponse)
    )
)]
pub async fn get_document(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<DocumentQuery>,
) -> impl Responder {
    let view = match find_view(&state, &path).await {
        Ok(view) => view,
        Err(response) => return response,
    };

    let document = match state.render_view(&view, 1.0) {
        Ok(document) => document,
        Err(e) => {
            log::error!("Failed to render document of view {}: {}", view.id(), e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&e.to_string()));
        }
    };

    match query.format {
        DocumentFormat::Json => HttpResponse::Ok().json(document),
        DocumentFormat::Html => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(render_html(&document)),
    }
}

#[utoipa::path(
    post,
    path = "/api/views/{view_id}/export",
    tag = "Documents",
    params(
        ("view_id" = Uuid, Path, description = "View ID")
    ),
    responses(
        (status = 200, description = "PDF attachment", body = Vec<u8>, content_type = "application/pdf"),
        (status = 404, description = "View not found or expired", body = ErrorResponse),
        (status = 409, description = "An export of this view is already running", body = ErrorResponse),
        (status = 500, description = "Export failed, nothing was produced", body = ErrorResponse)
    )
)]
pub async fn export_document(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let view = match find_view(&state, &path).await {
        Ok(view) => view,
        Err(response) => return response,
    };
    if view.is_exporting() {
        return HttpResponse::Conflict().json(ErrorResponse::conflict(
            &ExportError::Busy.to_string(),
        ));
    }

    let document = match state.render_view(&view, state.export_options.pixel_ratio) {
        Ok(document) => document,
        Err(e) => {
            log::error!("Failed to render document of view {}: {}", view.id(), e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&e.to_string()));
        }
    };

    let view_id = view.id();
    let result = web::block(move || view.export(&document)).await;
    match result {
        Ok(Ok(file)) => HttpResponse::Ok()
            .content_type(file.mime_type())
            .insert_header(attachment(file.filename.clone()))
            .body(file.bytes),
        Ok(Err(ExportError::Busy)) => HttpResponse::Conflict().json(ErrorResponse::conflict(
            &ExportError::Busy.to_string(),
        )),
        Ok(Err(e)) => {
            log::error!("Export of view {} failed: {}", view_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&e.to_string()))
        }
        Err(e) => {
            log::error!("Export task of view {} did not complete: {}", view_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(
                "L'exportation a été interrompue",
            ))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/employees/{id}/qr",
    tag = "Documents",
    params(
        ("id" = String, Path, description = "Employee ID"),
        QrQuery
    ),
    responses(
        (status = 200, description = "PNG encoding the employee profile URL", body = Vec<u8>, content_type = "image/png"),
        (status = 500, description = "QR code generation failed", body = ErrorResponse)
    )
)]
pub async fn get_qr_code(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<QrQuery>,
) -> impl Responder {
    let employee_id = path.into_inner();
    let size = query.size.unwrap_or(DEFAULT_QR_SIZE);
    let qr = match state.qr.render(&employee_id, size) {
        Ok(qr) => qr.downloadable(query.download),
        Err(e) => {
            log::error!("Failed to render QR code for '{}': {}", employee_id, e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&e.to_string()));
        }
    };

    let mut response = HttpResponse::Ok();
    response.content_type("image/png");
    if qr.downloadable {
        response.insert_header(attachment(qr.download_filename(&employee_id)));
    }
    response.body(qr.png)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/views/{view_id}/document").route(web::get().to(get_document)))
        .service(web::resource("/views/{view_id}/export").route(web::post().to(export_document)))
        .service(web::resource("/employees/{id}/qr").route(web::get().to(get_qr_code)));
}
