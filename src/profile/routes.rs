use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use log;
use uuid::Uuid;

use crate::profile::controller::EditError;
use crate::profile::model::{ProfileField, UpdateFieldRequest};
use crate::profile::provider::ProviderError;
use crate::profile::view::{ProfileView, ViewSnapshot};
use crate::upload::{read_image_field, ImageUploadForm};
use crate::{AppState, ErrorResponse};

pub(crate) async fn find_view(
    state: &web::Data<AppState>,
    view_id: &Uuid,
) -> Result<Arc<ProfileView>, HttpResponse> {
    state.views.get(view_id).await.ok_or_else(|| {
        log::debug!("Profile view {} not found or expired", view_id);
        HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
            "Profile view {} not found",
            view_id
        )))
    })
}

pub(crate) fn provider_error_response(error: &ProviderError) -> HttpResponse {
    match error {
        ProviderError::NotFound(_) => {
            HttpResponse::NotFound().json(ErrorResponse::not_found(&error.to_string()))
        }
        ProviderError::Rejected(_) | ProviderError::Unavailable(_) => {
            HttpResponse::BadGateway().json(ErrorResponse::bad_gateway(&error.to_string()))
        }
    }
}

pub(crate) fn edit_error_response(error: &EditError) -> HttpResponse {
    match error {
        EditError::NotEditing | EditError::SaveInProgress => {
            HttpResponse::Conflict().json(ErrorResponse::conflict(&error.to_string()))
        }
        EditError::Invalid(errors) => {
            HttpResponse::BadRequest().json(ErrorResponse::bad_request(&errors.to_string()))
        }
        EditError::Upstream(e) => provider_error_response(e),
    }
}

fn snapshot_response(result: Result<ViewSnapshot, EditError>) -> HttpResponse {
    match result {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot),
        Err(e) => edit_error_response(&e),
    }
}

#[utoipa::path(
    post,
    path = "/api/profiles/{employee_id}/views",
    tag = "Profile Views",
    params(
        ("employee_id" = String, Path, description = "Employee ID in the employee service")
    ),
    responses(
        (status = 201, description = "View opened in viewing mode", body = ViewSnapshot),
        (status = 404, description = "Employee not found", body = ErrorResponse),
        (status = 502, description = "Employee service unavailable", body = ErrorResponse)
    )
)]
pub async fn open_view(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let employee_id = path.into_inner();
    match state.views.open(state.employees.as_ref(), &employee_id).await {
        Ok(view) => HttpResponse::Created().json(view.snapshot()),
        Err(e) => {
            log::error!("Failed to open profile of '{}': {}", employee_id, e);
            provider_error_response(&e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/views/{view_id}",
    tag = "Profile Views",
    params(
        ("view_id" = Uuid, Path, description = "View ID")
    ),
    responses(
        (status = 200, description = "Current state of the view", body = ViewSnapshot),
        (status = 404, description = "View not found or expired", body = ErrorResponse)
    )
)]
pub async fn get_view(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match find_view(&state, &path).await {
        Ok(view) => HttpResponse::Ok().json(view.snapshot()),
        Err(response) => response,
    }
}

#[utoipa::path(
    delete,
    path = "/api/views/{view_id}",
    tag = "Profile Views",
    params(
        ("view_id" = Uuid, Path, description = "View ID")
    ),
    responses(
        (status = 204, description = "View closed"),
        (status = 404, description = "View not found or expired", body = ErrorResponse)
    )
)]
pub async fn close_view(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match find_view(&state, &path).await {
        Ok(view) => {
            state.views.close(&view.id()).await;
            HttpResponse::NoContent().finish()
        }
        Err(response) => response,
    }
}

#[utoipa::path(
    post,
    path = "/api/views/{view_id}/edit",
    tag = "Profile Views",
    params(
        ("view_id" = Uuid, Path, description = "View ID")
    ),
    responses(
        (status = 200, description = "View switched to editing", body = ViewSnapshot),
        (status = 404, description = "View not found or expired", body = ErrorResponse)
    )
)]
pub async fn begin_edit(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match find_view(&state, &path).await {
        Ok(view) => HttpResponse::Ok().json(view.begin_edit()),
        Err(response) => response,
    }
}

#[utoipa::path(
    put,
    path = "/api/views/{view_id}/fields",
    tag = "Profile Views",
    params(
        ("view_id" = Uuid, Path, description = "View ID")
    ),
    request_body = UpdateFieldRequest,
    responses(
        (status = 200, description = "Working copy updated", body = ViewSnapshot),
        (status = 400, description = "Photo must be uploaded", body = ErrorResponse),
        (status = 404, description = "View not found or expired", body = ErrorResponse),
        (status = 409, description = "Not editing, or a save is in progress", body = ErrorResponse)
    )
)]
pub async fn update_field(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    item: web::Json<UpdateFieldRequest>,
) -> impl Responder {
    let view = match find_view(&state, &path).await {
        Ok(view) => view,
        Err(response) => return response,
    };
    let UpdateFieldRequest { field, value } = item.into_inner();
    // Photos only enter through the upload policy.
    if field == ProfileField::Photo && value.as_deref().is_some_and(|v| !v.trim().is_empty()) {
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request(
            "La photo doit être envoyée via le téléversement d'image",
        ));
    }
    snapshot_response(view.update_field(field, value))
}

#[utoipa::path(
    post,
    path = "/api/views/{view_id}/save",
    tag = "Profile Views",
    params(
        ("view_id" = Uuid, Path, description = "View ID")
    ),
    responses(
        (status = 200, description = "Changes committed, view back to viewing", body = ViewSnapshot),
        (status = 400, description = "Required field missing", body = ErrorResponse),
        (status = 404, description = "View not found or expired", body = ErrorResponse),
        (status = 409, description = "Not editing, or a save is already in progress", body = ErrorResponse),
        (status = 502, description = "Employee service rejected or failed the update", body = ErrorResponse)
    )
)]
pub async fn save_view(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let view = match find_view(&state, &path).await {
        Ok(view) => view,
        Err(response) => return response,
    };
    snapshot_response(view.save(state.employees.as_ref()).await)
}

#[utoipa::path(
    post,
    path = "/api/views/{view_id}/cancel",
    tag = "Profile Views",
    params(
        ("view_id" = Uuid, Path, description = "View ID")
    ),
    responses(
        (status = 200, description = "Edits discarded", body = ViewSnapshot),
        (status = 404, description = "View not found or expired", body = ErrorResponse),
        (status = 409, description = "A save is in progress", body = ErrorResponse)
    )
)]
pub async fn cancel_edit(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match find_view(&state, &path).await {
        Ok(view) => snapshot_response(view.cancel()),
        Err(response) => response,
    }
}

#[utoipa::path(
    post,
    path = "/api/views/{view_id}/photo",
    tag = "Profile Views",
    params(
        ("view_id" = Uuid, Path, description = "View ID")
    ),
    request_body(content = inline(ImageUploadForm), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Photo set on the working copy", body = ViewSnapshot),
        (status = 400, description = "Rejected image", body = ErrorResponse),
        (status = 404, description = "View not found or expired", body = ErrorResponse),
        (status = 409, description = "Not editing, or a save is in progress", body = ErrorResponse)
    )
)]
pub async fn upload_photo(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> impl Responder {
    let view = match find_view(&state, &path).await {
        Ok(view) => view,
        Err(response) => return response,
    };

    let accepted = match read_image_field(payload, state.image_policy.max_bytes)
        .await
        .and_then(|upload| state.image_policy.accept(&upload))
    {
        Ok(accepted) => accepted,
        Err(e) => {
            log::warn!("Photo upload for view {} rejected: {}", view.id(), e);
            return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e.to_string()));
        }
    };

    log::info!(
        "Photo ({}) set on view {} of employee '{}'",
        accepted.mime_type,
        view.id(),
        view.employee_id()
    );
    snapshot_response(view.update_field(ProfileField::Photo, Some(accepted.data_uri)))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/profiles/{employee_id}/views").route(web::post().to(open_view)))
        .service(
            web::resource("/views/{view_id}")
                .route(web::get().to(get_view))
                .route(web::delete().to(close_view)),
        )
        .service(web::resource("/views/{view_id}/edit").route(web::post().to(begin_edit)))
        .service(web::resource("/views/{view_id}/fields").route(web::put().to(update_field)))
        .service(web::resource("/views/{view_id}/save").route(web::post().to(save_view)))
        .service(web::resource("/views/{view_id}/cancel").route(web::post().to(cancel_edit)))
        .service(web::resource("/views/{view_id}/photo").route(web::post().to(upload_photo)));
}
