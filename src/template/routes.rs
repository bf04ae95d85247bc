use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use log;

use crate::template::editor::{checked_config, FooterPatch, HeaderFooterEditor, HeaderPatch};
use crate::template::model::{
    HeaderFooterConfig, NewTemplateRequest, ProfileTemplate, SelectTemplateRequest,
    TemplateListResponse,
};
use crate::upload::{read_image_field, ImageUploadForm};
use crate::{AppState, ErrorResponse};

fn template_not_found(id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
        "Template '{}' not found",
        id
    )))
}

// Saves an editor back and answers with the resulting template.
async fn save_editor(state: &web::Data<AppState>, editor: HeaderFooterEditor) -> HttpResponse {
    let id = editor.template_id().to_string();
    if !editor.on_save(&state.templates).await {
        return template_not_found(&id);
    }
    match state.templates.get_template(&id) {
        Some(template) => HttpResponse::Ok().json(template),
        None => template_not_found(&id),
    }
}

fn open_editor(state: &web::Data<AppState>, id: &str) -> Option<HeaderFooterEditor> {
    HeaderFooterEditor::for_template(&state.templates, id, state.image_policy)
}

#[utoipa::path(
    get,
    path = "/api/templates",
    tag = "Templates",
    responses(
        (status = 200, description = "All templates and the active one", body = TemplateListResponse)
    )
)]
pub async fn list_templates(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(TemplateListResponse {
        active_template_id: state.templates.active_template_id(),
        templates: state.templates.list_templates(),
    })
}

#[utoipa::path(
    post,
    path = "/api/templates",
    tag = "Templates",
    request_body = NewTemplateRequest,
    responses(
        (status = 201, description = "Template created and activated", body = ProfileTemplate),
        (status = 400, description = "Missing name or rejected logo", body = ErrorResponse)
    )
)]
pub async fn create_template(
    state: web::Data<AppState>,
    item: web::Json<NewTemplateRequest>,
) -> impl Responder {
    let mut request = item.into_inner();
    if request.name.trim().is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request(
            "Le nom du modèle est obligatoire",
        ));
    }
    request.header_footer_config =
        match checked_config(&state.image_policy, request.header_footer_config) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Logo of new template '{}' rejected: {}", request.name, e);
                return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e.to_string()));
            }
        };
    let template = state.templates.save_new_template(request).await;
    HttpResponse::Created().json(template)
}

#[utoipa::path(
    get,
    path = "/api/templates/active",
    tag = "Templates",
    responses(
        (status = 200, description = "Active template", body = ProfileTemplate)
    )
)]
pub async fn get_active_template(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.templates.get_active_template())
}

#[utoipa::path(
    put,
    path = "/api/templates/active",
    tag = "Templates",
    request_body = SelectTemplateRequest,
    responses(
        (status = 200, description = "Template now active; an unknown id selects the first template", body = ProfileTemplate)
    )
)]
pub async fn select_template(
    state: web::Data<AppState>,
    item: web::Json<SelectTemplateRequest>,
) -> impl Responder {
    let selected = state.templates.select_template(&item.template_id).await;
    log::info!("Active profile template is now '{}'", selected.id);
    HttpResponse::Ok().json(selected)
}

#[utoipa::path(
    put,
    path = "/api/templates/{id}/header-footer",
    tag = "Templates",
    params(
        ("id" = String, Path, description = "Template ID")
    ),
    request_body = HeaderFooterConfig,
    responses(
        (status = 200, description = "Header/footer replaced", body = ProfileTemplate),
        (status = 400, description = "Rejected logo", body = ErrorResponse),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn update_header_footer(
    state: web::Data<AppState>,
    path: web::Path<String>,
    item: web::Json<HeaderFooterConfig>,
) -> impl Responder {
    let id = path.into_inner();
    let Some(mut editor) = open_editor(&state, &id) else {
        return template_not_found(&id);
    };
    if let Err(e) = editor.replace_config(item.into_inner()) {
        log::warn!("Header/footer of template '{}' rejected: {}", id, e);
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e.to_string()));
    }
    save_editor(&state, editor).await
}

#[utoipa::path(
    patch,
    path = "/api/templates/{id}/header",
    tag = "Templates",
    params(
        ("id" = String, Path, description = "Template ID")
    ),
    request_body = HeaderPatch,
    responses(
        (status = 200, description = "Header updated, other settings kept", body = ProfileTemplate),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn patch_header(
    state: web::Data<AppState>,
    path: web::Path<String>,
    item: web::Json<HeaderPatch>,
) -> impl Responder {
    let id = path.into_inner();
    let Some(mut editor) = open_editor(&state, &id) else {
        return template_not_found(&id);
    };
    editor.on_header_change(&item);
    save_editor(&state, editor).await
}

#[utoipa::path(
    patch,
    path = "/api/templates/{id}/footer",
    tag = "Templates",
    params(
        ("id" = String, Path, description = "Template ID")
    ),
    request_body = FooterPatch,
    responses(
        (status = 200, description = "Footer updated, other settings kept", body = ProfileTemplate),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn patch_footer(
    state: web::Data<AppState>,
    path: web::Path<String>,
    item: web::Json<FooterPatch>,
) -> impl Responder {
    let id = path.into_inner();
    let Some(mut editor) = open_editor(&state, &id) else {
        return template_not_found(&id);
    };
    editor.on_footer_change(&item);
    save_editor(&state, editor).await
}

#[utoipa::path(
    post,
    path = "/api/templates/{id}/logo",
    tag = "Templates",
    params(
        ("id" = String, Path, description = "Template ID")
    ),
    request_body(content = inline(ImageUploadForm), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Logo stored in the header", body = ProfileTemplate),
        (status = 400, description = "Rejected image", body = ErrorResponse),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn upload_logo(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: Multipart,
) -> impl Responder {
    let id = path.into_inner();
    let Some(mut editor) = open_editor(&state, &id) else {
        return template_not_found(&id);
    };

    let upload = match read_image_field(payload, state.image_policy.max_bytes).await {
        Ok(upload) => upload,
        Err(e) => {
            log::warn!("Logo upload for template '{}' rejected: {}", id, e);
            return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e.to_string()));
        }
    };
    if let Err(e) = editor.set_logo(&upload) {
        log::warn!("Logo upload for template '{}' rejected: {}", id, e);
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e.to_string()));
    }

    log::info!("Logo updated for template '{}'", id);
    save_editor(&state, editor).await
}

#[utoipa::path(
    delete,
    path = "/api/templates/{id}/logo",
    tag = "Templates",
    params(
        ("id" = String, Path, description = "Template ID")
    ),
    responses(
        (status = 200, description = "Logo removed", body = ProfileTemplate),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn delete_logo(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    let Some(mut editor) = open_editor(&state, &id) else {
        return template_not_found(&id);
    };
    editor.clear_logo();
    save_editor(&state, editor).await
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/templates")
            .route(web::get().to(list_templates))
            .route(web::post().to(create_template)),
    )
    .service(
        web::resource("/templates/active")
            .route(web::get().to(get_active_template))
            .route(web::put().to(select_template)),
    )
    .service(
        web::resource("/templates/{id}/header-footer").route(web::put().to(update_header_footer)),
    )
    .service(web::resource("/templates/{id}/header").route(web::patch().to(patch_header)))
    .service(web::resource("/templates/{id}/footer").route(web::patch().to(patch_footer)))
    .service(
        web::resource("/templates/{id}/logo")
            .route(web::post().to(upload_logo))
            .route(web::delete().to(delete_logo)),
    );
}
