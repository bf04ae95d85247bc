use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod document;
pub mod profile;
pub mod state;
pub mod template;
pub mod upload;

pub use crate::config::AppConfig;
pub use crate::state::AppState;

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn conflict(message: &str) -> Self {
        Self::new("Conflict", message)
    }

    pub fn bad_gateway(message: &str) -> Self {
        Self::new("BadGateway", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::template::routes::list_templates,
        crate::template::routes::create_template,
        crate::template::routes::get_active_template,
        crate::template::routes::select_template,
        crate::template::routes::update_header_footer,
        crate::template::routes::patch_header,
        crate::template::routes::patch_footer,
        crate::template::routes::upload_logo,
        crate::template::routes::delete_logo,
        crate::profile::routes::open_view,
        crate::profile::routes::get_view,
        crate::profile::routes::close_view,
        crate::profile::routes::begin_edit,
        crate::profile::routes::update_field,
        crate::profile::routes::save_view,
        crate::profile::routes::cancel_edit,
        crate::profile::routes::upload_photo,
        crate::document::routes::get_document,
        crate::document::routes::export_document,
        crate::document::routes::get_qr_code
    ),
    components(
        schemas(
            ErrorResponse,
            template::model::ProfileTemplate,
            template::model::HeaderFooterConfig,
            template::model::HeaderConfig,
            template::model::FooterConfig,
            template::model::QrCodePosition,
            template::model::NewTemplateRequest,
            template::model::SelectTemplateRequest,
            template::model::TemplateListResponse,
            template::editor::HeaderPatch,
            template::editor::FooterPatch,
            profile::model::ProfileEmployee,
            profile::model::ProfileField,
            profile::model::UpdateFieldRequest,
            profile::controller::EditMode,
            profile::view::ViewSnapshot,
            document::renderer::ProfileDocument,
            document::routes::DocumentFormat,
            upload::ImageUploadForm,
        )
    ),
    tags(
        (name = "Templates", description = "Profile template and header/footer endpoints."),
        (name = "Profile Views", description = "Viewing and editing employee profiles."),
        (name = "Documents", description = "Document preview, PDF export and QR codes.")
    )
)]
pub struct ApiDoc;

/// Registers every `/api` route.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.configure(template::routes::config)
        .configure(profile::routes::config)
        .configure(document::routes::config);
}

pub async fn run() -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    let config = AppConfig::from_env()?;
    let app_state = web::Data::new(AppState::from_config(&config).await?);
    let upload_limit = config.max_upload_bytes;

    let prometheus = PrometheusMetricsBuilder::new("profile_docs")
        .endpoint("/metrics")
        .build()
        .map_err(|e| anyhow::anyhow!("failed to create Prometheus metrics middleware: {}", e))?;

    log::info!(
        "Starting server at http://{}:{} (templates in {})",
        config.bind_addr,
        config.port,
        config.template_file.display()
    );

    let allowed_origins = config.allowed_origins.clone();
    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .expose_headers(vec![header::CONTENT_DISPOSITION])
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .app_data(web::JsonConfig::default().limit(upload_limit * 2))
            .service(web::scope("/api").configure(configure_api))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
