use std::sync::Arc;

use crate::config::AppConfig;
use crate::document::export::ExportOptions;
use crate::document::qr::{QrCodeProvider, QrError, DEFAULT_QR_SIZE};
use crate::document::renderer::{DocumentRenderer, ProfileDocument};
use crate::profile::provider::{EmployeeProvider, HttpEmployeeProvider};
use crate::profile::view::{ProfileView, ViewRegistry};
use crate::template::persistence::{JsonFileRepository, TemplateRepository};
use crate::template::store::TemplateStore;
use crate::upload::ImagePolicy;

#[derive(Clone)]
pub struct AppState {
    pub templates: Arc<TemplateStore>,
    pub employees: Arc<dyn EmployeeProvider>,
    pub views: ViewRegistry,
    pub qr: QrCodeProvider,
    pub renderer: DocumentRenderer,
    pub image_policy: ImagePolicy,
    pub export_options: ExportOptions,
}

impl AppState {
    /// Wires the production adapters: templates in a JSON file, employees over HTTP.
    pub async fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .pool_idle_timeout(std::time::Duration::from_secs(900))
            .user_agent("profile-docs/0.3")
            .build()?;

        let repository: Arc<dyn TemplateRepository> =
            Arc::new(JsonFileRepository::new(config.template_file.clone()));
        let templates = Arc::new(TemplateStore::load(repository).await);

        let employees: Arc<dyn EmployeeProvider> = Arc::new(HttpEmployeeProvider::new(
            http_client,
            config.employee_api_url.clone(),
            config.employee_api_token.clone(),
        ));

        Ok(Self::new(templates, employees, config))
    }

    pub fn new(
        templates: Arc<TemplateStore>,
        employees: Arc<dyn EmployeeProvider>,
        config: &AppConfig,
    ) -> Self {
        let export_options = ExportOptions::default().with_pixel_ratio(config.export_pixel_ratio);
        Self {
            templates,
            employees,
            views: ViewRegistry::new(config.view_ttl, export_options),
            qr: QrCodeProvider::new(config.public_origin.clone()),
            renderer: DocumentRenderer::new(config.organization_address.clone()),
            image_policy: ImagePolicy::new(config.max_upload_bytes),
            export_options,
        }
    }

    /// Renders the view's current record with the active template.
    ///
    /// `pixel_ratio` sets how many bitmap pixels back each displayed QR pixel.
    pub fn render_view(&self, view: &ProfileView, pixel_ratio: f32) -> Result<ProfileDocument, QrError> {
        let template = self.templates.get_active_template();
        let (employee, mode) = view.current();
        let qr = if template.show_qr_code {
            Some(self.qr.render_scaled(&employee.id, DEFAULT_QR_SIZE, pixel_ratio)?)
        } else {
            None
        };
        Ok(self.renderer.render(&employee, mode, &template, qr.as_ref()))
    }
}
