//! Two-tab editor over a template's header/footer configuration.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::template::model::{FooterConfig, HeaderConfig, HeaderFooterConfig};
use crate::template::store::TemplateStore;
use crate::upload::{ImagePolicy, ImageUpload, UploadError};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EditorTab {
    #[default]
    Header,
    Footer,
}

/// Partial header update; `None` keeps the current value.
#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeaderPatch {
    pub text: Option<String>,
    pub show_logo: Option<bool>,
}

/// Partial footer update; `None` keeps the current value.
#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FooterPatch {
    pub text: Option<String>,
    pub show_contact_info: Option<bool>,
    pub show_address: Option<bool>,
}

impl HeaderPatch {
    pub fn apply(&self, current: &HeaderConfig) -> HeaderConfig {
        HeaderConfig {
            text: self.text.clone().unwrap_or_else(|| current.text.clone()),
            logo: current.logo.clone(),
            show_logo: self.show_logo.unwrap_or(current.show_logo),
        }
    }
}

impl FooterPatch {
    pub fn apply(&self, current: &FooterConfig) -> FooterConfig {
        FooterConfig {
            text: self.text.clone().unwrap_or_else(|| current.text.clone()),
            show_contact_info: self.show_contact_info.unwrap_or(current.show_contact_info),
            show_address: self.show_address.unwrap_or(current.show_address),
        }
    }
}

/// Runs a client-supplied logo through the image policy, keeping the
/// normalised data URI. A config without a logo passes unchanged.
pub fn checked_config(
    policy: &ImagePolicy,
    mut config: HeaderFooterConfig,
) -> Result<HeaderFooterConfig, UploadError> {
    if let Some(logo) = config.header.logo.take() {
        config.header.logo = Some(policy.accept_data_uri(&logo)?.data_uri);
    }
    Ok(config)
}

pub struct HeaderFooterEditor {
    template_id: String,
    config: HeaderFooterConfig,
    active_tab: EditorTab,
    policy: ImagePolicy,
}

impl HeaderFooterEditor {
    pub fn new(template_id: impl Into<String>, config: HeaderFooterConfig, policy: ImagePolicy) -> Self {
        Self {
            template_id: template_id.into(),
            config,
            active_tab: EditorTab::Header,
            policy,
        }
    }

    /// Opens the editor on a stored template, `None` when the id is unknown.
    pub fn for_template(store: &TemplateStore, template_id: &str, policy: ImagePolicy) -> Option<Self> {
        store
            .get_template(template_id)
            .map(|t| Self::new(t.id, t.header_footer_config, policy))
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn config(&self) -> &HeaderFooterConfig {
        &self.config
    }

    pub fn active_tab(&self) -> EditorTab {
        self.active_tab
    }

    pub fn select_tab(&mut self, tab: EditorTab) {
        self.active_tab = tab;
    }

    pub fn on_header_change(&mut self, patch: &HeaderPatch) -> &HeaderFooterConfig {
        self.config = HeaderFooterConfig {
            header: patch.apply(&self.config.header),
            footer: self.config.footer.clone(),
        };
        &self.config
    }

    pub fn on_footer_change(&mut self, patch: &FooterPatch) -> &HeaderFooterConfig {
        self.config = HeaderFooterConfig {
            header: self.config.header.clone(),
            footer: patch.apply(&self.config.footer),
        };
        &self.config
    }

    /// Validates the logo and stores it as a data URI. Nothing changes on error.
    pub fn set_logo(&mut self, upload: &ImageUpload) -> Result<&HeaderFooterConfig, UploadError> {
        let accepted = self.policy.accept(upload)?;
        self.config.header.logo = Some(accepted.data_uri);
        Ok(&self.config)
    }

    /// Replaces the whole config. A logo in it must pass the image policy;
    /// nothing changes on error.
    pub fn replace_config(&mut self, config: HeaderFooterConfig) -> Result<&HeaderFooterConfig, UploadError> {
        self.config = checked_config(&self.policy, config)?;
        Ok(&self.config)
    }

    pub fn clear_logo(&mut self) -> &HeaderFooterConfig {
        self.config.header.logo = None;
        &self.config
    }

    /// Writes the composed config back to the owning template.
    ///
    /// Returns `false` when the template disappeared in the meantime.
    pub async fn on_save(self, store: &TemplateStore) -> bool {
        let saved = store
            .update_header_footer(&self.template_id, self.config)
            .await;
        if saved {
            log::info!("Header/footer saved for template '{}'", self.template_id);
        }
        saved
    }
}
