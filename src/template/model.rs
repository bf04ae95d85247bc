use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where the profile QR code is placed in the rendered document.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QrCodePosition {
    Header,
    #[default]
    Body,
    Footer,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeaderConfig {
    #[serde(default)]
    pub text: String,
    /// Logo stored as a data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default)]
    pub show_logo: bool,
}

impl HeaderConfig {
    /// The logo when it is both configured and switched on.
    pub fn visible_logo(&self) -> Option<&str> {
        if self.show_logo {
            self.logo.as_deref().filter(|l| !l.is_empty())
        } else {
            None
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FooterConfig {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub show_contact_info: bool,
    #[serde(default)]
    pub show_address: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ToSchema)]
pub struct HeaderFooterConfig {
    #[serde(default)]
    pub header: HeaderConfig,
    #[serde(default)]
    pub footer: FooterConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileTemplate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub header_footer_config: HeaderFooterConfig,
    #[serde(rename = "showQRCode", default)]
    pub show_qr_code: bool,
    #[serde(rename = "qrCodePosition", default)]
    pub qr_code_position: QrCodePosition,
    #[serde(default)]
    pub show_department_info: bool,
    #[serde(default)]
    pub show_manager_info: bool,
    #[serde(default)]
    pub show_job_title: bool,
}

impl ProfileTemplate {
    /// The zone holding the QR code, if the template shows one at all.
    pub fn qr_zone(&self) -> Option<QrCodePosition> {
        self.show_qr_code.then_some(self.qr_code_position)
    }
}

/// A template submitted for creation; the store assigns the id.
#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub header_footer_config: HeaderFooterConfig,
    #[serde(rename = "showQRCode", default)]
    pub show_qr_code: bool,
    #[serde(rename = "qrCodePosition", default)]
    pub qr_code_position: QrCodePosition,
    #[serde(default)]
    pub show_department_info: bool,
    #[serde(default)]
    pub show_manager_info: bool,
    #[serde(default)]
    pub show_job_title: bool,
}

impl NewTemplateRequest {
    pub fn into_template(self, id: String) -> ProfileTemplate {
        ProfileTemplate {
            id,
            name: self.name,
            description: self.description,
            header_footer_config: self.header_footer_config,
            show_qr_code: self.show_qr_code,
            qr_code_position: self.qr_code_position,
            show_department_info: self.show_department_info,
            show_manager_info: self.show_manager_info,
            show_job_title: self.show_job_title,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectTemplateRequest {
    pub template_id: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateListResponse {
    pub active_template_id: String,
    pub templates: Vec<ProfileTemplate>,
}

/// The built-in templates used whenever nothing valid has been persisted.
pub fn seed_templates() -> Vec<ProfileTemplate> {
    vec![
        ProfileTemplate {
            id: "standard".to_string(),
            name: "Standard".to_string(),
            description: Some("Fiche complète avec QR code dans le corps".to_string()),
            header_footer_config: HeaderFooterConfig {
                header: HeaderConfig {
                    text: "Fiche employé".to_string(),
                    logo: None,
                    show_logo: true,
                },
                footer: FooterConfig {
                    text: "Document interne".to_string(),
                    show_contact_info: true,
                    show_address: false,
                },
            },
            show_qr_code: true,
            qr_code_position: QrCodePosition::Body,
            show_department_info: true,
            show_manager_info: true,
            show_job_title: true,
        },
        ProfileTemplate {
            id: "minimal".to_string(),
            name: "Minimal".to_string(),
            description: Some("Identité et coordonnées uniquement".to_string()),
            header_footer_config: HeaderFooterConfig::default(),
            show_qr_code: false,
            qr_code_position: QrCodePosition::Header,
            show_department_info: false,
            show_manager_info: false,
            show_job_title: true,
        },
        ProfileTemplate {
            id: "print".to_string(),
            name: "Print".to_string(),
            description: Some("Mise en page pour impression avec en-tête et adresse".to_string()),
            header_footer_config: HeaderFooterConfig {
                header: HeaderConfig {
                    text: "Profil employé".to_string(),
                    logo: None,
                    show_logo: true,
                },
                footer: FooterConfig {
                    text: "Confidentiel - usage interne".to_string(),
                    show_contact_info: true,
                    show_address: true,
                },
            },
            show_qr_code: true,
            qr_code_position: QrCodePosition::Header,
            show_department_info: true,
            show_manager_info: true,
            show_job_title: true,
        },
        ProfileTemplate {
            id: "badge".to_string(),
            name: "Badge".to_string(),
            description: Some("Format badge avec QR code en pied de page".to_string()),
            header_footer_config: HeaderFooterConfig {
                header: HeaderConfig {
                    text: String::new(),
                    logo: None,
                    show_logo: true,
                },
                footer: FooterConfig {
                    text: String::new(),
                    show_contact_info: false,
                    show_address: false,
                },
            },
            show_qr_code: true,
            qr_code_position: QrCodePosition::Footer,
            show_department_info: true,
            show_manager_info: false,
            show_job_title: true,
        },
    ]
}
