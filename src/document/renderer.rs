//! Builds the structured profile document from employee data and a template.

use serde::Serialize;
use utoipa::ToSchema;

use crate::document::qr::QrImage;
use crate::profile::controller::EditMode;
use crate::profile::model::{ProfileEmployee, ProfileField};
use crate::template::model::{ProfileTemplate, QrCodePosition};

/// Element id of the document root in HTML output; print rules are scoped to it.
pub const PROFILE_DOCUMENT_ROOT: &str = "profile-document";

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldContent {
    /// Editable control bound to the field.
    Input { value: String },
    Value { text: String },
    Placeholder { text: String },
}

impl FieldContent {
    /// Text as it reads on paper: inputs show their value, empty ones nothing.
    pub fn display_text(&self) -> &str {
        match self {
            FieldContent::Input { value } => value,
            FieldContent::Value { text } | FieldContent::Placeholder { text } => text,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct FieldBlock {
    pub field: ProfileField,
    pub label: String,
    pub content: FieldContent,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PhotoBlock {
    Image { data_uri: String },
    Initial { letter: String },
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct QrBlock {
    pub url: String,
    pub size: u32,
    pub data_uri: String,
    pub downloadable: bool,
}

impl From<&QrImage> for QrBlock {
    fn from(qr: &QrImage) -> Self {
        Self {
            url: qr.url.clone(),
            size: qr.size,
            data_uri: qr.data_uri(),
            downloadable: qr.downloadable,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct HeaderZone {
    pub text: Option<String>,
    pub logo: Option<String>,
    pub qr: Option<QrBlock>,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct BodyZone {
    pub photo: PhotoBlock,
    pub photo_editable: bool,
    pub name: FieldBlock,
    pub status: Option<String>,
    pub fields: Vec<FieldBlock>,
    pub qr: Option<QrBlock>,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ContactLine {
    pub label: String,
    pub value: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct FooterZone {
    pub text: Option<String>,
    pub contact: Vec<ContactLine>,
    pub address: Option<String>,
    pub qr: Option<QrBlock>,
}

/// One profile document with a single root; header and footer are optional.
#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ProfileDocument {
    pub root_id: String,
    pub title: String,
    pub template_id: String,
    pub mode: EditMode,
    pub header: Option<HeaderZone>,
    pub body: BodyZone,
    pub footer: Option<FooterZone>,
}

impl ProfileDocument {
    /// Zones currently holding the QR code.
    pub fn qr_zones(&self) -> Vec<QrCodePosition> {
        let mut zones = Vec::new();
        if self.header.as_ref().is_some_and(|h| h.qr.is_some()) {
            zones.push(QrCodePosition::Header);
        }
        if self.body.qr.is_some() {
            zones.push(QrCodePosition::Body);
        }
        if self.footer.as_ref().is_some_and(|f| f.qr.is_some()) {
            zones.push(QrCodePosition::Footer);
        }
        zones
    }
}

#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    organization_address: String,
}

impl DocumentRenderer {
    pub fn new(organization_address: impl Into<String>) -> Self {
        Self {
            organization_address: organization_address.into(),
        }
    }

    pub fn render(
        &self,
        employee: &ProfileEmployee,
        mode: EditMode,
        template: &ProfileTemplate,
        qr: Option<&QrImage>,
    ) -> ProfileDocument {
        let qr_zone = if qr.is_some() { template.qr_zone() } else { None };
        let qr_for = |zone: QrCodePosition| {
            if qr_zone == Some(zone) {
                qr.map(QrBlock::from)
            } else {
                None
            }
        };

        ProfileDocument {
            root_id: PROFILE_DOCUMENT_ROOT.to_string(),
            title: employee.name.trim().to_string(),
            template_id: template.id.clone(),
            mode,
            header: header_zone(template, qr_for(QrCodePosition::Header)),
            body: body_zone(employee, mode, template, qr_for(QrCodePosition::Body)),
            footer: self.footer_zone(employee, template, qr_for(QrCodePosition::Footer)),
        }
    }

    fn footer_zone(
        &self,
        employee: &ProfileEmployee,
        template: &ProfileTemplate,
        qr: Option<QrBlock>,
    ) -> Option<FooterZone> {
        let footer = &template.header_footer_config.footer;
        let text = non_empty(&footer.text);
        if text.is_none() && !footer.show_contact_info && !footer.show_address && qr.is_none() {
            return None;
        }

        let contact = if footer.show_contact_info {
            [ProfileField::WorkEmail, ProfileField::WorkPhone]
                .into_iter()
                .filter_map(|field| {
                    employee.field(field).map(|value| ContactLine {
                        label: field.label().to_string(),
                        value: value.to_string(),
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        Some(FooterZone {
            text,
            contact,
            address: footer
                .show_address
                .then(|| self.organization_address.clone()),
            qr,
        })
    }
}

fn header_zone(template: &ProfileTemplate, qr: Option<QrBlock>) -> Option<HeaderZone> {
    let header = &template.header_footer_config.header;
    let text = non_empty(&header.text);
    let logo = header.visible_logo().map(str::to_string);
    if text.is_none() && logo.is_none() && qr.is_none() {
        return None;
    }
    Some(HeaderZone { text, logo, qr })
}

fn body_zone(
    employee: &ProfileEmployee,
    mode: EditMode,
    template: &ProfileTemplate,
    qr: Option<QrBlock>,
) -> BodyZone {
    let mut shown = Vec::new();
    if template.show_job_title {
        shown.push(ProfileField::JobTitle);
    }
    if template.show_department_info {
        shown.push(ProfileField::DepartmentName);
    }
    if template.show_manager_info {
        shown.push(ProfileField::ManagerName);
    }
    shown.extend([
        ProfileField::WorkEmail,
        ProfileField::WorkPhone,
        ProfileField::Address,
        ProfileField::Notes,
    ]);

    let photo = match employee.field(ProfileField::Photo) {
        Some(uri) => PhotoBlock::Image {
            data_uri: uri.to_string(),
        },
        None => PhotoBlock::Initial {
            letter: employee.initial().to_string(),
        },
    };

    let status = employee
        .is_active
        .map(|active| if active { "Actif" } else { "Inactif" }.to_string());

    BodyZone {
        photo,
        photo_editable: mode == EditMode::Editing,
        name: field_block(employee, mode, ProfileField::Name),
        status,
        fields: shown
            .into_iter()
            .map(|field| field_block(employee, mode, field))
            .collect(),
        qr,
    }
}

fn field_block(employee: &ProfileEmployee, mode: EditMode, field: ProfileField) -> FieldBlock {
    let value = employee.field(field);
    let content = match (mode, value) {
        (EditMode::Editing, value) => FieldContent::Input {
            value: value.unwrap_or_default().to_string(),
        },
        (EditMode::Viewing, Some(text)) => FieldContent::Value {
            text: text.to_string(),
        },
        (EditMode::Viewing, None) => FieldContent::Placeholder {
            text: field.placeholder().to_string(),
        },
    };
    FieldBlock {
        field,
        label: field.label().to_string(),
        content,
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
