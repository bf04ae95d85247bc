//! HTML preview of a profile document.
//!
//! Everything sits under one root element. The print stylesheet is wrapped in
//! `@media print` and scoped to that root, so it never affects the interactive
//! view nor anything outside the document.

use std::fmt::Write;

use crate::document::renderer::{
    BodyZone, FieldBlock, FieldContent, FooterZone, HeaderZone, PhotoBlock, ProfileDocument,
    QrBlock, PROFILE_DOCUMENT_ROOT,
};
use crate::profile::model::ProfileField;

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn print_stylesheet() -> String {
    let root = PROFILE_DOCUMENT_ROOT;
    format!(
        "@media print {{\n\
         body * {{ visibility: hidden; }}\n\
         #{root}, #{root} * {{ visibility: visible; }}\n\
         #{root} {{ position: absolute; left: 0; top: 0; width: 100%; box-shadow: none !important; border: none !important; }}\n\
         #{root} .pd-card {{ box-shadow: none !important; border: none !important; }}\n\
         #{root} .pd-no-print {{ display: none !important; }}\n\
         }}\n"
    )
}

/// Renders the document as an HTML fragment (a `<style>` plus the root `<div>`).
pub fn render_html(doc: &ProfileDocument) -> String {
    let mut html = String::new();
    let _ = write!(html, "<style>{}</style>", print_stylesheet());
    let _ = write!(
        html,
        "<div id=\"{}\" class=\"profile-document pd-card\" data-template=\"{}\" data-mode=\"{}\">",
        escape_html(&doc.root_id),
        escape_html(&doc.template_id),
        match doc.mode {
            crate::profile::controller::EditMode::Viewing => "viewing",
            crate::profile::controller::EditMode::Editing => "editing",
        }
    );

    if let Some(header) = &doc.header {
        push_header(&mut html, header);
    }
    push_body(&mut html, &doc.body);
    if let Some(footer) = &doc.footer {
        push_footer(&mut html, footer);
    }

    html.push_str("</div>");
    html
}

fn push_header(html: &mut String, header: &HeaderZone) {
    html.push_str("<header class=\"pd-header\">");
    if let Some(logo) = &header.logo {
        let _ = write!(html, "<img class=\"pd-logo\" src=\"{}\" alt=\"Logo\">", escape_html(logo));
    }
    if let Some(text) = &header.text {
        let _ = write!(html, "<h2 class=\"pd-header-text\">{}</h2>", escape_html(text));
    }
    if let Some(qr) = &header.qr {
        push_qr(html, qr);
    }
    html.push_str("</header>");
}

fn push_body(html: &mut String, body: &BodyZone) {
    html.push_str("<section class=\"pd-body\">");
    match &body.photo {
        PhotoBlock::Image { data_uri } => {
            let _ = write!(html, "<img class=\"pd-photo\" src=\"{}\" alt=\"Photo\">", escape_html(data_uri));
        }
        PhotoBlock::Initial { letter } => {
            let _ = write!(html, "<div class=\"pd-photo pd-initial\">{}</div>", escape_html(letter));
        }
    }
    if body.photo_editable {
        html.push_str("<input class=\"pd-photo-upload pd-no-print\" type=\"file\" name=\"photo\" accept=\"image/*\">");
    }

    html.push_str("<h1 class=\"pd-name\">");
    push_field_content(html, &body.name);
    html.push_str("</h1>");
    if let Some(status) = &body.status {
        let _ = write!(html, "<span class=\"pd-status\">{}</span>", escape_html(status));
    }

    html.push_str("<dl class=\"pd-fields\">");
    for block in &body.fields {
        let _ = write!(
            html,
            "<dt>{}</dt><dd data-field=\"{}\">",
            escape_html(&block.label),
            field_name(block.field)
        );
        push_field_content(html, block);
        html.push_str("</dd>");
    }
    html.push_str("</dl>");

    if let Some(qr) = &body.qr {
        push_qr(html, qr);
    }
    html.push_str("</section>");
}

fn push_footer(html: &mut String, footer: &FooterZone) {
    html.push_str("<footer class=\"pd-footer\">");
    if let Some(text) = &footer.text {
        let _ = write!(html, "<p class=\"pd-footer-text\">{}</p>", escape_html(text));
    }
    for line in &footer.contact {
        let _ = write!(
            html,
            "<p class=\"pd-contact\">{} : {}</p>",
            escape_html(&line.label),
            escape_html(&line.value)
        );
    }
    if let Some(address) = &footer.address {
        let _ = write!(html, "<address class=\"pd-address\">{}</address>", escape_html(address));
    }
    if let Some(qr) = &footer.qr {
        push_qr(html, qr);
    }
    html.push_str("</footer>");
}

fn push_qr(html: &mut String, qr: &QrBlock) {
    let _ = write!(
        html,
        "<figure class=\"pd-qr\"><img src=\"{}\" width=\"{}\" height=\"{}\" alt=\"{}\">",
        escape_html(&qr.data_uri),
        qr.size,
        qr.size,
        escape_html(&qr.url)
    );
    if qr.downloadable {
        let _ = write!(
            html,
            "<a class=\"pd-no-print\" href=\"{}\" download=\"qr-code.png\">Télécharger</a>",
            escape_html(&qr.data_uri)
        );
    }
    html.push_str("</figure>");
}

fn push_field_content(html: &mut String, block: &FieldBlock) {
    let name = field_name(block.field);
    match &block.content {
        FieldContent::Input { value } if block.field == ProfileField::Notes => {
            let _ = write!(html, "<textarea name=\"{}\">{}</textarea>", name, escape_html(value));
        }
        FieldContent::Input { value } => {
            let _ = write!(
                html,
                "<input type=\"text\" name=\"{}\" value=\"{}\" placeholder=\"{}\">",
                name,
                escape_html(value),
                escape_html(block.field.placeholder())
            );
        }
        FieldContent::Value { text } => html.push_str(&escape_html(text)),
        FieldContent::Placeholder { text } => {
            let _ = write!(html, "<span class=\"pd-placeholder\">{}</span>", escape_html(text));
        }
    }
}

fn field_name(field: ProfileField) -> &'static str {
    match field {
        ProfileField::Name => "name",
        ProfileField::JobTitle => "job_title",
        ProfileField::DepartmentName => "department_name",
        ProfileField::WorkEmail => "work_email",
        ProfileField::WorkPhone => "work_phone",
        ProfileField::ManagerName => "manager_name",
        ProfileField::Notes => "notes",
        ProfileField::Address => "address",
        ProfileField::Photo => "photo",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::renderer::DocumentRenderer;
    use crate::profile::controller::EditMode;
    use crate::profile::model::ProfileEmployee;
    use crate::template::model::seed_templates;

    fn employee() -> ProfileEmployee {
        ProfileEmployee {
            id: "3".to_string(),
            name: "Zoé <Admin>".to_string(),
            notes: Some("a & b".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_single_root_and_scoped_print_rules() {
        let doc = DocumentRenderer::new("adresse").render(
            &employee(),
            EditMode::Viewing,
            &seed_templates()[0],
            None,
        );
        let html = render_html(&doc);

        assert_eq!(html.matches("id=\"profile-document\"").count(), 1);
        assert!(html.contains("@media print"));
        // Every print rule lives inside the media query.
        let style = html.split("</style>").next().unwrap();
        let before_media = style.split("@media print").next().unwrap();
        assert!(!before_media.contains('{'));
        assert!(html.contains("Zoé &lt;Admin&gt;"));
        assert!(html.contains("a &amp; b"));
    }

    #[test]
    fn test_editing_renders_inputs() {
        let doc = DocumentRenderer::new("adresse").render(
            &employee(),
            EditMode::Editing,
            &seed_templates()[0],
            None,
        );
        let html = render_html(&doc);
        assert!(html.contains("<input type=\"text\" name=\"work_email\" value=\"\""));
        assert!(html.contains("<textarea name=\"notes\">a &amp; b</textarea>"));
        assert!(html.contains("data-mode=\"editing\""));
    }
}
