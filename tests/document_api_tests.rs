mod common;

use std::sync::Arc;

use actix_web::{http::header, http::StatusCode, test, web, App};
use profile_docs::configure_api;
use serde_json::{json, Value};

use common::{jean_dupont, test_state, MockEmployeeProvider};

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .service(web::scope("/api").configure(configure_api)),
        )
        .await
    };
}

macro_rules! open_view {
    ($app:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/profiles/42/views")
            .to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        body["view_id"].as_str().unwrap().to_string()
    }};
}

#[actix_web::test]
async fn test_document_json_shows_placeholder_for_empty_email() {
    let provider = Arc::new(MockEmployeeProvider::with_employee(jean_dupont()));
    let (state, _) = test_state(provider).await;
    let app = app!(state);
    let view_id = open_view!(app);

    let req = test::TestRequest::get()
        .uri(&format!("/api/views/{}/document", view_id))
        .to_request();
    let doc: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(doc["root_id"], "profile-document");
    assert_eq!(doc["mode"], "viewing");
    let email = doc["body"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["field"] == "work_email")
        .unwrap();
    assert_eq!(email["content"]["kind"], "placeholder");
    assert_eq!(email["content"]["text"], "Email non défini");
    // Standard template: QR in the body only.
    assert!(doc["body"]["qr"].is_object());
    assert!(doc["header"].is_null() || doc["header"]["qr"].is_null());
    assert!(doc["footer"].is_null() || doc["footer"]["qr"].is_null());
}

#[actix_web::test]
async fn test_document_follows_active_template_qr_position() {
    let provider = Arc::new(MockEmployeeProvider::with_employee(jean_dupont()));
    let (state, _) = test_state(provider).await;
    let app = app!(state);
    let view_id = open_view!(app);

    let req = test::TestRequest::put()
        .uri("/api/templates/active")
        .set_json(json!({ "templateId": "badge" }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/views/{}/document", view_id))
        .to_request();
    let doc: Value = test::call_and_read_body_json(&app, req).await;
    assert!(doc["footer"]["qr"].is_object());
    assert!(doc["body"]["qr"].is_null());
    assert_eq!(
        doc["footer"]["qr"]["url"],
        "https://rh.example.org/hr/employees/42"
    );
}

#[actix_web::test]
async fn test_document_html_has_single_root() {
    let provider = Arc::new(MockEmployeeProvider::with_employee(jean_dupont()));
    let (state, _) = test_state(provider).await;
    let app = app!(state);
    let view_id = open_view!(app);

    let req = test::TestRequest::get()
        .uri(&format!("/api/views/{}/document?format=html", view_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let body = test::read_body(resp).await;
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(html.matches("id=\"profile-document\"").count(), 1);
    assert!(html.contains("@media print"));
    assert!(html.contains("Jean Dupont"));
}

#[actix_web::test]
async fn test_export_returns_pdf_attachment() {
    let provider = Arc::new(MockEmployeeProvider::with_employee(jean_dupont()));
    let (state, _) = test_state(provider).await;
    let app = app!(state);
    let view_id = open_view!(app);

    let req = test::TestRequest::post()
        .uri(&format!("/api/views/{}/export", view_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let headers = resp.headers();
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/pdf");
    let disposition = headers
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("Jean_Dupont.pdf"));

    let body = test::read_body(resp).await;
    assert!(body.starts_with(b"%PDF"));

    // The busy flag is released once the export is over.
    let req = test::TestRequest::get()
        .uri(&format!("/api/views/{}", view_id))
        .to_request();
    let snapshot: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(snapshot["exporting"], false);
}

#[actix_web::test]
async fn test_qr_code_png_and_download() {
    let (state, _) = test_state(Arc::new(MockEmployeeProvider::default())).await;
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/api/employees/42/qr?size=64")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert!(resp.headers().get(header::CONTENT_DISPOSITION).is_none());
    let body = test::read_body(resp).await;
    let png = image::load_from_memory(&body).unwrap();
    assert_eq!(png.width(), 64);

    let req = test::TestRequest::get()
        .uri("/api/employees/42/qr?download=true")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("qr-42.png"));
}

#[actix_web::test]
async fn test_small_qr_code_is_not_shrunk_below_its_modules() {
    let (state, _) = test_state(Arc::new(MockEmployeeProvider::default())).await;
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/api/employees/42/qr?size=32")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let png = image::load_from_memory(&body).unwrap();

    let code = qrcode::QrCode::new(b"https://rh.example.org/hr/employees/42").unwrap();
    let modules = code.width() as u32 + 8;
    assert!(png.width() >= modules);
    assert_eq!(png.width(), png.height());
}
