use std::sync::Arc;

use profile_docs::template::model::{HeaderFooterConfig, HeaderConfig, NewTemplateRequest, QrCodePosition};
use profile_docs::template::persistence::{JsonFileRepository, TemplateRepository};
use profile_docs::template::store::TemplateStore;
use tempfile::tempdir;

fn repository(path: &std::path::Path) -> Arc<dyn TemplateRepository> {
    Arc::new(JsonFileRepository::new(path))
}

#[tokio::test]
async fn test_templates_survive_a_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("templates.json");

    let store = TemplateStore::load(repository(&path)).await;
    store.select_template("print").await;
    let created = store
        .save_new_template(NewTemplateRequest {
            name: "Visiteurs".to_string(),
            show_qr_code: true,
            qr_code_position: QrCodePosition::Header,
            ..Default::default()
        })
        .await;
    let header = HeaderFooterConfig {
        header: HeaderConfig {
            text: "Accueil".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(store.update_header_footer(&created.id, header.clone()).await);

    let reloaded = TemplateStore::load(repository(&path)).await;
    assert_eq!(reloaded.list_templates().len(), 5);
    assert_eq!(reloaded.active_template_id(), created.id);
    let stored = reloaded.get_template(&created.id).unwrap();
    assert_eq!(stored.header_footer_config, header);
    assert_eq!(stored.qr_code_position, QrCodePosition::Header);
}

#[tokio::test]
async fn test_corrupt_file_falls_back_to_seed_set() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("templates.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let store = TemplateStore::load(repository(&path)).await;
    assert_eq!(store.list_templates().len(), 4);
    assert_eq!(store.get_active_template().id, "standard");
}

#[tokio::test]
async fn test_bare_array_file_is_accepted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("templates.json");
    std::fs::write(
        &path,
        br#"[{ "id": "solo", "name": "Solo", "showQRCode": false, "qrCodePosition": "body" }]"#,
    )
    .unwrap();

    let store = TemplateStore::load(repository(&path)).await;
    let ids: Vec<String> = store.list_templates().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["solo".to_string()]);
    assert_eq!(store.active_template_id(), "solo");
}

#[tokio::test]
async fn test_missing_directory_is_created_on_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("templates.json");

    let store = TemplateStore::load(repository(&path)).await;
    store.select_template("minimal").await;

    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(written["activeTemplateId"], "minimal");
    assert_eq!(written["templates"].as_array().unwrap().len(), 4);
}
