#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use profile_docs::profile::model::{EmployeePatch, ProfileEmployee};
use profile_docs::profile::provider::{EmployeeProvider, ProviderError};
use profile_docs::template::persistence::{MemoryRepository, TemplateRepository};
use profile_docs::template::store::TemplateStore;
use profile_docs::{AppConfig, AppState};

/// In-memory stand-in for the employee service.
#[derive(Default)]
pub struct MockEmployeeProvider {
    employees: Mutex<HashMap<String, ProfileEmployee>>,
    updates: Mutex<Vec<(String, EmployeePatch)>>,
    fail_updates: Mutex<Option<ProviderError>>,
}

impl MockEmployeeProvider {
    pub fn with_employee(employee: ProfileEmployee) -> Self {
        let provider = Self::default();
        provider
            .employees
            .lock()
            .insert(employee.id.clone(), employee);
        provider
    }

    pub fn fail_updates_with(&self, error: ProviderError) {
        *self.fail_updates.lock() = Some(error);
    }

    pub fn updates(&self) -> Vec<(String, EmployeePatch)> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl EmployeeProvider for MockEmployeeProvider {
    async fn get(&self, id: &str) -> Result<ProfileEmployee, ProviderError> {
        self.employees
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &str, patch: &EmployeePatch) -> Result<ProfileEmployee, ProviderError> {
        if let Some(error) = self.fail_updates.lock().clone() {
            return Err(error);
        }
        self.updates.lock().push((id.to_string(), patch.clone()));

        let mut employees = self.employees.lock();
        let employee = employees
            .get_mut(id)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        let apply = |slot: &mut Option<String>, value: &Option<String>| {
            if let Some(value) = value {
                *slot = Some(value.clone()).filter(|v| !v.is_empty());
            }
        };
        if let Some(name) = &patch.name {
            employee.name = name.clone();
        }
        apply(&mut employee.job_title, &patch.job_title);
        apply(&mut employee.department_name, &patch.department_name);
        apply(&mut employee.work_email, &patch.work_email);
        apply(&mut employee.work_phone, &patch.work_phone);
        apply(&mut employee.manager_name, &patch.manager_name);
        apply(&mut employee.notes, &patch.notes);
        apply(&mut employee.address, &patch.address);
        apply(&mut employee.photo, &patch.photo);
        Ok(employee.clone())
    }
}

pub fn jean_dupont() -> ProfileEmployee {
    ProfileEmployee {
        id: "42".to_string(),
        name: "Jean Dupont".to_string(),
        job_title: Some("Comptable".to_string()),
        department_name: Some("Finance".to_string()),
        work_email: Some(String::new()),
        is_active: Some(true),
        ..Default::default()
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        public_origin: "https://rh.example.org".to_string(),
        ..AppConfig::default()
    }
}

/// State wired with in-memory adapters. The repository is returned so tests
/// can inspect what was persisted.
pub async fn test_state(provider: Arc<MockEmployeeProvider>) -> (AppState, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::new());
    let store_repository: Arc<dyn TemplateRepository> = repository.clone();
    let templates = Arc::new(TemplateStore::load(store_repository).await);
    let state = AppState::new(templates, provider, &test_config());
    (state, repository)
}

pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(6, 6, image::Rgb([20, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

pub const BOUNDARY: &str = "----profile-docs-test-boundary";

/// Builds a multipart body with a single `file` field.
pub fn multipart_file(filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
