//! Port to the upstream employee service and its HTTP adapter.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

use crate::profile::model::{EmployeePatch, ProfileEmployee};

/// Failures from the employee service. Messages are meant for end users.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Employé introuvable ({0})")]
    NotFound(String),
    #[error("{0}")]
    Rejected(String),
    #[error("Le service des employés est indisponible, réessayez plus tard")]
    Unavailable(String),
}

#[async_trait]
pub trait EmployeeProvider: Send + Sync {
    async fn get(&self, id: &str) -> Result<ProfileEmployee, ProviderError>;
    async fn update(&self, id: &str, patch: &EmployeePatch) -> Result<ProfileEmployee, ProviderError>;
}

#[derive(Deserialize)]
struct UpstreamError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Talks to `{base_url}/employees/{id}`.
pub struct HttpEmployeeProvider {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpEmployeeProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// The id is always a single, percent-encoded path segment.
    fn employee_url(&self, id: &str) -> Result<Url, ProviderError> {
        if id.trim().is_empty() || id == "." || id == ".." {
            return Err(ProviderError::NotFound(id.to_string()));
        }
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            log::error!("Invalid employee API URL '{}': {}", self.base_url, e);
            ProviderError::Unavailable(e.to_string())
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                log::error!("Employee API URL '{}' cannot hold a path", self.base_url);
                ProviderError::Unavailable(format!("invalid base URL {}", self.base_url))
            })?
            .pop_if_empty()
            .push("employees")
            .push(id);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_employee(
        id: &str,
        response: reqwest::Response,
    ) -> Result<ProfileEmployee, ProviderError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Employee API answered {} for '{}': {}", status, id, body);
            return Err(upstream_error(status, &body));
        }

        response.json::<ProfileEmployee>().await.map_err(|e| {
            log::error!("Unreadable employee payload for '{}': {}", id, e);
            ProviderError::Unavailable(e.to_string())
        })
    }
}

fn upstream_error(status: StatusCode, body: &str) -> ProviderError {
    if status.is_server_error() {
        return ProviderError::Unavailable(format!("HTTP {}", status));
    }
    let message = serde_json::from_str::<UpstreamError>(body)
        .ok()
        .and_then(|e| e.message.or(e.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("La mise à jour a été refusée (HTTP {})", status.as_u16()));
    ProviderError::Rejected(message)
}

#[async_trait]
impl EmployeeProvider for HttpEmployeeProvider {
    async fn get(&self, id: &str) -> Result<ProfileEmployee, ProviderError> {
        log::debug!("Fetching employee '{}'", id);
        let response = self
            .authorize(self.client.get(self.employee_url(id)?))
            .send()
            .await
            .map_err(|e| {
                log::error!("Employee API unreachable: {}", e);
                ProviderError::Unavailable(e.to_string())
            })?;
        Self::read_employee(id, response).await
    }

    async fn update(&self, id: &str, patch: &EmployeePatch) -> Result<ProfileEmployee, ProviderError> {
        log::debug!("Updating employee '{}'", id);
        let response = self
            .authorize(self.client.patch(self.employee_url(id)?).json(patch))
            .send()
            .await
            .map_err(|e| {
                log::error!("Employee API unreachable: {}", e);
                ProviderError::Unavailable(e.to_string())
            })?;
        Self::read_employee(id, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employee_url_trims_trailing_slash() {
        let provider = HttpEmployeeProvider::new(reqwest::Client::new(), "http://rh.local/api/", None);
        assert_eq!(
            provider.employee_url("12").unwrap().as_str(),
            "http://rh.local/api/employees/12"
        );
    }

    #[test]
    fn test_employee_id_stays_one_path_segment() {
        let provider = HttpEmployeeProvider::new(reqwest::Client::new(), "http://rh.local/api", None);
        assert_eq!(
            provider.employee_url("12/../admin?x=1").unwrap().as_str(),
            "http://rh.local/api/employees/12%2F..%2Fadmin%3Fx=1"
        );
        assert_eq!(
            provider.employee_url(".."),
            Err(ProviderError::NotFound("..".to_string()))
        );
        assert!(provider.employee_url("").is_err());
    }

    #[test]
    fn test_upstream_message_is_surfaced() {
        let error = upstream_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message": "Adresse email déjà utilisée"}"#,
        );
        assert_eq!(error.to_string(), "Adresse email déjà utilisée");
    }

    #[test]
    fn test_server_errors_become_unavailable() {
        let error = upstream_error(StatusCode::BAD_GATEWAY, "");
        assert!(matches!(error, ProviderError::Unavailable(_)));
    }

    #[test]
    fn test_unreadable_rejection_gets_generic_message() {
        let error = upstream_error(StatusCode::BAD_REQUEST, "<html>nope</html>");
        assert_eq!(error.to_string(), "La mise à jour a été refusée (HTTP 400)");
    }
}
