//! Open profile views.
//!
//! A view is one employee profile being looked at (and possibly edited) by a
//! client: its editing controller plus its own export pipeline. Views live in
//! a cache and expire after a period of inactivity.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use parking_lot::Mutex;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::document::export::{ExportError, ExportOptions, ExportPipeline, ExportedFile};
use crate::document::renderer::ProfileDocument;
use crate::profile::controller::{EditError, EditMode, FieldEditingController};
use crate::profile::model::{ProfileEmployee, ProfileField};
use crate::profile::provider::{EmployeeProvider, ProviderError};

const MAX_OPEN_VIEWS: u64 = 1_000;

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct ViewSnapshot {
    pub view_id: Uuid,
    pub employee_id: String,
    pub mode: EditMode,
    pub saving: bool,
    pub exporting: bool,
    pub opened_at: DateTime<Utc>,
    pub employee: ProfileEmployee,
}

pub struct ProfileView {
    id: Uuid,
    employee_id: String,
    opened_at: DateTime<Utc>,
    controller: Mutex<FieldEditingController>,
    export: ExportPipeline,
}

impl ProfileView {
    pub fn new(employee: ProfileEmployee, export_options: ExportOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            employee_id: employee.id.clone(),
            opened_at: Utc::now(),
            controller: Mutex::new(FieldEditingController::new(employee)),
            export: ExportPipeline::new(export_options),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn employee_id(&self) -> &str {
        &self.employee_id
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let controller = self.controller.lock();
        ViewSnapshot {
            view_id: self.id,
            employee_id: self.employee_id.clone(),
            mode: controller.mode(),
            saving: controller.is_saving(),
            exporting: self.export.is_busy(),
            opened_at: self.opened_at,
            employee: controller.current().clone(),
        }
    }

    /// The record and mode the document should be rendered from.
    pub fn current(&self) -> (ProfileEmployee, EditMode) {
        let controller = self.controller.lock();
        (controller.current().clone(), controller.mode())
    }

    pub fn begin_edit(&self) -> ViewSnapshot {
        self.controller.lock().begin_edit();
        self.snapshot()
    }

    pub fn update_field(&self, field: ProfileField, value: Option<String>) -> Result<ViewSnapshot, EditError> {
        self.controller.lock().update_field(field, value)?;
        Ok(self.snapshot())
    }

    pub fn cancel(&self) -> Result<ViewSnapshot, EditError> {
        self.controller.lock().cancel()?;
        Ok(self.snapshot())
    }

    /// Commits the working copy upstream. The controller lock is only held to
    /// start and finish the commit, never across the upstream call. If this
    /// future is dropped mid-call the commit is released and can be retried.
    pub async fn save(&self, provider: &dyn EmployeeProvider) -> Result<ViewSnapshot, EditError> {
        let ticket = self.controller.lock().begin_commit()?;
        if let Some(ticket) = ticket {
            let pending = PendingCommit {
                controller: &self.controller,
                settled: false,
            };
            log::info!("Saving profile '{}' from view {}", ticket.employee_id, self.id);
            let result = provider.update(&ticket.employee_id, &ticket.patch).await;
            pending.finish(result)?;
        }
        Ok(self.snapshot())
    }

    pub fn is_exporting(&self) -> bool {
        self.export.is_busy()
    }

    pub fn export(&self, document: &ProfileDocument) -> Result<ExportedFile, ExportError> {
        self.export.export(document, &document.title)
    }
}

/// An in-flight commit. Dropped without `finish`, it clears the saving flag.
struct PendingCommit<'a> {
    controller: &'a Mutex<FieldEditingController>,
    settled: bool,
}

impl PendingCommit<'_> {
    fn finish(mut self, result: Result<ProfileEmployee, ProviderError>) -> Result<(), EditError> {
        self.settled = true;
        self.controller.lock().finish_commit(result)
    }
}

impl Drop for PendingCommit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.controller.lock().abort_commit();
        }
    }
}

/// Cache of open views keyed by view id.
#[derive(Clone)]
pub struct ViewRegistry {
    views: Cache<Uuid, Arc<ProfileView>>,
    export_options: ExportOptions,
}

impl ViewRegistry {
    pub fn new(idle_timeout: Duration, export_options: ExportOptions) -> Self {
        let views = Cache::builder()
            .time_to_idle(idle_timeout)
            .max_capacity(MAX_OPEN_VIEWS)
            .build();
        Self {
            views,
            export_options,
        }
    }

    /// Loads the employee and opens a new view on it.
    pub async fn open(
        &self,
        provider: &dyn EmployeeProvider,
        employee_id: &str,
    ) -> Result<Arc<ProfileView>, ProviderError> {
        let employee = provider.get(employee_id).await?;
        let view = Arc::new(ProfileView::new(employee, self.export_options));
        self.views.insert(view.id(), view.clone()).await;
        log::info!("Opened view {} on employee '{}'", view.id(), employee_id);
        Ok(view)
    }

    pub async fn get(&self, view_id: &Uuid) -> Option<Arc<ProfileView>> {
        self.views.get(view_id).await
    }

    pub async fn close(&self, view_id: &Uuid) {
        self.views.invalidate(view_id).await;
    }
}
