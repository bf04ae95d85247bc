//! Viewing/Editing state machine over one employee profile.
//!
//! The controller keeps two copies of the record: the committed snapshot (last
//! known saved state) and the working copy edits go to. While viewing, the two
//! are always equal.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::profile::model::{EmployeePatch, ProfileEmployee, ProfileField};
use crate::profile::provider::{EmployeeProvider, ProviderError};
use crate::profile::validation::{validate_profile, ValidationErrors};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    Viewing,
    Editing,
}

#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("le profil n'est pas en cours de modification")]
    NotEditing,
    #[error("un enregistrement est déjà en cours")]
    SaveInProgress,
    #[error("{0}")]
    Invalid(ValidationErrors),
    #[error("{0}")]
    Upstream(#[from] ProviderError),
}

/// A commit that has been started and must be finished with
/// [`FieldEditingController::finish_commit`].
#[derive(Debug, Clone, PartialEq)]
pub struct CommitTicket {
    pub employee_id: String,
    pub patch: EmployeePatch,
}

#[derive(Debug, Clone)]
pub struct FieldEditingController {
    committed: ProfileEmployee,
    working: ProfileEmployee,
    mode: EditMode,
    saving: bool,
}

impl FieldEditingController {
    pub fn new(employee: ProfileEmployee) -> Self {
        Self {
            working: employee.clone(),
            committed: employee,
            mode: EditMode::Viewing,
            saving: false,
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn committed(&self) -> &ProfileEmployee {
        &self.committed
    }

    /// What the document should show: the working copy while editing, the
    /// committed snapshot otherwise.
    pub fn current(&self) -> &ProfileEmployee {
        match self.mode {
            EditMode::Editing => &self.working,
            EditMode::Viewing => &self.committed,
        }
    }

    pub fn begin_edit(&mut self) {
        if self.mode == EditMode::Viewing {
            self.working = self.committed.clone();
            self.mode = EditMode::Editing;
        }
    }

    pub fn update_field(&mut self, field: ProfileField, value: Option<String>) -> Result<(), EditError> {
        if self.mode != EditMode::Editing {
            return Err(EditError::NotEditing);
        }
        if self.saving {
            return Err(EditError::SaveInProgress);
        }
        self.working.set_field(field, value);
        Ok(())
    }

    /// Drops the working copy. No-op while viewing.
    pub fn cancel(&mut self) -> Result<(), EditError> {
        if self.saving {
            return Err(EditError::SaveInProgress);
        }
        if self.mode == EditMode::Editing {
            self.working = self.committed.clone();
            self.mode = EditMode::Viewing;
        }
        Ok(())
    }

    /// Starts a commit. `Ok(None)` means there was nothing to send and the
    /// controller is already back to viewing.
    pub fn begin_commit(&mut self) -> Result<Option<CommitTicket>, EditError> {
        if self.mode != EditMode::Editing {
            return Err(EditError::NotEditing);
        }
        if self.saving {
            return Err(EditError::SaveInProgress);
        }
        validate_profile(&self.working).map_err(EditError::Invalid)?;

        let patch = EmployeePatch::diff(&self.committed, &self.working);
        if patch.is_empty() {
            self.working = self.committed.clone();
            self.mode = EditMode::Viewing;
            return Ok(None);
        }

        self.saving = true;
        Ok(Some(CommitTicket {
            employee_id: self.committed.id.clone(),
            patch,
        }))
    }

    /// Applies the upstream answer to a commit started by `begin_commit`.
    pub fn finish_commit(
        &mut self,
        result: Result<ProfileEmployee, ProviderError>,
    ) -> Result<(), EditError> {
        self.saving = false;
        match result {
            Ok(saved) => {
                self.committed = saved;
                self.working = self.committed.clone();
                self.mode = EditMode::Viewing;
                Ok(())
            }
            Err(e) => {
                log::warn!("Saving profile '{}' failed: {}", self.committed.id, e);
                Err(EditError::Upstream(e))
            }
        }
    }

    /// Releases a commit whose upstream answer will never arrive. The working
    /// copy and editing mode are kept so the save can be retried.
    pub fn abort_commit(&mut self) {
        if self.saving {
            log::warn!("Commit of profile '{}' was abandoned", self.committed.id);
            self.saving = false;
        }
    }

    pub async fn save(&mut self, provider: &dyn EmployeeProvider) -> Result<(), EditError> {
        let Some(ticket) = self.begin_commit()? else {
            return Ok(());
        };
        let result = provider.update(&ticket.employee_id, &ticket.patch).await;
        self.finish_commit(result)
    }
}
