use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Profile projection of an employee record, as served by the employee API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ToSchema)]
pub struct ProfileEmployee {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub department_name: Option<String>,
    #[serde(default)]
    pub work_email: Option<String>,
    #[serde(default)]
    pub work_phone: Option<String>,
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub manager_name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Photo as a data URI.
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Fields that can be edited from the profile view.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    JobTitle,
    DepartmentName,
    WorkEmail,
    WorkPhone,
    ManagerName,
    Notes,
    Address,
    Photo,
}

impl ProfileField {
    pub const ALL: [ProfileField; 9] = [
        ProfileField::Name,
        ProfileField::JobTitle,
        ProfileField::DepartmentName,
        ProfileField::WorkEmail,
        ProfileField::WorkPhone,
        ProfileField::ManagerName,
        ProfileField::Notes,
        ProfileField::Address,
        ProfileField::Photo,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProfileField::Name => "Nom",
            ProfileField::JobTitle => "Poste",
            ProfileField::DepartmentName => "Département",
            ProfileField::WorkEmail => "Email",
            ProfileField::WorkPhone => "Téléphone",
            ProfileField::ManagerName => "Responsable",
            ProfileField::Notes => "Notes",
            ProfileField::Address => "Adresse",
            ProfileField::Photo => "Photo",
        }
    }

    /// Shown in read-only mode when the field is empty.
    pub fn placeholder(self) -> &'static str {
        match self {
            ProfileField::Name => "Nom non défini",
            ProfileField::JobTitle => "Poste non défini",
            ProfileField::DepartmentName => "Département non défini",
            ProfileField::WorkEmail => "Email non défini",
            ProfileField::WorkPhone => "Téléphone non défini",
            ProfileField::ManagerName => "Aucun responsable",
            ProfileField::Notes => "Aucune note",
            ProfileField::Address => "Adresse non définie",
            ProfileField::Photo => "Aucune photo",
        }
    }
}

impl ProfileEmployee {
    /// Current value of `field`; blank strings count as empty.
    pub fn field(&self, field: ProfileField) -> Option<&str> {
        let value = match field {
            ProfileField::Name => Some(self.name.as_str()),
            ProfileField::JobTitle => self.job_title.as_deref(),
            ProfileField::DepartmentName => self.department_name.as_deref(),
            ProfileField::WorkEmail => self.work_email.as_deref(),
            ProfileField::WorkPhone => self.work_phone.as_deref(),
            ProfileField::ManagerName => self.manager_name.as_deref(),
            ProfileField::Notes => self.notes.as_deref(),
            ProfileField::Address => self.address.as_deref(),
            ProfileField::Photo => self.photo.as_deref(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Sets `field`; `None` or a blank string clears optional fields.
    pub fn set_field(&mut self, field: ProfileField, value: Option<String>) {
        let value = value.filter(|v| !v.trim().is_empty());
        match field {
            ProfileField::Name => self.name = value.unwrap_or_default(),
            ProfileField::JobTitle => self.job_title = value,
            ProfileField::DepartmentName => self.department_name = value,
            ProfileField::WorkEmail => self.work_email = value,
            ProfileField::WorkPhone => self.work_phone = value,
            ProfileField::ManagerName => self.manager_name = value,
            ProfileField::Notes => self.notes = value,
            ProfileField::Address => self.address = value,
            ProfileField::Photo => self.photo = value,
        }
    }

    /// First letter of the name, used when there is no photo.
    pub fn initial(&self) -> char {
        self.name
            .trim()
            .chars()
            .next()
            .and_then(|c| c.to_uppercase().next())
            .unwrap_or('?')
    }
}

/// Partial update sent to the employee API. Absent fields are left untouched;
/// an empty string clears the field upstream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ToSchema)]
pub struct EmployeePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl EmployeePatch {
    /// Editable fields that differ between `committed` and `working`.
    pub fn diff(committed: &ProfileEmployee, working: &ProfileEmployee) -> Self {
        let mut patch = EmployeePatch::default();
        for field in ProfileField::ALL {
            let before = committed.field(field);
            let after = working.field(field);
            if before != after {
                patch.set(field, after.unwrap_or_default().to_string());
            }
        }
        patch
    }

    fn set(&mut self, field: ProfileField, value: String) {
        let slot = match field {
            ProfileField::Name => &mut self.name,
            ProfileField::JobTitle => &mut self.job_title,
            ProfileField::DepartmentName => &mut self.department_name,
            ProfileField::WorkEmail => &mut self.work_email,
            ProfileField::WorkPhone => &mut self.work_phone,
            ProfileField::ManagerName => &mut self.manager_name,
            ProfileField::Notes => &mut self.notes,
            ProfileField::Address => &mut self.address,
            ProfileField::Photo => &mut self.photo,
        };
        *slot = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        self == &EmployeePatch::default()
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateFieldRequest {
    pub field: ProfileField,
    pub value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employee_deserializes_with_missing_optionals() {
        let json = r#"{ "id": "42", "name": "Jean Dupont", "work_email": "" }"#;
        let employee: ProfileEmployee = serde_json::from_str(json).unwrap();
        assert_eq!(employee.name, "Jean Dupont");
        assert_eq!(employee.work_email.as_deref(), Some(""));
        assert_eq!(employee.field(ProfileField::WorkEmail), None);
        assert_eq!(employee.manager_name, None);
    }

    #[test]
    fn test_initial_falls_back_to_question_mark() {
        let mut employee = ProfileEmployee::default();
        assert_eq!(employee.initial(), '?');
        employee.name = "  élodie".to_string();
        assert_eq!(employee.initial(), 'É');
    }

    #[test]
    fn test_diff_only_carries_changed_fields() {
        let committed = ProfileEmployee {
            id: "7".to_string(),
            name: "Jean Dupont".to_string(),
            work_email: Some("jean@example.org".to_string()),
            notes: Some("RAS".to_string()),
            ..Default::default()
        };
        let mut working = committed.clone();
        working.set_field(ProfileField::JobTitle, Some("Comptable".to_string()));
        working.set_field(ProfileField::Notes, Some("  ".to_string()));

        let patch = EmployeePatch::diff(&committed, &working);
        assert_eq!(patch.job_title.as_deref(), Some("Comptable"));
        assert_eq!(patch.notes.as_deref(), Some(""));
        assert_eq!(patch.name, None);
        assert_eq!(patch.work_email, None);

        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_identical_records_give_empty_patch() {
        let employee = ProfileEmployee {
            id: "1".to_string(),
            name: "A".to_string(),
            ..Default::default()
        };
        assert!(EmployeePatch::diff(&employee, &employee.clone()).is_empty());
    }

    #[test]
    fn test_update_field_request_uses_snake_case() {
        let request: UpdateFieldRequest =
            serde_json::from_str(r#"{ "field": "work_email", "value": "a@b.fr" }"#).unwrap();
        assert_eq!(request.field, ProfileField::WorkEmail);
    }
}
