//! In-memory template collection with write-through persistence.

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::template::model::{
    seed_templates, HeaderFooterConfig, NewTemplateRequest, ProfileTemplate,
};
use crate::template::persistence::{TemplateCollection, TemplateRepository};

struct TemplateState {
    templates: Vec<ProfileTemplate>,
    active_id: String,
}

impl TemplateState {
    fn from_collection(collection: TemplateCollection) -> Self {
        let active_id = collection
            .active_template_id
            .filter(|id| collection.templates.iter().any(|t| &t.id == id))
            .unwrap_or_else(|| collection.templates[0].id.clone());
        Self {
            templates: collection.templates,
            active_id,
        }
    }

    fn seeded() -> Self {
        Self::from_collection(TemplateCollection {
            active_template_id: None,
            templates: seed_templates(),
        })
    }

    fn active(&self) -> &ProfileTemplate {
        self.templates
            .iter()
            .find(|t| t.id == self.active_id)
            .unwrap_or(&self.templates[0])
    }

    fn to_collection(&self) -> TemplateCollection {
        TemplateCollection {
            active_template_id: Some(self.active_id.clone()),
            templates: self.templates.clone(),
        }
    }
}

/// Holds the templates and which one is active.
///
/// The collection is never empty; whatever the repository returns, an unusable
/// record is replaced by the built-in seed set.
pub struct TemplateStore {
    state: RwLock<TemplateState>,
    repository: Arc<dyn TemplateRepository>,
    persist_lock: tokio::sync::Mutex<()>,
}

impl TemplateStore {
    /// Loads the persisted collection, falling back to the seed set.
    pub async fn load(repository: Arc<dyn TemplateRepository>) -> Self {
        let state = match repository.load().await {
            Ok(Some(collection)) if !collection.templates.is_empty() => {
                log::info!(
                    "Loaded {} profile templates from storage",
                    collection.templates.len()
                );
                TemplateState::from_collection(collection)
            }
            Ok(Some(_)) => {
                log::warn!("Stored template collection is empty, using built-in templates");
                TemplateState::seeded()
            }
            Ok(None) => {
                log::info!("No stored templates found, using built-in templates");
                TemplateState::seeded()
            }
            Err(e) => {
                log::warn!("Failed to load templates, using built-in templates: {}", e);
                TemplateState::seeded()
            }
        };

        Self {
            state: RwLock::new(state),
            repository,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn list_templates(&self) -> Vec<ProfileTemplate> {
        self.state.read().templates.clone()
    }

    pub fn get_template(&self, id: &str) -> Option<ProfileTemplate> {
        self.state.read().templates.iter().find(|t| t.id == id).cloned()
    }

    pub fn get_active_template(&self) -> ProfileTemplate {
        self.state.read().active().clone()
    }

    pub fn active_template_id(&self) -> String {
        self.state.read().active().id.clone()
    }

    /// Activates `id`, or the first template when `id` is unknown.
    pub async fn select_template(&self, id: &str) -> ProfileTemplate {
        let selected = {
            let mut state = self.state.write();
            let next = if state.templates.iter().any(|t| t.id == id) {
                id.to_string()
            } else {
                log::debug!("Unknown template '{}', falling back to the first one", id);
                state.templates[0].id.clone()
            };
            state.active_id = next;
            state.active().clone()
        };
        self.persist().await;
        selected
    }

    /// Replaces the header/footer of `id`. Returns `false` when `id` is unknown.
    pub async fn update_header_footer(&self, id: &str, config: HeaderFooterConfig) -> bool {
        let updated = {
            let mut state = self.state.write();
            match state.templates.iter_mut().find(|t| t.id == id) {
                Some(template) => {
                    template.header_footer_config = config;
                    true
                }
                None => false,
            }
        };

        if updated {
            self.persist().await;
        } else {
            log::debug!("Ignoring header/footer update for unknown template '{}'", id);
        }
        updated
    }

    /// Appends a new template and makes it the active one.
    pub async fn save_new_template(&self, request: NewTemplateRequest) -> ProfileTemplate {
        let template = {
            let mut state = self.state.write();
            let template = request.into_template(Uuid::new_v4().to_string());
            state.templates.push(template.clone());
            state.active_id = template.id.clone();
            template
        };
        log::info!("Created profile template '{}' ({})", template.name, template.id);
        self.persist().await;
        template
    }

    // Saves are serialized and always write the latest state, so a slow save
    // can never overwrite a newer one.
    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.state.read().to_collection();
        match self.repository.save(&snapshot).await {
            Ok(()) => log::debug!(
                "Persisted {} profile templates",
                snapshot.templates.len()
            ),
            Err(e) => log::error!("Failed to persist profile templates: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::model::QrCodePosition;
    use crate::template::persistence::{MemoryRepository, PersistenceError};
    use async_trait::async_trait;

    struct BrokenRepository;

    #[async_trait]
    impl TemplateRepository for BrokenRepository {
        async fn load(&self) -> Result<Option<TemplateCollection>, PersistenceError> {
            Err(PersistenceError::Task("disk on fire".to_string()))
        }

        async fn save(&self, _collection: &TemplateCollection) -> Result<(), PersistenceError> {
            Err(PersistenceError::Task("disk on fire".to_string()))
        }
    }

    async fn seeded_store() -> (TemplateStore, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let store = TemplateStore::load(repo.clone()).await;
        (store, repo)
    }

    #[tokio::test]
    async fn test_seed_set_is_used_when_nothing_stored() {
        let (store, _) = seeded_store().await;
        let ids: Vec<String> = store.list_templates().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["standard", "minimal", "print", "badge"]);
        assert_eq!(store.active_template_id(), "standard");
    }

    #[tokio::test]
    async fn test_select_badge_puts_qr_in_footer() {
        let (store, _) = seeded_store().await;
        store.select_template("badge").await;
        assert_eq!(
            store.get_active_template().qr_code_position,
            QrCodePosition::Footer
        );
    }

    #[tokio::test]
    async fn test_unknown_id_falls_back_to_first() {
        let (store, _) = seeded_store().await;
        store.select_template("print").await;
        let selected = store.select_template("does-not-exist").await;
        assert_eq!(selected.id, "standard");
        assert_eq!(store.active_template_id(), "standard");
    }

    #[tokio::test]
    async fn test_active_template_always_listed() {
        let (store, _) = seeded_store().await;
        let steps = ["badge", "nope", "minimal", "", "print"];
        for (i, id) in steps.iter().enumerate() {
            store.select_template(id).await;
            if i % 2 == 0 {
                store
                    .save_new_template(NewTemplateRequest {
                        name: format!("Custom {}", i),
                        ..Default::default()
                    })
                    .await;
            }
            let active = store.get_active_template();
            assert!(store.list_templates().iter().any(|t| t == &active));
        }
    }

    #[tokio::test]
    async fn test_save_new_template_appends_and_activates() {
        let (store, repo) = seeded_store().await;
        let created = store
            .save_new_template(NewTemplateRequest {
                name: "Annuaire".to_string(),
                show_qr_code: true,
                qr_code_position: QrCodePosition::Header,
                ..Default::default()
            })
            .await;

        let list = store.list_templates();
        assert_eq!(list.len(), 5);
        assert_eq!(list.last().unwrap().id, created.id);
        assert_eq!(store.active_template_id(), created.id);

        let stored = repo.stored().unwrap();
        assert_eq!(stored.templates.len(), 5);
        assert_eq!(stored.active_template_id, Some(created.id));
    }

    #[tokio::test]
    async fn test_update_header_footer_unknown_id_is_noop() {
        let (store, repo) = seeded_store().await;
        let before = store.list_templates();
        let updated = store
            .update_header_footer("ghost", HeaderFooterConfig::default())
            .await;
        assert!(!updated);
        assert_eq!(store.list_templates(), before);
        assert_eq!(repo.save_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_active_id_falls_back_on_load() {
        let repo = Arc::new(MemoryRepository::with_collection(TemplateCollection {
            active_template_id: Some("removed".to_string()),
            templates: seed_templates(),
        }));
        let store = TemplateStore::load(repo).await;
        assert_eq!(store.get_active_template().id, "standard");
    }

    #[tokio::test]
    async fn test_broken_repository_never_surfaces() {
        let store = TemplateStore::load(Arc::new(BrokenRepository)).await;
        assert_eq!(store.list_templates().len(), 4);
        let selected = store.select_template("minimal").await;
        assert_eq!(selected.id, "minimal");
    }
}
