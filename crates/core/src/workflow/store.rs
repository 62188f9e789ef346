//! Storage contracts and the optimistic-concurrency retry loop.
//!
//! `InstanceStore::save` is a compare-and-swap on `version`: a save only
//! lands when the stored row is still at `expected_version`. The in-memory
//! stores here follow the same contract as the PostgreSQL ones in
//! `hrflow-db` and back the tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::types::DbId;
use crate::workflow::instance::WorkflowInstance;
use crate::workflow::intent::Transition;
use crate::workflow::registry::TemplateRegistry;
use crate::workflow::status::WorkflowType;
use crate::workflow::template::WorkflowTemplate;

/// Attempts made by [`run_with_retry`] when no limit is configured.
pub const DEFAULT_MAX_SAVE_ATTEMPTS: u32 = 3;

pub const ENTITY_INSTANCE: &str = "WorkflowInstance";
pub const ENTITY_TEMPLATE: &str = "WorkflowTemplate";

#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn load(&self, id: DbId) -> Result<WorkflowInstance, CoreError>;

    /// Persist a new instance. Returns it with its assigned `id` and `version = 1`.
    async fn insert(&self, instance: WorkflowInstance) -> Result<WorkflowInstance, CoreError>;

    /// Compare-and-swap save. Returns the new version.
    async fn save(&self, instance: &WorkflowInstance, expected_version: i64)
        -> Result<i64, CoreError>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get(&self, id: DbId) -> Result<WorkflowTemplate, CoreError>;

    /// Active templates visible to `company_id` (own and public).
    async fn list_active(&self, company_id: DbId) -> Result<Vec<WorkflowTemplate>, CoreError>;

    async fn latest_active(
        &self,
        company_id: DbId,
        workflow_type: WorkflowType,
    ) -> Result<Option<WorkflowTemplate>, CoreError>;

    /// Persist a new template version. The store assigns `id` and the next
    /// version number of the template's lineage.
    async fn insert(&self, template: WorkflowTemplate) -> Result<WorkflowTemplate, CoreError>;
}

// ---------------------------------------------------------------------------
// Retry loop
// ---------------------------------------------------------------------------

/// Load, apply `op`, save; on `VersionConflict` reload and reapply.
///
/// `op` is re-run against the freshly loaded instance on every attempt, so
/// it must be a pure function of its input (the engine operations are).
/// Errors from `op` and non-conflict store errors propagate immediately.
/// After `max_attempts` conflicts the last `VersionConflict` is returned.
pub async fn run_with_retry<F>(
    store: &dyn InstanceStore,
    id: DbId,
    max_attempts: u32,
    mut op: F,
) -> Result<Transition, CoreError>
where
    F: FnMut(&WorkflowInstance) -> Result<Transition, CoreError> + Send,
{
    let mut last_conflict = None;
    for _ in 0..max_attempts.max(1) {
        let current = store.load(id).await?;
        let mut transition = op(&current)?;
        match store.save(&transition.instance, current.version).await {
            Ok(version) => {
                transition.instance.version = version;
                return Ok(transition);
            }
            Err(e) if e.is_retryable() => last_conflict = Some(e),
            Err(e) => return Err(e),
        }
    }
    Err(last_conflict.unwrap_or_else(|| {
        CoreError::Internal(format!("No save attempt was made for instance {id}"))
    }))
}

// ---------------------------------------------------------------------------
// In-memory stores
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryInstanceStore {
    rows: RwLock<HashMap<DbId, WorkflowInstance>>,
    next_id: AtomicI64,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn load(&self, id: DbId) -> Result<WorkflowInstance, CoreError> {
        self.rows
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: ENTITY_INSTANCE,
                id,
            })
    }

    async fn insert(&self, mut instance: WorkflowInstance) -> Result<WorkflowInstance, CoreError> {
        instance.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        instance.version = 1;
        self.rows.write().await.insert(instance.id, instance.clone());
        Ok(instance)
    }

    async fn save(
        &self,
        instance: &WorkflowInstance,
        expected_version: i64,
    ) -> Result<i64, CoreError> {
        let mut rows = self.rows.write().await;
        let stored = rows.get_mut(&instance.id).ok_or(CoreError::NotFound {
            entity: ENTITY_INSTANCE,
            id: instance.id,
        })?;
        if stored.version != expected_version {
            return Err(CoreError::VersionConflict {
                entity: ENTITY_INSTANCE,
                id: instance.id,
                expected_version,
            });
        }
        let version = expected_version + 1;
        *stored = WorkflowInstance {
            version,
            ..instance.clone()
        };
        Ok(version)
    }
}

/// Template store backed by a [`TemplateRegistry`].
#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    registry: RwLock<TemplateRegistry>,
    next_id: AtomicI64,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn get(&self, id: DbId) -> Result<WorkflowTemplate, CoreError> {
        self.registry.read().await.require(id).cloned()
    }

    async fn list_active(&self, company_id: DbId) -> Result<Vec<WorkflowTemplate>, CoreError> {
        Ok(self
            .registry
            .read()
            .await
            .list_active(company_id)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn latest_active(
        &self,
        company_id: DbId,
        workflow_type: WorkflowType,
    ) -> Result<Option<WorkflowTemplate>, CoreError> {
        Ok(self
            .registry
            .read()
            .await
            .latest_active(company_id, workflow_type)
            .cloned())
    }

    async fn insert(&self, mut template: WorkflowTemplate) -> Result<WorkflowTemplate, CoreError> {
        let mut registry = self.registry.write().await;
        let (company_id, workflow_type, name) = template.lineage_key();
        let version = registry.next_version(company_id, workflow_type, name);
        template.version = version;
        template.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        registry.register(template.clone())?;
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::command::AdvanceCommand;
    use crate::workflow::engine::{self, EngineConfig, NewInstance};
    use crate::workflow::assignee::NoOrgLookup;
    use crate::workflow::instance::Actor;
    use crate::workflow::status::{InstanceStatus, StepStatus};
    use crate::workflow::template::fixtures::linear_template;
    use assert_matches::assert_matches;

    fn hr() -> Actor {
        Actor::new(1, "Hana", "hr")
    }

    async fn seeded(
        ids: &[&str],
    ) -> (InMemoryInstanceStore, WorkflowTemplate, WorkflowInstance) {
        let mut template = linear_template(ids);
        for step in &mut template.steps {
            step.assignee_id = Some(1);
        }
        let created = engine::create_instance(&template, NewInstance::new(hr()), &NoOrgLookup)
            .unwrap()
            .instance;
        let store = InMemoryInstanceStore::new();
        let inst = store.insert(created).await.unwrap();
        (store, template, inst)
    }

    fn advance(
        template: &WorkflowTemplate,
        inst: &WorkflowInstance,
        step_id: &str,
    ) -> Result<Transition, CoreError> {
        engine::advance_step(
            template,
            inst,
            &AdvanceCommand::new(step_id, "approved", hr()),
            &NoOrgLookup,
            &EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn insert_assigns_id_and_first_version() {
        let (store, _, inst) = seeded(&["a"]).await;
        assert_eq!(inst.id, 1);
        assert_eq!(inst.version, 1);
        assert_eq!(store.load(1).await.unwrap(), inst);
        assert_matches!(store.load(2).await, Err(CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn scenario_d_concurrent_saves_only_one_wins() {
        let (store, template, _) = seeded(&["apply", "interview", "offer"]).await;

        // Two callers load the same version and compute independently.
        let first = store.load(1).await.unwrap();
        let second = store.load(1).await.unwrap();
        let a = advance(&template, &first, "apply").unwrap();
        let b = advance(&template, &second, "apply").unwrap();

        let saved = store.save(&a.instance, first.version).await;
        let lost = store.save(&b.instance, second.version).await;

        assert_eq!(saved, Ok(2));
        assert_matches!(
            lost,
            Err(CoreError::VersionConflict { id: 1, expected_version: 1, .. })
        );
        let stored = store.load(1).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.current_step().unwrap().id, "interview");
    }

    #[tokio::test]
    async fn retry_reapplies_against_fresh_state() {
        let (store, template, _) = seeded(&["apply", "interview", "offer"]).await;
        let stale = store.load(1).await.unwrap();
        let winner = advance(&template, &stale, "apply").unwrap();
        store.save(&winner.instance, stale.version).await.unwrap();

        // The loser retries and now sees that "apply" is no longer current.
        let err = run_with_retry(&store, 1, 3, |inst| advance(&template, inst, "apply"))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::StepMismatch { .. });

        let ok = run_with_retry(&store, 1, 3, |inst| advance(&template, inst, "interview"))
            .await
            .unwrap();
        assert_eq!(ok.instance.version, 3);
        assert_eq!(ok.instance.current_step().unwrap().id, "offer");
    }

    /// Store whose first `conflicts` saves fail as if another writer won.
    struct Contended {
        inner: InMemoryInstanceStore,
        conflicts: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl InstanceStore for Contended {
        async fn load(&self, id: DbId) -> Result<WorkflowInstance, CoreError> {
            self.inner.load(id).await
        }
        async fn insert(&self, i: WorkflowInstance) -> Result<WorkflowInstance, CoreError> {
            self.inner.insert(i).await
        }
        async fn save(&self, i: &WorkflowInstance, expected: i64) -> Result<i64, CoreError> {
            let left = self.conflicts.load(Ordering::SeqCst);
            if left > 0 {
                self.conflicts.store(left - 1, Ordering::SeqCst);
                return Err(CoreError::VersionConflict {
                    entity: ENTITY_INSTANCE,
                    id: i.id,
                    expected_version: expected,
                });
            }
            self.inner.save(i, expected).await
        }
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let (inner, template, _) = seeded(&["a", "b"]).await;
        let store = Contended {
            inner,
            conflicts: std::sync::atomic::AtomicU32::new(5),
        };
        let mut calls = 0;
        let err = run_with_retry(&store, 1, 3, |inst| {
            calls += 1;
            advance(&template, inst, "a")
        })
        .await
        .unwrap_err();
        assert_matches!(err, CoreError::VersionConflict { .. });
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_conflict() {
        let (inner, template, _) = seeded(&["a", "b"]).await;
        let store = Contended {
            inner,
            conflicts: std::sync::atomic::AtomicU32::new(1),
        };
        let tr = run_with_retry(&store, 1, DEFAULT_MAX_SAVE_ATTEMPTS, |inst| {
            advance(&template, inst, "a")
        })
        .await
        .unwrap();
        assert_eq!(tr.instance.steps[0].status, StepStatus::Completed);
        assert_eq!(tr.instance.status, InstanceStatus::Active);
    }

    #[tokio::test]
    async fn template_store_assigns_versions_per_lineage() {
        let store = InMemoryTemplateStore::new();
        let first = store.insert(linear_template(&["a"])).await.unwrap();
        let second = store.insert(linear_template(&["a", "b"])).await.unwrap();
        assert_eq!((first.id, first.version), (1, 1));
        assert_eq!((second.id, second.version), (2, 2));

        let latest = store
            .latest_active(1, WorkflowType::Recruitment)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, 2);
        assert_eq!(store.list_active(1).await.unwrap().len(), 2);
        assert_matches!(store.get(9).await, Err(CoreError::NotFound { .. }));
    }
}
