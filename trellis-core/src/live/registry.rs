//! One live-update handler per open case.
//!
//! Handlers are independent, so each sits behind its own mutex and two cases
//! can be updated from different threads at once. The map itself is a
//! `DashMap`, which keeps opening and closing cases off the handlers' locks.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::handler::LiveUpdateHandler;
use super::results::ResultDatabase;
use crate::config::TrellisConfig;
use crate::error::Result;

/// A handler shared between the registry and its callers.
pub type SharedHandler = Arc<Mutex<LiveUpdateHandler>>;

/// Live-update handlers keyed by case.
pub struct CaseRegistry<C>
where
    C: Eq + Hash + Clone,
{
    config: TrellisConfig,
    cases: DashMap<C, SharedHandler>,
}

impl<C> CaseRegistry<C>
where
    C: Eq + Hash + Clone,
{
    pub fn new(config: TrellisConfig) -> Self {
        Self {
            config,
            cases: DashMap::new(),
        }
    }

    /// The handler of `case`, created empty if the case is not open yet.
    pub fn open(&self, case: C) -> SharedHandler {
        let entry = self.cases.entry(case).or_insert_with(|| {
            debug!("case opened");
            Arc::new(Mutex::new(LiveUpdateHandler::with_config(self.config.clone())))
        });
        Arc::clone(entry.value())
    }

    /// Open `case` from persisted state, replacing any handler it had.
    pub fn load(&self, case: C, db: ResultDatabase) -> Result<SharedHandler> {
        let handler = Arc::new(Mutex::new(LiveUpdateHandler::from_database(
            db,
            self.config.clone(),
        )?));
        self.cases.insert(case, Arc::clone(&handler));
        info!("case loaded from persisted results");
        Ok(handler)
    }

    pub fn get(&self, case: &C) -> Option<SharedHandler> {
        self.cases.get(case).map(|entry| Arc::clone(entry.value()))
    }

    /// Close `case` and return its state for persistence.
    pub fn close(&self, case: &C) -> Option<ResultDatabase> {
        let (_, handler) = self.cases.remove(case)?;
        let data = handler.lock().serializable_data();
        debug!("case closed");
        Some(data)
    }

    pub fn case_ids(&self) -> Vec<C> {
        self.cases.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn config(&self) -> &TrellisConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl<C> Default for CaseRegistry<C>
where
    C: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new(TrellisConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::{
        CheckContext, CheckKind, CheckOutcome, Checker, CheckerPipeline, EntityId, Identifiable,
        LogicalKey,
    };
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize)]
    struct Guide {
        id: EntityId,
        thickness: f64,
    }

    impl Identifiable for Guide {
        fn entity_id(&self) -> EntityId {
            self.id
        }

        fn logical_key(&self) -> LogicalKey {
            LogicalKey::new(1, 0)
        }
    }

    struct Thickness;

    impl Checker<Guide> for Thickness {
        fn kind(&self) -> CheckKind {
            CheckKind::Custom("thickness".into())
        }

        fn check(&self, guide: &Guide, _: &CheckContext<'_, Guide>) -> Result<CheckOutcome> {
            Ok(CheckOutcome::new(json!({ "thin": guide.thickness < 1.0 })))
        }
    }

    #[test]
    fn open_returns_same_handler() {
        let registry: CaseRegistry<u32> = CaseRegistry::default();
        let a = registry.open(1);
        let b = registry.open(1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&2).is_none());
    }

    #[test]
    fn cases_update_in_parallel() {
        let registry: CaseRegistry<u32> = CaseRegistry::default();

        std::thread::scope(|scope| {
            for case in 0..4u32 {
                let registry = &registry;
                scope.spawn(move || {
                    let pipeline = CheckerPipeline::new().with(Thickness);
                    let handler = registry.open(case);
                    let guides = [Guide {
                        id: EntityId::from_u128(case as u128),
                        thickness: 0.5 + case as f64,
                    }];
                    handler.lock().update(&guides, &pipeline).unwrap();
                });
            }
        });

        let mut ids = registry.case_ids();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        for case in 0..4u32 {
            let handler = registry.get(&case).unwrap();
            assert_eq!(handler.lock().tracked_len(), 1);
        }
    }

    #[test]
    fn close_then_load_restores_state() {
        let registry: CaseRegistry<&str> = CaseRegistry::default();
        let pipeline = CheckerPipeline::new().with(Thickness);
        let guides = [Guide {
            id: EntityId::from_u128(1),
            thickness: 0.2,
        }];
        registry.open("jaw").lock().update(&guides, &pipeline).unwrap();

        let db = registry.close(&"jaw").unwrap();
        assert!(registry.is_empty());

        let handler = registry.load("jaw", db).unwrap();
        let handler = handler.lock();
        let result = handler
            .result(&EntityId::from_u128(1), &CheckKind::Custom("thickness".into()))
            .unwrap();
        assert_eq!(result.content, json!({ "thin": true }));
    }
}
