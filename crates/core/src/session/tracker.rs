use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::{
    catalog::Catalog,
    config::AppConfig,
    entity::MapBounds,
    error::TrackerError,
    ids::EntityId,
    storage::{self, Storage, ACTIVE_TAB_KEY, ENTITIES_KEY, PATTERNS_KEY},
};

use super::{
    sort::SortScheduler,
    state::{Changes, SessionEvent, SessionState, Tab},
};

/// Application root: owns the catalog, the session and its backing store.
///
/// Every accepted event is written through to storage. Storage failures are
/// logged and never undo the in-memory change.
pub struct Tracker {
    catalog: Catalog,
    state: SessionState,
    storage: Box<dyn Storage>,
    scheduler: SortScheduler,
    bounds: MapBounds,
}

impl Tracker {
    /// Restore the session from `storage` using the settings in `config`.
    pub fn open(catalog: Catalog, storage: Box<dyn Storage>, config: &AppConfig) -> Self {
        Self::with_settings(catalog, storage, config.sort_delay(), config.map_bounds())
    }

    pub fn with_settings(
        catalog: Catalog,
        storage: Box<dyn Storage>,
        sort_delay: Duration,
        bounds: MapBounds,
    ) -> Self {
        let entities = storage::load_or_default(storage.as_ref(), ENTITIES_KEY);
        let patterns = storage::load_or_default(storage.as_ref(), PATTERNS_KEY);
        let tab: Tab = storage::load_or_default(storage.as_ref(), ACTIVE_TAB_KEY);
        let state = SessionState::new(entities, patterns, tab);
        info!(
            entities = state.entities().len(),
            patterns = state.patterns().len(),
            "Session restored"
        );
        Self {
            catalog,
            state,
            storage,
            scheduler: SortScheduler::new(sort_delay),
            bounds,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn bounds(&self) -> MapBounds {
        self.bounds
    }

    pub fn dispatch(&mut self, event: SessionEvent) -> Result<Changes, TrackerError> {
        self.dispatch_at(event, Instant::now())
    }

    /// Restart the sort countdown, then apply `event` and persist what it
    /// changed. A rejected event still restarts the countdown.
    pub fn dispatch_at(&mut self, event: SessionEvent, now: Instant) -> Result<Changes, TrackerError> {
        self.scheduler.touch(now);
        let changes = self.state.apply(event, &self.catalog, self.bounds)?;
        self.persist(changes);
        Ok(changes)
    }

    /// Add whatever the add-entity dialog currently describes and reset it.
    /// Returns `None` when the selection is incomplete.
    pub fn add_selected(&mut self) -> Result<Option<EntityId>, TrackerError> {
        let Some(request) = self.state.selection().to_request() else {
            return Ok(None);
        };
        self.dispatch(SessionEvent::AddEntity(request))?;
        self.state.selection_mut().reset();
        Ok(self.state.entities().last().map(|entity| entity.id))
    }

    /// Run the debounced sort if its quiet period has elapsed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.scheduler.take_due(now) {
            return false;
        }
        self.state.sort_entities();
        debug!("Entities re-sorted");
        self.persist(Changes {
            entities: true,
            ..Changes::default()
        });
        true
    }

    pub fn sort_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    fn persist(&mut self, changes: Changes) {
        if changes.entities {
            self.write(ENTITIES_KEY, |state, storage| {
                storage::store(storage, ENTITIES_KEY, state.entities())
            });
        }
        if changes.patterns {
            self.write(PATTERNS_KEY, |state, storage| {
                storage::store(storage, PATTERNS_KEY, state.patterns())
            });
        }
        if changes.tab {
            self.write(ACTIVE_TAB_KEY, |state, storage| {
                storage::store(storage, ACTIVE_TAB_KEY, &state.tab())
            });
        }
    }

    fn write(
        &mut self,
        key: &str,
        store: impl FnOnce(&SessionState, &mut dyn Storage) -> Result<()>,
    ) {
        if let Err(err) = store(&self.state, self.storage.as_mut()) {
            warn!("Failed to persist {key}: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use anyhow::bail;

    use super::*;
    use crate::entity::{EntityRequest, GroupColor};
    use crate::session::ChassisChoice;
    use crate::storage::MemoryStorage;

    /// Shares one `MemoryStorage` between the tracker and the test body.
    #[derive(Clone, Default)]
    struct SharedStorage(Rc<RefCell<MemoryStorage>>);

    impl Storage for SharedStorage {
        fn read(&self, key: &str) -> Result<Option<String>> {
            self.0.borrow().read(key)
        }

        fn write(&mut self, key: &str, value: &str) -> Result<()> {
            self.0.borrow_mut().write(key, value)
        }
    }

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn read(&self, _key: &str) -> Result<Option<String>> {
            bail!("disk unplugged")
        }

        fn write(&mut self, _key: &str, _value: &str) -> Result<()> {
            bail!("disk unplugged")
        }
    }

    fn tracker(storage: impl Storage + 'static) -> Tracker {
        Tracker::with_settings(
            Catalog::bundled().expect("bundled catalog parses"),
            Box::new(storage),
            Duration::from_millis(1500),
            MapBounds::default(),
        )
    }

    fn raider() -> SessionEvent {
        SessionEvent::AddEntity(EntityRequest::Other {
            category: "NPCs".to_string(),
            template: "Raider".to_string(),
        })
    }

    #[test]
    fn session_survives_a_restart() -> Result<()> {
        let shared = SharedStorage::default();
        let mut first = tracker(shared.clone());
        first.dispatch(raider())?;
        first.dispatch(SessionEvent::SetTab(Tab::MechBuilder))?;
        let saved = first.state().entities().to_vec();

        let second = tracker(shared.clone());
        assert_eq!(second.state().entities(), saved.as_slice());
        assert_eq!(second.state().tab(), Tab::MechBuilder);
        assert!(shared.0.borrow().read(PATTERNS_KEY)?.is_none());
        Ok(())
    }

    #[test]
    fn storage_failures_do_not_block_edits() -> Result<()> {
        let mut tracker = tracker(BrokenStorage);
        assert!(tracker.state().entities().is_empty());
        tracker.dispatch(raider())?;
        assert_eq!(tracker.state().entities().len(), 1);
        Ok(())
    }

    #[test]
    fn rejected_event_is_not_persisted() -> Result<()> {
        let shared = SharedStorage::default();
        let mut tracker = tracker(shared.clone());
        let start = Instant::now();
        let result = tracker.dispatch_at(
            SessionEvent::AddEntity(EntityRequest::CatalogMech {
                chassis: "Buzzsaw".to_string(),
                pattern: "Nonexistent".to_string(),
            }),
            start,
        );
        assert!(result.is_err());
        assert!(shared.0.borrow().read(ENTITIES_KEY)?.is_none());
        assert!(tracker.sort_pending());
        Ok(())
    }

    #[test]
    fn rejected_event_still_restarts_the_countdown() -> Result<()> {
        let mut tracker = tracker(MemoryStorage::new());
        let start = Instant::now();
        tracker.dispatch_at(raider(), start)?;
        let rejected = tracker.dispatch_at(
            SessionEvent::DeletePattern("Nonexistent".to_string()),
            start + Duration::from_millis(1000),
        );
        assert!(rejected.is_err());

        assert!(!tracker.tick(start + Duration::from_millis(1500)));
        assert!(tracker.tick(start + Duration::from_millis(2500)));
        Ok(())
    }

    #[test]
    fn sort_waits_for_quiet_period() -> Result<()> {
        let mut tracker = tracker(MemoryStorage::new());
        let start = Instant::now();
        tracker.dispatch_at(raider(), start)?;
        tracker.dispatch_at(raider(), start)?;
        let first = tracker.state().entities()[0].id;
        tracker.dispatch_at(SessionEvent::CycleGroupColor(first), start)?;
        assert_eq!(tracker.state().entities()[0].group_color, GroupColor::Red);

        assert!(!tracker.tick(start + Duration::from_millis(1000)));
        assert_eq!(tracker.state().entities()[0].id, first);

        assert!(tracker.tick(start + Duration::from_millis(1500)));
        assert_eq!(tracker.state().entities()[1].id, first);
        assert!(!tracker.tick(start + Duration::from_millis(3000)));
        Ok(())
    }

    #[test]
    fn add_selected_consumes_the_selection() -> Result<()> {
        let mut tracker = tracker(MemoryStorage::new());
        assert_eq!(tracker.add_selected()?, None);

        let selection = tracker.state_mut().selection_mut();
        selection.select_chassis(ChassisChoice::Catalog("Mule".to_string()));
        selection.select_pattern("Hauler");
        let id = tracker.add_selected()?.expect("selection was complete");

        let added = tracker.state().entity(id).expect("added");
        assert_eq!(added.name, "Mule - Hauler");
        assert!(!tracker.state().selection().is_complete());
        Ok(())
    }
}
