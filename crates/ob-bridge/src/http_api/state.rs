use ob_core::config::Settings;
use ob_core::events::EventBus;
use ob_db::Db;
use ob_storage::DynObjectStore;

/// Shared state for all Control API handlers.
pub struct ApiState {
    pub db: Db,
    pub storage: DynObjectStore,
    pub bus: &'static EventBus,
    pub settings: Settings,
}

impl ApiState {
    pub fn new(db: Db, storage: DynObjectStore, bus: &'static EventBus, settings: Settings) -> Self {
        Self {
            db,
            storage,
            bus,
            settings,
        }
    }
}
