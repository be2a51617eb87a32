//! Persistence models and the storage seam for event materialization.

pub mod error;
pub mod memory;
pub mod model;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use model::{
    EventException, MaterializationWindow, MaterializedInstance, NewMaterializedInstance,
    StoredRecurrenceRule, TemplateEvent,
};
pub use store::MaterializationStore;
