pub mod event;
pub mod exception;
pub mod instance;
pub mod rule;
pub mod window;

pub use event::TemplateEvent;
pub use exception::EventException;
pub use instance::{MaterializedInstance, NewMaterializedInstance};
pub use rule::StoredRecurrenceRule;
pub use window::MaterializationWindow;
