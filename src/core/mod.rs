//! Infrastructure shared across the model: event bus and worker pool.

pub mod event_bus;
pub mod workers;

pub use event_bus::{LibraryEvent, LibraryEventBus, Receiver, ReceiverKind};
pub use workers::Workers;
