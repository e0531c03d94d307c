//! XFLDOC - Structural model for XFL animation authoring documents
//!
//! Re-exports the document model and collaborator ports.

// Core plumbing (event bus, workers)
pub mod core;

// Model modules
pub mod entities;
pub mod error;
pub mod io;
pub mod markup;

// Re-export commonly used types from core
pub use core::event_bus::{LibraryEvent, LibraryEventBus, Receiver, ReceiverKind};
pub use core::workers::Workers;

// Re-export entities
pub use entities::{
    Document, Element, EventDelivery, Frame, Item, ItemData, ItemOperation, Layer, LayerType,
    Library, Timeline,
};

pub use error::{Result, XflError};
pub use io::{Container, DirContainer, MarkupIo, MediaProbe, MemoryMarkup, NullProbe, SoundInfo};
pub use markup::Node;
