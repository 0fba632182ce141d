pub mod event_registry;

pub use event_registry::{
    create_shared_event_registry, EventRegistry, RegistrySnapshot, SharedEventRegistry,
};
