// storefront/src/services/mod.rs

pub mod session_registry;

pub use session_registry::SessionRegistry;
