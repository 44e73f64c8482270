pub mod events;
pub mod identity;

pub use events::require_event_token;
pub use identity::resolve_identity;
