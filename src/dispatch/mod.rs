pub mod dispatcher;
pub mod intent;
pub mod reply;

pub use dispatcher::{DEFAULT_MAX_CONTEXT_CHARS, Dispatcher};
pub use intent::{Intent, Origin, ParticipantProfile};
pub use reply::Reply;
