pub mod locks;
pub mod memory;
pub mod record;
pub mod sqlite;
pub mod store;
pub mod types;

pub use locks::{KeyedLocks, SessionLock};
pub use memory::MemorySessionStore;
pub use record::{RECORD_SCHEMA_VERSION, SessionRecord};
pub use sqlite::{DEFAULT_SESSION_TTL, SqliteSessionStore, SqliteStoreOptions};
pub use store::{SessionStore, StoreFuture};
pub use types::{Session, SessionKey, Turn, TurnRole};
