//! Session state and its persistence backends.
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`InMemoryStore`] | tests, single-process chat |
//! | [`FileStore`] | durable single-host sessions |
//! | `RocksStore` | `rocksdb` feature, many sessions |

pub mod file;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocks;
pub mod store;
pub mod types;

pub use file::FileStore;
pub use memory::InMemoryStore;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksStore;
pub use store::{
    validate_key, SessionStore, SharedSessionStore, StoreError, StoreResult, StoredSession,
};
pub use types::{ConversationState, SessionStatus, STATE_SCHEMA_VERSION};
