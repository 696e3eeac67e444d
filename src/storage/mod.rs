use anyhow::Result;
use async_trait::async_trait;

mod json_file;
mod seen;

pub use json_file::JsonFileStorage;
pub use seen::{SeenItemId, SeenItemStore};

#[async_trait]
pub trait Storage: Send + Sync {
    /// Never fails: unreadable state comes back as an empty store.
    async fn load(&self, capacity: usize) -> SeenItemStore;
    async fn save(&self, store: &SeenItemStore) -> Result<()>;
}
