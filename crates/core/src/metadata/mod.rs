//! Key-value metadata port (sync cursors and other small persisted scalars).

use async_trait::async_trait;

use crate::errors::Result;

/// Key under which the cursor of `domain` is stored.
pub fn cursor_key(domain: &str) -> String {
    format!("{domain}_cursor")
}

#[async_trait]
pub trait MetadataRepositoryTrait: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Upsert. `None` stores a null value rather than removing the key.
    async fn set(&self, key: String, value: Option<String>) -> Result<()>;

    fn get_cursor(&self, domain: &str) -> Result<Option<String>> {
        self.get(&cursor_key(domain))
    }

    async fn set_cursor(&self, domain: &str, value: Option<String>) -> Result<()> {
        self.set(cursor_key(domain), value).await
    }
}
