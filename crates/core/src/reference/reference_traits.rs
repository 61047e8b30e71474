use async_trait::async_trait;

use super::{ReferenceItem, ReferenceKind};
use crate::errors::Result;

#[async_trait]
pub trait ReferenceRepositoryTrait: Send + Sync {
    /// Bulk upsert in one transaction.
    async fn replace_from_server(&self, kind: ReferenceKind, items: Vec<ReferenceItem>)
        -> Result<usize>;

    /// Non-deleted rows ordered by name.
    fn list(&self, kind: ReferenceKind) -> Result<Vec<ReferenceItem>>;
}

#[async_trait]
pub trait ReferenceServiceTrait: Send + Sync {
    async fn fetch_reference(&self, kind: ReferenceKind) -> Result<Vec<ReferenceItem>>;
}
