//! Persistence seams. Hydration and translation persistence only ever talk to these traits.

mod memory;

pub use memory::MemoryStore;

use crate::entity::{Entity, Translation};
use crate::error::StoreError;
use crate::query::SelectQuery;
use async_trait::async_trait;

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Run a single-entity select plan. `Ok(None)` when no row has the plan's primary key.
    async fn find_one(&self, query: &SelectQuery) -> Result<Option<Entity>, StoreError>;
}

#[async_trait]
pub trait TranslationRepository: Send + Sync {
    /// Insert or update one translation row of `entity_type`, returning it with its identity.
    async fn save_translation(
        &self,
        entity_type: &str,
        translation: Translation,
    ) -> Result<Translation, StoreError>;
}
