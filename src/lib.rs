//! relgraph: relation-path resolution and entity hydration for a commerce backend.

pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod path;
pub mod price;
pub mod query;
pub mod selection;
pub mod service;
pub mod settings;
pub mod store;

pub use config::{load_from_path, resolve, MetadataRegistry, SchemaConfig};
pub use context::RequestContext;
pub use entity::{Entity, EntityId, Related, Translation};
pub use error::{ConfigError, EngineError, SelectionError, StoreError};
pub use path::RelationPath;
pub use price::{ChannelPriceApplicator, PriceApplicator};
pub use query::{SelectQuery, SelectQueryBuilder, TreeJoinPlanner};
pub use selection::{FieldSelection, FieldSelectionAnalyzer, RelationOptions, RelationPathCache, ReturnType, SelectionContext};
pub use service::{EntityHydrator, HydrateOptions, TranslationDiff, TranslationDiffer, TranslationResolver};
pub use settings::EngineSettings;
pub use store::{EntityStore, MemoryStore, TranslationRepository};
