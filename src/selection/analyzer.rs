//! Compiles a client field selection into the relation paths needed to satisfy it.

use crate::config::{EntityMetadata, MetadataRegistry, CUSTOM_FIELDS};
use crate::error::{ConfigError, SelectionError};
use crate::path::RelationPath;
use crate::selection::cache::RelationPathCache;
use crate::selection::tree::FieldSelection;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Field holding the page of results in a paginated-list return type.
pub const PAGINATED_ITEMS: &str = "items";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReturnType {
    pub name: String,
    /// The type is a paginated-list wrapper; only its `items` are inspected.
    pub paginated: bool,
}

impl ReturnType {
    pub fn entity(name: &str) -> Self {
        ReturnType {
            name: name.to_string(),
            paginated: false,
        }
    }

    pub fn paginated(name: &str) -> Self {
        ReturnType {
            name: name.to_string(),
            paginated: true,
        }
    }
}

/// The selection-bearing part of an inbound query, for one root field.
#[derive(Clone, Debug)]
pub struct SelectionContext {
    pub root_field: String,
    pub raw_selection: String,
    pub selection: FieldSelection,
    pub return_type: ReturnType,
}

impl SelectionContext {
    pub fn parse(root_field: &str, raw_selection: &str, return_type: ReturnType) -> Result<Self, SelectionError> {
        Ok(SelectionContext {
            root_field: root_field.to_string(),
            raw_selection: raw_selection.to_string(),
            selection: FieldSelection::parse(raw_selection)?,
            return_type,
        })
    }
}

/// Per-call-site configuration.
#[derive(Clone, Debug, Default)]
pub struct RelationOptions {
    /// Overrides the analyzer's maximum depth.
    pub depth: Option<usize>,
    /// Computed paths equal to or under any of these prefixes are dropped, for relations a
    /// field resolver loads by itself.
    pub omit: Vec<RelationPath>,
}

impl RelationOptions {
    pub fn depth(depth: usize) -> Self {
        RelationOptions {
            depth: Some(depth),
            omit: Vec::new(),
        }
    }

    pub fn omit(mut self, prefix: &str) -> Self {
        self.omit.push(RelationPath::parse(prefix));
        self
    }
}

pub struct FieldSelectionAnalyzer {
    registry: Arc<MetadataRegistry>,
    cache: Arc<RelationPathCache>,
    max_depth: usize,
}

impl FieldSelectionAnalyzer {
    pub fn new(registry: Arc<MetadataRegistry>, cache: Arc<RelationPathCache>) -> Self {
        FieldSelectionAnalyzer {
            registry,
            cache,
            max_depth: crate::settings::DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Relation paths for `entity_type` given the current selection. Outside a selection
    /// context this is an empty list, not an error.
    pub fn relations(
        &self,
        entity_type: &str,
        options: &RelationOptions,
        ctx: Option<&SelectionContext>,
    ) -> Result<Vec<RelationPath>, ConfigError> {
        let Some(ctx) = ctx else {
            tracing::warn!(entity = %entity_type, "no selection context, no relations");
            return Ok(Vec::new());
        };
        let paths = self.cache.get_or_try_insert_with(&ctx.root_field, &ctx.raw_selection, || {
            self.compute(entity_type, options, &ctx.selection, &ctx.return_type)
        })?;
        Ok(paths.to_vec())
    }

    /// Uncached computation.
    pub fn compute(
        &self,
        entity_type: &str,
        options: &RelationOptions,
        selection: &FieldSelection,
        return_type: &ReturnType,
    ) -> Result<Vec<RelationPath>, ConfigError> {
        let metadata = self.registry.require(entity_type)?;
        let selection = if return_type.paginated {
            match selection.get(PAGINATED_ITEMS) {
                Some(items) => items,
                None => return Ok(Vec::new()),
            }
        } else {
            selection
        };
        let max_depth = options.depth.unwrap_or(self.max_depth);
        let mut out = BTreeSet::new();
        self.walk(metadata, selection, &RelationPath::default(), 1, max_depth, &mut out);

        let paths: Vec<RelationPath> = out
            .into_iter()
            .filter(|p| !options.omit.iter().any(|prefix| p.starts_with(prefix)))
            .collect();
        tracing::debug!(entity = %entity_type, relations = ?paths, "relations from selection");
        Ok(paths)
    }

    /// `depth` is the level of the fields in `selection`, starting at 1. Relations are
    /// recorded up to `max_depth`; calculated-property dependencies at any level.
    fn walk(
        &self,
        metadata: &EntityMetadata,
        selection: &FieldSelection,
        prefix: &RelationPath,
        depth: usize,
        max_depth: usize,
        out: &mut BTreeSet<RelationPath>,
    ) {
        for (name, sub) in selection.fields() {
            if let Some(calculated) = metadata.calculated_property(name) {
                for dependency in &calculated.relations {
                    out.extend(prefix.join(dependency).prefixes());
                }
            }
            if name == CUSTOM_FIELDS {
                if let Some(embedded) = self.registry.custom_fields_type(&metadata.name) {
                    self.walk(embedded, sub, &prefix.child(CUSTOM_FIELDS), depth + 1, max_depth, out);
                }
                continue;
            }
            let Some(relation) = metadata.relation(name) else {
                continue;
            };
            let path = prefix.child(name);
            if depth <= max_depth {
                out.insert(path.clone());
            }
            // keep descending past the depth limit only to find calculated dependencies
            if let Some(target) = self.registry.get(&relation.target) {
                self.walk(target, sub, &path, depth + 1, max_depth, out);
            }
        }
    }
}
