//! Join planning for self-referential ("tree") entities.
//!
//! The store's standard relation loader cannot follow a relation whose target is the
//! owner's own type without either repeating joins or recursing through eager
//! relations forever. Paths that start at a tree entity are therefore joined here,
//! one alias per distinct path, and the caller removes them from the paths handed
//! to the standard loader.

use crate::config::{EntityMetadata, MetadataRegistry, CUSTOM_FIELDS};
use crate::error::ConfigError;
use crate::path::RelationPath;
use crate::query::builder::SelectQueryBuilder;
use std::collections::BTreeMap;

const EXPLICIT_CONNECTOR: &str = "_";
const EAGER_CONNECTOR: &str = "__";

/// True if the type is declared tree-typed, has a tree-parent/children relation, or has a
/// structural relation back to its own type. Self-referencing custom-field relations do not count.
pub fn is_tree_entity(metadata: &EntityMetadata) -> bool {
    metadata.tree
        || metadata.relations.iter().any(|r| {
            r.tree_parent || r.tree_children || (!r.custom_field && r.target == metadata.name)
        })
}

pub struct TreeJoinPlanner<'a> {
    registry: &'a MetadataRegistry,
}

impl<'a> TreeJoinPlanner<'a> {
    pub fn new(registry: &'a MetadataRegistry) -> Self {
        TreeJoinPlanner { registry }
    }

    /// Left-join every requested path that touches a tree entity. Returns logical path → alias
    /// for each join added by this call.
    pub fn join_tree_relations(
        &self,
        qb: &mut SelectQueryBuilder,
        entity_type: &str,
        requested: &[RelationPath],
        max_eager_depth: usize,
    ) -> Result<BTreeMap<RelationPath, String>, ConfigError> {
        let mut joined = BTreeMap::new();
        if requested.is_empty() {
            return Ok(joined);
        }
        let source = self.registry.require(entity_type)?;
        let source_is_tree = is_tree_entity(source);
        let root_alias = qb.alias().to_string();
        let root_path = RelationPath::default();
        for path in requested {
            if joined.contains_key(path) {
                continue;
            }
            let step = Step {
                metadata: source,
                parent_is_tree: source_is_tree,
                alias: &root_alias,
                parent_path: &root_path,
                eager_depth: 0,
            };
            self.process(qb, &mut joined, step, path.segments(), source_is_tree, max_eager_depth);
        }
        if !joined.is_empty() {
            tracing::debug!(entity = %entity_type, joins = ?joined, "tree relations joined");
        }
        Ok(joined)
    }

    fn process(
        &self,
        qb: &mut SelectQueryBuilder,
        joined: &mut BTreeMap<RelationPath, String>,
        step: Step<'_>,
        remaining: &[String],
        source_is_tree: bool,
        max_eager_depth: usize,
    ) {
        if remaining.is_empty() {
            return;
        }
        let current_is_tree = is_tree_entity(step.metadata) || source_is_tree || step.parent_is_tree;
        if !current_is_tree {
            return;
        }
        let (part, rest) = if remaining[0] == CUSTOM_FIELDS && remaining.len() > 1 {
            (format!("{}.{}", CUSTOM_FIELDS, remaining[1]), &remaining[2..])
        } else {
            (remaining[0].clone(), &remaining[1..])
        };
        let Some(relation) = step.metadata.relation(&part) else {
            return;
        };
        let connector = if relation.eager { EAGER_CONNECTOR } else { EXPLICIT_CONNECTOR };
        let next_alias = format!("{}{}{}", step.alias, connector, part.replace('.', "_"));
        let full_path = step.parent_path.child(&part);
        match qb.join_path(&next_alias) {
            // Same alias for another path, e.g. `parent.parent` vs `parent_parent`.
            // Leave this path to the standard loader.
            Some(existing) if existing != full_path => {
                tracing::debug!(alias = %next_alias, path = %full_path, taken_by = %existing, "join alias taken");
                return;
            }
            Some(_) => {}
            None => {
                if qb.left_join_and_select(step.alias, &part, &next_alias, &relation.target, relation.eager) {
                    joined.insert(full_path.clone(), next_alias.clone());
                }
            }
        }

        let Some(target) = self.registry.get(&relation.target) else {
            return;
        };
        let eager_depth = if relation.eager { step.eager_depth + 1 } else { step.eager_depth };
        if eager_depth <= max_eager_depth {
            for sub in target.relations.iter().filter(|r| r.eager) {
                let sub_path = RelationPath::parse(&sub.property);
                let next = Step {
                    metadata: target,
                    parent_is_tree: current_is_tree,
                    alias: &next_alias,
                    parent_path: &full_path,
                    eager_depth,
                };
                self.process(qb, joined, next, sub_path.segments(), source_is_tree, max_eager_depth);
            }
        }
        // Explicitly requested remainder is never depth-limited.
        if !rest.is_empty() {
            let next = Step {
                metadata: target,
                parent_is_tree: current_is_tree,
                alias: &next_alias,
                parent_path: &full_path,
                eager_depth: 0,
            };
            self.process(qb, joined, next, rest, source_is_tree, max_eager_depth);
        }
    }
}

#[derive(Clone, Copy)]
struct Step<'s> {
    metadata: &'s EntityMetadata,
    parent_is_tree: bool,
    alias: &'s str,
    parent_path: &'s RelationPath,
    eager_depth: usize,
}
