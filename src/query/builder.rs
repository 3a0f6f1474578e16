//! Incremental select plan: root lookup by primary key plus left joins and relation loads.
//! Describes what to fetch; turning it into SQL is the store's concern.

use crate::entity::EntityId;
use crate::path::RelationPath;

/// One explicit left join. `alias` is unique within a builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinClause {
    pub parent_alias: String,
    /// Relation property on the parent (custom-field relations as `customFields.<name>`).
    pub property: String,
    pub alias: String,
    pub target_type: String,
    pub eager: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectQuery {
    pub entity_type: String,
    pub alias: String,
    pub id: Option<EntityId>,
    pub joins: Vec<JoinClause>,
    /// Paths left to the store's standard relation loader.
    pub relations: Vec<RelationPath>,
}

impl SelectQuery {
    pub fn join(&self, alias: &str) -> Option<&JoinClause> {
        self.joins.iter().find(|j| j.alias == alias)
    }

    /// Relation properties from the root down to `alias`, e.g. `["parent", "parent"]`.
    pub fn join_path(&self, alias: &str) -> Option<RelationPath> {
        let mut segments = Vec::new();
        let mut current = alias;
        while current != self.alias {
            let join = self.join(current)?;
            segments.push(join.property.clone());
            current = &join.parent_alias;
        }
        segments.reverse();
        Some(RelationPath::parse(&segments.join(".")))
    }
}

pub struct SelectQueryBuilder {
    query: SelectQuery,
}

impl SelectQueryBuilder {
    pub fn new(entity_type: &str, alias: &str) -> Self {
        SelectQueryBuilder {
            query: SelectQuery {
                entity_type: entity_type.to_string(),
                alias: alias.to_string(),
                id: None,
                joins: Vec::new(),
                relations: Vec::new(),
            },
        }
    }

    /// Builder aliased by its entity type name.
    pub fn for_entity(entity_type: &str) -> Self {
        Self::new(entity_type, entity_type)
    }

    pub fn alias(&self) -> &str {
        &self.query.alias
    }

    pub fn entity_type(&self) -> &str {
        &self.query.entity_type
    }

    pub fn has_join_alias(&self, alias: &str) -> bool {
        alias == self.query.alias || self.query.joins.iter().any(|j| j.alias == alias)
    }

    pub fn joins(&self) -> &[JoinClause] {
        &self.query.joins
    }

    /// Logical path joined under `alias`, if the alias is registered.
    pub fn join_path(&self, alias: &str) -> Option<RelationPath> {
        self.query.join_path(alias)
    }

    /// Adds a left join selecting the related rows. Returns false, adding nothing, when
    /// `alias` is already registered or `parent_alias` is unknown.
    pub fn left_join_and_select(
        &mut self,
        parent_alias: &str,
        property: &str,
        alias: &str,
        target_type: &str,
        eager: bool,
    ) -> bool {
        if self.has_join_alias(alias) || !self.has_join_alias(parent_alias) {
            return false;
        }
        tracing::debug!(parent = %parent_alias, property = %property, alias = %alias, "left join");
        self.query.joins.push(JoinClause {
            parent_alias: parent_alias.to_string(),
            property: property.to_string(),
            alias: alias.to_string(),
            target_type: target_type.to_string(),
            eager,
        });
        true
    }

    pub fn where_id(&mut self, id: EntityId) -> &mut Self {
        self.query.id = Some(id);
        self
    }

    pub fn with_relations(&mut self, relations: Vec<RelationPath>) -> &mut Self {
        for r in relations {
            if !self.query.relations.contains(&r) {
                self.query.relations.push(r);
            }
        }
        self
    }

    pub fn build(self) -> SelectQuery {
        self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_duplicate_and_orphan_aliases() {
        let mut qb = SelectQueryBuilder::for_entity("Category");
        assert!(qb.left_join_and_select("Category", "parent", "Category_parent", "Category", false));
        assert!(!qb.left_join_and_select("Category", "parent", "Category_parent", "Category", false));
        assert!(!qb.left_join_and_select("Nowhere", "parent", "Nowhere_parent", "Category", false));
        assert!(!qb.left_join_and_select("Category", "parent", "Category", "Category", false));
        assert_eq!(qb.joins().len(), 1);
    }

    #[test]
    fn join_path_walks_back_to_root() {
        let mut qb = SelectQueryBuilder::for_entity("Category");
        qb.left_join_and_select("Category", "parent", "Category_parent", "Category", false);
        qb.left_join_and_select("Category_parent", "parent", "Category_parent_parent", "Category", false);
        qb.where_id(EntityId::Int(3));
        let query = qb.build();
        assert_eq!(
            query.join_path("Category_parent_parent"),
            Some(RelationPath::parse("parent.parent"))
        );
        assert_eq!(query.join_path("Category"), Some(RelationPath::from_segments(Vec::<String>::new())));
        assert_eq!(query.join_path("missing"), None);
    }

    #[test]
    fn relations_are_deduplicated() {
        let mut qb = SelectQueryBuilder::for_entity("Product");
        qb.with_relations(vec!["variants".into(), "variants".into(), "featuredAsset".into()]);
        assert_eq!(qb.build().relations.len(), 2);
    }
}
