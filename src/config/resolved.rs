//! Resolved relation graph: schema config validated and flattened for runtime use.

use crate::config::IdType;
use crate::error::ConfigError;
use crate::path::RelationPath;
use std::collections::HashMap;

/// Property name of the embedded custom-field pseudo-relation.
pub const CUSTOM_FIELDS: &str = "customFields";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Clone, Debug)]
pub struct RelationDescriptor {
    /// Property path on the owner. Custom-field relations are `customFields.<name>`.
    pub property: String,
    pub target: String,
    pub cardinality: Cardinality,
    pub eager: bool,
    pub tree_parent: bool,
    pub tree_children: bool,
    pub custom_field: bool,
}

impl RelationDescriptor {
    pub fn is_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }
}

#[derive(Clone, Debug)]
pub struct CalculatedPropertyDescriptor {
    pub name: String,
    pub relations: Vec<RelationPath>,
}

#[derive(Clone, Debug)]
pub struct TranslationSpec {
    pub relation: String,
    pub fields: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct EntityMetadata {
    pub name: String,
    pub id_type: IdType,
    /// Explicitly declared tree-typed.
    pub tree: bool,
    /// True for generated custom-field pseudo-types.
    pub embedded: bool,
    pub relations: Vec<RelationDescriptor>,
    /// Name of the embedded `customFields` pseudo-type, when any custom field is declared.
    pub custom_fields_type: Option<String>,
    pub calculated: Vec<CalculatedPropertyDescriptor>,
    pub translation: Option<TranslationSpec>,
    /// Relations needed for channel price and tax, when the type is priced.
    pub pricing_relations: Option<Vec<RelationPath>>,
}

impl EntityMetadata {
    pub fn relation(&self, property: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|r| r.property == property)
    }

    pub fn calculated_property(&self, name: &str) -> Option<&CalculatedPropertyDescriptor> {
        self.calculated.iter().find(|c| c.name == name)
    }

    pub fn is_translatable(&self) -> bool {
        self.translation.is_some()
    }

    pub fn is_priced(&self) -> bool {
        self.pricing_relations.is_some()
    }
}

/// Immutable lookup of every entity type's relations. Built once at startup.
#[derive(Clone, Debug, Default)]
pub struct MetadataRegistry {
    entities: HashMap<String, EntityMetadata>,
}

impl MetadataRegistry {
    pub(crate) fn from_entities(entities: Vec<EntityMetadata>) -> Self {
        MetadataRegistry {
            entities: entities.into_iter().map(|e| (e.name.clone(), e)).collect(),
        }
    }

    pub fn get(&self, entity_type: &str) -> Option<&EntityMetadata> {
        self.entities.get(entity_type)
    }

    pub fn require(&self, entity_type: &str) -> Result<&EntityMetadata, ConfigError> {
        self.get(entity_type)
            .ok_or_else(|| ConfigError::UnknownEntity(entity_type.to_string()))
    }

    pub fn relations_for(&self, entity_type: &str) -> &[RelationDescriptor] {
        self.get(entity_type)
            .map(|m| m.relations.as_slice())
            .unwrap_or(&[])
    }

    pub fn find_relation(&self, entity_type: &str, property: &str) -> Option<&RelationDescriptor> {
        self.get(entity_type).and_then(|m| m.relation(property))
    }

    pub fn custom_fields_type(&self, entity_type: &str) -> Option<&EntityMetadata> {
        self.get(entity_type)
            .and_then(|m| m.custom_fields_type.as_deref())
            .and_then(|name| self.get(name))
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Resolve every segment of `path` from `entity_type`, returning the relation chain.
    /// A trailing bare `customFields` segment resolves to the chain before it.
    pub fn resolve_path(
        &self,
        entity_type: &str,
        path: &RelationPath,
    ) -> Result<Vec<&RelationDescriptor>, ConfigError> {
        let unknown = || ConfigError::UnknownRelation {
            entity: entity_type.to_string(),
            path: path.to_string(),
        };
        let mut current = self.require(entity_type)?;
        let mut chain = Vec::new();
        let mut segments = path.segments().iter();
        while let Some(segment) = segments.next() {
            let relation = if segment.as_str() == CUSTOM_FIELDS {
                match segments.next() {
                    Some(name) => current
                        .relation(&format!("{}.{}", CUSTOM_FIELDS, name))
                        .ok_or_else(unknown)?,
                    None if current.custom_fields_type.is_some() => break,
                    None => return Err(unknown()),
                }
            } else {
                current.relation(segment).ok_or_else(unknown)?
            };
            chain.push(relation);
            current = self.get(&relation.target).ok_or_else(unknown)?;
        }
        Ok(chain)
    }

    /// Target type reached by `path`, or `None` if any segment is unknown.
    pub fn target_type<'a>(&'a self, entity_type: &'a str, path: &RelationPath) -> Option<&'a str> {
        let chain = self.resolve_path(entity_type, path).ok()?;
        Some(chain.last().map(|r| r.target.as_str()).unwrap_or(entity_type))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{resolve, EntityConfig, SchemaConfig};
    use crate::path::RelationPath;

    #[test]
    fn resolves_flattened_custom_field_relations() {
        let config = SchemaConfig::default()
            .with(EntityConfig::new("Asset"))
            .with(EntityConfig::new("Product").custom_field_relation("hero", "Asset", false));
        let registry = resolve(&config).unwrap();

        let chain = registry
            .resolve_path("Product", &RelationPath::parse("customFields.hero"))
            .unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].target, "Asset");
        assert!(chain[0].custom_field);

        let bare = registry
            .resolve_path("Product", &RelationPath::parse("customFields"))
            .unwrap();
        assert!(bare.is_empty());
        assert_eq!(
            registry.target_type("Product", &RelationPath::parse("customFields.hero")),
            Some("Asset")
        );
        // an empty chain reaches the root type itself
        let root = String::from("Product");
        assert_eq!(registry.target_type(&root, &RelationPath::parse("customFields")), Some("Product"));
    }

    #[test]
    fn unknown_segments_are_configuration_errors() {
        let config = SchemaConfig::default()
            .with(EntityConfig::new("Asset"))
            .with(EntityConfig::new("Product").relation("featuredAsset", "Asset"));
        let registry = resolve(&config).unwrap();
        let err = registry
            .resolve_path("Product", &RelationPath::parse("featuredAsset.owner"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown relation path 'featuredAsset.owner' on Product"
        );
    }
}
