//! Load schema config from JSON and resolve it into the metadata registry.

use crate::config::resolved::{
    CalculatedPropertyDescriptor, Cardinality, EntityMetadata, MetadataRegistry,
    RelationDescriptor, TranslationSpec, CUSTOM_FIELDS,
};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use crate::path::RelationPath;
use std::path::Path;

/// Build the registry from schema config (validates first).
pub fn resolve(config: &SchemaConfig) -> Result<MetadataRegistry, ConfigError> {
    validate(config)?;

    let mut entities = Vec::with_capacity(config.entities.len());
    for e in &config.entities {
        let mut relations: Vec<RelationDescriptor> = e
            .relations
            .iter()
            .map(|r| RelationDescriptor {
                property: r.name.clone(),
                target: r.target.clone(),
                cardinality: cardinality(r.many),
                eager: r.eager,
                tree_parent: r.tree_parent,
                tree_children: r.tree_children,
                custom_field: false,
            })
            .collect();

        let custom_fields_type = if e.custom_fields.is_empty() {
            None
        } else {
            let embedded_name = format!("{}CustomFields", e.name);
            if config.entities.iter().any(|other| other.name == embedded_name) {
                return Err(ConfigError::DuplicateEntity(embedded_name));
            }
            let embedded_relations: Vec<RelationDescriptor> = e
                .custom_fields
                .iter()
                .filter_map(|cf| cf.relation.as_ref().map(|rel| (cf, rel)))
                .map(|(cf, rel)| RelationDescriptor {
                    property: cf.name.clone(),
                    target: rel.target.clone(),
                    cardinality: cardinality(rel.many),
                    eager: rel.eager,
                    tree_parent: false,
                    tree_children: false,
                    custom_field: true,
                })
                .collect();
            relations.extend(embedded_relations.iter().map(|r| RelationDescriptor {
                property: format!("{}.{}", CUSTOM_FIELDS, r.property),
                ..r.clone()
            }));
            entities.push(EntityMetadata {
                name: embedded_name.clone(),
                id_type: e.id_type.clone(),
                tree: false,
                embedded: true,
                relations: embedded_relations,
                custom_fields_type: None,
                calculated: Vec::new(),
                translation: None,
                pricing_relations: None,
            });
            Some(embedded_name)
        };

        entities.push(EntityMetadata {
            name: e.name.clone(),
            id_type: e.id_type.clone(),
            tree: e.tree,
            embedded: false,
            relations,
            custom_fields_type,
            calculated: e
                .calculated
                .iter()
                .map(|c| CalculatedPropertyDescriptor {
                    name: c.name.clone(),
                    relations: c.relations.iter().map(|p| RelationPath::parse(p)).collect(),
                })
                .collect(),
            translation: e.translation.as_ref().map(|t| TranslationSpec {
                relation: t.relation.clone(),
                fields: t.fields.clone(),
            }),
            pricing_relations: e
                .pricing
                .as_ref()
                .map(|p| p.relations.iter().map(|r| RelationPath::parse(r)).collect()),
        });
    }

    let registry = MetadataRegistry::from_entities(entities);
    check_dependency_paths(&registry, config)?;
    tracing::debug!(entities = config.entities.len(), "metadata registry resolved");
    Ok(registry)
}

/// Calculated-property and pricing paths must resolve against the finished graph.
fn check_dependency_paths(registry: &MetadataRegistry, config: &SchemaConfig) -> Result<(), ConfigError> {
    for e in &config.entities {
        let Some(meta) = registry.get(&e.name) else { continue };
        let calculated = meta.calculated.iter().flat_map(|c| c.relations.iter());
        let pricing = meta.pricing_relations.iter().flatten();
        for path in calculated.chain(pricing) {
            registry.resolve_path(&e.name, path)?;
        }
    }
    Ok(())
}

fn cardinality(many: bool) -> Cardinality {
    if many {
        Cardinality::Many
    } else {
        Cardinality::One
    }
}

/// Read a JSON schema definition from disk.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<SchemaConfig, ConfigError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading schema config");
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}
