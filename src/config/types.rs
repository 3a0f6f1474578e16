//! Raw schema config types matching the JSON schema definition.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    #[default]
    Int,
    Uuid,
    Text,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationConfig {
    pub name: String,
    pub target: String,
    #[serde(default)]
    pub many: bool,
    #[serde(default)]
    pub eager: bool,
    #[serde(default)]
    pub tree_parent: bool,
    #[serde(default)]
    pub tree_children: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomFieldRelationConfig {
    pub target: String,
    #[serde(default)]
    pub many: bool,
    #[serde(default)]
    pub eager: bool,
}

/// A custom field. Scalar custom fields have no `relation` and load with the base row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomFieldConfig {
    pub name: String,
    #[serde(default)]
    pub relation: Option<CustomFieldRelationConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalculatedPropertyConfig {
    pub name: String,
    /// Relation paths, relative to the owning entity, the value is derived from.
    #[serde(default)]
    pub relations: Vec<String>,
}

fn default_translation_relation() -> String {
    "translations".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_translation_relation")]
    pub relation: String,
    pub fields: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Relations a channel price and tax computation cannot proceed without.
    pub relations: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    #[serde(default)]
    pub tree: bool,
    #[serde(default)]
    pub id_type: IdType,
    #[serde(default)]
    pub relations: Vec<RelationConfig>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldConfig>,
    #[serde(default)]
    pub calculated: Vec<CalculatedPropertyConfig>,
    #[serde(default)]
    pub translation: Option<TranslationConfig>,
    #[serde(default)]
    pub pricing: Option<PricingConfig>,
}

impl EntityConfig {
    pub fn new(name: impl Into<String>) -> Self {
        EntityConfig {
            name: name.into(),
            tree: false,
            id_type: IdType::Int,
            relations: Vec::new(),
            custom_fields: Vec::new(),
            calculated: Vec::new(),
            translation: None,
            pricing: None,
        }
    }

    pub fn relation(mut self, name: &str, target: &str) -> Self {
        self.relations.push(RelationConfig {
            name: name.into(),
            target: target.into(),
            many: false,
            eager: false,
            tree_parent: false,
            tree_children: false,
        });
        self
    }

    pub fn many(mut self, name: &str, target: &str) -> Self {
        self = self.relation(name, target);
        if let Some(r) = self.relations.last_mut() {
            r.many = true;
        }
        self
    }

    /// Marks the most recently added relation as eager.
    pub fn eager(mut self) -> Self {
        if let Some(r) = self.relations.last_mut() {
            r.eager = true;
        }
        self
    }

    pub fn tree_parent(mut self) -> Self {
        if let Some(r) = self.relations.last_mut() {
            r.tree_parent = true;
        }
        self
    }

    pub fn tree_children(mut self) -> Self {
        if let Some(r) = self.relations.last_mut() {
            r.tree_children = true;
        }
        self
    }

    pub fn tree(mut self) -> Self {
        self.tree = true;
        self
    }

    pub fn custom_field_relation(mut self, name: &str, target: &str, many: bool) -> Self {
        self.custom_fields.push(CustomFieldConfig {
            name: name.into(),
            relation: Some(CustomFieldRelationConfig {
                target: target.into(),
                many,
                eager: false,
            }),
        });
        self
    }

    pub fn custom_field(mut self, name: &str) -> Self {
        self.custom_fields.push(CustomFieldConfig {
            name: name.into(),
            relation: None,
        });
        self
    }

    pub fn calculated(mut self, name: &str, relations: &[&str]) -> Self {
        self.calculated.push(CalculatedPropertyConfig {
            name: name.into(),
            relations: relations.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Declares a `translations` to-many relation to `target` and the fields it carries.
    pub fn translatable(mut self, target: &str, fields: &[&str]) -> Self {
        self = self.many("translations", target).eager();
        self.translation = Some(TranslationConfig {
            relation: default_translation_relation(),
            fields: fields.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn priced(mut self, relations: &[&str]) -> Self {
        self.pricing = Some(PricingConfig {
            relations: relations.iter().map(|s| s.to_string()).collect(),
        });
        self
    }
}

/// All schema config in one struct for in-memory loading.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub entities: Vec<EntityConfig>,
}

impl SchemaConfig {
    pub fn with(mut self, entity: EntityConfig) -> Self {
        self.entities.push(entity);
        self
    }
}
