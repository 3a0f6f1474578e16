//! In-memory entity graph: scalar fields plus the relations loaded so far.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Primary key value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Uuid(uuid::Uuid),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(n) => write!(f, "{}", n),
            EntityId::Uuid(u) => write!(f, "{}", u),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Int(n)
    }
}

impl From<i32> for EntityId {
    fn from(n: i32) -> Self {
        EntityId::Int(n.into())
    }
}

impl From<uuid::Uuid> for EntityId {
    fn from(u: uuid::Uuid) -> Self {
        EntityId::Uuid(u)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

/// A loaded relation value. An absent key on [`Entity::relations`] means "not loaded".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Related {
    Many(Vec<Entity>),
    One(Option<Box<Entity>>),
}

impl Related {
    pub fn one(entity: Entity) -> Self {
        Related::One(Some(Box::new(entity)))
    }

    pub fn entities(&self) -> Vec<&Entity> {
        match self {
            Related::One(Some(e)) => vec![e.as_ref()],
            Related::One(None) => Vec::new(),
            Related::Many(items) => items.iter().collect(),
        }
    }

    pub fn entities_mut(&mut self) -> Vec<&mut Entity> {
        match self {
            Related::One(Some(e)) => vec![e.as_mut()],
            Related::One(None) => Vec::new(),
            Related::Many(items) => items.iter_mut().collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: EntityId,
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// Keyed by relation property path (custom-field relations as `customFields.<name>`).
    #[serde(default)]
    pub relations: BTreeMap<String, Related>,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, id: impl Into<EntityId>) -> Self {
        Entity {
            entity_type: entity_type.into(),
            id: id.into(),
            fields: Map::new(),
            relations: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_one(mut self, property: &str, entity: Option<Entity>) -> Self {
        self.relations
            .insert(property.to_string(), Related::One(entity.map(Box::new)));
        self
    }

    pub fn with_many(mut self, property: &str, entities: Vec<Entity>) -> Self {
        self.relations
            .insert(property.to_string(), Related::Many(entities));
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn is_loaded(&self, property: &str) -> bool {
        self.relations.contains_key(property)
    }

    pub fn related(&self, property: &str) -> Option<&Related> {
        self.relations.get(property)
    }

    pub fn related_mut(&mut self, property: &str) -> Option<&mut Related> {
        self.relations.get_mut(property)
    }

    /// The loaded to-one entity at `property`, if loaded and non-null.
    pub fn one(&self, property: &str) -> Option<&Entity> {
        match self.relations.get(property) {
            Some(Related::One(e)) => e.as_deref(),
            _ => None,
        }
    }

    /// The loaded to-many entities at `property`, if loaded.
    pub fn many(&self, property: &str) -> Option<&[Entity]> {
        match self.relations.get(property) {
            Some(Related::Many(items)) => Some(items.as_slice()),
            _ => None,
        }
    }
}

/// Field on a translation row naming its language.
pub const LANGUAGE_CODE: &str = "languageCode";
/// Field on a translation row pointing back at the base entity.
pub const BASE_ID: &str = "baseId";

/// A per-language record of translatable fields. `id` and `base_id` are the record's
/// identity; a fresh record has neither until it is persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub id: Option<EntityId>,
    pub language_code: String,
    pub base_id: Option<EntityId>,
    pub fields: Map<String, Value>,
}

impl Translation {
    pub fn new(language_code: &str) -> Self {
        Translation {
            id: None,
            language_code: language_code.to_string(),
            base_id: None,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Read a loaded translation row. `None` when the row has no language code.
    pub fn from_entity(entity: &Entity) -> Option<Self> {
        let language_code = entity.str_field(LANGUAGE_CODE)?.to_string();
        let base_id = entity
            .field(BASE_ID)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok());
        let fields = entity
            .fields
            .iter()
            .filter(|(k, _)| k.as_str() != LANGUAGE_CODE && k.as_str() != BASE_ID)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Some(Translation {
            id: Some(entity.id.clone()),
            language_code,
            base_id,
            fields,
        })
    }

    /// Row form of a persisted translation. `None` while it has no id.
    pub fn to_entity(&self, entity_type: &str) -> Option<Entity> {
        let id = self.id.clone()?;
        let mut entity = Entity::new(entity_type, id);
        entity.fields = self.fields.clone();
        entity
            .fields
            .insert(LANGUAGE_CODE.to_string(), Value::String(self.language_code.clone()));
        if let Some(base_id) = &self.base_id {
            entity
                .fields
                .insert(BASE_ID.to_string(), serde_json::to_value(base_id).unwrap_or(Value::Null));
        }
        Some(entity)
    }
}
