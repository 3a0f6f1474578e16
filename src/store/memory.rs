//! In-process store backed by hash maps. Used by tests and the demo.
//!
//! Rows are keyed by (entity type, id) and hold scalar fields plus relation links. A select
//! plan materializes the root with its eager relations, applies explicit joins in plan
//! order, then loads the remaining relation paths. Entities reached through the relation
//! loader get their eager relations too; entities reached through explicit joins do not,
//! the planner joins those itself.

use crate::config::{IdType, MetadataRegistry, RelationDescriptor};
use crate::entity::{Entity, EntityId, Related, Translation, BASE_ID, LANGUAGE_CODE};
use crate::error::StoreError;
use crate::query::{JoinClause, SelectQuery};
use crate::store::{EntityStore, TranslationRepository};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone, Debug)]
enum Link {
    One(Option<EntityId>),
    Many(Vec<EntityId>),
}

#[derive(Clone, Debug, Default)]
struct Row {
    fields: Map<String, Value>,
    links: HashMap<String, Link>,
}

type RowKey = (String, EntityId);
type Rows = HashMap<RowKey, Row>;

pub struct MemoryStore {
    registry: Arc<MetadataRegistry>,
    rows: RwLock<Rows>,
    log: Mutex<Vec<SelectQuery>>,
    fail_next: Mutex<Option<StoreError>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryStore {
    pub fn new(registry: Arc<MetadataRegistry>) -> Self {
        MemoryStore {
            registry,
            rows: RwLock::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Rows> {
        self.rows.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Rows> {
        self.rows.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Store an entity graph. Every loaded relation becomes a link and every related
    /// entity a row of its own. Existing rows keep fields and links not mentioned here.
    pub fn insert(&self, entity: &Entity) {
        let mut rows = self.write();
        flatten(&mut rows, entity);
    }

    /// Stored scalar fields of one row, without relations.
    pub fn get(&self, entity_type: &str, id: &EntityId) -> Option<Entity> {
        row_entity(&self.read(), entity_type, id)
    }

    /// All rows of one type, ordered by id.
    pub fn all(&self, entity_type: &str) -> Vec<Entity> {
        let rows = self.read();
        let mut out: Vec<Entity> = rows
            .keys()
            .filter(|(t, _)| t == entity_type)
            .filter_map(|(t, id)| row_entity(&rows, t, id))
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Number of select plans executed so far.
    pub fn query_count(&self) -> usize {
        lock(&self.log).len()
    }

    pub fn queries(&self) -> Vec<SelectQuery> {
        lock(&self.log).clone()
    }

    pub fn last_query(&self) -> Option<SelectQuery> {
        lock(&self.log).last().cloned()
    }

    /// Make the next store call fail with `err`.
    pub fn fail_next(&self, err: StoreError) {
        *lock(&self.fail_next) = Some(err);
    }

    fn take_failure(&self) -> Result<(), StoreError> {
        match lock(&self.fail_next).take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Related rows behind `relation` on the stored owner, fields only. A relation with no
    /// stored link is loaded as null or empty.
    fn follow(&self, rows: &Rows, owner: &Entity, relation: &RelationDescriptor) -> Related {
        let link = rows
            .get(&(owner.entity_type.clone(), owner.id.clone()))
            .and_then(|row| row.links.get(&relation.property));
        match link {
            Some(Link::One(Some(id))) => {
                Related::One(row_entity(rows, &relation.target, id).map(Box::new))
            }
            Some(Link::Many(ids)) => Related::Many(
                ids.iter()
                    .filter_map(|id| row_entity(rows, &relation.target, id))
                    .collect(),
            ),
            Some(Link::One(None)) => Related::One(None),
            None if relation.is_many() => Related::Many(Vec::new()),
            None => Related::One(None),
        }
    }

    /// Load eager relations recursively. `visiting` holds the types on the current chain so
    /// self-referencing eager relations terminate.
    fn load_eager(&self, rows: &Rows, entity: &mut Entity, visiting: &mut Vec<String>) {
        if visiting.contains(&entity.entity_type) {
            return;
        }
        visiting.push(entity.entity_type.clone());
        for relation in self.registry.relations_for(&entity.entity_type) {
            if !relation.eager || entity.is_loaded(&relation.property) {
                continue;
            }
            let mut related = self.follow(rows, entity, relation);
            for child in related.entities_mut() {
                self.load_eager(rows, child, visiting);
            }
            entity.relations.insert(relation.property.clone(), related);
        }
        visiting.pop();
    }

    fn load_path(&self, rows: &Rows, entity: &mut Entity, properties: &[String]) {
        let Some((first, rest)) = properties.split_first() else {
            return;
        };
        if !entity.is_loaded(first) {
            let Some(relation) = self.registry.find_relation(&entity.entity_type, first) else {
                return;
            };
            let mut related = self.follow(rows, entity, relation);
            for child in related.entities_mut() {
                self.load_eager(rows, child, &mut Vec::new());
            }
            entity.relations.insert(first.clone(), related);
        }
        if let Some(related) = entity.related_mut(first) {
            for child in related.entities_mut() {
                self.load_path(rows, child, rest);
            }
        }
    }

    fn apply_join(&self, rows: &Rows, entity: &mut Entity, parents: &[String], join: &JoinClause) {
        match parents.split_first() {
            None => {
                if entity.is_loaded(&join.property) {
                    return;
                }
                if let Some(relation) = self.registry.find_relation(&entity.entity_type, &join.property) {
                    let related = self.follow(rows, entity, relation);
                    entity.relations.insert(join.property.clone(), related);
                }
            }
            Some((first, rest)) => {
                if let Some(related) = entity.related_mut(first) {
                    for child in related.entities_mut() {
                        self.apply_join(rows, child, rest, join);
                    }
                }
            }
        }
    }

    /// The type and relation that own translations of `translation_type`.
    fn translation_owner(&self, translation_type: &str) -> Option<(String, String)> {
        self.registry.entity_types().find_map(|name| {
            let metadata = self.registry.get(name)?;
            let spec = metadata.translation.as_ref()?;
            let relation = metadata.relation(&spec.relation)?;
            (relation.target == translation_type).then(|| (name.to_string(), spec.relation.clone()))
        })
    }

    fn next_id(&self, rows: &Rows, entity_type: &str) -> EntityId {
        match self.registry.get(entity_type).map(|m| &m.id_type) {
            Some(IdType::Uuid) => EntityId::Uuid(uuid::Uuid::new_v4()),
            Some(IdType::Text) => EntityId::Text(uuid::Uuid::new_v4().to_string()),
            _ => {
                let max = rows
                    .keys()
                    .filter(|(t, _)| t == entity_type)
                    .filter_map(|(_, id)| match id {
                        EntityId::Int(n) => Some(*n),
                        _ => None,
                    })
                    .max()
                    .unwrap_or(0);
                EntityId::Int(max + 1)
            }
        }
    }
}

fn row_entity(rows: &Rows, entity_type: &str, id: &EntityId) -> Option<Entity> {
    rows.get(&(entity_type.to_string(), id.clone())).map(|row| {
        let mut entity = Entity::new(entity_type, id.clone());
        entity.fields = row.fields.clone();
        entity
    })
}

fn flatten(rows: &mut Rows, entity: &Entity) {
    let row = rows
        .entry((entity.entity_type.clone(), entity.id.clone()))
        .or_default();
    row.fields
        .extend(entity.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    for (property, related) in &entity.relations {
        let link = match related {
            Related::One(e) => Link::One(e.as_ref().map(|e| e.id.clone())),
            Related::Many(items) => Link::Many(items.iter().map(|e| e.id.clone()).collect()),
        };
        row.links.insert(property.clone(), link);
    }
    for related in entity.relations.values() {
        for child in related.entities() {
            flatten(rows, child);
        }
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_one(&self, query: &SelectQuery) -> Result<Option<Entity>, StoreError> {
        lock(&self.log).push(query.clone());
        self.take_failure()?;
        let Some(id) = &query.id else {
            return Err(StoreError::Backend(format!(
                "select on {} has no primary key condition",
                query.entity_type
            )));
        };
        let rows = self.read();
        let Some(mut root) = row_entity(&rows, &query.entity_type, id) else {
            return Ok(None);
        };
        self.load_eager(&rows, &mut root, &mut Vec::new());
        for join in &query.joins {
            if let Some(path) = query.join_path(&join.parent_alias) {
                self.apply_join(&rows, &mut root, &path.properties(), join);
            }
        }
        for path in &query.relations {
            self.load_path(&rows, &mut root, &path.properties());
        }
        Ok(Some(root))
    }
}

#[async_trait]
impl TranslationRepository for MemoryStore {
    async fn save_translation(
        &self,
        entity_type: &str,
        mut translation: Translation,
    ) -> Result<Translation, StoreError> {
        self.take_failure()?;
        let mut rows = self.write();
        let base = translation
            .base_id
            .as_ref()
            .and_then(|b| serde_json::to_value(b).ok());
        let clash = rows.iter().any(|((t, id), row)| {
            t == entity_type
                && Some(id) != translation.id.as_ref()
                && row.fields.get(LANGUAGE_CODE).and_then(Value::as_str)
                    == Some(translation.language_code.as_str())
                && row.fields.get(BASE_ID) == base.as_ref()
        });
        if clash {
            return Err(StoreError::DuplicateKey(format!(
                "{} ({}, {})",
                entity_type,
                base.unwrap_or(Value::Null),
                translation.language_code
            )));
        }

        let is_new = translation.id.is_none();
        let id = match translation.id.clone() {
            Some(id) => id,
            None => self.next_id(&rows, entity_type),
        };
        translation.id = Some(id.clone());
        if let Some(row) = translation.to_entity(entity_type) {
            let stored = rows.entry((entity_type.to_string(), id.clone())).or_default();
            stored.fields = row.fields;
        }

        if let (true, Some(base_id)) = (is_new, &translation.base_id) {
            if let Some((owner, relation)) = self.translation_owner(entity_type) {
                if let Some(owner_row) = rows.get_mut(&(owner, base_id.clone())) {
                    match owner_row
                        .links
                        .entry(relation)
                        .or_insert_with(|| Link::Many(Vec::new()))
                    {
                        Link::Many(ids) => ids.push(id.clone()),
                        Link::One(slot) => *slot = Some(id.clone()),
                    }
                }
            }
        }
        tracing::debug!(entity = %entity_type, id = %id, language = %translation.language_code, "translation saved");
        Ok(translation)
    }
}
