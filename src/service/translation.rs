//! Copies per-language fields from a loaded translation list onto the base entity.

use crate::config::{MetadataRegistry, CUSTOM_FIELDS};
use crate::context::RequestContext;
use crate::entity::{Entity, Related, LANGUAGE_CODE};
use crate::error::EngineError;
use crate::path::RelationPath;
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct TranslationResolver {
    registry: Arc<MetadataRegistry>,
}

impl TranslationResolver {
    pub fn new(registry: Arc<MetadataRegistry>) -> Self {
        TranslationResolver { registry }
    }

    /// Translate one entity in place. Entities that are not translatable, or whose
    /// translation list is not loaded, are left untouched.
    pub fn translate(&self, entity: &mut Entity, ctx: &RequestContext) -> Result<(), EngineError> {
        let Some(spec) = self
            .registry
            .get(&entity.entity_type)
            .and_then(|m| m.translation.as_ref())
        else {
            return Ok(());
        };
        let Some(Related::Many(rows)) = entity.related(&spec.relation) else {
            return Ok(());
        };
        let Some(chosen) = pick_translation(rows, &ctx.language_chain()) else {
            return Err(EngineError::MissingTranslation {
                entity_type: entity.entity_type.clone(),
                id: entity.id.to_string(),
            });
        };

        let language = chosen.str_field(LANGUAGE_CODE).unwrap_or_default().to_string();
        let values: Vec<(String, Value)> = spec
            .fields
            .iter()
            .filter_map(|f| chosen.field(f).map(|v| (f.clone(), v.clone())))
            .collect();
        let custom = chosen
            .field(CUSTOM_FIELDS)
            .and_then(Value::as_object)
            .cloned();

        entity.fields.extend(values);
        entity
            .fields
            .insert(LANGUAGE_CODE.to_string(), Value::String(language));
        if let Some(custom) = custom {
            merge_custom_fields(&mut entity.fields, custom);
        }
        Ok(())
    }

    /// Translate `entity` and every entity reached along `paths`. Issues no queries; unloaded
    /// relations end the walk.
    pub fn translate_deep(
        &self,
        entity: &mut Entity,
        ctx: &RequestContext,
        paths: &[RelationPath],
    ) -> Result<(), EngineError> {
        self.translate(entity, ctx)?;
        for path in paths {
            self.translate_along(entity, ctx, &path.properties())?;
        }
        Ok(())
    }

    fn translate_along(
        &self,
        entity: &mut Entity,
        ctx: &RequestContext,
        properties: &[String],
    ) -> Result<(), EngineError> {
        let Some((first, rest)) = properties.split_first() else {
            return Ok(());
        };
        if let Some(related) = entity.related_mut(first) {
            for child in related.entities_mut() {
                self.translate(child, ctx)?;
                self.translate_along(child, ctx, rest)?;
            }
        }
        Ok(())
    }
}

/// First match along the language chain, else the lexicographically smallest language code.
pub fn pick_translation<'a>(rows: &'a [Entity], chain: &[&str]) -> Option<&'a Entity> {
    chain
        .iter()
        .find_map(|code| rows.iter().find(|t| t.str_field(LANGUAGE_CODE) == Some(*code)))
        .or_else(|| {
            rows.iter()
                .filter(|t| t.str_field(LANGUAGE_CODE).is_some())
                .min_by(|a, b| a.str_field(LANGUAGE_CODE).cmp(&b.str_field(LANGUAGE_CODE)))
        })
}

fn merge_custom_fields(fields: &mut Map<String, Value>, custom: Map<String, Value>) {
    let slot = fields
        .entry(CUSTOM_FIELDS.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(existing) = slot {
        existing.extend(custom);
    }
}
