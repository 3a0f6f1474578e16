//! Reconciles a desired set of per-language translations against the persisted ones.

use crate::config::MetadataRegistry;
use crate::entity::{Entity, Related, Translation, LANGUAGE_CODE};
use crate::error::{ConfigError, EngineError};
use crate::store::TranslationRepository;

/// Translations to persist. Nothing is ever scheduled for deletion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TranslationDiff {
    /// Entries matching a persisted language, carrying its id and base reference.
    pub to_update: Vec<Translation>,
    /// Entries for new languages, without identity.
    pub to_add: Vec<Translation>,
}

impl TranslationDiff {
    pub fn is_empty(&self) -> bool {
        self.to_update.is_empty() && self.to_add.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct TranslationDiffer {
    translation_type: String,
    relation: String,
}

impl TranslationDiffer {
    pub fn new(translation_type: &str, relation: &str) -> Self {
        TranslationDiffer {
            translation_type: translation_type.to_string(),
            relation: relation.to_string(),
        }
    }

    /// Differ for the translation relation declared on `entity_type`.
    pub fn for_entity(registry: &MetadataRegistry, entity_type: &str) -> Result<Self, ConfigError> {
        let metadata = registry.require(entity_type)?;
        let spec = metadata
            .translation
            .as_ref()
            .ok_or_else(|| ConfigError::Validation(format!("{} is not translatable", entity_type)))?;
        let relation = metadata.relation(&spec.relation).ok_or_else(|| ConfigError::UnknownRelation {
            entity: entity_type.to_string(),
            path: spec.relation.clone(),
        })?;
        Ok(Self::new(&relation.target, &spec.relation))
    }

    pub fn translation_type(&self) -> &str {
        &self.translation_type
    }

    pub fn diff(&self, existing: &[Translation], desired: &[Translation]) -> TranslationDiff {
        let mut diff = TranslationDiff::default();
        let mut seen: Vec<&str> = Vec::new();
        for entry in desired {
            if seen.contains(&entry.language_code.as_str()) {
                continue;
            }
            seen.push(&entry.language_code);
            match existing.iter().find(|t| t.language_code == entry.language_code) {
                Some(current) => {
                    let mut fields = current.fields.clone();
                    fields.extend(entry.fields.clone());
                    diff.to_update.push(Translation {
                        id: current.id.clone(),
                        language_code: entry.language_code.clone(),
                        base_id: current.base_id.clone(),
                        fields,
                    });
                }
                None => diff.to_add.push(Translation {
                    id: None,
                    base_id: None,
                    ..entry.clone()
                }),
            }
        }
        diff
    }

    /// Persisted translations currently loaded on `entity`.
    pub fn existing(&self, entity: &Entity) -> Vec<Translation> {
        entity
            .many(&self.relation)
            .map(|rows| rows.iter().filter_map(Translation::from_entity).collect())
            .unwrap_or_default()
    }

    /// Persist `diff` and reflect it in `entity`'s translation list when that list is loaded.
    /// Updated entries replace the loaded row with the same language; added entries are
    /// stamped with the base id and appended. An unloaded list stays unloaded.
    pub async fn apply_diff(
        &self,
        repo: &dyn TranslationRepository,
        entity: &mut Entity,
        diff: TranslationDiff,
    ) -> Result<(), EngineError> {
        for translation in diff.to_update {
            let saved = repo
                .save_translation(&self.translation_type, translation)
                .await?;
            self.put_row(entity, saved, true)?;
        }
        for mut translation in diff.to_add {
            translation.base_id = Some(entity.id.clone());
            let language = translation.language_code.clone();
            let saved = repo
                .save_translation(&self.translation_type, translation)
                .await
                .map_err(|e| {
                    tracing::warn!(entity = %entity.entity_type, id = %entity.id, language = %language, error = %e, "adding translation failed");
                    EngineError::Internal(e.to_string())
                })?;
            self.put_row(entity, saved, false)?;
        }
        Ok(())
    }

    fn put_row(&self, entity: &mut Entity, saved: Translation, replace: bool) -> Result<(), EngineError> {
        let row = saved.to_entity(&self.translation_type).ok_or_else(|| {
            EngineError::Internal(format!(
                "saved {} '{}' has no id",
                self.translation_type, saved.language_code
            ))
        })?;
        let Some(related) = entity.relations.get_mut(&self.relation) else {
            return Ok(());
        };
        let Related::Many(rows) = related else {
            return Err(EngineError::Internal(format!(
                "{}.{} is not a list",
                entity.entity_type, self.relation
            )));
        };
        let position = if replace {
            rows.iter()
                .position(|r| r.str_field(LANGUAGE_CODE) == Some(saved.language_code.as_str()))
        } else {
            None
        };
        match position {
            Some(i) => rows[i] = row,
            None => rows.push(row),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use crate::error::StoreError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn persisted(id: i64, code: &str, name: &str) -> Translation {
        Translation {
            id: Some(EntityId::Int(id)),
            language_code: code.into(),
            base_id: Some(EntityId::Int(1)),
            fields: Translation::new(code).with_field("name", name).fields,
        }
    }

    #[test]
    fn existing_languages_update_and_new_ones_add() {
        let differ = TranslationDiffer::new("ProductTranslation", "translations");
        let desired = vec![
            Translation::new("en").with_field("name", "Laptop"),
            Translation::new("de").with_field("name", "Laptop DE"),
        ];
        let diff = differ.diff(&[persisted(10, "en", "Old")], &desired);
        assert_eq!(diff.to_update.len(), 1);
        assert_eq!(diff.to_update[0].id, Some(EntityId::Int(10)));
        assert_eq!(diff.to_update[0].base_id, Some(EntityId::Int(1)));
        assert_eq!(diff.to_update[0].fields["name"], "Laptop");
        assert_eq!(diff.to_add.len(), 1);
        assert_eq!(diff.to_add[0].language_code, "de");
        assert!(diff.to_add[0].id.is_none() && diff.to_add[0].base_id.is_none());
    }

    #[test]
    fn duplicate_desired_languages_are_skipped() {
        let differ = TranslationDiffer::new("ProductTranslation", "translations");
        let desired = vec![Translation::new("fr"), Translation::new("fr").with_field("name", "bis")];
        let diff = differ.diff(&[], &desired);
        assert_eq!(diff.to_add.len(), 1);
        assert!(diff.to_add[0].fields.is_empty());
    }

    #[derive(Default)]
    struct FlakyRepo {
        saved: Mutex<Vec<Translation>>,
        fail_adds: bool,
    }

    #[async_trait]
    impl TranslationRepository for FlakyRepo {
        async fn save_translation(&self, _entity_type: &str, mut t: Translation) -> Result<Translation, StoreError> {
            if t.id.is_none() {
                if self.fail_adds {
                    return Err(StoreError::Backend("insert rejected".into()));
                }
                t.id = Some(EntityId::Int(99));
            }
            self.saved.lock().unwrap().push(t.clone());
            Ok(t)
        }
    }

    #[tokio::test]
    async fn apply_replaces_and_appends() {
        let differ = TranslationDiffer::new("ProductTranslation", "translations");
        let mut product = Entity::new("Product", 1).with_many(
            "translations",
            vec![persisted(10, "en", "Old").to_entity("ProductTranslation").unwrap()],
        );
        let existing = differ.existing(&product);
        let diff = differ.diff(
            &existing,
            &[Translation::new("en").with_field("name", "New"), Translation::new("de").with_field("name", "Neu")],
        );
        let repo = FlakyRepo::default();
        differ.apply_diff(&repo, &mut product, diff).await.unwrap();

        let rows = product.many("translations").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].str_field("name"), Some("New"));
        assert_eq!(rows[1].id, EntityId::Int(99));
        assert_eq!(repo.saved.lock().unwrap()[1].base_id, Some(EntityId::Int(1)));
    }

    #[tokio::test]
    async fn unloaded_translation_list_stays_unloaded() {
        let differ = TranslationDiffer::new("ProductTranslation", "translations");
        let mut product = Entity::new("Product", 1);
        let diff = differ.diff(&[], &[Translation::new("fr").with_field("name", "Portable")]);
        let repo = FlakyRepo::default();
        differ.apply_diff(&repo, &mut product, diff).await.unwrap();
        assert!(!product.is_loaded("translations"));
        assert_eq!(repo.saved.lock().unwrap().len(), 1);
    }

    struct IdlessRepo;

    #[async_trait]
    impl TranslationRepository for IdlessRepo {
        async fn save_translation(&self, _entity_type: &str, t: Translation) -> Result<Translation, StoreError> {
            Ok(t)
        }
    }

    #[tokio::test]
    async fn saved_rows_without_id_are_rejected() {
        let differ = TranslationDiffer::new("ProductTranslation", "translations");
        let mut product = Entity::new("Product", 1).with_many("translations", vec![]);
        let diff = differ.diff(&[], &[Translation::new("fr")]);
        let err = differ.apply_diff(&IdlessRepo, &mut product, diff).await.unwrap_err();
        assert_eq!(err.to_string(), "internal: saved ProductTranslation 'fr' has no id");
        assert!(product.many("translations").unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_failures_become_internal_errors() {
        let differ = TranslationDiffer::new("ProductTranslation", "translations");
        let mut product = Entity::new("Product", 1);
        let diff = differ.diff(&[], &[Translation::new("de")]);
        let repo = FlakyRepo {
            fail_adds: true,
            ..Default::default()
        };
        let err = differ.apply_diff(&repo, &mut product, diff).await.unwrap_err();
        assert_eq!(err.to_string(), "internal: store backend: insert rejected");
    }
}
