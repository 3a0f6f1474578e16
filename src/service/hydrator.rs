//! Loads missing relations onto an already-fetched entity, in place.
//!
//! Only the relations not yet present are fetched, in a single select plan. The fetched
//! copy is merged into the caller's instance under the requested top-level properties;
//! data already on the instance is kept.

use crate::config::{MetadataRegistry, CUSTOM_FIELDS};
use crate::context::RequestContext;
use crate::entity::{Entity, Related};
use crate::error::EngineError;
use crate::path::RelationPath;
use crate::price::PriceApplicator;
use crate::query::{SelectQueryBuilder, TreeJoinPlanner};
use crate::service::translation::TranslationResolver;
use crate::settings::EngineSettings;
use crate::store::EntityStore;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct HydrateOptions {
    pub relations: Vec<RelationPath>,
    /// Also load pricing relations of priced entities and apply channel prices.
    pub apply_product_variant_prices: bool,
}

impl HydrateOptions {
    pub fn relations<I, S>(relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        HydrateOptions {
            relations: crate::path::paths(relations),
            apply_product_variant_prices: false,
        }
    }

    pub fn with_prices(mut self) -> Self {
        self.apply_product_variant_prices = true;
        self
    }
}

/// Steps from a root to one entity: relation property and index within it.
type Address = Vec<(String, usize)>;

pub struct EntityHydrator {
    registry: Arc<MetadataRegistry>,
    store: Arc<dyn EntityStore>,
    prices: Arc<dyn PriceApplicator>,
    translations: TranslationResolver,
    max_eager_depth: usize,
}

impl EntityHydrator {
    pub fn new(
        registry: Arc<MetadataRegistry>,
        store: Arc<dyn EntityStore>,
        prices: Arc<dyn PriceApplicator>,
    ) -> Self {
        EntityHydrator {
            translations: TranslationResolver::new(registry.clone()),
            registry,
            store,
            prices,
            max_eager_depth: crate::settings::DEFAULT_MAX_EAGER_DEPTH,
        }
    }

    pub fn with_settings(mut self, settings: &EngineSettings) -> Self {
        self.max_eager_depth = settings.max_eager_depth;
        self
    }

    /// Ensure every path in `options.relations` is loaded on `target`. Issues at most one
    /// store query, and none when everything is already present. Merging, pricing and
    /// translation run on a staged copy; on error `target` is left untouched.
    pub async fn hydrate(
        &self,
        ctx: &RequestContext,
        target: &mut Entity,
        options: &HydrateOptions,
    ) -> Result<(), EngineError> {
        let metadata = self.registry.require(&target.entity_type)?;
        for path in &options.relations {
            self.registry.resolve_path(&target.entity_type, path)?;
        }

        let mut missing = get_missing_relations(target, &options.relations);
        if options.apply_product_variant_prices {
            missing = self.with_pricing_relations(target, missing);
        }
        if missing.is_empty() {
            tracing::debug!(entity = %target.entity_type, id = %target.id, "relations already loaded");
            return Ok(());
        }

        let mut qb = SelectQueryBuilder::for_entity(&target.entity_type);
        let joined = TreeJoinPlanner::new(&self.registry).join_tree_relations(
            &mut qb,
            &target.entity_type,
            &missing,
            self.max_eager_depth,
        )?;
        let remaining: Vec<RelationPath> = missing
            .iter()
            .filter(|p| !joined.contains_key(*p))
            .cloned()
            .collect();
        qb.where_id(target.id.clone()).with_relations(remaining);
        let query = qb.build();
        tracing::debug!(entity = %target.entity_type, id = %target.id, query = ?query, "hydrating");

        let hydrated = self
            .store
            .find_one(&query)
            .await?
            .ok_or_else(|| EngineError::Consistency {
                entity_type: target.entity_type.clone(),
                id: target.id.to_string(),
            })?;
        let mut staged = target.clone();
        self.merge_requested(&mut staged, hydrated, &missing);

        if options.apply_product_variant_prices {
            if metadata.is_priced() {
                self.prices.apply_channel_price_and_tax(&mut staged, ctx).await?;
            }
            for address in self.priced_addresses(&staged, &missing) {
                if let Some(entity) = entity_at_mut(&mut staged, &address) {
                    self.prices.apply_channel_price_and_tax(entity, ctx).await?;
                }
            }
        }
        self.translations.translate_deep(&mut staged, ctx, &missing)?;
        *target = staged;
        Ok(())
    }

    /// Add pricing relations under every missing path that reaches a priced type, and the
    /// target's own pricing relations when the target is priced.
    fn with_pricing_relations(&self, target: &Entity, missing: Vec<RelationPath>) -> Vec<RelationPath> {
        let mut out: BTreeSet<RelationPath> = missing.iter().cloned().collect();
        for path in &missing {
            let Some(pricing) = self
                .registry
                .target_type(&target.entity_type, path)
                .and_then(|t| self.registry.get(t))
                .and_then(|m| m.pricing_relations.as_ref())
            else {
                continue;
            };
            for relation in pricing {
                out.extend(path.join(relation).prefixes());
            }
        }
        if let Some(own) = self
            .registry
            .get(&target.entity_type)
            .and_then(|m| m.pricing_relations.as_ref())
        {
            out.extend(get_missing_relations(target, own));
        }
        out.into_iter().collect()
    }

    /// Copy the fetched relations onto `target`, one requested top-level property at a time.
    fn merge_requested(&self, target: &mut Entity, mut hydrated: Entity, missing: &[RelationPath]) {
        let properties: BTreeSet<String> = missing
            .iter()
            .filter_map(|p| p.properties().into_iter().next())
            .collect();
        for property in properties {
            if self.registry.find_relation(&target.entity_type, &property).is_none() {
                continue;
            }
            let Some(incoming) = hydrated.relations.remove(&property) else {
                continue;
            };
            match target.relations.remove(&property) {
                Some(existing) => {
                    let merged = self.merge_related(existing, incoming);
                    target.relations.insert(property, merged);
                }
                None => {
                    target.relations.insert(property, incoming);
                }
            }
        }
    }

    fn merge_related(&self, existing: Related, incoming: Related) -> Related {
        match (existing, incoming) {
            (Related::One(Some(mut current)), Related::One(Some(fresh))) => {
                if current.id == fresh.id {
                    self.merge_entity(&mut current, *fresh);
                    Related::One(Some(current))
                } else {
                    Related::One(Some(fresh))
                }
            }
            (Related::One(Some(current)), Related::One(None)) => Related::One(Some(current)),
            (Related::Many(mut current), Related::Many(fresh)) => {
                for item in fresh {
                    match current.iter_mut().find(|e| e.id == item.id) {
                        Some(existing) => self.merge_entity(existing, item),
                        None => current.push(item),
                    }
                }
                Related::Many(current)
            }
            (_, incoming) => incoming,
        }
    }

    /// Fill in what `existing` lacks from `incoming`. Existing fields win; relations known to
    /// the type are merged recursively.
    fn merge_entity(&self, existing: &mut Entity, incoming: Entity) {
        for (name, value) in incoming.fields {
            existing.fields.entry(name).or_insert(value);
        }
        for (property, related) in incoming.relations {
            if self.registry.find_relation(&existing.entity_type, &property).is_none() {
                continue;
            }
            let merged = match existing.relations.remove(&property) {
                Some(current) => self.merge_related(current, related),
                None => related,
            };
            existing.relations.insert(property, merged);
        }
    }

    /// Every entity at a missing path whose type is priced.
    fn priced_addresses(&self, target: &Entity, missing: &[RelationPath]) -> BTreeSet<Address> {
        let mut out = BTreeSet::new();
        for path in missing {
            let priced = self
                .registry
                .target_type(&target.entity_type, path)
                .and_then(|t| self.registry.get(t))
                .map(|m| m.is_priced())
                .unwrap_or(false);
            if priced {
                collect_addresses(target, &path.properties(), Vec::new(), &mut out);
            }
        }
        out
    }
}

/// Paths (with all their prefixes) that are not yet loaded on `target`. A loaded null or
/// empty relation counts as present; every element of a to-many relation must carry the
/// rest of the path. A path ending in `customFields` needs nothing.
pub fn get_missing_relations(target: &Entity, paths: &[RelationPath]) -> Vec<RelationPath> {
    let mut missing = BTreeSet::new();
    for path in paths {
        if !loaded_along(target, &path.properties()) {
            missing.extend(path.prefixes().into_iter().filter(|p| p.last() != Some(CUSTOM_FIELDS)));
        }
    }
    missing.into_iter().collect()
}

fn loaded_along(entity: &Entity, properties: &[String]) -> bool {
    let Some((first, rest)) = properties.split_first() else {
        return true;
    };
    if first == CUSTOM_FIELDS {
        return true;
    }
    match entity.related(first) {
        Some(related) => related.entities().into_iter().all(|child| loaded_along(child, rest)),
        None => false,
    }
}

fn collect_addresses(entity: &Entity, properties: &[String], prefix: Address, out: &mut BTreeSet<Address>) {
    let Some((first, rest)) = properties.split_first() else {
        out.insert(prefix);
        return;
    };
    if let Some(related) = entity.related(first) {
        for (i, child) in related.entities().into_iter().enumerate() {
            let mut next = prefix.clone();
            next.push((first.clone(), i));
            collect_addresses(child, rest, next, out);
        }
    }
}

fn entity_at_mut<'e>(root: &'e mut Entity, address: &[(String, usize)]) -> Option<&'e mut Entity> {
    let mut current = root;
    for (property, index) in address {
        current = match current.related_mut(property)? {
            Related::One(e) => e.as_deref_mut()?,
            Related::Many(items) => items.get_mut(*index)?,
        };
    }
    Some(current)
}
