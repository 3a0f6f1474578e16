//! Shared commerce fixture: the demo schema plus a small seeded catalogue.
#![allow(dead_code)]

use relgraph::{
    resolve, ChannelPriceApplicator, Entity, EntityHydrator, MemoryStore, MetadataRegistry,
    RelationPath, SchemaConfig,
};
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn registry() -> Arc<MetadataRegistry> {
    let config: SchemaConfig =
        serde_json::from_str(include_str!("../../demos/commerce_schema.json")).unwrap();
    Arc::new(resolve(&config).unwrap())
}

fn translation(entity_type: &str, id: i64, base: i64, code: &str, name: &str) -> Entity {
    Entity::new(entity_type, id)
        .with_field("languageCode", code)
        .with_field("baseId", base)
        .with_field("name", name)
}

fn price(id: i64, channel: i64, amount: i64) -> Entity {
    Entity::new("ProductVariantPrice", id)
        .with_field("channelId", channel)
        .with_field("price", amount)
}

/// Categories 1 > 2 > 3, product 1 with variants 10 and 11, asset 5 tagged with tag 1.
pub fn seed(store: &MemoryStore) {
    let all = Entity::new("Category", 1)
        .with_field("position", 0)
        .with_many("translations", vec![translation("CategoryTranslation", 21, 1, "en", "All")]);
    let electronics = Entity::new("Category", 2)
        .with_one("parent", Some(all))
        .with_many(
            "translations",
            vec![
                translation("CategoryTranslation", 22, 2, "en", "Electronics"),
                translation("CategoryTranslation", 23, 2, "de", "Elektronik"),
            ],
        );
    let laptops = Entity::new("Category", 3)
        .with_one("parent", Some(electronics))
        .with_many("translations", vec![translation("CategoryTranslation", 24, 3, "en", "Laptops")]);

    let standard_tax = Entity::new("TaxCategory", 1).with_field("taxRate", 20.0);
    let hero = Entity::new("Asset", 5)
        .with_field("preview", "hero.jpg")
        .with_many("tags", vec![Entity::new("Tag", 1).with_field("value", "featured")]);

    let small = Entity::new("ProductVariant", 10)
        .with_field("sku", "LAP-13")
        .with_one("taxCategory", Some(standard_tax.clone()))
        .with_many("productVariantPrices", vec![price(1, 1, 1000), price(2, 2, 900)])
        .with_many(
            "translations",
            vec![translation("ProductVariantTranslation", 110, 10, "en", "Variant EN")],
        );
    let large = Entity::new("ProductVariant", 11)
        .with_field("sku", "LAP-15")
        .with_one("taxCategory", Some(standard_tax))
        .with_many("productVariantPrices", vec![price(3, 1, 2000)])
        .with_many(
            "translations",
            vec![translation("ProductVariantTranslation", 111, 11, "en", "Variant 2 EN")],
        );

    store.insert(
        &Entity::new("Product", 1)
            .with_field("enabled", true)
            .with_one("customFields.hero", Some(hero))
            .with_many("variants", vec![small, large])
            .with_many("collections", vec![laptops])
            .with_many(
                "translations",
                vec![
                    translation("ProductTranslation", 100, 1, "en", "Name EN"),
                    translation("ProductTranslation", 101, 1, "de", "Name DE"),
                ],
            ),
    );
}

pub struct Fixture {
    pub registry: Arc<MetadataRegistry>,
    pub store: Arc<MemoryStore>,
    pub hydrator: EntityHydrator,
}

pub fn fixture() -> Fixture {
    init_tracing();
    let registry = registry();
    let store = Arc::new(MemoryStore::new(registry.clone()));
    seed(&store);
    let hydrator = EntityHydrator::new(
        registry.clone(),
        store.clone(),
        Arc::new(ChannelPriceApplicator::default()),
    );
    Fixture {
        registry,
        store,
        hydrator,
    }
}

/// True when every relation along `path` is loaded on every entity reached.
pub fn is_defined(entity: &Entity, path: &RelationPath) -> bool {
    fn walk(entity: &Entity, properties: &[String]) -> bool {
        let Some((first, rest)) = properties.split_first() else {
            return true;
        };
        match entity.related(first) {
            Some(related) => related.entities().into_iter().all(|child| walk(child, rest)),
            None => false,
        }
    }
    walk(entity, &path.properties())
}
