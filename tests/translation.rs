mod support;

use relgraph::entity::EntityId;
use relgraph::{
    EngineError, Entity, HydrateOptions, RequestContext, StoreError, Translation, TranslationDiffer,
};
use support::fixture;

#[tokio::test]
async fn falls_back_through_the_channel_language() {
    let f = fixture();
    let mut product = Entity::new("Product", 1);
    f.hydrator
        .hydrate(&RequestContext::new("zh", "en"), &mut product, &HydrateOptions::relations(["translations"]))
        .await
        .unwrap();
    assert_eq!(product.str_field("name"), Some("Name EN"));
    assert_eq!(product.str_field("languageCode"), Some("en"));
}

#[tokio::test]
async fn diff_updates_known_languages_and_adds_new_ones() {
    let f = fixture();
    let mut laptops = Entity::new("Category", 3);
    f.hydrator
        .hydrate(&RequestContext::new("en", "en"), &mut laptops, &HydrateOptions::relations(["translations"]))
        .await
        .unwrap();

    let differ = TranslationDiffer::for_entity(&f.registry, "Category").unwrap();
    assert_eq!(differ.translation_type(), "CategoryTranslation");
    let existing = differ.existing(&laptops);
    let diff = differ.diff(
        &existing,
        &[
            Translation::new("en").with_field("name", "Notebooks"),
            Translation::new("de").with_field("name", "Laptops DE"),
        ],
    );
    assert_eq!(diff.to_update.len(), 1);
    assert_eq!(diff.to_update[0].id, Some(EntityId::Int(24)));
    assert_eq!(diff.to_update[0].base_id, Some(EntityId::Int(3)));
    assert_eq!(diff.to_add.len(), 1);
    assert!(diff.to_add[0].id.is_none());

    differ.apply_diff(f.store.as_ref(), &mut laptops, diff).await.unwrap();
    let rows = laptops.many("translations").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].str_field("name"), Some("Notebooks"));
    assert_eq!(rows[1].id, EntityId::Int(25));

    let stored = f.store.get("CategoryTranslation", &EntityId::Int(25)).unwrap();
    assert_eq!(stored.field("baseId"), Some(&serde_json::json!(3)));

    let mut fresh = Entity::new("Category", 3);
    f.hydrator
        .hydrate(&RequestContext::new("de", "en"), &mut fresh, &HydrateOptions::relations(["translations"]))
        .await
        .unwrap();
    assert_eq!(fresh.str_field("name"), Some("Laptops DE"));
}

#[tokio::test]
async fn add_failures_are_internal_errors() {
    let f = fixture();
    let differ = TranslationDiffer::for_entity(&f.registry, "Category").unwrap();
    // Category 2 already has a persisted German translation that is not loaded here.
    let mut electronics = Entity::new("Category", 2);
    let diff = differ.diff(&[], &[Translation::new("de").with_field("name", "Elektronik")]);
    let err = differ
        .apply_diff(f.store.as_ref(), &mut electronics, diff)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Internal(ref msg) if msg.starts_with("duplicate key")));
}

#[tokio::test]
async fn update_failures_pass_through() {
    let f = fixture();
    let differ = TranslationDiffer::for_entity(&f.registry, "Product").unwrap();
    let mut product = Entity::new("Product", 1);
    f.hydrator
        .hydrate(&RequestContext::new("en", "en"), &mut product, &HydrateOptions::relations(["translations"]))
        .await
        .unwrap();
    let diff = differ.diff(&differ.existing(&product), &[Translation::new("en").with_field("name", "Laptop")]);
    f.store.fail_next(StoreError::Cancelled);
    let err = differ.apply_diff(f.store.as_ref(), &mut product, diff).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Cancelled)));
}

#[tokio::test]
async fn non_translatable_types_have_no_differ() {
    let f = fixture();
    assert!(TranslationDiffer::for_entity(&f.registry, "Asset").is_err());
}

#[tokio::test]
async fn adding_to_an_unloaded_list_keeps_it_unloaded() {
    let f = fixture();
    let differ = TranslationDiffer::for_entity(&f.registry, "Product").unwrap();
    let mut product = Entity::new("Product", 1);
    let diff = differ.diff(&[], &[Translation::new("fr").with_field("name", "Portable")]);
    differ.apply_diff(f.store.as_ref(), &mut product, diff).await.unwrap();
    assert!(!product.is_loaded("translations"));

    f.hydrator
        .hydrate(&RequestContext::new("fr", "en"), &mut product, &HydrateOptions::relations(["translations"]))
        .await
        .unwrap();
    assert_eq!(f.store.query_count(), 1);
    assert_eq!(product.many("translations").unwrap().len(), 3);
    assert_eq!(product.str_field("name"), Some("Portable"));
}
