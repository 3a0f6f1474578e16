mod support;

use relgraph::path::paths;
use relgraph::{
    Entity, FieldSelectionAnalyzer, HydrateOptions, RelationOptions, RelationPathCache,
    RequestContext, ReturnType, SelectionContext,
};
use std::sync::Arc;
use std::time::Duration;
use support::{fixture, is_defined, registry};

fn analyzer() -> (FieldSelectionAnalyzer, Arc<RelationPathCache>) {
    let cache = Arc::new(RelationPathCache::new(32, Duration::from_secs(60)));
    (FieldSelectionAnalyzer::new(registry(), cache.clone()), cache)
}

#[test]
fn paginated_product_list_with_calculated_field() {
    let (analyzer, _) = analyzer();
    let ctx = SelectionContext::parse(
        "products",
        "{ items { name priceRange featuredAsset { tags { id } } } totalItems }",
        ReturnType::paginated("ProductList"),
    )
    .unwrap();
    let got = analyzer.relations("Product", &RelationOptions::default(), Some(&ctx)).unwrap();
    assert_eq!(
        got,
        paths(["featuredAsset", "featuredAsset.tags", "variants", "variants.productVariantPrices"])
    );
}

#[test]
fn fourth_level_is_dropped() {
    let (analyzer, _) = analyzer();
    let ctx = SelectionContext::parse(
        "product",
        "{ collections { parent { parent { parent { id } } } } }",
        ReturnType::entity("Product"),
    )
    .unwrap();
    let got = analyzer.relations("Product", &RelationOptions::default(), Some(&ctx)).unwrap();
    assert_eq!(got, paths(["collections", "collections.parent", "collections.parent.parent"]));

    let deeper = SelectionContext::parse(
        "productDeep",
        "{ collections { parent { parent { parent { id } } } } }",
        ReturnType::entity("Product"),
    )
    .unwrap();
    let got = analyzer.relations("Product", &RelationOptions::depth(4), Some(&deeper)).unwrap();
    assert_eq!(got.len(), 4);
}

#[test]
fn resolver_managed_relations_can_be_omitted() {
    let (analyzer, _) = analyzer();
    let ctx = SelectionContext::parse(
        "product",
        "{ variants { taxCategory { id } } customFields { hero { preview } } }",
        ReturnType::entity("Product"),
    )
    .unwrap();
    let got = analyzer
        .relations("Product", &RelationOptions::default().omit("variants"), Some(&ctx))
        .unwrap();
    assert_eq!(got, paths(["customFields.hero"]));
}

#[test]
fn cache_is_keyed_by_root_field_and_text() {
    let (analyzer, cache) = analyzer();
    let text = "{ featuredAsset { id } }";
    for root in ["product", "product", "productBySlug"] {
        let ctx = SelectionContext::parse(root, text, ReturnType::entity("Product")).unwrap();
        analyzer.relations("Product", &RelationOptions::default(), Some(&ctx)).unwrap();
    }
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.len), (1, 2, 2));
}

#[tokio::test]
async fn selection_drives_hydration() {
    let f = fixture();
    let (analyzer, _) = analyzer();
    let ctx = SelectionContext::parse(
        "product",
        "{ name variants { sku taxCategory { id } } collections { parent { id } } customFields { hero { tags { value } } } }",
        ReturnType::entity("Product"),
    )
    .unwrap();
    let relations = analyzer.relations("Product", &RelationOptions::default(), Some(&ctx)).unwrap();

    let mut product = Entity::new("Product", 1);
    let options = HydrateOptions {
        relations: relations.clone(),
        apply_product_variant_prices: false,
    };
    let request = RequestContext::new("en", "en");
    f.hydrator.hydrate(&request, &mut product, &options).await.unwrap();
    for path in &relations {
        assert!(is_defined(&product, path), "{} not loaded", path);
    }
    f.hydrator.hydrate(&request, &mut product, &options).await.unwrap();
    assert_eq!(f.store.query_count(), 1);
}
