//! Demo: load the commerce schema, seed an in-memory store and hydrate a product.
//!
//! Run from repo root: `cargo run --example hydrate`
//! Set `RUST_LOG=relgraph=debug` to see planned queries.

use relgraph::{
    load_from_path, resolve, ChannelPriceApplicator, EngineSettings, Entity, EntityHydrator,
    FieldSelectionAnalyzer, HydrateOptions, MemoryStore, RelationOptions, RelationPath, RelationPathCache,
    RequestContext, ReturnType, SelectionContext,
};
use std::sync::Arc;

fn seed(store: &MemoryStore) {
    let root = Entity::new("Category", 1).with_many(
        "translations",
        vec![Entity::new("CategoryTranslation", 1)
            .with_field("languageCode", "en")
            .with_field("name", "All")],
    );
    let laptops = Entity::new("Category", 2)
        .with_one("parent", Some(root))
        .with_many(
            "translations",
            vec![Entity::new("CategoryTranslation", 2)
                .with_field("languageCode", "en")
                .with_field("name", "Laptops")],
        );
    let variant = Entity::new("ProductVariant", 10)
        .with_field("sku", "LAP-13")
        .with_one("taxCategory", Some(Entity::new("TaxCategory", 1).with_field("taxRate", 20.0)))
        .with_many(
            "productVariantPrices",
            vec![Entity::new("ProductVariantPrice", 1)
                .with_field("channelId", 1)
                .with_field("price", 129900)],
        )
        .with_many(
            "translations",
            vec![Entity::new("ProductVariantTranslation", 1)
                .with_field("languageCode", "en")
                .with_field("name", "Laptop 13 inch")],
        );
    store.insert(
        &Entity::new("Product", 1)
            .with_many("variants", vec![variant])
            .with_many("collections", vec![laptops])
            .with_many(
                "translations",
                vec![
                    Entity::new("ProductTranslation", 1)
                        .with_field("languageCode", "en")
                        .with_field("name", "Laptop"),
                    Entity::new("ProductTranslation", 2)
                        .with_field("languageCode", "de")
                        .with_field("name", "Klapprechner"),
                ],
            ),
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("relgraph=info")),
        )
        .init();

    let settings = EngineSettings::from_env()?;
    let schema_path = std::env::var("RELGRAPH_SCHEMA")
        .unwrap_or_else(|_| concat!(env!("CARGO_MANIFEST_DIR"), "/demos/commerce_schema.json").into());
    let registry = Arc::new(resolve(&load_from_path(&schema_path).await?)?);

    let store = Arc::new(MemoryStore::new(registry.clone()));
    seed(&store);

    let analyzer = FieldSelectionAnalyzer::new(registry.clone(), Arc::new(RelationPathCache::from_settings(&settings)))
        .with_max_depth(settings.max_depth);
    let selection = SelectionContext::parse(
        "product",
        "{ name variants { sku price taxCategory { id } } collections { parent { name } } }",
        ReturnType::entity("Product"),
    )?;
    let mut relations = analyzer.relations("Product", &RelationOptions::default(), Some(&selection))?;
    relations.push(RelationPath::parse("translations"));
    tracing::info!(relations = ?relations, "relations from selection");

    let hydrator = EntityHydrator::new(registry, store.clone(), Arc::new(ChannelPriceApplicator::default()))
        .with_settings(&settings);
    let ctx = RequestContext::from_settings(&settings, "de", "en");
    let mut product = Entity::new("Product", 1);
    let options = HydrateOptions {
        relations,
        apply_product_variant_prices: true,
    };
    hydrator.hydrate(&ctx, &mut product, &options).await?;
    hydrator.hydrate(&ctx, &mut product, &options).await?;
    tracing::info!(queries = store.query_count(), "hydrated twice");

    println!("{}", serde_json::to_string_pretty(&product)?);
    Ok(())
}
