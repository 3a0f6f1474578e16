//! Channel price and tax application for priced entities.

use crate::context::RequestContext;
use crate::entity::Entity;
use crate::error::EngineError;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait PriceApplicator: Send + Sync {
    /// Set channel-specific price fields on `entity` in place. Requires the entity's pricing
    /// relations to be loaded.
    async fn apply_channel_price_and_tax(
        &self,
        entity: &mut Entity,
        ctx: &RequestContext,
    ) -> Result<(), EngineError>;
}

/// Picks the price row for the request's channel and applies the tax category's rate.
///
/// Reads `channelId` and `price` from the rows of `prices_relation` and `taxRate` (percent)
/// from the `tax_relation` entity. Writes `price`, `priceWithTax` and `taxRateApplied`.
#[derive(Clone, Debug)]
pub struct ChannelPriceApplicator {
    prices_relation: String,
    tax_relation: String,
}

impl ChannelPriceApplicator {
    pub fn new(prices_relation: &str, tax_relation: &str) -> Self {
        ChannelPriceApplicator {
            prices_relation: prices_relation.to_string(),
            tax_relation: tax_relation.to_string(),
        }
    }
}

impl Default for ChannelPriceApplicator {
    fn default() -> Self {
        Self::new("productVariantPrices", "taxCategory")
    }
}

#[async_trait]
impl PriceApplicator for ChannelPriceApplicator {
    async fn apply_channel_price_and_tax(
        &self,
        entity: &mut Entity,
        ctx: &RequestContext,
    ) -> Result<(), EngineError> {
        let channel = serde_json::to_value(&ctx.channel_id).unwrap_or(Value::Null);
        let price = entity
            .many(&self.prices_relation)
            .and_then(|rows| rows.iter().find(|row| row.field("channelId") == Some(&channel)))
            .and_then(|row| row.field("price"))
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                EngineError::Internal(format!(
                    "no price found for {} {} in channel {}",
                    entity.entity_type, entity.id, ctx.channel_id
                ))
            })?;
        let rate = entity
            .one(&self.tax_relation)
            .and_then(|tax| tax.field("taxRate"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let with_tax = (price as f64 * (1.0 + rate / 100.0)).round() as i64;
        entity.fields.insert("price".into(), price.into());
        entity.fields.insert("priceWithTax".into(), with_tax.into());
        entity.fields.insert("taxRateApplied".into(), rate.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant() -> Entity {
        Entity::new("ProductVariant", 7)
            .with_many(
                "productVariantPrices",
                vec![
                    Entity::new("ProductVariantPrice", 1).with_field("channelId", 1).with_field("price", 1000),
                    Entity::new("ProductVariantPrice", 2).with_field("channelId", 2).with_field("price", 900),
                ],
            )
            .with_one("taxCategory", Some(Entity::new("TaxCategory", 1).with_field("taxRate", 20.0)))
    }

    #[tokio::test]
    async fn applies_channel_price_with_tax() {
        let mut v = variant();
        let ctx = RequestContext::new("en", "en").with_channel(2);
        ChannelPriceApplicator::default()
            .apply_channel_price_and_tax(&mut v, &ctx)
            .await
            .unwrap();
        assert_eq!(v.field("price"), Some(&Value::from(900)));
        assert_eq!(v.field("priceWithTax"), Some(&Value::from(1080)));
    }

    #[tokio::test]
    async fn missing_channel_price_is_an_error() {
        let mut v = variant();
        let ctx = RequestContext::new("en", "en").with_channel(3);
        let err = ChannelPriceApplicator::default()
            .apply_channel_price_and_tax(&mut v, &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "internal_error");
    }
}
