//! Skin pricing seam.
//!
//! Converts a list of deposited skins into a stake value before the round
//! engine sees it. The pricing algorithm itself lives in an external
//! collaborator; this module only defines the seam and a static price
//! sheet for tests.

use crate::ledger::Cents;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// One staked item, identified by its market hash name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeItem {
    pub asset_id: String,
    pub market_hash_name: String,
}

/// Pricing errors
#[derive(Debug, Error)]
pub enum PricingError {
    #[error("no price for item: {0}")]
    UnknownItem(String),

    #[error("price source unavailable: {0}")]
    Unavailable(String),
}

pub type PricingResult<T> = Result<T, PricingError>;

/// Skin pricing service.
#[async_trait]
pub trait SkinPricing: Send + Sync {
    /// Total value of the given items in cents.
    async fn value_of(&self, items: &[StakeItem]) -> PricingResult<Cents>;
}

/// Fixed price sheet, used in tests and as a fallback.
#[derive(Default)]
pub struct StaticPriceSheet {
    prices: HashMap<String, Cents>,
}

impl StaticPriceSheet {
    pub fn new(prices: HashMap<String, Cents>) -> Self {
        Self { prices }
    }

    pub fn with_price(mut self, market_hash_name: &str, cents: Cents) -> Self {
        self.prices.insert(market_hash_name.to_string(), cents);
        self
    }
}

#[async_trait]
impl SkinPricing for StaticPriceSheet {
    async fn value_of(&self, items: &[StakeItem]) -> PricingResult<Cents> {
        let mut total = 0;
        for item in items {
            let price = self
                .prices
                .get(&item.market_hash_name)
                .ok_or_else(|| PricingError::UnknownItem(item.market_hash_name.clone()))?;
            total += price;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> StakeItem {
        StakeItem {
            asset_id: "1".to_string(),
            market_hash_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn sums_known_items() {
        let sheet = StaticPriceSheet::default()
            .with_price("AK-47 | Redline (Field-Tested)", 1_250)
            .with_price("AWP | Asiimov (Well-Worn)", 5_400);

        let value = sheet
            .value_of(&[
                item("AK-47 | Redline (Field-Tested)"),
                item("AWP | Asiimov (Well-Worn)"),
            ])
            .await
            .unwrap();
        assert_eq!(value, 6_650);
    }

    #[tokio::test]
    async fn unknown_item_is_an_error() {
        let sheet = StaticPriceSheet::default();
        let err = sheet.value_of(&[item("Souvenir Glock")]).await.unwrap_err();
        assert!(matches!(err, PricingError::UnknownItem(_)));
    }
}
