//! Gas fee calculation utilities
//!
//! Raw gas data -> fee in the base asset -> fee in the quote asset.
//! Shared by single-transaction resolution, range reconciliation and ingestion.

use crate::error::FeeError;
use crate::price::PriceOracle;
use crate::records::FeeRecord;
use alloy_primitives::B256;

/// Wei per ether.
pub const WEI_PER_ETH: f64 = 1e18;

/// Calculate the total fee paid for a transaction, in wei.
///
/// Fee = gas_used * gas_price
pub fn calculate_fee(gas_price: u128, gas_used: u64) -> u128 {
    gas_price.saturating_mul(gas_used as u128)
}

/// Convert a wei amount into the base asset (10^18 wei per unit).
pub fn wei_to_base(wei: u128) -> f64 {
    wei as f64 / WEI_PER_ETH
}

/// Fee of a transaction in the base asset.
pub fn fee_in_base(gas_price: u128, gas_used: u64) -> f64 {
    wei_to_base(calculate_fee(gas_price, gas_used))
}

/// Build a fee record, pricing the gas cost at `timestamp`.
///
/// A missing price becomes [`FeeError::PriceUnavailable`], so a record that
/// violates the fee invariant is never constructed.
pub async fn price_fee(
    oracle: &dyn PriceOracle,
    transaction_id: B256,
    timestamp: u64,
    gas_price: u128,
    gas_used: u64,
) -> Result<FeeRecord, FeeError> {
    let fee_base = fee_in_base(gas_price, gas_used);
    let fee_quote = oracle
        .convert(fee_base, timestamp)
        .await
        .map_err(FeeError::upstream)?
        .ok_or(FeeError::PriceUnavailable { timestamp })?;

    Ok(FeeRecord {
        transaction_id,
        timestamp,
        gas_price,
        gas_used,
        fee_quote,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct FixedPrice(Option<f64>);

    #[async_trait]
    impl PriceOracle for FixedPrice {
        async fn convert(&self, amount: f64, _timestamp: u64) -> Result<Option<f64>> {
            Ok(self.0.map(|p| amount * p))
        }
    }

    #[test]
    fn test_fee_calculation() {
        // 21000 * 20 gwei
        assert_eq!(calculate_fee(20_000_000_000, 21_000), 420_000_000_000_000);
        assert_eq!(fee_in_base(20_000_000_000, 21_000), 0.00042);
        assert_eq!(fee_in_base(0, 21_000), 0.0);
    }

    #[test]
    fn test_fee_saturates() {
        assert_eq!(calculate_fee(u128::MAX, 2), u128::MAX);
    }

    #[tokio::test]
    async fn test_price_fee_invariant() {
        let oracle = FixedPrice(Some(2949.33));
        let record = price_fee(&oracle, B256::ZERO, 1_620_000_000, 50_000_000_000, 150_000)
            .await
            .unwrap();
        let expected = 50_000_000_000f64 * 150_000f64 / 1e18 * 2949.33;
        assert!((record.fee_quote - expected).abs() < 1e-9);
        assert_eq!(record.gas_price, 50_000_000_000);
        assert_eq!(record.gas_used, 150_000);
    }

    #[tokio::test]
    async fn test_price_fee_unavailable() {
        let oracle = FixedPrice(None);
        let err = price_fee(&oracle, B256::ZERO, 1, 1, 1).await.unwrap_err();
        assert!(matches!(err, FeeError::PriceUnavailable { timestamp: 1 }));
    }
}
