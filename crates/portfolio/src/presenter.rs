use num_bigint::BigUint;
use shared::config::DisplayConfig;
use shared::models::{DisplayRow, TokenBalance};
use std::collections::{HashMap, HashSet};

use crate::normalize::{cmp_decimal, parse_units, COMPARE_SCALE};

/// Display filtering criteria. Affects presentation only.
#[derive(Debug, Clone)]
pub struct Criteria {
    /// Minimum displayed balance, as an exact decimal string
    pub min_balance: String,
    /// Symbols hidden from the output (case-insensitive)
    pub excluded_symbols: HashSet<String>,
}

impl Criteria {
    pub fn new(min_balance: impl Into<String>, excluded_symbols: &[&str]) -> Self {
        Self {
            min_balance: min_balance.into(),
            excluded_symbols: excluded_symbols
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }

    /// Build criteria from the environment-backed display settings.
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self {
            min_balance: config.min_balance.clone(),
            excluded_symbols: config
                .excluded_symbols
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }

    fn excludes_symbol(&self, symbol: &str) -> bool {
        self.excluded_symbols.contains(&symbol.to_lowercase())
    }

    fn below_minimum(&self, normalized: &str) -> bool {
        matches!(
            cmp_decimal(normalized, &self.min_balance),
            Some(std::cmp::Ordering::Less)
        )
    }
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            min_balance: "0".to_string(),
            excluded_symbols: HashSet::new(),
        }
    }
}

/// Arrange balances for display: filter by the criteria and order by
/// descending normalized balance. Ordering is presentational only and
/// carries no transactional meaning.
pub fn present(balances: &[TokenBalance], criteria: &Criteria) -> Vec<DisplayRow> {
    present_with_prices(balances, criteria, &HashMap::new())
}

/// Like [`present`], with USD values attached from an externally supplied
/// price lookup keyed by lowercase contract address.
pub fn present_with_prices(
    balances: &[TokenBalance],
    criteria: &Criteria,
    prices: &HashMap<String, f64>,
) -> Vec<DisplayRow> {
    let mut ordered: Vec<(BigUint, DisplayRow)> = balances
        .iter()
        .filter(|b| !criteria.excludes_symbol(&b.token.symbol))
        .filter(|b| !criteria.below_minimum(&b.normalized))
        .map(|b| {
            let value_usd = prices
                .get(&b.token.contract.to_lowercase())
                .map(|price| format_usd(&b.normalized, *price));

            let sort_key =
                parse_units(&b.normalized, COMPARE_SCALE).unwrap_or_else(|| BigUint::from(0u8));

            let row = DisplayRow {
                contract: b.token.contract.clone(),
                symbol: b.token.symbol.clone(),
                name: b.token.name.clone(),
                amount: b.normalized.clone(),
                value_usd,
                error: None,
            };
            (sort_key, row)
        })
        .collect();

    ordered.sort_by(|(a_key, a_row), (b_key, b_row)| {
        b_key.cmp(a_key).then_with(|| a_row.symbol.cmp(&b_row.symbol))
    });

    ordered.into_iter().map(|(_, row)| row).collect()
}

// USD values are display-only, so f64 precision is acceptable here;
// the exact path never leaves the decimal-string representation
fn format_usd(normalized: &str, price: f64) -> String {
    let amount: f64 = normalized.parse().unwrap_or(0.0);
    format!("${:.2}", amount * price)
}
