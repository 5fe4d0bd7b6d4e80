//! Deterministic token ordering for selectors.
//!
//! Native-currency placeholders come first (ordered by chain priority), then
//! stablecoins in symbol priority, then everything else in input order.

use std::cmp::Ordering;

use crate::types::token::Token;

/// Chain ids in display priority: Ethereum, BNB, Avalanche, Polygon,
/// Filecoin, Arbitrum, Optimism, Fantom.
pub const CHAIN_PRIORITY: [&str; 8] = ["1", "56", "43114", "137", "314", "42161", "10", "250"];

pub const SYMBOL_PRIORITY: [&str; 3] = ["USDC", "USDT", "axlUSDC"];

fn chain_rank(chain_id: &str) -> Option<usize> {
    CHAIN_PRIORITY.iter().position(|c| *c == chain_id)
}

fn symbol_rank(symbol: &str) -> Option<usize> {
    SYMBOL_PRIORITY.iter().position(|s| *s == symbol)
}

/// Ranked entries first, in rank order. Two unranked entries are equal.
fn compare_ranks(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn compare_tokens(a: &Token, b: &Token) -> Ordering {
    match (a.is_native(), b.is_native()) {
        (true, true) => compare_ranks(chain_rank(&a.chain_id), chain_rank(&b.chain_id)),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => compare_ranks(symbol_rank(&a.symbol), symbol_rank(&b.symbol)),
    }
}

/// Stable sort by [`compare_tokens`].
pub fn sort_tokens(tokens: &mut [Token]) {
    tokens.sort_by(compare_tokens);
}
