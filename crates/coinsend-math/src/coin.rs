//! Coin and Coins types for handling tokens

use crate::decimal::Dec;
use crate::int::Int;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinError {
    #[error("invalid denomination: {0}")]
    InvalidDenom(String),

    #[error("negative amount not allowed: {0}")]
    NegativeAmount(String),

    #[error("non-positive amount: {0}")]
    NonPositiveAmount(String),

    #[error("duplicate denomination: {0}")]
    DuplicateDenom(String),

    #[error("coins are not sorted by denomination: {0} before {1}")]
    Unsorted(String, String),

    #[error("invalid coin expression: {0}")]
    InvalidExpression(String),
}

/// A single coin with denomination and amount
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Int,
}

impl Coin {
    /// Create a new coin, validating denomination and amount
    pub fn new(denom: impl Into<String>, amount: Int) -> Result<Self, CoinError> {
        let denom = denom.into();
        if !is_valid_denom(&denom) {
            return Err(CoinError::InvalidDenom(denom));
        }
        if amount.is_negative() {
            return Err(CoinError::NegativeAmount(format!("{amount}{denom}")));
        }
        Ok(Self { denom, amount })
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A collection of coins.
///
/// Coins built through [`Coins::new`] or [`Coins::normalized`] are sorted by
/// denomination. [`Coins::from_wire`] keeps whatever order the encoded
/// transaction carried, so [`Coins::validate`] must pass before such a list
/// is signed over.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coins(Vec<Coin>);

impl Coins {
    /// Sort by denomination and reject duplicates. Amounts are not checked.
    pub fn new(mut coins: Vec<Coin>) -> Result<Self, CoinError> {
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        for window in coins.windows(2) {
            if window[0].denom == window[1].denom {
                return Err(CoinError::DuplicateDenom(window[0].denom.clone()));
            }
        }
        Ok(Self(coins))
    }

    /// Like [`Coins::new`] but zero coins are dropped first.
    pub fn normalized(mut coins: Vec<Coin>) -> Result<Self, CoinError> {
        coins.retain(|c| !c.is_zero());
        Self::new(coins)
    }

    /// Keep the given order untouched.
    pub fn from_wire(coins: Vec<Coin>) -> Self {
        Self(coins)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[Coin] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coin> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Coin> {
        self.0
    }

    /// Find amount of a specific denomination
    pub fn amount_of(&self, denom: &str) -> Int {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount.clone())
            .unwrap_or_else(Int::zero)
    }

    /// Check the canonical form: valid denoms, strictly positive amounts,
    /// strictly ascending denominations.
    pub fn validate(&self) -> Result<(), CoinError> {
        for coin in &self.0 {
            if !is_valid_denom(&coin.denom) {
                return Err(CoinError::InvalidDenom(coin.denom.clone()));
            }
            if !coin.amount.is_positive() {
                return Err(CoinError::NonPositiveAmount(coin.to_string()));
            }
        }
        for window in self.0.windows(2) {
            match window[0].denom.cmp(&window[1].denom) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => {
                    return Err(CoinError::DuplicateDenom(window[0].denom.clone()))
                }
                std::cmp::Ordering::Greater => {
                    return Err(CoinError::Unsorted(
                        window[0].denom.clone(),
                        window[1].denom.clone(),
                    ))
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Coins {
    type Item = &'a Coin;
    type IntoIter = std::slice::Iter<'a, Coin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", s.join(","))
    }
}

/// A coin with a decimal amount, e.g. a gas price of `0.025stake`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecCoin {
    pub denom: String,
    pub amount: Dec,
}

impl DecCoin {
    /// Fee owed for `gas_limit` units at this price, rounded up.
    pub fn fee_for_gas(&self, gas_limit: u64) -> Option<Coin> {
        let total = self.amount.checked_mul(Dec::from_u64(gas_limit))?;
        Some(Coin {
            denom: self.denom.clone(),
            amount: total.ceil_int(),
        })
    }
}

impl fmt::Display for DecCoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Parse a comma separated list such as `100stake,5uatom`.
///
/// The result is normalized: sorted by denomination with zero coins removed.
/// An empty or blank string yields an empty set.
pub fn parse_coins(expr: &str) -> Result<Coins, CoinError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Ok(Coins::empty());
    }

    let mut coins = Vec::new();
    for part in expr.split(',') {
        let (amount, denom) = split_amount(part.trim(), false)?;
        let amount: Int = amount
            .parse()
            .map_err(|_| CoinError::InvalidExpression(part.to_string()))?;
        coins.push(Coin::new(denom, amount)?);
    }
    Coins::normalized(coins)
}

/// Parse a single decimal coin such as `0.025stake`.
pub fn parse_dec_coin(expr: &str) -> Result<DecCoin, CoinError> {
    let expr = expr.trim();
    let (amount, denom) = split_amount(expr, true)?;
    let amount: Dec = amount
        .parse()
        .map_err(|_| CoinError::InvalidExpression(expr.to_string()))?;
    if !is_valid_denom(denom) {
        return Err(CoinError::InvalidDenom(denom.to_string()));
    }
    Ok(DecCoin {
        denom: denom.to_string(),
        amount,
    })
}

fn split_amount(expr: &str, allow_fraction: bool) -> Result<(&str, &str), CoinError> {
    let split = expr
        .find(|c: char| !(c.is_ascii_digit() || (allow_fraction && c == '.')))
        .unwrap_or(expr.len());
    let (amount, denom) = expr.split_at(split);
    let denom = denom.trim_start();
    if amount.is_empty() || denom.is_empty() {
        return Err(CoinError::InvalidExpression(expr.to_string()));
    }
    Ok((amount, denom))
}

/// Validate denomination format: an ASCII letter followed by up to 126
/// alphanumerics or any of `/ : . _ -`.
pub fn is_valid_denom(denom: &str) -> bool {
    if denom.is_empty() || denom.len() > 127 {
        return false;
    }

    let mut chars = denom.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'))
}
