//! Mathematical types for coinsend
//!
//! Arbitrary precision integers back every on-chain amount, decimals are
//! only used for gas prices, and coins pair an amount with a denomination.

pub mod coin;
pub mod decimal;
pub mod int;

pub use coin::{is_valid_denom, parse_coins, parse_dec_coin, Coin, CoinError, Coins, DecCoin};
pub use decimal::Dec;
pub use int::Int;
