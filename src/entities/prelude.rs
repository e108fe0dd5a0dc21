//! `SeaORM` Entity prelude

pub use super::altcoin_samples::Entity as AltcoinSamples;
pub use super::btc_dominance::Entity as BtcDominance;
