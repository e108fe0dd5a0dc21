// src/lib.rs

pub mod config;

pub mod entities {
    pub mod prelude;
    pub mod altcoin_samples;
    pub mod btc_dominance;
}

pub mod services {
    pub mod alerts;
    pub mod coingecko;
    pub mod notifier;
    pub mod sample_store;
    pub mod trend_analyzer;
}

pub mod jobs;
pub mod models;

pub use config::TrackerConfig;
pub use jobs::dominance_tracker::{CycleOutcome, CycleReport, DominanceTracker, TrackerError};
