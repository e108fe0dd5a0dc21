pub mod dominance_tracker;
