// apply / scan / diff / registry
pub mod declarative;

// Per-entity console output
pub mod report;
