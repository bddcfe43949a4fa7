// Design-system analysis of screenshots
pub mod analysis;

// Concurrency helpers for independent units
pub mod batch;

// Screenshot capture boundary
pub mod capture;

// CLI arguments
pub mod cli;

// Environment settings
pub mod config;

// Per-segment component mapping
pub mod mapper;

// Run orchestration and artifacts
pub mod pipeline;

// Style transfer over variation images
pub mod stylizer;

// A/B layout variations
pub mod variation;
