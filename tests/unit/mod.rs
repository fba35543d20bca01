//! Configuration tests for printer-motion.
//!
//! Parsing and validation are checked through the public API only.

mod config_parsing;
mod config_validation;
