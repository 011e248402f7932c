//! Stateless byte-range access to read-only files.
pub mod errors;
pub mod range_reader;
