//! Demo data.
//!
//! The application ships without a real book of business; these seed
//! clients cover every risk band and exercise each recommendation path.

pub mod seed;
