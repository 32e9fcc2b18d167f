//! Integration tests: full advisor workflows against the public API.

mod mock_host;
mod workflow;
