//! Integration tests through the router and a live worker

pub mod worker_tests;
