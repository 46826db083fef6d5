//! Integration tests for Reel-Harvest

mod crawl_tests;
mod support;
