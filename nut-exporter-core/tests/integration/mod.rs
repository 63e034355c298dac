//! Integration tests for the NUT exporter core

mod fake_upsd;
mod poller_tests;
