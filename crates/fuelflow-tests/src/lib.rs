//! Integration test suite for Fuelflow.
//!
//! Exercises the decay engine and the trading protocol together: materials
//! decaying through shared lineages, sell policies answering requests in a
//! simple exchange, and settlement against live buffers.

pub mod helpers;
