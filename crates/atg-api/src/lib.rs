//! Azure Terraform generator API: library crate for the REST server.
//!
//! Re-exports all modules so the binary (`main.rs`) and external crates
//! (e.g. `atg-e2e-tests`) can build the router around their own
//! [`Orchestrator`](atg_engine::Orchestrator).

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
