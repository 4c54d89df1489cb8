//! regsweep - registry maintenance for container packages.
//!
//! Reconciles two eventually-inconsistent bookkeeping systems: the package
//! version ledger (one record per stored blob, with an id, a digest and
//! optional tags) and the content-addressed manifest graph on the registry
//! (multi-platform image indexes referencing constituent manifests by
//! digest). The outcome classifies every digest as part of a tagged image,
//! an orphan, or an inconsistency, and drives listing, reporting and
//! deletion.
//!
//! ## Architecture
//!
//! - **Ledger / Registry clients**: thin trait-fronted HTTP clients.
//! - **Scheduler**: bounded-concurrency pool for index fetches.
//! - **Engine**: enumerates the ledger, schedules fetches, builds the graph.
//! - **Commands**: list / report / delete, wired to one abort signal.

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod output;
pub mod registry;
pub mod repo;
pub mod scheduler;
