//! Sortie Orchestrator
//!
//! Accepts adhoc execution requests, tracks every execution through its
//! lifecycle and persists the terminal result.
//!
//! Architecture:
//! - Config: command-line / environment settings
//! - Repository: record store (Postgres, or in-memory when no database is configured)
//! - Service: request validation and the execution tracker
//! - API: axum HTTP endpoints over the tracker

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;
