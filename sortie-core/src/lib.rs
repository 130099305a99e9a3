//! Sortie Core
//!
//! Core types shared by the Sortie execution engine.
//!
//! This crate contains:
//! - Domain types: execution records and their lifecycle status, saved inventories
//! - DTOs: requests and aggregates exchanged with the HTTP layer
//! - The catalog of automation modules that may be invoked

pub mod domain;
pub mod dto;
pub mod modules;
