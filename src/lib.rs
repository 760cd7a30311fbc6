//! Wildfire incident records: query, coordinate normalization and statistics.
//!
//! The record store is a JSON array of fire records whose positions are given
//! in the national TM grid. [`normalize`] attaches approximate WGS84 positions
//! (cached per record), [`query`] filters by region and period, [`reports`]
//! aggregates counts and scores provincial risk, and [`tools`] wraps all of it
//! as text-in/text-out operations for an agent.

pub mod cache;
pub mod config;
pub mod error;
pub mod geo;
pub mod kakao;
pub mod loader;
pub mod map;
pub mod normalize;
pub mod output;
pub mod query;
pub mod reports;
pub mod tools;
pub mod types;
pub mod util;
