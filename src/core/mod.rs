//! Core domain types shared across the agent and CLI layers.

pub mod rating;

pub use rating::SourceRating;
