//! Shared configuration for the cadence workspace.

pub mod config;
