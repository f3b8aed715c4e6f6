//! Utility module for Lectern
//!
//! This module provides common utilities used throughout the crate:
//! - Error handling with custom error types
//! - Application configuration management
//! - Time formatting helpers shared by the control bar and save-state

pub mod config;
pub mod error;

// Re-export commonly used items
pub use config::AppConfig;
pub use error::{PlayerError, Result};

/// Format a playback time for the VCR display
///
/// # Arguments
///
/// * `seconds` - Time in seconds; fractions are truncated
///
/// # Returns
///
/// Formatted string in the format "H:MM:SS" or "M:SS" for times under an hour
pub fn format_duration(seconds: f64) -> String {
    let total_secs = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Format a position as zero-padded "HH:MM:SS", rounded to whole seconds
pub fn format_full(seconds: f64) -> String {
    let total_secs = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };

    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}
