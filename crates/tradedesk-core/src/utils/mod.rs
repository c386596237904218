//! Utility functions for displaying session details.

pub mod format;

pub use format::{format_expiry, format_remaining, format_roles, mask_token};
