//! # Storysync Common Library
//!
//! Shared code for the storysync widget crates including:
//! - Event types (WidgetEvent enum) and the broadcast EventBus
//! - Tuning parameters with range validation
//! - Host page boundary traits and test doubles
//! - Error types

pub mod error;
pub mod events;
pub mod host;
pub mod params;

pub use error::{Error, Result};
pub use events::{EventBus, FadeDirection, WidgetEvent};
pub use params::{FadeParams, ObserverParams, WidgetParams};
