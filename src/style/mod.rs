//! Style resolution
//!
//! Selector matching, the cascade, computed styles and the engine that
//! drives them from DOM mutations.

pub mod cascade;
pub mod computed;
pub mod engine;
pub mod matcher;

pub use cascade::resolve_style;
pub use computed::{ComputedStyle, DEFAULT_FONT_SIZE};
pub use engine::StyleEngine;
pub use matcher::{MatchedRule, RuleIndex};
