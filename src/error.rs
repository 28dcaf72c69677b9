//! Error types for faststyle
//!
//! Parse-level problems are reported through the observer channel
//! (see [`crate::css::parser`]) and never abort the caller; the types here
//! cover the places where an operation as a whole can fail (an entry point
//! given input it cannot produce any value for, or style resolution asked
//! about an unknown node).
//!
//! All errors use the `thiserror` crate for minimal boilerplate and
//! proper error trait implementations.

use thiserror::Error;

/// Result type alias for faststyle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for faststyle
#[derive(Error, Debug)]
pub enum Error {
  /// CSS parsing error
  #[error("Parse error: {0}")]
  Parse(#[from] ParseError),

  /// Style computation error
  #[error("Style error: {0}")]
  Style(#[from] StyleError),

  /// Generic error for miscellaneous issues
  #[error("{0}")]
  Other(String),
}

/// Errors that occur during CSS parsing
#[derive(Error, Debug, Clone)]
pub enum ParseError {
  /// Malformed token stream with no valid recovery point
  #[error("Unrecoverable syntax error at {line}:{column}")]
  UnrecoverableSyntax { line: u32, column: u32 },

  /// Invalid value for a single-property parse entry point
  #[error("Invalid value for property '{property}': {value}")]
  InvalidPropertyValue { property: String, value: String },

  /// Property name not in the supported set
  #[error("Unsupported property: {property}")]
  UnsupportedProperty { property: String },

  /// Invalid selector text
  #[error("Invalid selector: {selector}")]
  InvalidSelector { selector: String },

  /// Invalid media query text
  #[error("Invalid media query: {query}")]
  InvalidMediaQuery { query: String },
}

/// Errors that occur during style resolution
#[derive(Error, Debug, Clone)]
pub enum StyleError {
  /// Style state requested for a node the engine has never styled
  #[error("No computed style for node {node_id}")]
  NoComputedStyle { node_id: usize },

  /// An @keyframes name referenced by animation-name is not registered
  #[error("Unknown keyframes rule '{name}'")]
  UnknownKeyframes { name: String },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_error_display_contains_location() {
    let error = ParseError::UnrecoverableSyntax { line: 10, column: 18 };
    let display = format!("{}", error);
    assert!(display.contains("10:18"));
  }

  #[test]
  fn error_from_parse_error() {
    let parse_error = ParseError::UnsupportedProperty {
      property: "pony".to_string(),
    };
    let error: Error = parse_error.into();
    assert!(matches!(error, Error::Parse(_)));
  }

  #[test]
  fn error_from_style_error() {
    let style_error = StyleError::UnknownKeyframes {
      name: "fade".to_string(),
    };
    let error: Error = style_error.into();
    assert!(matches!(error, Error::Style(_)));
  }

  #[test]
  fn error_trait_implemented() {
    let error = Error::Other("test".to_string());
    let _: &dyn std::error::Error = &error;
  }
}
