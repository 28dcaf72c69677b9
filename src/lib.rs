//! faststyle: a CSS cascade and style-resolution engine.
//!
//! Parses stylesheets into a rule model, matches selectors against an
//! arena-backed element tree, runs the cascade to produce computed styles,
//! and animates them over time with CSS transitions and @keyframes
//! animations.
//!
//! The usual flow:
//!
//! ```
//! use faststyle::css::media::MediaContext;
//! use faststyle::css::parser::CssParser;
//! use faststyle::dom::Document;
//! use faststyle::style::StyleEngine;
//!
//! let mut parser = CssParser::new("app.css");
//! let sheet = parser.parse_style_sheet("body { font-size: 18px; color: #222; }");
//!
//! let mut doc = Document::new("html");
//! let body = doc.create_element("body");
//! doc.append_child(doc.root(), body);
//!
//! let mut engine = StyleEngine::new(MediaContext::screen(1280.0, 720.0));
//! engine.add_stylesheet(sheet);
//! engine.update_styles(&mut doc, 0.0);
//!
//! let style = engine.style(body).unwrap();
//! assert_eq!(style.font_size(), 18.0);
//! ```

pub mod animation;
pub mod css;
pub mod dom;
pub mod error;
pub mod style;

pub use css::parser::{CollectedDiagnostics, CssParser, ParserObserver};
pub use css::{PropertyKey, PropertyValue, StyleSheet};
pub use dom::{Document, NodeId};
pub use error::{Error, Result};
pub use style::{ComputedStyle, StyleEngine};
