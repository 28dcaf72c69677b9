//! CSS object model and parsing
//!
//! The value model ([`value`]), the supported property table
//! ([`properties`]), selectors ([`selector`]), parsed rules ([`types`]),
//! media queries ([`media`]), transforms ([`transform`]) and the parser
//! itself ([`parser`]).

pub mod media;
pub mod parser;
pub mod properties;
pub mod selector;
pub mod transform;
pub mod types;
pub mod value;

pub use parser::{CollectedDiagnostics, CssParser, ParserObserver};
pub use properties::{PropertyKey, Shorthand, PROPERTY_COUNT};
pub use selector::{ComplexSelector, Specificity};
pub use types::{DeclaredStyle, Rule, StyleRule, StyleSheet};
pub use value::{Keyword, Length, PropertyValue, Rgba, TimingFunction};
