//! CSS selector model
//!
//! Simple, compound and complex selectors with their specificity triples.
//! Parsing lives in [`crate::css::parser`]; matching against an element tree
//! lives in [`crate::style::matcher`].
//!
//! Reference: Selectors Level 3 <https://www.w3.org/TR/selectors-3/>

use std::cmp::Ordering;
use std::fmt;

/// Selector specificity: (id, class/attribute/pseudo-class, type/pseudo-element)
///
/// Compared lexicographically; cascade ties at equal specificity are broken
/// by source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Specificity {
  pub ids: u32,
  pub classes: u32,
  pub types: u32,
}

impl Specificity {
  pub const ZERO: Specificity = Specificity {
    ids: 0,
    classes: 0,
    types: 0,
  };

  pub fn new(ids: u32, classes: u32, types: u32) -> Self {
    Self { ids, classes, types }
  }

  pub fn add(self, other: Specificity) -> Specificity {
    Specificity {
      ids: self.ids + other.ids,
      classes: self.classes + other.classes,
      types: self.types + other.types,
    }
  }
}

impl PartialOrd for Specificity {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Specificity {
  fn cmp(&self, other: &Self) -> Ordering {
    (self.ids, self.classes, self.types).cmp(&(other.ids, other.classes, other.types))
  }
}

/// Pseudo-classes supported by the matcher
///
/// The boolean ones are answered by the DOM collaborator; `:empty` is
/// computed from the tree and `:not()` recurses into a single compound
/// selector (complex arguments are rejected at parse time).
#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
  Active,
  Empty,
  Focus,
  Hover,
  Not(Box<CompoundSelector>),
}

impl PseudoClass {
  pub fn name(&self) -> &'static str {
    match self {
      PseudoClass::Active => "active",
      PseudoClass::Empty => "empty",
      PseudoClass::Focus => "focus",
      PseudoClass::Hover => "hover",
      PseudoClass::Not(_) => "not",
    }
  }
}

/// Generated-content pseudo-elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoElement {
  After,
  Before,
}

impl PseudoElement {
  pub fn name(self) -> &'static str {
    match self {
      PseudoElement::After => "after",
      PseudoElement::Before => "before",
    }
  }
}

/// A single simple selector
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleSelector {
  /// `*` matches any element; contributes no specificity
  Universal,
  Type(String),
  Class(String),
  Id(String),
  PseudoClass(PseudoClass),
  PseudoElement(PseudoElement),
}

impl SimpleSelector {
  pub fn specificity(&self) -> Specificity {
    match self {
      SimpleSelector::Universal => Specificity::ZERO,
      SimpleSelector::Type(_) | SimpleSelector::PseudoElement(_) => Specificity::new(0, 0, 1),
      SimpleSelector::Class(_) => Specificity::new(0, 1, 0),
      SimpleSelector::Id(_) => Specificity::new(1, 0, 0),
      // :not() contributes its argument's specificity, not its own.
      SimpleSelector::PseudoClass(PseudoClass::Not(inner)) => inner.specificity(),
      SimpleSelector::PseudoClass(_) => Specificity::new(0, 1, 0),
    }
  }

  /// Rank used for the canonical in-compound ordering.
  fn canonical_rank(&self) -> (u8, &str) {
    match self {
      SimpleSelector::Universal => (0, ""),
      SimpleSelector::Type(name) => (1, name),
      SimpleSelector::Id(name) => (2, name),
      SimpleSelector::Class(name) => (3, name),
      SimpleSelector::PseudoClass(pc) => (4, pc.name()),
      SimpleSelector::PseudoElement(pe) => (5, pe.name()),
    }
  }
}

impl fmt::Display for SimpleSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SimpleSelector::Universal => write!(f, "*"),
      SimpleSelector::Type(name) => write!(f, "{}", name),
      SimpleSelector::Class(name) => write!(f, ".{}", name),
      SimpleSelector::Id(name) => write!(f, "#{}", name),
      SimpleSelector::PseudoClass(PseudoClass::Not(inner)) => write!(f, ":not({})", inner),
      SimpleSelector::PseudoClass(pc) => write!(f, ":{}", pc.name()),
      SimpleSelector::PseudoElement(pe) => write!(f, "::{}", pe.name()),
    }
  }
}

/// Combinators linking a compound selector to the compound on its left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
  /// Whitespace: any ancestor
  Descendant,
  /// `>`: immediate parent
  Child,
  /// `+`: immediate preceding sibling
  NextSibling,
  /// `~`: any preceding sibling
  FollowingSibling,
}

impl Combinator {
  pub fn is_sibling(self) -> bool {
    matches!(self, Combinator::NextSibling | Combinator::FollowingSibling)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Combinator::Descendant => " ",
      Combinator::Child => " > ",
      Combinator::NextSibling => " + ",
      Combinator::FollowingSibling => " ~ ",
    }
  }
}

/// An ordered set of simple selectors matched against one element
///
/// Matching is order-insensitive AND semantics; the stored order is the
/// canonical sorted form used for deduplication and text generation.
/// At most one pseudo-element, and only on the rightmost compound of a
/// complex selector (enforced by the parser).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundSelector {
  simple_selectors: Vec<SimpleSelector>,
}

impl CompoundSelector {
  pub fn new(mut simple_selectors: Vec<SimpleSelector>) -> Self {
    simple_selectors.sort_by(|a, b| {
      let (rank_a, name_a) = a.canonical_rank();
      let (rank_b, name_b) = b.canonical_rank();
      (rank_a, name_a).cmp(&(rank_b, name_b))
    });
    Self { simple_selectors }
  }

  pub fn is_empty(&self) -> bool {
    self.simple_selectors.is_empty()
  }

  pub fn simple_selectors(&self) -> &[SimpleSelector] {
    &self.simple_selectors
  }

  pub fn pseudo_element(&self) -> Option<PseudoElement> {
    self.simple_selectors.iter().find_map(|s| match s {
      SimpleSelector::PseudoElement(pe) => Some(*pe),
      _ => None,
    })
  }

  pub fn has_pseudo_element(&self) -> bool {
    self.pseudo_element().is_some()
  }

  /// Element-wise sum of the constituent simple selectors' specificities.
  pub fn specificity(&self) -> Specificity {
    self
      .simple_selectors
      .iter()
      .fold(Specificity::ZERO, |acc, s| acc.add(s.specificity()))
  }
}

impl fmt::Display for CompoundSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for simple in &self.simple_selectors {
      write!(f, "{}", simple)?;
    }
    Ok(())
  }
}

/// A chain of compound selectors joined by combinators
///
/// `compounds[i]` sits to the left of `combinators[i]`; the rightmost
/// compound (`compounds.last()`) is the subject of the selector.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
  compounds: Vec<CompoundSelector>,
  combinators: Vec<Combinator>,
}

impl ComplexSelector {
  /// Build from left-to-right parts. `combinators.len()` must be
  /// `compounds.len() - 1`.
  pub fn new(compounds: Vec<CompoundSelector>, combinators: Vec<Combinator>) -> Self {
    debug_assert_eq!(combinators.len() + 1, compounds.len());
    Self {
      compounds,
      combinators,
    }
  }

  pub fn from_compound(compound: CompoundSelector) -> Self {
    Self {
      compounds: vec![compound],
      combinators: Vec::new(),
    }
  }

  pub fn compounds(&self) -> &[CompoundSelector] {
    &self.compounds
  }

  pub fn combinators(&self) -> &[Combinator] {
    &self.combinators
  }

  /// The rightmost compound: the one matched against the element itself.
  pub fn subject(&self) -> &CompoundSelector {
    self.compounds.last().expect("complex selector is never empty")
  }

  pub fn pseudo_element(&self) -> Option<PseudoElement> {
    self.subject().pseudo_element()
  }

  pub fn has_sibling_combinator(&self) -> bool {
    self.combinators.iter().any(|c| c.is_sibling())
  }

  pub fn specificity(&self) -> Specificity {
    self
      .compounds
      .iter()
      .fold(Specificity::ZERO, |acc, c| acc.add(c.specificity()))
  }
}

impl fmt::Display for ComplexSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, compound) in self.compounds.iter().enumerate() {
      if i > 0 {
        write!(f, "{}", self.combinators[i - 1].as_str())?;
      }
      write!(f, "{}", compound)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn class(name: &str) -> SimpleSelector {
    SimpleSelector::Class(name.to_string())
  }

  fn tag(name: &str) -> SimpleSelector {
    SimpleSelector::Type(name.to_string())
  }

  #[test]
  fn specificity_orders_lexicographically() {
    let one_id = Specificity::new(1, 0, 0);
    let many_classes = Specificity::new(0, 100, 0);
    assert!(one_id > many_classes);
    assert!(Specificity::new(0, 1, 0) > Specificity::new(0, 0, 100));
    assert_eq!(Specificity::new(1, 2, 3), Specificity::new(1, 2, 3));
  }

  #[test]
  fn compound_sums_simple_specificities() {
    let compound = CompoundSelector::new(vec![
      tag("div"),
      class("a"),
      class("b"),
      SimpleSelector::Id("x".to_string()),
    ]);
    assert_eq!(compound.specificity(), Specificity::new(1, 2, 1));
  }

  #[test]
  fn not_contributes_argument_specificity() {
    let not = SimpleSelector::PseudoClass(PseudoClass::Not(Box::new(CompoundSelector::new(
      vec![class("hidden")],
    ))));
    assert_eq!(not.specificity(), Specificity::new(0, 1, 0));
  }

  #[test]
  fn compound_normalizes_to_canonical_order() {
    let a = CompoundSelector::new(vec![class("b"), tag("div"), class("a")]);
    let b = CompoundSelector::new(vec![class("a"), class("b"), tag("div")]);
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "div.a.b");
  }

  #[test]
  fn complex_selector_text_roundtrips_combinators() {
    let sel = ComplexSelector::new(
      vec![
        CompoundSelector::new(vec![tag("main")]),
        CompoundSelector::new(vec![tag("article")]),
        CompoundSelector::new(vec![class("toc")]),
      ],
      vec![Combinator::Child, Combinator::Descendant],
    );
    assert_eq!(sel.to_string(), "main > article .toc");
    assert_eq!(sel.subject().to_string(), ".toc");
    assert!(!sel.has_sibling_combinator());
  }

  #[test]
  fn universal_has_zero_specificity() {
    assert_eq!(SimpleSelector::Universal.specificity(), Specificity::ZERO);
  }
}
