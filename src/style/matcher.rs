//! Selector matching
//!
//! Matches complex selectors against the element tree and maintains the
//! rule index the engine queries per element. Selectors are bucketed by the
//! most specific simple selector of their subject compound (id, then class,
//! then type, then universal), so an element only runs full matching against
//! plausible candidates.
//!
//! Matching proceeds right to left: the subject compound is tested against
//! the element itself, then each combinator walks to candidate ancestors or
//! preceding siblings for the next compound over.

use crate::css::selector::{
  Combinator, ComplexSelector, CompoundSelector, PseudoClass, PseudoElement, SimpleSelector,
  Specificity,
};
use crate::css::types::StyleRule;
use crate::dom::{Document, NodeId};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// One selector of one rule that matched an element.
#[derive(Debug, Clone)]
pub struct MatchedRule {
  pub rule: Arc<StyleRule>,
  pub specificity: Specificity,
  /// Set when the matching selector targets ::before or ::after; the
  /// declarations then style that pseudo-element, not the element itself.
  pub pseudo_element: Option<PseudoElement>,
  /// Global ordering: stylesheet position in the high bits, rule position
  /// within the stylesheet in the low bits.
  pub order: u64,
}

#[derive(Debug, Clone)]
struct IndexedSelector {
  rule: Arc<StyleRule>,
  selector_index: usize,
  order: u64,
}

/// Selector buckets over all active style rules.
#[derive(Debug, Default)]
pub struct RuleIndex {
  by_id: FxHashMap<String, Vec<IndexedSelector>>,
  by_class: FxHashMap<String, Vec<IndexedSelector>>,
  by_type: FxHashMap<String, Vec<IndexedSelector>>,
  universal: Vec<IndexedSelector>,
  /// Whether any indexed selector uses `+` or `~`; drives conservative
  /// sibling invalidation in the engine.
  has_sibling_combinators: bool,
}

impl RuleIndex {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn clear(&mut self) {
    self.by_id.clear();
    self.by_class.clear();
    self.by_type.clear();
    self.universal.clear();
    self.has_sibling_combinators = false;
  }

  pub fn has_sibling_combinators(&self) -> bool {
    self.has_sibling_combinators
  }

  /// Index every selector of the rules of one stylesheet.
  pub fn add_rules(&mut self, rules: &[Arc<StyleRule>], sheet_index: u32) {
    for rule in rules {
      let order = (u64::from(sheet_index) << 32) | u64::from(rule.source_order);
      for (selector_index, selector) in rule.selectors.iter().enumerate() {
        if selector.has_sibling_combinator() {
          self.has_sibling_combinators = true;
        }
        let entry = IndexedSelector {
          rule: Arc::clone(rule),
          selector_index,
          order,
        };
        match bucket_key(selector.subject()) {
          BucketKey::Id(name) => self.by_id.entry(name).or_default().push(entry),
          BucketKey::Class(name) => self.by_class.entry(name).or_default().push(entry),
          BucketKey::Type(name) => self.by_type.entry(name).or_default().push(entry),
          BucketKey::Universal => self.universal.push(entry),
        }
      }
    }
  }

  /// All rules whose selectors match the element, including pseudo-element
  /// selectors rooted at it.
  pub fn matching_rules(&self, doc: &Document, node: NodeId) -> Vec<MatchedRule> {
    let Some(element) = doc.element(node) else {
      return Vec::new();
    };

    let mut matched = Vec::new();
    let mut consider = |entries: &[IndexedSelector]| {
      for entry in entries {
        let selector = &entry.rule.selectors[entry.selector_index];
        if matches_complex(doc, node, selector) {
          matched.push(MatchedRule {
            rule: Arc::clone(&entry.rule),
            specificity: selector.specificity(),
            pseudo_element: selector.pseudo_element(),
            order: entry.order,
          });
        }
      }
    };

    if let Some(id) = element.id() {
      if let Some(entries) = self.by_id.get(id) {
        consider(entries);
      }
    }
    for class in element.classes() {
      if let Some(entries) = self.by_class.get(class.as_str()) {
        consider(entries);
      }
    }
    if let Some(entries) = self.by_type.get(element.tag_name()) {
      consider(entries);
    }
    consider(&self.universal);

    matched
  }
}

enum BucketKey {
  Id(String),
  Class(String),
  Type(String),
  Universal,
}

/// Pick the subject's most selective simple selector as the index key.
fn bucket_key(subject: &CompoundSelector) -> BucketKey {
  let mut class: Option<&str> = None;
  let mut tag: Option<&str> = None;
  for simple in subject.simple_selectors() {
    match simple {
      SimpleSelector::Id(name) => return BucketKey::Id(name.clone()),
      SimpleSelector::Class(name) if class.is_none() => class = Some(name),
      SimpleSelector::Type(name) if tag.is_none() => tag = Some(name),
      _ => {}
    }
  }
  if let Some(name) = class {
    BucketKey::Class(name.to_string())
  } else if let Some(name) = tag {
    BucketKey::Type(name.to_string())
  } else {
    BucketKey::Universal
  }
}

/// Whether the selector matches the element (pseudo-elements on the subject
/// are treated as matching; the caller routes their declarations).
pub fn matches_complex(doc: &Document, node: NodeId, selector: &ComplexSelector) -> bool {
  let compounds = selector.compounds();
  matches_up(doc, node, compounds, selector.combinators(), compounds.len() - 1)
}

fn matches_up(
  doc: &Document,
  node: NodeId,
  compounds: &[CompoundSelector],
  combinators: &[Combinator],
  index: usize,
) -> bool {
  if !matches_compound(doc, node, &compounds[index]) {
    return false;
  }
  if index == 0 {
    return true;
  }
  match combinators[index - 1] {
    Combinator::Child => match parent_element(doc, node) {
      Some(parent) => matches_up(doc, parent, compounds, combinators, index - 1),
      None => false,
    },
    Combinator::Descendant => doc
      .ancestors(node)
      .filter(|&a| doc.node(a).is_element())
      .any(|a| matches_up(doc, a, compounds, combinators, index - 1)),
    Combinator::NextSibling => match doc.previous_sibling_element(node) {
      Some(sibling) => matches_up(doc, sibling, compounds, combinators, index - 1),
      None => false,
    },
    Combinator::FollowingSibling => doc
      .preceding_sibling_elements(node)
      .into_iter()
      .any(|s| matches_up(doc, s, compounds, combinators, index - 1)),
  }
}

fn parent_element(doc: &Document, node: NodeId) -> Option<NodeId> {
  let parent = doc.parent(node)?;
  doc.node(parent).is_element().then_some(parent)
}

pub fn matches_compound(doc: &Document, node: NodeId, compound: &CompoundSelector) -> bool {
  compound
    .simple_selectors()
    .iter()
    .all(|simple| matches_simple(doc, node, simple))
}

fn matches_simple(doc: &Document, node: NodeId, simple: &SimpleSelector) -> bool {
  let Some(element) = doc.element(node) else {
    return false;
  };
  match simple {
    SimpleSelector::Universal => true,
    SimpleSelector::Type(name) => element.tag_name() == name,
    SimpleSelector::Class(name) => element.has_class(name),
    SimpleSelector::Id(name) => element.id() == Some(name.as_str()),
    SimpleSelector::PseudoClass(pc) => match pc {
      PseudoClass::Active => element.state().active,
      PseudoClass::Focus => element.state().focused,
      PseudoClass::Hover => element.state().hovered,
      PseudoClass::Empty => doc.is_empty_element(node),
      PseudoClass::Not(inner) => !matches_compound(doc, node, inner),
    },
    // Subject pseudo-elements match the originating element; the cascade
    // routes their declarations separately.
    SimpleSelector::PseudoElement(_) => true,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::css::parser::CssParser;
  use crate::css::types::Rule;
  use crate::dom::ElementState;

  fn index_of(css: &str) -> RuleIndex {
    let mut parser = CssParser::new("test.css");
    let sheet = parser.parse_style_sheet(css);
    let rules: Vec<Arc<StyleRule>> = sheet
      .rules
      .iter()
      .filter_map(|r| match r {
        Rule::Style(rule) => Some(Arc::clone(rule)),
        _ => None,
      })
      .collect();
    let mut index = RuleIndex::new();
    index.add_rules(&rules, 0);
    index
  }

  fn sample_doc() -> (Document, NodeId, NodeId, NodeId) {
    // <html><body class="page"><div id="main"><p class="intro hot"/><p/></div></body></html>
    let mut doc = Document::new("html");
    let body = doc.create_element("body");
    doc.set_attribute(body, "class", "page");
    doc.append_child(doc.root(), body);
    let main = doc.create_element("div");
    doc.set_attribute(main, "id", "main");
    doc.append_child(body, main);
    let intro = doc.create_element("p");
    doc.set_attribute(intro, "class", "intro hot");
    doc.append_child(main, intro);
    let plain = doc.create_element("p");
    doc.append_child(main, plain);
    (doc, main, intro, plain)
  }

  #[test]
  fn descendant_and_child_combinators() {
    let (doc, _, intro, _) = sample_doc();
    let index = index_of("body p {} body > p {} div > p {}");
    let matched = index.matching_rules(&doc, intro);
    let orders: Vec<u64> = matched.iter().map(|m| m.order).collect();
    // "body p" and "div > p" match; "body > p" does not.
    assert_eq!(orders.len(), 2);
    assert!(orders.contains(&0));
    assert!(orders.contains(&2));
  }

  #[test]
  fn sibling_combinators() {
    let (doc, _, intro, plain) = sample_doc();
    let index = index_of(".intro + p {} .intro ~ p {}");
    assert!(index.has_sibling_combinators());
    assert_eq!(index.matching_rules(&doc, plain).len(), 2);
    assert!(index.matching_rules(&doc, intro).is_empty());
  }

  #[test]
  fn id_and_compound_matching() {
    let (doc, main, intro, _) = sample_doc();
    let index = index_of("#main {} p.intro.hot {} p.intro.cold {}");
    assert_eq!(index.matching_rules(&doc, main).len(), 1);
    assert_eq!(index.matching_rules(&doc, intro).len(), 1);
  }

  #[test]
  fn not_pseudo_class_inverts_compound() {
    let (doc, _, intro, plain) = sample_doc();
    let index = index_of("p:not(.intro) {}");
    assert!(index.matching_rules(&doc, intro).is_empty());
    assert_eq!(index.matching_rules(&doc, plain).len(), 1);
  }

  #[test]
  fn state_pseudo_classes_follow_element_flags() {
    let (mut doc, _, intro, _) = sample_doc();
    let index = index_of("p:hover {}");
    assert!(index.matching_rules(&doc, intro).is_empty());
    doc.set_element_state(
      intro,
      ElementState {
        hovered: true,
        ..ElementState::default()
      },
    );
    assert_eq!(index.matching_rules(&doc, intro).len(), 1);
  }

  #[test]
  fn empty_pseudo_class_checks_children() {
    let (mut doc, _, intro, plain) = sample_doc();
    let index = index_of("p:empty {}");
    assert_eq!(index.matching_rules(&doc, plain).len(), 1);
    let text = doc.create_text("words");
    doc.append_child(intro, text);
    assert!(index.matching_rules(&doc, intro).is_empty());
  }

  #[test]
  fn pseudo_element_selectors_record_their_target() {
    let (doc, _, intro, _) = sample_doc();
    let index = index_of("p.intro::before {}");
    let matched = index.matching_rules(&doc, intro);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].pseudo_element, Some(PseudoElement::Before));
  }
}
