//! The cascade
//!
//! Turns the set of matched rules (plus the element's inline style) into a
//! computed style. For each property the declaration with the highest
//! cascade priority wins:
//!
//! 1. `!important` declarations beat normal ones,
//! 2. at equal importance, inline style beats author stylesheets,
//! 3. then selector specificity,
//! 4. then source order (later wins).
//!
//! The winners are applied over the inherited/initial base, CSS-wide
//! keywords are resolved, and the result is absolutized against the parent
//! and root font sizes.
//!
//! Reference: CSS 2.1 section 6.4 <https://www.w3.org/TR/CSS21/cascade.html>

use crate::css::properties::{PropertyKey, PROPERTY_COUNT};
use crate::css::selector::{PseudoElement, Specificity};
use crate::css::types::DeclaredStyle;
use crate::css::value::{Keyword, PropertyValue};
use crate::style::computed::{ComputedStyle, DEFAULT_FONT_SIZE};
use crate::style::matcher::MatchedRule;

/// Cascade priority of one declaration. Derived `Ord` compares fields top
/// to bottom, which is exactly the cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct CascadePriority {
  important: bool,
  inline: bool,
  specificity: Specificity,
  order: u64,
}

/// Resolve the computed style for one cascade target: the element itself
/// (`pseudo_element: None`) or one of its pseudo-elements.
///
/// `inline_style` participates only when resolving the element itself;
/// pseudo-elements cannot carry inline style.
pub fn resolve_style(
  matched: &[MatchedRule],
  pseudo_element: Option<PseudoElement>,
  inline_style: Option<&DeclaredStyle>,
  parent_style: Option<&ComputedStyle>,
  root_font_size: f32,
) -> ComputedStyle {
  let mut winners: [Option<(CascadePriority, &PropertyValue)>; PROPERTY_COUNT] =
    [None; PROPERTY_COUNT];

  for rule in matched {
    if rule.pseudo_element != pseudo_element {
      continue;
    }
    for (key, declared) in rule.rule.declarations.iter() {
      let priority = CascadePriority {
        important: declared.important,
        inline: false,
        specificity: rule.specificity,
        order: rule.order,
      };
      offer_winner(&mut winners, key, priority, &declared.value);
    }
  }

  if pseudo_element.is_none() {
    if let Some(inline) = inline_style {
      for (key, declared) in inline.iter() {
        let priority = CascadePriority {
          important: declared.important,
          inline: true,
          specificity: Specificity::ZERO,
          order: u64::MAX,
        };
        offer_winner(&mut winners, key, priority, &declared.value);
      }
    }
  }

  let mut style = match parent_style {
    Some(parent) => ComputedStyle::inherited_from(parent),
    None => ComputedStyle::initial(),
  };

  for (i, winner) in winners.iter().enumerate() {
    let Some((_, value)) = winner else {
      continue;
    };
    let key = PropertyKey::ALL[i];
    let resolved = match value {
      PropertyValue::Keyword(Keyword::Initial) => key.initial_value(),
      PropertyValue::Keyword(Keyword::Inherit) => match parent_style {
        Some(parent) => parent.get(key).clone(),
        // Inheriting at the root falls back to the initial value.
        None => key.initial_value(),
      },
      other => (*other).clone(),
    };
    style.set(key, resolved);
  }

  let parent_font_size = parent_style.map(|p| p.font_size()).unwrap_or(DEFAULT_FONT_SIZE);
  style.absolutize(parent_font_size, root_font_size);
  style
}

fn offer_winner<'a>(
  winners: &mut [Option<(CascadePriority, &'a PropertyValue)>; PROPERTY_COUNT],
  key: PropertyKey,
  priority: CascadePriority,
  value: &'a PropertyValue,
) {
  let slot = &mut winners[key.index()];
  match slot {
    Some((current, _)) if *current > priority => {}
    _ => *slot = Some((priority, value)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::css::parser::CssParser;
  use crate::css::types::{Rule, StyleRule};
  use crate::css::value::{Length, Rgba};
  use crate::dom::Document;
  use crate::style::matcher::RuleIndex;
  use std::sync::Arc;

  fn matched_for(css: &str, doc: &Document, node: crate::dom::NodeId) -> Vec<MatchedRule> {
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
    index.matching_rules(doc, node)
  }

  fn single_div() -> (Document, crate::dom::NodeId) {
    let mut doc = Document::new("html");
    let div = doc.create_element("div");
    doc.set_attribute(div, "class", "box");
    doc.append_child(doc.root(), div);
    (doc, div)
  }

  #[test]
  fn higher_specificity_wins() {
    let (doc, div) = single_div();
    let matched = matched_for(
      "div { width: 10px; } div.box { width: 20px; } div { width: 30px; }",
      &doc,
      div,
    );
    let style = resolve_style(&matched, None, None, None, 16.0);
    assert_eq!(
      style.get(PropertyKey::Width),
      &PropertyValue::Length(Length::px(20.0))
    );
  }

  #[test]
  fn source_order_breaks_specificity_ties() {
    let (doc, div) = single_div();
    let matched = matched_for("div { opacity: 0.2; } div { opacity: 0.7; }", &doc, div);
    let style = resolve_style(&matched, None, None, None, 16.0);
    assert_eq!(style.opacity(), 0.7);
  }

  #[test]
  fn important_beats_specificity() {
    let (doc, div) = single_div();
    let matched = matched_for(
      "div { color: #ff0000 !important; } div.box { color: #00ff00; }",
      &doc,
      div,
    );
    let style = resolve_style(&matched, None, None, None, 16.0);
    assert_eq!(style.color(), Rgba::new(255, 0, 0, 255));
  }

  #[test]
  fn inline_style_beats_author_rules_but_not_important() {
    let (doc, div) = single_div();
    let matched = matched_for(
      "div.box { width: 20px; height: 10px !important; }",
      &doc,
      div,
    );
    let mut parser = CssParser::new("inline");
    let inline = parser.parse_style_declaration_list("width: 50px; height: 40px;");
    let style = resolve_style(&matched, None, Some(&inline), None, 16.0);
    assert_eq!(
      style.get(PropertyKey::Width),
      &PropertyValue::Length(Length::px(50.0))
    );
    assert_eq!(
      style.get(PropertyKey::Height),
      &PropertyValue::Length(Length::px(10.0))
    );
  }

  #[test]
  fn inherit_and_initial_resolve_against_parent() {
    let (doc, div) = single_div();
    let mut parent = ComputedStyle::initial();
    parent.set(PropertyKey::Width, PropertyValue::Length(Length::px(77.0)));
    parent.set(PropertyKey::Color, PropertyValue::Color(Rgba::WHITE));
    let matched = matched_for("div { width: inherit; color: initial; }", &doc, div);
    let style = resolve_style(&matched, None, None, Some(&parent), 16.0);
    assert_eq!(
      style.get(PropertyKey::Width),
      &PropertyValue::Length(Length::px(77.0))
    );
    assert_eq!(style.color(), Rgba::BLACK);
  }

  #[test]
  fn pseudo_element_declarations_route_to_their_target() {
    let (doc, div) = single_div();
    let matched = matched_for(
      "div.box::before { content: 'x'; width: 5px; } div.box { width: 9px; }",
      &doc,
      div,
    );
    let element_style = resolve_style(&matched, None, None, None, 16.0);
    assert_eq!(
      element_style.get(PropertyKey::Width),
      &PropertyValue::Length(Length::px(9.0))
    );
    let before = resolve_style(&matched, Some(PseudoElement::Before), None, None, 16.0);
    assert_eq!(
      before.get(PropertyKey::Width),
      &PropertyValue::Length(Length::px(5.0))
    );
    assert_eq!(
      before.get(PropertyKey::Content),
      &PropertyValue::String("x".to_string())
    );
  }

  #[test]
  fn em_lengths_resolve_against_own_font_size() {
    let (doc, div) = single_div();
    let matched = matched_for("div { font-size: 20px; padding-top: 0.5em; }", &doc, div);
    let style = resolve_style(&matched, None, None, None, 16.0);
    assert_eq!(
      style.get(PropertyKey::PaddingTop),
      &PropertyValue::Length(Length::px(10.0))
    );
  }
}
