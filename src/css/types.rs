//! CSS rule model
//!
//! Parsed stylesheets: declarations, declared style maps, the rule variants
//! (style, @font-face, @keyframes, @media) and the stylesheet container.
//! Everything here is immutable once parsing finishes; the style engine
//! shares rules by `Arc` and matches against them without copying.

use crate::css::media::MediaList;
use crate::css::properties::PropertyKey;
use crate::css::selector::ComplexSelector;
use crate::css::value::PropertyValue;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A single parsed declaration: property, value, importance
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
  pub property: PropertyKey,
  pub value: PropertyValue,
  pub important: bool,
}

impl Declaration {
  pub fn new(property: PropertyKey, value: PropertyValue) -> Self {
    Self {
      property,
      value,
      important: false,
    }
  }
}

/// A declared value as stored in a declaration block
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredValue {
  pub value: PropertyValue,
  pub important: bool,
}

/// A declaration block: property key -> declared value
///
/// Keys absent from the map are "not set", which is distinct from a key
/// explicitly set to `initial`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeclaredStyle {
  values: FxHashMap<PropertyKey, DeclaredValue>,
}

impl DeclaredStyle {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn get(&self, key: PropertyKey) -> Option<&PropertyValue> {
    self.values.get(&key).map(|d| &d.value)
  }

  pub fn get_declared(&self, key: PropertyKey) -> Option<&DeclaredValue> {
    self.values.get(&key)
  }

  pub fn is_important(&self, key: PropertyKey) -> bool {
    self.values.get(&key).map(|d| d.important).unwrap_or(false)
  }

  /// Set a property; later declarations for the same key overwrite earlier
  /// ones, matching source-order semantics within one block.
  pub fn set(&mut self, key: PropertyKey, value: PropertyValue, important: bool) {
    self.values.insert(key, DeclaredValue { value, important });
  }

  pub fn push(&mut self, declaration: Declaration) {
    self.set(declaration.property, declaration.value, declaration.important);
  }

  pub fn iter(&self) -> impl Iterator<Item = (PropertyKey, &DeclaredValue)> {
    self.values.iter().map(|(k, v)| (*k, v))
  }

  pub fn keys(&self) -> impl Iterator<Item = PropertyKey> + '_ {
    self.values.keys().copied()
  }
}

/// A style rule: selector list plus declaration block
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
  pub selectors: Vec<ComplexSelector>,
  pub declarations: DeclaredStyle,
  /// Rule insertion sequence across the stylesheet set; breaks specificity
  /// ties in the cascade.
  pub source_order: u32,
}

/// A source in a @font-face `src` list
#[derive(Debug, Clone, PartialEq)]
pub enum FontFaceSource {
  Url(String),
  Local(String),
}

/// An @font-face rule
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FontFaceRule {
  pub family: Option<String>,
  pub sources: Vec<FontFaceSource>,
}

/// One keyframe block inside @keyframes: offsets plus a style snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
  /// Offsets in [0, 1]; `25%, 75% { ... }` yields two offsets on one block
  pub offsets: Vec<f32>,
  pub style: DeclaredStyle,
}

/// A named @keyframes rule
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframesRule {
  pub name: String,
  pub keyframes: Vec<Keyframe>,
}

impl KeyframesRule {
  /// Flatten to (offset, style) pairs sorted by offset, preserving source
  /// order among equal offsets (later blocks win during sampling).
  pub fn sorted_offsets(&self) -> Vec<(f32, &DeclaredStyle)> {
    let mut out: Vec<(f32, &DeclaredStyle)> = Vec::new();
    for frame in &self.keyframes {
      for &offset in &frame.offsets {
        out.push((offset, &frame.style));
      }
    }
    out.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    out
  }
}

/// A @media rule: query list plus nested rules
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRule {
  pub media: MediaList,
  pub rules: Vec<Rule>,
}

/// A top-level CSS rule
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
  Style(Arc<StyleRule>),
  FontFace(Arc<FontFaceRule>),
  Keyframes(Arc<KeyframesRule>),
  Media(Arc<MediaRule>),
}

/// A parsed CSS stylesheet
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleSheet {
  pub rules: Vec<Rule>,
}

impl StyleSheet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Style rules applicable under the given media context, in source order,
  /// descending into matching @media blocks.
  pub fn collect_style_rules(&self, ctx: &crate::css::media::MediaContext) -> Vec<Arc<StyleRule>> {
    let mut out = Vec::new();
    collect_into(&self.rules, ctx, &mut out);
    out
  }

  /// All @keyframes rules, including those nested in matching @media blocks.
  pub fn collect_keyframes(&self, ctx: &crate::css::media::MediaContext) -> Vec<Arc<KeyframesRule>> {
    let mut out = Vec::new();
    collect_keyframes_into(&self.rules, ctx, &mut out);
    out
  }

  pub fn style_rule_count(&self) -> usize {
    self
      .rules
      .iter()
      .filter(|r| matches!(r, Rule::Style(_)))
      .count()
  }
}

fn collect_into(
  rules: &[Rule],
  ctx: &crate::css::media::MediaContext,
  out: &mut Vec<Arc<StyleRule>>,
) {
  for rule in rules {
    match rule {
      Rule::Style(style) => out.push(Arc::clone(style)),
      Rule::Media(media) if media.media.evaluate(ctx) => collect_into(&media.rules, ctx, out),
      _ => {}
    }
  }
}

fn collect_keyframes_into(
  rules: &[Rule],
  ctx: &crate::css::media::MediaContext,
  out: &mut Vec<Arc<KeyframesRule>>,
) {
  for rule in rules {
    match rule {
      Rule::Keyframes(kf) => out.push(Arc::clone(kf)),
      Rule::Media(media) if media.media.evaluate(ctx) => {
        collect_keyframes_into(&media.rules, ctx, out)
      }
      _ => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::css::value::{Keyword, PropertyValue};

  #[test]
  fn declared_style_distinguishes_unset_from_initial() {
    let mut style = DeclaredStyle::new();
    assert!(style.get(PropertyKey::Color).is_none());
    style.set(
      PropertyKey::Color,
      PropertyValue::Keyword(Keyword::Initial),
      false,
    );
    assert!(style.get(PropertyKey::Color).is_some());
  }

  #[test]
  fn later_declaration_overwrites_earlier() {
    let mut style = DeclaredStyle::new();
    style.set(PropertyKey::Opacity, PropertyValue::Number(0.5), false);
    style.set(PropertyKey::Opacity, PropertyValue::Number(0.9), false);
    assert_eq!(
      style.get(PropertyKey::Opacity),
      Some(&PropertyValue::Number(0.9))
    );
    assert_eq!(style.len(), 1);
  }

  #[test]
  fn keyframes_sorted_offsets_flattens_multi_offset_blocks() {
    let mut style = DeclaredStyle::new();
    style.set(PropertyKey::Opacity, PropertyValue::Number(0.5), false);
    let rule = KeyframesRule {
      name: "fade".to_string(),
      keyframes: vec![
        Keyframe {
          offsets: vec![0.25, 0.75],
          style: style.clone(),
        },
        Keyframe {
          offsets: vec![0.0],
          style,
        },
      ],
    };
    let sorted = rule.sorted_offsets();
    let offsets: Vec<f32> = sorted.iter().map(|(o, _)| *o).collect();
    assert_eq!(offsets, vec![0.0, 0.25, 0.75]);
  }
}
