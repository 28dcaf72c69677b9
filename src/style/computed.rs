//! Computed style
//!
//! A [`ComputedStyle`] holds one resolved value for every supported
//! property. It is total by construction: slots start at the property's
//! initial value and the cascade overwrites the ones that matched
//! declarations, so lookups never miss.
//!
//! After [`ComputedStyle::absolutize`] runs, font-relative lengths are gone:
//! `em` and `rem` have been multiplied out against the font sizes in scope,
//! and out-of-range scalars (opacity) are clamped. Published snapshots are
//! shared as `Arc<ComputedStyle>` and never mutated afterwards.

use crate::css::properties::{PropertyKey, PROPERTY_COUNT};
use crate::css::transform::{TransformFunction, TransformList, TranslateOffset};
use crate::css::value::{Keyword, Length, PropertyValue, Rgba};
use std::sync::Arc;

/// Default root font size in pixels when nothing sets one.
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

/// One value per supported property.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
  values: Box<[PropertyValue; PROPERTY_COUNT]>,
}

impl Default for ComputedStyle {
  fn default() -> Self {
    Self::initial()
  }
}

impl ComputedStyle {
  /// Every property at its initial value.
  pub fn initial() -> Self {
    Self {
      values: Box::new(std::array::from_fn(|i| PropertyKey::ALL[i].initial_value())),
    }
  }

  /// Start from a parent style: inherited properties copy the parent's
  /// computed value, the rest reset to initial.
  pub fn inherited_from(parent: &ComputedStyle) -> Self {
    Self {
      values: Box::new(std::array::from_fn(|i| {
        let key = PropertyKey::ALL[i];
        if key.is_inherited() {
          parent.get(key).clone()
        } else {
          key.initial_value()
        }
      })),
    }
  }

  pub fn get(&self, key: PropertyKey) -> &PropertyValue {
    &self.values[key.index()]
  }

  pub fn set(&mut self, key: PropertyKey, value: PropertyValue) {
    self.values[key.index()] = value;
  }

  // --------------------------------------------------------------------------
  // Typed accessors
  // --------------------------------------------------------------------------

  /// Opacity clamped to [0, 1].
  pub fn opacity(&self) -> f32 {
    self
      .get(PropertyKey::Opacity)
      .as_number()
      .unwrap_or(1.0)
      .clamp(0.0, 1.0)
  }

  pub fn color(&self) -> Rgba {
    self.get(PropertyKey::Color).as_color().unwrap_or(Rgba::BLACK)
  }

  pub fn background_color(&self) -> Rgba {
    self
      .get(PropertyKey::BackgroundColor)
      .as_color()
      .unwrap_or(Rgba::TRANSPARENT)
  }

  pub fn display(&self) -> Keyword {
    self
      .get(PropertyKey::Display)
      .as_keyword()
      .unwrap_or(Keyword::Inline)
  }

  pub fn is_displayed(&self) -> bool {
    self.display() != Keyword::None
  }

  /// Font size in pixels. Only meaningful after absolutization.
  pub fn font_size(&self) -> f32 {
    match self.get(PropertyKey::FontSize) {
      PropertyValue::Length(length) if length.is_absolute() => length.value,
      _ => DEFAULT_FONT_SIZE,
    }
  }

  /// The transform list, or `None` for `transform: none`.
  pub fn transform(&self) -> Option<&TransformList> {
    match self.get(PropertyKey::Transform) {
      PropertyValue::Transform(list) => Some(list),
      _ => None,
    }
  }

  pub fn z_index(&self) -> Option<i64> {
    match self.get(PropertyKey::ZIndex) {
      PropertyValue::Integer(i) => Some(*i),
      _ => None,
    }
  }

  // --------------------------------------------------------------------------
  // Absolutization
  // --------------------------------------------------------------------------

  /// Resolve font-relative lengths and clamp range-limited scalars.
  ///
  /// Font size resolves first, against the parent's font size, because every
  /// other `em` on this element resolves against this element's own font
  /// size.
  pub fn absolutize(&mut self, parent_font_size: f32, root_font_size: f32) {
    let font_size = match self.get(PropertyKey::FontSize) {
      PropertyValue::Length(length) => length.to_px(parent_font_size, root_font_size),
      // Percentage font sizes scale the parent's size.
      PropertyValue::Percentage(pct) => parent_font_size * pct / 100.0,
      PropertyValue::Calc(calc) => {
        calc.length.to_px(parent_font_size, root_font_size)
          + parent_font_size * calc.percentage / 100.0
      }
      _ => parent_font_size,
    };
    self.set(
      PropertyKey::FontSize,
      PropertyValue::Length(Length::px(font_size)),
    );

    for i in 0..PROPERTY_COUNT {
      if PropertyKey::ALL[i] == PropertyKey::FontSize {
        continue;
      }
      absolutize_value(&mut self.values[i], font_size, root_font_size);
    }

    let opacity = self.opacity();
    self.set(PropertyKey::Opacity, PropertyValue::Number(opacity));
  }

  pub fn into_arc(self) -> Arc<ComputedStyle> {
    Arc::new(self)
  }
}

fn absolutize_value(value: &mut PropertyValue, font_size: f32, root_font_size: f32) {
  match value {
    PropertyValue::Length(length) => {
      if !length.is_absolute() {
        *length = Length::px(length.to_px(font_size, root_font_size));
      }
    }
    PropertyValue::Calc(calc) => {
      if !calc.length.is_absolute() {
        calc.length = Length::px(calc.length.to_px(font_size, root_font_size));
      }
    }
    PropertyValue::List(items) => {
      for item in items {
        absolutize_value(item, font_size, root_font_size);
      }
    }
    PropertyValue::Transform(list) => {
      for function in &mut list.functions {
        if let TransformFunction::Translate { offset, .. } = function {
          if let TranslateOffset::Length(length) = offset {
            if !length.is_absolute() {
              *length = Length::px(length.to_px(font_size, root_font_size));
            }
          }
        }
      }
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::css::value::LengthUnit;

  #[test]
  fn initial_style_is_total() {
    let style = ComputedStyle::initial();
    for &key in PropertyKey::ALL {
      assert_eq!(style.get(key), &key.initial_value(), "{}", key.name());
    }
  }

  #[test]
  fn inheritance_copies_only_inherited_properties() {
    let mut parent = ComputedStyle::initial();
    parent.set(PropertyKey::Color, PropertyValue::Color(Rgba::WHITE));
    parent.set(PropertyKey::Opacity, PropertyValue::Number(0.5));
    let child = ComputedStyle::inherited_from(&parent);
    assert_eq!(child.color(), Rgba::WHITE);
    assert_eq!(child.opacity(), 1.0); // opacity does not inherit
  }

  #[test]
  fn font_size_resolves_before_other_ems() {
    let mut style = ComputedStyle::initial();
    style.set(
      PropertyKey::FontSize,
      PropertyValue::Length(Length::new(2.0, LengthUnit::Em)),
    );
    style.set(
      PropertyKey::MarginTop,
      PropertyValue::Length(Length::new(1.0, LengthUnit::Em)),
    );
    style.set(
      PropertyKey::PaddingLeft,
      PropertyValue::Length(Length::new(1.0, LengthUnit::Rem)),
    );
    style.absolutize(10.0, 16.0);
    assert_eq!(style.font_size(), 20.0);
    assert_eq!(
      style.get(PropertyKey::MarginTop),
      &PropertyValue::Length(Length::px(20.0))
    );
    assert_eq!(
      style.get(PropertyKey::PaddingLeft),
      &PropertyValue::Length(Length::px(16.0))
    );
  }

  #[test]
  fn opacity_clamps_to_unit_range() {
    let mut style = ComputedStyle::initial();
    style.set(PropertyKey::Opacity, PropertyValue::Number(2.5));
    style.absolutize(16.0, 16.0);
    assert_eq!(style.get(PropertyKey::Opacity), &PropertyValue::Number(1.0));
    let mut style = ComputedStyle::initial();
    style.set(PropertyKey::Opacity, PropertyValue::Number(-1.0));
    style.absolutize(16.0, 16.0);
    assert_eq!(style.get(PropertyKey::Opacity), &PropertyValue::Number(0.0));
  }
}
