//! CSS property table
//!
//! The closed set of supported longhand properties, plus per-property
//! metadata the cascade needs: inheritance, animatability and initial
//! values. Shorthand names are a separate closed set; the parser expands
//! them into longhands at parse time.
//!
//! Reference: CSS Cascading and Inheritance Level 3
//! <https://www.w3.org/TR/css-cascade-3/>

use crate::css::value::{Keyword, Length, PropertyValue, Rgba, TimingFunction};

macro_rules! property_keys {
  ($(($variant:ident, $name:literal)),+ $(,)?) => {
    /// A supported longhand CSS property
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum PropertyKey {
      $($variant),+
    }

    impl PropertyKey {
      /// Every supported longhand, in declaration order
      pub const ALL: &'static [PropertyKey] = &[$(PropertyKey::$variant),+];

      /// The CSS name of this property
      pub fn name(self) -> &'static str {
        match self {
          $(PropertyKey::$variant => $name),+
        }
      }

      /// Look up a longhand by its CSS name (already lowercased)
      pub fn from_name(name: &str) -> Option<PropertyKey> {
        match name {
          $($name => Some(PropertyKey::$variant),)+
          _ => None,
        }
      }
    }
  };
}

property_keys![
  (AnimationDelay, "animation-delay"),
  (AnimationDirection, "animation-direction"),
  (AnimationDuration, "animation-duration"),
  (AnimationFillMode, "animation-fill-mode"),
  (AnimationIterationCount, "animation-iteration-count"),
  (AnimationName, "animation-name"),
  (AnimationTimingFunction, "animation-timing-function"),
  (BackgroundColor, "background-color"),
  (BackgroundImage, "background-image"),
  (BackgroundPosition, "background-position"),
  (BackgroundRepeat, "background-repeat"),
  (BackgroundSize, "background-size"),
  (BorderBottomColor, "border-bottom-color"),
  (BorderBottomStyle, "border-bottom-style"),
  (BorderBottomWidth, "border-bottom-width"),
  (BorderLeftColor, "border-left-color"),
  (BorderLeftStyle, "border-left-style"),
  (BorderLeftWidth, "border-left-width"),
  (BorderRadius, "border-radius"),
  (BorderRightColor, "border-right-color"),
  (BorderRightStyle, "border-right-style"),
  (BorderRightWidth, "border-right-width"),
  (BorderTopColor, "border-top-color"),
  (BorderTopStyle, "border-top-style"),
  (BorderTopWidth, "border-top-width"),
  (Bottom, "bottom"),
  (Color, "color"),
  (Content, "content"),
  (Display, "display"),
  (FontFamily, "font-family"),
  (FontSize, "font-size"),
  (FontStyle, "font-style"),
  (FontWeight, "font-weight"),
  (Height, "height"),
  (Left, "left"),
  (LineHeight, "line-height"),
  (MarginBottom, "margin-bottom"),
  (MarginLeft, "margin-left"),
  (MarginRight, "margin-right"),
  (MarginTop, "margin-top"),
  (MaxHeight, "max-height"),
  (MaxWidth, "max-width"),
  (MinHeight, "min-height"),
  (MinWidth, "min-width"),
  (Opacity, "opacity"),
  (Overflow, "overflow"),
  (OverflowWrap, "overflow-wrap"),
  (PaddingBottom, "padding-bottom"),
  (PaddingLeft, "padding-left"),
  (PaddingRight, "padding-right"),
  (PaddingTop, "padding-top"),
  (Position, "position"),
  (Right, "right"),
  (TabSize, "tab-size"),
  (TextAlign, "text-align"),
  (TextIndent, "text-indent"),
  (TextOverflow, "text-overflow"),
  (TextTransform, "text-transform"),
  (Top, "top"),
  (Transform, "transform"),
  (TransitionDelay, "transition-delay"),
  (TransitionDuration, "transition-duration"),
  (TransitionProperty, "transition-property"),
  (TransitionTimingFunction, "transition-timing-function"),
  (VerticalAlign, "vertical-align"),
  (Visibility, "visibility"),
  (WhiteSpace, "white-space"),
  (Width, "width"),
  (ZIndex, "z-index"),
];

/// Number of longhand properties; computed styles are arrays of this size.
pub const PROPERTY_COUNT: usize = PropertyKey::ALL.len();

impl PropertyKey {
  /// Stable index of this key, usable into `[_; PROPERTY_COUNT]` arrays.
  pub fn index(self) -> usize {
    self as usize
  }

  /// Whether the property inherits by default.
  pub fn is_inherited(self) -> bool {
    use PropertyKey::*;
    matches!(
      self,
      Color
        | FontFamily
        | FontSize
        | FontStyle
        | FontWeight
        | LineHeight
        | OverflowWrap
        | TabSize
        | TextAlign
        | TextIndent
        | TextTransform
        | Visibility
        | WhiteSpace
    )
  }

  /// Whether transitions may animate this property: colors, numbers,
  /// lengths, integers and transforms all have defined interpolation.
  pub fn is_animatable(self) -> bool {
    use PropertyKey::*;
    matches!(
      self,
      BackgroundColor
        | BorderBottomColor
        | BorderBottomWidth
        | BorderLeftColor
        | BorderLeftWidth
        | BorderRadius
        | BorderRightColor
        | BorderRightWidth
        | BorderTopColor
        | BorderTopWidth
        | Bottom
        | Color
        | FontSize
        | Height
        | Left
        | LineHeight
        | MarginBottom
        | MarginLeft
        | MarginRight
        | MarginTop
        | MaxHeight
        | MaxWidth
        | MinHeight
        | MinWidth
        | Opacity
        | PaddingBottom
        | PaddingLeft
        | PaddingRight
        | PaddingTop
        | Right
        | TextIndent
        | Top
        | Transform
        | Width
        | ZIndex
    )
  }

  /// The property's defined initial value.
  pub fn initial_value(self) -> PropertyValue {
    use PropertyKey::*;
    match self {
      AnimationDelay | AnimationDuration | TransitionDelay | TransitionDuration => {
        PropertyValue::TimeList(vec![0.0])
      }
      AnimationDirection => PropertyValue::List(vec![PropertyValue::Keyword(Keyword::Normal)]),
      AnimationFillMode => PropertyValue::List(vec![PropertyValue::NONE]),
      AnimationIterationCount => PropertyValue::List(vec![PropertyValue::Number(1.0)]),
      AnimationName => PropertyValue::NONE,
      AnimationTimingFunction | TransitionTimingFunction => {
        PropertyValue::TimingFunctionList(vec![TimingFunction::EASE])
      }
      BackgroundColor => PropertyValue::Color(Rgba::TRANSPARENT),
      BackgroundImage => PropertyValue::NONE,
      BackgroundPosition => PropertyValue::List(vec![
        PropertyValue::Percentage(0.0),
        PropertyValue::Percentage(0.0),
      ]),
      BackgroundRepeat => PropertyValue::List(vec![
        PropertyValue::Keyword(Keyword::Repeat),
        PropertyValue::Keyword(Keyword::Repeat),
      ]),
      BackgroundSize => PropertyValue::List(vec![PropertyValue::AUTO, PropertyValue::AUTO]),
      BorderBottomColor | BorderLeftColor | BorderRightColor | BorderTopColor => {
        PropertyValue::Color(Rgba::BLACK)
      }
      BorderBottomStyle | BorderLeftStyle | BorderRightStyle | BorderTopStyle => PropertyValue::NONE,
      BorderBottomWidth | BorderLeftWidth | BorderRightWidth | BorderTopWidth => {
        // 'medium'
        PropertyValue::Length(Length::px(3.0))
      }
      BorderRadius | MarginBottom | MarginLeft | MarginRight | MarginTop | PaddingBottom
      | PaddingLeft | PaddingRight | PaddingTop | TextIndent => {
        PropertyValue::Length(Length::px(0.0))
      }
      Bottom | Left | Right | Top | Height | Width | ZIndex => PropertyValue::AUTO,
      Color => PropertyValue::Color(Rgba::BLACK),
      Content | LineHeight | FontStyle | FontWeight | OverflowWrap | WhiteSpace => {
        PropertyValue::NORMAL
      }
      Display => PropertyValue::Keyword(Keyword::Inline),
      FontFamily => PropertyValue::List(vec![PropertyValue::Keyword(Keyword::SansSerif)]),
      FontSize => PropertyValue::Length(Length::px(16.0)),
      MaxHeight | MaxWidth | TextTransform | Transform => PropertyValue::NONE,
      MinHeight | MinWidth => PropertyValue::Length(Length::px(0.0)),
      Opacity => PropertyValue::Number(1.0),
      Overflow | Visibility => PropertyValue::Keyword(Keyword::Visible),
      Position => PropertyValue::Keyword(Keyword::Static),
      TabSize => PropertyValue::Integer(8),
      TextAlign => PropertyValue::Keyword(Keyword::Left),
      TextOverflow => PropertyValue::Keyword(Keyword::Clip),
      TransitionProperty => PropertyValue::Keyword(Keyword::All),
      VerticalAlign => PropertyValue::Keyword(Keyword::Baseline),
    }
  }
}

/// A supported shorthand property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shorthand {
  Animation,
  Background,
  Border,
  BorderBottom,
  BorderColor,
  BorderLeft,
  BorderRight,
  BorderStyle,
  BorderTop,
  BorderWidth,
  Font,
  Margin,
  Padding,
  Transition,
}

impl Shorthand {
  pub fn from_name(name: &str) -> Option<Shorthand> {
    Some(match name {
      "animation" => Shorthand::Animation,
      "background" => Shorthand::Background,
      "border" => Shorthand::Border,
      "border-bottom" => Shorthand::BorderBottom,
      "border-color" => Shorthand::BorderColor,
      "border-left" => Shorthand::BorderLeft,
      "border-right" => Shorthand::BorderRight,
      "border-style" => Shorthand::BorderStyle,
      "border-top" => Shorthand::BorderTop,
      "border-width" => Shorthand::BorderWidth,
      "font" => Shorthand::Font,
      "margin" => Shorthand::Margin,
      "padding" => Shorthand::Padding,
      "transition" => Shorthand::Transition,
      _ => return None,
    })
  }

  /// The longhands this shorthand resets. Parsing a shorthand always sets
  /// every one of these, either to an explicit sub-value or to its initial
  /// value.
  pub fn longhands(self) -> &'static [PropertyKey] {
    use PropertyKey::*;
    match self {
      Shorthand::Animation => &[
        AnimationDelay,
        AnimationDirection,
        AnimationDuration,
        AnimationFillMode,
        AnimationIterationCount,
        AnimationName,
        AnimationTimingFunction,
      ],
      Shorthand::Background => &[
        BackgroundColor,
        BackgroundImage,
        BackgroundPosition,
        BackgroundRepeat,
        BackgroundSize,
      ],
      Shorthand::Border => &[
        BorderTopColor,
        BorderTopStyle,
        BorderTopWidth,
        BorderRightColor,
        BorderRightStyle,
        BorderRightWidth,
        BorderBottomColor,
        BorderBottomStyle,
        BorderBottomWidth,
        BorderLeftColor,
        BorderLeftStyle,
        BorderLeftWidth,
      ],
      Shorthand::BorderBottom => &[BorderBottomColor, BorderBottomStyle, BorderBottomWidth],
      Shorthand::BorderColor => &[
        BorderTopColor,
        BorderRightColor,
        BorderBottomColor,
        BorderLeftColor,
      ],
      Shorthand::BorderLeft => &[BorderLeftColor, BorderLeftStyle, BorderLeftWidth],
      Shorthand::BorderRight => &[BorderRightColor, BorderRightStyle, BorderRightWidth],
      Shorthand::BorderStyle => &[
        BorderTopStyle,
        BorderRightStyle,
        BorderBottomStyle,
        BorderLeftStyle,
      ],
      Shorthand::BorderTop => &[BorderTopColor, BorderTopStyle, BorderTopWidth],
      Shorthand::BorderWidth => &[
        BorderTopWidth,
        BorderRightWidth,
        BorderBottomWidth,
        BorderLeftWidth,
      ],
      Shorthand::Font => &[FontFamily, FontSize, FontStyle, FontWeight, LineHeight],
      Shorthand::Margin => &[MarginTop, MarginRight, MarginBottom, MarginLeft],
      Shorthand::Padding => &[PaddingTop, PaddingRight, PaddingBottom, PaddingLeft],
      Shorthand::Transition => &[
        TransitionDelay,
        TransitionDuration,
        TransitionProperty,
        TransitionTimingFunction,
      ],
    }
  }
}

/// Strip a recognized vendor prefix, returning the unprefixed name.
pub fn strip_vendor_prefix(name: &str) -> Option<&str> {
  for prefix in ["-webkit-", "-moz-", "-ms-", "-o-"] {
    if let Some(stripped) = name.strip_prefix(prefix) {
      return Some(stripped);
    }
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn name_lookup_roundtrips() {
    for &key in PropertyKey::ALL {
      assert_eq!(PropertyKey::from_name(key.name()), Some(key));
    }
    assert_eq!(PropertyKey::from_name("pony"), None);
    assert_eq!(PropertyKey::from_name("background"), None);
  }

  #[test]
  fn indices_are_dense_and_stable() {
    for (i, &key) in PropertyKey::ALL.iter().enumerate() {
      assert_eq!(key.index(), i);
    }
    assert_eq!(PROPERTY_COUNT, PropertyKey::ALL.len());
  }

  #[test]
  fn typography_inherits_box_model_does_not() {
    assert!(PropertyKey::Color.is_inherited());
    assert!(PropertyKey::FontSize.is_inherited());
    assert!(!PropertyKey::MarginTop.is_inherited());
    assert!(!PropertyKey::BackgroundColor.is_inherited());
  }

  #[test]
  fn every_property_has_an_initial_value() {
    for &key in PropertyKey::ALL {
      // Must not panic, and CSS-wide keywords are never initial values.
      let value = key.initial_value();
      assert!(!value.is_css_wide(), "{} has css-wide initial", key.name());
    }
  }

  #[test]
  fn shorthand_name_lookup_handles_unknown_names() {
    assert_eq!(Shorthand::from_name("border"), Some(Shorthand::Border));
    assert_eq!(Shorthand::from_name("transition"), Some(Shorthand::Transition));
    assert_eq!(Shorthand::from_name("pony"), None);
    // Longhands are not shorthands.
    assert_eq!(Shorthand::from_name("border-top-width"), None);
  }

  #[test]
  fn lengths_and_integers_are_animatable_keywords_are_not() {
    assert!(PropertyKey::Width.is_animatable());
    assert!(PropertyKey::MarginLeft.is_animatable());
    assert!(PropertyKey::FontSize.is_animatable());
    assert!(PropertyKey::ZIndex.is_animatable());
    assert!(PropertyKey::Color.is_animatable());
    assert!(!PropertyKey::Display.is_animatable());
    assert!(!PropertyKey::FontFamily.is_animatable());
    assert!(!PropertyKey::TransitionDuration.is_animatable());
  }

  #[test]
  fn shorthand_longhands_are_in_the_closed_set() {
    for shorthand in [
      Shorthand::Animation,
      Shorthand::Background,
      Shorthand::Border,
      Shorthand::Font,
      Shorthand::Margin,
      Shorthand::Transition,
    ] {
      assert!(!shorthand.longhands().is_empty());
    }
    assert_eq!(Shorthand::Border.longhands().len(), 12);
  }

  #[test]
  fn vendor_prefixes_strip() {
    assert_eq!(strip_vendor_prefix("-webkit-transform"), Some("transform"));
    assert_eq!(strip_vendor_prefix("-moz-transform"), Some("transform"));
    assert_eq!(strip_vendor_prefix("transform"), None);
  }
}
