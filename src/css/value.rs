//! CSS value types
//!
//! The property value model: a closed tagged union of every value shape the
//! supported property set can produce, plus the scalar types they are built
//! from (lengths, colors, timing functions).
//!
//! Values are immutable once constructed. Declared and computed styles share
//! them freely; cloning is cheap for scalars and keywords, and list values
//! clone their contents.
//!
//! Reference: CSS Values and Units Module Level 3
//! <https://www.w3.org/TR/css-values-3/>

use crate::css::properties::PropertyKey;
use crate::css::transform::TransformList;
use std::fmt;

/// CSS length units surviving to the value model
///
/// Absolute units other than `px` (pt, pc, in, cm, mm, q) are converted to
/// pixels during parsing, so only `px` and the font-relative units remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
  /// Pixels - CSS reference unit, 1/96th of an inch
  Px,
  /// Relative to the element's font size
  Em,
  /// Relative to the root element's font size
  Rem,
}

impl LengthUnit {
  pub fn is_absolute(self) -> bool {
    matches!(self, LengthUnit::Px)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      LengthUnit::Px => "px",
      LengthUnit::Em => "em",
      LengthUnit::Rem => "rem",
    }
  }
}

/// A CSS length: a scalar with a unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length {
  pub value: f32,
  pub unit: LengthUnit,
}

impl Length {
  pub fn new(value: f32, unit: LengthUnit) -> Self {
    Self { value, unit }
  }

  pub fn px(value: f32) -> Self {
    Self::new(value, LengthUnit::Px)
  }

  pub fn is_absolute(&self) -> bool {
    self.unit.is_absolute()
  }

  /// Resolve to pixels given font-size context.
  ///
  /// `em` multiplies the element's font size, `rem` the root font size.
  pub fn to_px(&self, font_size: f32, root_font_size: f32) -> f32 {
    match self.unit {
      LengthUnit::Px => self.value,
      LengthUnit::Em => self.value * font_size,
      LengthUnit::Rem => self.value * root_font_size,
    }
  }
}

impl fmt::Display for Length {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.value, self.unit.as_str())
  }
}

/// A color in 8-bit RGBA form
///
/// RGB components clamp to [0, 255] and alpha to [0, 1] at construction
/// time, so a stored color is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}

impl Rgba {
  pub const TRANSPARENT: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0 };
  pub const BLACK: Rgba = Rgba { r: 0, g: 0, b: 0, a: 255 };
  pub const WHITE: Rgba = Rgba {
    r: 255,
    g: 255,
    b: 255,
    a: 255,
  };

  pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
    Self { r, g, b, a }
  }

  /// Build from possibly out-of-range integer components and a fractional
  /// alpha, applying the CSS clamping rules.
  pub fn from_clamped(r: i32, g: i32, b: i32, alpha: f32) -> Self {
    let clamp_chan = |c: i32| c.clamp(0, 255) as u8;
    Self {
      r: clamp_chan(r),
      g: clamp_chan(g),
      b: clamp_chan(b),
      a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
    }
  }

  pub fn alpha_f32(&self) -> f32 {
    self.a as f32 / 255.0
  }
}

impl fmt::Display for Rgba {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "rgba({}, {}, {}, {})",
      self.r,
      self.g,
      self.b,
      self.alpha_f32()
    )
  }
}

/// A CSS timing function (easing curve)
///
/// Reference: CSS Transitions, timing functions
/// <https://www.w3.org/TR/css3-transitions/#transition-timing-function>
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimingFunction {
  /// cubic-bezier(x1, y1, x2, y2); x values are in [0, 1]
  CubicBezier { x1: f32, y1: f32, x2: f32, y2: f32 },
  /// steps(count, start|end); `at_start` selects the rising edge position
  Steps { count: i32, at_start: bool },
}

impl TimingFunction {
  pub const LINEAR: TimingFunction = TimingFunction::CubicBezier {
    x1: 0.0,
    y1: 0.0,
    x2: 1.0,
    y2: 1.0,
  };
  pub const EASE: TimingFunction = TimingFunction::CubicBezier {
    x1: 0.25,
    y1: 0.1,
    x2: 0.25,
    y2: 1.0,
  };
  pub const EASE_IN: TimingFunction = TimingFunction::CubicBezier {
    x1: 0.42,
    y1: 0.0,
    x2: 1.0,
    y2: 1.0,
  };
  pub const EASE_OUT: TimingFunction = TimingFunction::CubicBezier {
    x1: 0.0,
    y1: 0.0,
    x2: 0.58,
    y2: 1.0,
  };
  pub const EASE_IN_OUT: TimingFunction = TimingFunction::CubicBezier {
    x1: 0.42,
    y1: 0.0,
    x2: 0.58,
    y2: 1.0,
  };
  pub const STEP_START: TimingFunction = TimingFunction::Steps {
    count: 1,
    at_start: true,
  };
  pub const STEP_END: TimingFunction = TimingFunction::Steps {
    count: 1,
    at_start: false,
  };

  /// Evaluate the curve at time progress `x` in [0, 1], returning the output
  /// progress.
  pub fn evaluate(&self, x: f32) -> f32 {
    match *self {
      TimingFunction::CubicBezier { x1, y1, x2, y2 } => {
        let x = x.clamp(0.0, 1.0);
        if x == 0.0 || x == 1.0 {
          return x;
        }
        let t = solve_bezier_t(x, x1, x2);
        bezier_component(t, y1, y2)
      }
      TimingFunction::Steps { count, at_start } => {
        let x = x.clamp(0.0, 1.0);
        let count = count.max(1) as f32;
        let mut step = (x * count).floor();
        if at_start {
          step += 1.0;
        }
        // The final rising edge lands exactly on 1.0.
        (step / count).clamp(0.0, 1.0)
      }
    }
  }
}

fn bezier_component(t: f32, p1: f32, p2: f32) -> f32 {
  // Cubic bezier with endpoints pinned at 0 and 1.
  let one_t = 1.0 - t;
  3.0 * one_t * one_t * t * p1 + 3.0 * one_t * t * t * p2 + t * t * t
}

fn bezier_derivative(t: f32, p1: f32, p2: f32) -> f32 {
  let one_t = 1.0 - t;
  3.0 * one_t * one_t * p1 + 6.0 * one_t * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}

/// Solve the bezier's x(t) = x for t, Newton's method with a bisection
/// fallback when the derivative vanishes.
fn solve_bezier_t(x: f32, x1: f32, x2: f32) -> f32 {
  let mut t = x;
  for _ in 0..8 {
    let err = bezier_component(t, x1, x2) - x;
    if err.abs() < 1e-6 {
      return t;
    }
    let d = bezier_derivative(t, x1, x2);
    if d.abs() < 1e-6 {
      break;
    }
    t -= err / d;
  }

  let (mut lo, mut hi) = (0.0f32, 1.0f32);
  t = x;
  for _ in 0..32 {
    let v = bezier_component(t, x1, x2);
    if (v - x).abs() < 1e-6 {
      break;
    }
    if v < x {
      lo = t;
    } else {
      hi = t;
    }
    t = (lo + hi) / 2.0;
  }
  t
}

/// A calc() value: the length-plus-percentage subset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalcValue {
  pub length: Length,
  pub percentage: f32,
}

/// CSS keywords accepted by the supported property set
///
/// A closed vocabulary; `Inherit` and `Initial` are the CSS-wide keywords,
/// stored in declared styles and resolved by the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
  Absolute,
  All,
  Alternate,
  AlternateReverse,
  Auto,
  Backwards,
  Baseline,
  Block,
  Bold,
  Both,
  Bottom,
  BreakWord,
  Center,
  Clip,
  Contain,
  Cover,
  Cursive,
  Ellipsis,
  Fantasy,
  Fixed,
  Forwards,
  Hidden,
  Infinite,
  Inherit,
  Initial,
  Inline,
  InlineBlock,
  Italic,
  Left,
  Middle,
  Monospace,
  None,
  NoRepeat,
  Normal,
  NoWrap,
  Oblique,
  Pre,
  Relative,
  Repeat,
  Reverse,
  Right,
  SansSerif,
  Serif,
  Solid,
  Static,
  Top,
  Uppercase,
  Visible,
}

impl Keyword {
  pub fn as_str(self) -> &'static str {
    match self {
      Keyword::Absolute => "absolute",
      Keyword::All => "all",
      Keyword::Alternate => "alternate",
      Keyword::AlternateReverse => "alternate-reverse",
      Keyword::Auto => "auto",
      Keyword::Backwards => "backwards",
      Keyword::Baseline => "baseline",
      Keyword::Block => "block",
      Keyword::Bold => "bold",
      Keyword::Both => "both",
      Keyword::Bottom => "bottom",
      Keyword::BreakWord => "break-word",
      Keyword::Center => "center",
      Keyword::Clip => "clip",
      Keyword::Contain => "contain",
      Keyword::Cover => "cover",
      Keyword::Cursive => "cursive",
      Keyword::Ellipsis => "ellipsis",
      Keyword::Fantasy => "fantasy",
      Keyword::Fixed => "fixed",
      Keyword::Forwards => "forwards",
      Keyword::Hidden => "hidden",
      Keyword::Infinite => "infinite",
      Keyword::Inherit => "inherit",
      Keyword::Initial => "initial",
      Keyword::Inline => "inline",
      Keyword::InlineBlock => "inline-block",
      Keyword::Italic => "italic",
      Keyword::Left => "left",
      Keyword::Middle => "middle",
      Keyword::Monospace => "monospace",
      Keyword::None => "none",
      Keyword::NoRepeat => "no-repeat",
      Keyword::Normal => "normal",
      Keyword::NoWrap => "nowrap",
      Keyword::Oblique => "oblique",
      Keyword::Pre => "pre",
      Keyword::Relative => "relative",
      Keyword::Repeat => "repeat",
      Keyword::Reverse => "reverse",
      Keyword::Right => "right",
      Keyword::SansSerif => "sans-serif",
      Keyword::Serif => "serif",
      Keyword::Solid => "solid",
      Keyword::Static => "static",
      Keyword::Top => "top",
      Keyword::Uppercase => "uppercase",
      Keyword::Visible => "visible",
    }
  }

  /// Look up a keyword by its CSS identifier (ASCII case-insensitive).
  pub fn from_ident(ident: &str) -> Option<Keyword> {
    let lower = ident.to_ascii_lowercase();
    Some(match lower.as_str() {
      "absolute" => Keyword::Absolute,
      "all" => Keyword::All,
      "alternate" => Keyword::Alternate,
      "alternate-reverse" => Keyword::AlternateReverse,
      "auto" => Keyword::Auto,
      "backwards" => Keyword::Backwards,
      "baseline" => Keyword::Baseline,
      "block" => Keyword::Block,
      "bold" => Keyword::Bold,
      "both" => Keyword::Both,
      "bottom" => Keyword::Bottom,
      "break-word" => Keyword::BreakWord,
      "center" => Keyword::Center,
      "clip" => Keyword::Clip,
      "contain" => Keyword::Contain,
      "cover" => Keyword::Cover,
      "cursive" => Keyword::Cursive,
      "ellipsis" => Keyword::Ellipsis,
      "fantasy" => Keyword::Fantasy,
      "fixed" => Keyword::Fixed,
      "forwards" => Keyword::Forwards,
      "hidden" => Keyword::Hidden,
      "infinite" => Keyword::Infinite,
      "inherit" => Keyword::Inherit,
      "initial" => Keyword::Initial,
      "inline" => Keyword::Inline,
      "inline-block" => Keyword::InlineBlock,
      "italic" => Keyword::Italic,
      "left" => Keyword::Left,
      "middle" => Keyword::Middle,
      "monospace" => Keyword::Monospace,
      "none" => Keyword::None,
      "no-repeat" => Keyword::NoRepeat,
      "normal" => Keyword::Normal,
      "nowrap" => Keyword::NoWrap,
      "oblique" => Keyword::Oblique,
      "pre" => Keyword::Pre,
      "relative" => Keyword::Relative,
      "repeat" => Keyword::Repeat,
      "reverse" => Keyword::Reverse,
      "right" => Keyword::Right,
      "sans-serif" => Keyword::SansSerif,
      "serif" => Keyword::Serif,
      "solid" => Keyword::Solid,
      "static" => Keyword::Static,
      "top" => Keyword::Top,
      "uppercase" => Keyword::Uppercase,
      "visible" => Keyword::Visible,
      _ => return None,
    })
  }
}

/// A parsed CSS property value
///
/// Closed union over every value shape in the supported property set.
/// Structural equality via `PartialEq`; interpolation for the animatable
/// subset lives in [`crate::animation::interpolate`].
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
  Keyword(Keyword),
  Length(Length),
  Percentage(f32),
  Number(f32),
  Integer(i64),
  Color(Rgba),
  String(String),
  Url(String),
  /// Ordered list of values; insertion order is significant
  /// (e.g. background layers, font-family fallbacks, animation-name).
  List(Vec<PropertyValue>),
  /// Times in seconds (transition/animation durations and delays)
  TimeList(Vec<f32>),
  TimingFunctionList(Vec<TimingFunction>),
  Transform(TransformList),
  Calc(CalcValue),
  /// Property references (transition-property)
  PropertyKeyList(Vec<PropertyKey>),
}

impl PropertyValue {
  pub const NONE: PropertyValue = PropertyValue::Keyword(Keyword::None);
  pub const AUTO: PropertyValue = PropertyValue::Keyword(Keyword::Auto);
  pub const NORMAL: PropertyValue = PropertyValue::Keyword(Keyword::Normal);

  pub fn is_keyword(&self, keyword: Keyword) -> bool {
    matches!(self, PropertyValue::Keyword(k) if *k == keyword)
  }

  pub fn is_css_wide(&self) -> bool {
    self.is_keyword(Keyword::Inherit) || self.is_keyword(Keyword::Initial)
  }

  pub fn as_keyword(&self) -> Option<Keyword> {
    match self {
      PropertyValue::Keyword(k) => Some(*k),
      _ => None,
    }
  }

  pub fn as_length(&self) -> Option<Length> {
    match self {
      PropertyValue::Length(l) => Some(*l),
      _ => None,
    }
  }

  pub fn as_number(&self) -> Option<f32> {
    match self {
      PropertyValue::Number(n) => Some(*n),
      PropertyValue::Integer(i) => Some(*i as f32),
      _ => None,
    }
  }

  pub fn as_color(&self) -> Option<Rgba> {
    match self {
      PropertyValue::Color(c) => Some(*c),
      _ => None,
    }
  }
}

/// Normalize an angle in the given CSS unit to clockwise radians.
///
/// Returns `None` for unknown units.
pub fn angle_to_radians(value: f32, unit: &str) -> Option<f32> {
  let radians = match unit.to_ascii_lowercase().as_str() {
    "deg" => value * std::f32::consts::PI / 180.0,
    "grad" => value * std::f32::consts::PI / 200.0,
    "rad" => value,
    "turn" => value * 2.0 * std::f32::consts::PI,
    _ => return None,
  };
  Some(radians)
}

/// Normalize a time in the given CSS unit to seconds.
pub fn time_to_seconds(value: f32, unit: &str) -> Option<f32> {
  match unit.to_ascii_lowercase().as_str() {
    "s" => Some(value),
    "ms" => Some(value / 1000.0),
    _ => None,
  }
}

/// Convert an absolute length unit to pixels, if it is one.
///
/// The `px` result is what the value model stores; only em/rem survive
/// parsing as relative units.
pub fn absolute_unit_to_px(value: f32, unit: &str) -> Option<f32> {
  match unit.to_ascii_lowercase().as_str() {
    "px" => Some(value),
    "pt" => Some(value * 96.0 / 72.0),
    "pc" => Some(value * 16.0),
    "in" => Some(value * 96.0),
    "cm" => Some(value * 96.0 / 2.54),
    "mm" => Some(value * 96.0 / 25.4),
    "q" => Some(value * 96.0 / 101.6),
    _ => None,
  }
}
