//! Transitions and keyframe animations
//!
//! Per-element animation state driven by the style engine: a
//! [`TransitionSet`] watching computed-style changes on transition-enabled
//! properties, and an [`AnimationSet`] running @keyframes animations named
//! by `animation-name`.
//!
//! Both produce an animated overlay on top of the element's computed style;
//! the underlying cascade output is never mutated. Time is a float second
//! count supplied by the embedder, so the engine has no clock of its own.
//!
//! References: CSS Transitions <https://www.w3.org/TR/css3-transitions/>,
//! CSS Animations <https://www.w3.org/TR/css3-animations/>

pub mod interpolate;

use crate::css::properties::PropertyKey;
use crate::css::types::KeyframesRule;
use crate::css::value::{Keyword, Length, PropertyValue, TimingFunction};
use crate::style::computed::ComputedStyle;
use interpolate::interpolate;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Clock instants and durations, in seconds.
pub type Seconds = f64;

// ----------------------------------------------------------------------------
// List cycling
//
// The transition-* and animation-* longhands are comma-separated lists that
// repeat to cover however many properties or animations they apply to.
// ----------------------------------------------------------------------------

fn time_at(value: &PropertyValue, index: usize) -> f32 {
  match value {
    PropertyValue::TimeList(times) if !times.is_empty() => times[index % times.len()],
    _ => 0.0,
  }
}

fn timing_at(value: &PropertyValue, index: usize) -> TimingFunction {
  match value {
    PropertyValue::TimingFunctionList(functions) if !functions.is_empty() => {
      functions[index % functions.len()]
    }
    _ => TimingFunction::EASE,
  }
}

fn list_at<'a>(value: &'a PropertyValue, index: usize) -> Option<&'a PropertyValue> {
  match value {
    PropertyValue::List(items) if !items.is_empty() => Some(&items[index % items.len()]),
    _ => None,
  }
}

// ----------------------------------------------------------------------------
// Transitions
// ----------------------------------------------------------------------------

/// Which properties transition-property enables.
#[derive(Debug, Clone, PartialEq)]
enum TransitionTargets {
  None,
  All,
  Properties(Vec<PropertyKey>),
}

fn transition_targets(style: &ComputedStyle) -> TransitionTargets {
  match style.get(PropertyKey::TransitionProperty) {
    PropertyValue::Keyword(Keyword::None) => TransitionTargets::None,
    PropertyValue::Keyword(Keyword::All) => TransitionTargets::All,
    PropertyValue::PropertyKeyList(keys) => TransitionTargets::Properties(keys.clone()),
    _ => TransitionTargets::All,
  }
}

impl TransitionTargets {
  /// The list index a property uses when cycling duration/delay/timing.
  fn index_of(&self, key: PropertyKey) -> Option<usize> {
    match self {
      TransitionTargets::None => None,
      TransitionTargets::All => Some(0),
      TransitionTargets::Properties(keys) => keys.iter().position(|&k| k == key),
    }
  }
}

/// One running transition.
#[derive(Debug, Clone)]
pub struct Transition {
  pub property: PropertyKey,
  pub start_value: PropertyValue,
  pub end_value: PropertyValue,
  /// When interpolation begins; the declared delay is already added in.
  pub start_time: Seconds,
  pub duration: f32,
  pub timing: TimingFunction,
}

impl Transition {
  fn raw_progress(&self, now: Seconds) -> f32 {
    if self.duration <= 0.0 {
      return 1.0;
    }
    (((now - self.start_time) / self.duration as f64) as f32).clamp(0.0, 1.0)
  }

  pub fn is_finished(&self, now: Seconds) -> bool {
    now >= self.start_time + self.duration as f64
  }

  pub fn current_value(&self, now: Seconds) -> PropertyValue {
    if now < self.start_time {
      return self.start_value.clone();
    }
    let eased = self.timing.evaluate(self.raw_progress(now));
    interpolate(&self.start_value, &self.end_value, eased)
  }
}

/// The running transitions of one element.
#[derive(Debug, Clone, Default)]
pub struct TransitionSet {
  transitions: FxHashMap<PropertyKey, Transition>,
}

impl TransitionSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.transitions.is_empty()
  }

  pub fn get(&self, property: PropertyKey) -> Option<&Transition> {
    self.transitions.get(&property)
  }

  /// React to a computed-style change: start transitions for enabled
  /// animatable properties whose value changed, retarget transitions whose
  /// end value changed mid-flight, and drop ones whose target came back.
  ///
  /// A retargeted transition starts from its current animated value and
  /// begins immediately; the declared delay applies only to transitions
  /// triggered from rest.
  pub fn update(
    &mut self,
    now: Seconds,
    old_style: &ComputedStyle,
    new_style: &ComputedStyle,
  ) {
    let targets = transition_targets(new_style);
    if targets == TransitionTargets::None {
      self.transitions.clear();
      return;
    }
    let durations = new_style.get(PropertyKey::TransitionDuration);
    let delays = new_style.get(PropertyKey::TransitionDelay);
    let timings = new_style.get(PropertyKey::TransitionTimingFunction);

    // Cancel transitions on properties no longer enabled.
    self
      .transitions
      .retain(|&key, _| targets.index_of(key).is_some());

    for &key in PropertyKey::ALL {
      if !key.is_animatable() {
        continue;
      }
      let Some(index) = targets.index_of(key) else {
        continue;
      };
      let old_value = old_style.get(key);
      let new_value = new_style.get(key);

      if let Some(running) = self.transitions.get(&key) {
        if running.end_value == *new_value {
          continue; // still heading the right way
        }
        // Retarget from wherever the animation currently is.
        let current = running.current_value(now);
        let duration = time_at(durations, index);
        if duration <= 0.0 || current == *new_value {
          self.transitions.remove(&key);
          continue;
        }
        self.transitions.insert(
          key,
          Transition {
            property: key,
            start_value: current,
            end_value: new_value.clone(),
            start_time: now,
            duration,
            timing: timing_at(timings, index),
          },
        );
        continue;
      }

      if old_value == new_value {
        continue;
      }
      let duration = time_at(durations, index);
      if duration <= 0.0 {
        continue; // nothing to animate, snap
      }
      let delay = time_at(delays, index);
      self.transitions.insert(
        key,
        Transition {
          property: key,
          start_value: old_value.clone(),
          end_value: new_value.clone(),
          start_time: now + delay as f64,
          duration,
          timing: timing_at(timings, index),
        },
      );
    }
  }

  /// Overlay the in-flight values onto a style.
  pub fn apply(&self, now: Seconds, style: &mut ComputedStyle) {
    for transition in self.transitions.values() {
      style.set(transition.property, transition.current_value(now));
    }
  }

  pub fn remove_finished(&mut self, now: Seconds) {
    self.transitions.retain(|_, t| !t.is_finished(now));
  }

  /// Earliest instant at which the animated output changes next; `None`
  /// when nothing is running.
  pub fn next_event(&self, now: Seconds) -> Option<Seconds> {
    self
      .transitions
      .values()
      .map(|t| {
        if now < t.start_time {
          t.start_time
        } else {
          t.start_time + t.duration as f64
        }
      })
      .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
  }
}

// ----------------------------------------------------------------------------
// Keyframe animations
// ----------------------------------------------------------------------------

/// One running @keyframes animation on an element.
#[derive(Debug, Clone)]
pub struct Animation {
  pub name: String,
  pub keyframes: Arc<KeyframesRule>,
  pub start_time: Seconds,
  pub delay: f32,
  pub duration: f32,
  pub timing: TimingFunction,
  /// `None` means `infinite`.
  pub iteration_count: Option<f32>,
  pub direction: Keyword,
  pub fill_mode: Keyword,
}

impl Animation {
  pub fn is_finished(&self, now: Seconds) -> bool {
    let Some(count) = self.iteration_count else {
      return false;
    };
    if self.duration <= 0.0 {
      return true;
    }
    let elapsed = now - self.start_time - self.delay as f64;
    elapsed >= (self.duration * count) as f64
  }

  /// The iteration progress to sample, or `None` when the animation has no
  /// effect at this instant (outside its active window without fill).
  fn sample_position(&self, now: Seconds) -> Option<f32> {
    let elapsed = now - self.start_time - self.delay as f64;
    let fills_backwards = matches!(self.fill_mode, Keyword::Backwards | Keyword::Both);
    let fills_forwards = matches!(self.fill_mode, Keyword::Forwards | Keyword::Both);

    if elapsed < 0.0 {
      if !fills_backwards {
        return None;
      }
      return Some(self.directed_progress(0.0, 0));
    }

    if self.duration <= 0.0 {
      if !fills_forwards {
        return None;
      }
      let last = self.iteration_count.map(|c| c.ceil() as u64).unwrap_or(0);
      return Some(self.directed_progress(1.0, last.saturating_sub(1) as u64));
    }

    let t = (elapsed / self.duration as f64) as f32;
    if let Some(count) = self.iteration_count {
      if t >= count {
        if !fills_forwards {
          return None;
        }
        // Hold the final iteration's end position.
        let last_iteration = (count.ceil() as u64).saturating_sub(1);
        let end_fraction = if count.fract() == 0.0 { 1.0 } else { count.fract() };
        return Some(self.directed_progress(end_fraction, last_iteration));
      }
    }
    let iteration = t.floor() as u64;
    Some(self.directed_progress(t.fract(), iteration))
  }

  /// Apply animation-direction to an in-iteration fraction.
  fn directed_progress(&self, fraction: f32, iteration: u64) -> f32 {
    let reversed = match self.direction {
      Keyword::Reverse => true,
      Keyword::Alternate => iteration % 2 == 1,
      Keyword::AlternateReverse => iteration % 2 == 0,
      _ => false,
    };
    if reversed {
      1.0 - fraction
    } else {
      fraction
    }
  }

  /// Sample the keyframes at `now` on top of `base`, writing animated
  /// values into `style`.
  pub fn apply(
    &self,
    now: Seconds,
    base: &ComputedStyle,
    style: &mut ComputedStyle,
    root_font_size: f32,
  ) {
    let Some(position) = self.sample_position(now) else {
      return;
    };
    let frames = self.keyframes.sorted_offsets();
    if frames.is_empty() {
      return;
    }

    // Every property any keyframe mentions animates; endpoints missing from
    // the keyframes fall back to the base computed value.
    let mut properties: Vec<PropertyKey> = Vec::new();
    for (_, frame_style) in &frames {
      for key in frame_style.keys() {
        if !properties.contains(&key) {
          properties.push(key);
        }
      }
    }

    let font_size = base.font_size();
    for key in properties {
      let resolve = |v: &PropertyValue| resolve_keyframe_value(v, font_size, root_font_size);

      // Nearest declaring keyframes at or around the sample position.
      let mut below: Option<(f32, PropertyValue)> = None;
      let mut above: Option<(f32, PropertyValue)> = None;
      for (offset, frame_style) in &frames {
        let Some(value) = frame_style.get(key) else {
          continue;
        };
        if *offset <= position {
          below = Some((*offset, resolve(value)));
        } else if above.is_none() {
          above = Some((*offset, resolve(value)));
        }
      }

      let base_value = base.get(key).clone();
      let (lo_offset, lo_value) = below.unwrap_or((0.0, base_value.clone()));
      // The implicit 100% frame is the base value unless a keyframe sits
      // at or past the sample position already.
      let (hi_offset, hi_value) = above.unwrap_or_else(|| {
        if lo_offset >= 1.0 {
          (1.0, lo_value.clone())
        } else {
          (1.0, base_value)
        }
      });

      let value = if hi_offset <= lo_offset {
        lo_value
      } else {
        let local = (position - lo_offset) / (hi_offset - lo_offset);
        let eased = self.timing.evaluate(local);
        interpolate(&lo_value, &hi_value, eased)
      };
      style.set(key, value);
    }
  }
}

/// Keyframe declarations are raw parsed values; resolve the font-relative
/// lengths against the element's own font size before interpolating.
fn resolve_keyframe_value(
  value: &PropertyValue,
  font_size: f32,
  root_font_size: f32,
) -> PropertyValue {
  match value {
    PropertyValue::Length(length) if !length.is_absolute() => {
      PropertyValue::Length(Length::px(length.to_px(font_size, root_font_size)))
    }
    _ => value.clone(),
  }
}

/// The running animations of one element, in `animation-name` order.
#[derive(Debug, Clone, Default)]
pub struct AnimationSet {
  animations: Vec<Animation>,
}

impl AnimationSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.animations.is_empty()
  }

  pub fn animations(&self) -> &[Animation] {
    &self.animations
  }

  /// Sync the running set with the animation-* properties of a freshly
  /// computed style. New names start now; removed names stop immediately.
  pub fn update(
    &mut self,
    now: Seconds,
    style: &ComputedStyle,
    keyframes: &FxHashMap<String, Arc<KeyframesRule>>,
  ) {
    let names: Vec<String> = match style.get(PropertyKey::AnimationName) {
      PropertyValue::List(items) => items
        .iter()
        .filter_map(|item| match item {
          PropertyValue::String(name) => Some(name.clone()),
          _ => None,
        })
        .collect(),
      _ => Vec::new(),
    };

    self.animations.retain(|a| names.iter().any(|n| *n == a.name));

    let durations = style.get(PropertyKey::AnimationDuration);
    let delays = style.get(PropertyKey::AnimationDelay);
    let timings = style.get(PropertyKey::AnimationTimingFunction);
    let iterations = style.get(PropertyKey::AnimationIterationCount);
    let directions = style.get(PropertyKey::AnimationDirection);
    let fills = style.get(PropertyKey::AnimationFillMode);

    for (index, name) in names.iter().enumerate() {
      if self.animations.iter().any(|a| a.name == *name) {
        continue; // already running; a restart needs the name removed first
      }
      let Some(rule) = keyframes.get(name) else {
        log::debug!("animation-name {} has no @keyframes rule", name);
        continue;
      };
      let iteration_count = match list_at(iterations, index) {
        Some(PropertyValue::Keyword(Keyword::Infinite)) => None,
        Some(PropertyValue::Number(n)) => Some(n.max(0.0)),
        _ => Some(1.0),
      };
      let direction = list_at(directions, index)
        .and_then(|v| v.as_keyword())
        .unwrap_or(Keyword::Normal);
      let fill_mode = list_at(fills, index)
        .and_then(|v| v.as_keyword())
        .unwrap_or(Keyword::None);
      self.animations.push(Animation {
        name: name.clone(),
        keyframes: Arc::clone(rule),
        start_time: now,
        delay: time_at(delays, index),
        duration: time_at(durations, index),
        timing: timing_at(timings, index),
        iteration_count,
        direction,
        fill_mode,
      });
    }
  }

  /// Overlay all running animations, later list entries winning conflicts.
  pub fn apply(&self, now: Seconds, base: &ComputedStyle, style: &mut ComputedStyle, root_font_size: f32) {
    for animation in &self.animations {
      animation.apply(now, base, style, root_font_size);
    }
  }

  pub fn remove_finished(&mut self, now: Seconds) {
    self
      .animations
      .retain(|a| !a.is_finished(now) || matches!(a.fill_mode, Keyword::Forwards | Keyword::Both));
  }

  pub fn has_running(&self, now: Seconds) -> bool {
    self.animations.iter().any(|a| !a.is_finished(now))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::css::parser::CssParser;
  use crate::css::types::Rule;
  use crate::css::value::Rgba;

  fn style_with(key: PropertyKey, value: PropertyValue) -> ComputedStyle {
    let mut style = ComputedStyle::initial();
    style.set(key, value);
    style
  }

  fn transition_enabled(mut style: ComputedStyle, duration: f32) -> ComputedStyle {
    style.set(
      PropertyKey::TransitionProperty,
      PropertyValue::Keyword(Keyword::All),
    );
    style.set(
      PropertyKey::TransitionDuration,
      PropertyValue::TimeList(vec![duration]),
    );
    style.set(
      PropertyKey::TransitionTimingFunction,
      PropertyValue::TimingFunctionList(vec![TimingFunction::LINEAR]),
    );
    style
  }

  #[test]
  fn transition_interpolates_between_values() {
    let old = transition_enabled(style_with(PropertyKey::Opacity, PropertyValue::Number(0.0)), 2.0);
    let new = transition_enabled(style_with(PropertyKey::Opacity, PropertyValue::Number(1.0)), 2.0);
    let mut set = TransitionSet::new();
    set.update(0.0, &old, &new);
    let mut style = new.clone();
    set.apply(1.0, &mut style);
    assert_eq!(style.get(PropertyKey::Opacity), &PropertyValue::Number(0.5));
    assert!(!set.get(PropertyKey::Opacity).unwrap().is_finished(1.9));
    assert!(set.get(PropertyKey::Opacity).unwrap().is_finished(2.0));
  }

  #[test]
  fn zero_duration_snaps_without_transition() {
    let old = transition_enabled(style_with(PropertyKey::Opacity, PropertyValue::Number(0.0)), 0.0);
    let new = transition_enabled(style_with(PropertyKey::Opacity, PropertyValue::Number(1.0)), 0.0);
    let mut set = TransitionSet::new();
    set.update(0.0, &old, &new);
    assert!(set.is_empty());
  }

  #[test]
  fn retargeting_starts_from_current_value() {
    let a = transition_enabled(style_with(PropertyKey::Opacity, PropertyValue::Number(0.0)), 2.0);
    let b = transition_enabled(style_with(PropertyKey::Opacity, PropertyValue::Number(1.0)), 2.0);
    let mut set = TransitionSet::new();
    set.update(0.0, &a, &b);
    // Reverse halfway through: new transition starts at 0.5, heading to 0.
    set.update(1.0, &b, &a);
    let transition = set.get(PropertyKey::Opacity).unwrap();
    assert_eq!(transition.start_value, PropertyValue::Number(0.5));
    assert_eq!(transition.end_value, PropertyValue::Number(0.0));
    assert_eq!(transition.start_time, 1.0);
  }

  #[test]
  fn delay_defers_the_start() {
    let mut old = transition_enabled(
      style_with(PropertyKey::Opacity, PropertyValue::Number(0.0)),
      1.0,
    );
    old.set(PropertyKey::TransitionDelay, PropertyValue::TimeList(vec![0.5]));
    let mut new = transition_enabled(
      style_with(PropertyKey::Opacity, PropertyValue::Number(1.0)),
      1.0,
    );
    new.set(PropertyKey::TransitionDelay, PropertyValue::TimeList(vec![0.5]));
    let mut set = TransitionSet::new();
    set.update(0.0, &old, &new);
    let mut style = new.clone();
    set.apply(0.25, &mut style);
    assert_eq!(style.get(PropertyKey::Opacity), &PropertyValue::Number(0.0));
    set.apply(1.0, &mut style);
    assert_eq!(style.get(PropertyKey::Opacity), &PropertyValue::Number(0.5));
  }

  #[test]
  fn length_transition_interpolates_px_values() {
    let old = transition_enabled(
      style_with(PropertyKey::Width, PropertyValue::Length(Length::px(100.0))),
      2.0,
    );
    let new = transition_enabled(
      style_with(PropertyKey::Width, PropertyValue::Length(Length::px(200.0))),
      2.0,
    );
    let mut set = TransitionSet::new();
    set.update(0.0, &old, &new);
    let mut style = new.clone();
    set.apply(1.0, &mut style);
    assert_eq!(
      style.get(PropertyKey::Width),
      &PropertyValue::Length(Length::px(150.0))
    );
  }

  #[test]
  fn non_animatable_properties_do_not_transition() {
    let old = transition_enabled(
      style_with(PropertyKey::Display, PropertyValue::Keyword(Keyword::Block)),
      2.0,
    );
    let new = transition_enabled(
      style_with(PropertyKey::Display, PropertyValue::Keyword(Keyword::None)),
      2.0,
    );
    let mut set = TransitionSet::new();
    set.update(0.0, &old, &new);
    assert!(set.is_empty());
  }

  fn fade_keyframes() -> FxHashMap<String, Arc<KeyframesRule>> {
    let mut parser = CssParser::new("test.css");
    let rule = parser
      .parse_rule("@keyframes fade { from { opacity: 0; } to { opacity: 1; } }")
      .expect("rule");
    let Rule::Keyframes(kf) = rule else {
      panic!("expected keyframes");
    };
    let mut map = FxHashMap::default();
    map.insert("fade".to_string(), kf);
    map
  }

  fn animated_style(extra: &[(PropertyKey, PropertyValue)]) -> ComputedStyle {
    let mut style = ComputedStyle::initial();
    style.set(
      PropertyKey::AnimationName,
      PropertyValue::List(vec![PropertyValue::String("fade".to_string())]),
    );
    style.set(PropertyKey::AnimationDuration, PropertyValue::TimeList(vec![2.0]));
    style.set(
      PropertyKey::AnimationTimingFunction,
      PropertyValue::TimingFunctionList(vec![TimingFunction::LINEAR]),
    );
    for (key, value) in extra {
      style.set(*key, value.clone());
    }
    style
  }

  #[test]
  fn animation_samples_keyframes_linearly() {
    let style = animated_style(&[]);
    let mut set = AnimationSet::new();
    set.update(0.0, &style, &fade_keyframes());
    assert_eq!(set.animations().len(), 1);
    let mut out = style.clone();
    set.apply(1.0, &style, &mut out, 16.0);
    assert_eq!(out.get(PropertyKey::Opacity), &PropertyValue::Number(0.5));
  }

  #[test]
  fn animation_without_fill_stops_affecting_after_end() {
    let style = animated_style(&[]);
    let mut set = AnimationSet::new();
    set.update(0.0, &style, &fade_keyframes());
    let mut out = style.clone();
    set.apply(3.0, &style, &mut out, 16.0);
    // One iteration of 2s is over; opacity reverts to the base value.
    assert_eq!(out.get(PropertyKey::Opacity), &PropertyValue::Number(1.0));
    set.remove_finished(3.0);
    assert!(set.is_empty());
  }

  #[test]
  fn fill_forwards_holds_the_end_value() {
    let style = animated_style(&[(
      PropertyKey::AnimationFillMode,
      PropertyValue::List(vec![PropertyValue::Keyword(Keyword::Forwards)]),
    )]);
    let mut base = style.clone();
    base.set(PropertyKey::Opacity, PropertyValue::Number(0.25));
    let mut set = AnimationSet::new();
    set.update(0.0, &base, &fade_keyframes());
    let mut out = base.clone();
    set.apply(10.0, &base, &mut out, 16.0);
    assert_eq!(out.get(PropertyKey::Opacity), &PropertyValue::Number(1.0));
    set.remove_finished(10.0);
    assert!(!set.is_empty()); // kept alive to keep filling
  }

  #[test]
  fn reverse_direction_flips_sampling() {
    let style = animated_style(&[(
      PropertyKey::AnimationDirection,
      PropertyValue::List(vec![PropertyValue::Keyword(Keyword::Reverse)]),
    )]);
    let mut set = AnimationSet::new();
    set.update(0.0, &style, &fade_keyframes());
    let mut out = style.clone();
    set.apply(0.5, &style, &mut out, 16.0);
    // 25% through a reversed iteration samples offset 0.75.
    assert_eq!(out.get(PropertyKey::Opacity), &PropertyValue::Number(0.75));
  }

  #[test]
  fn infinite_animations_never_finish() {
    let style = animated_style(&[(
      PropertyKey::AnimationIterationCount,
      PropertyValue::List(vec![PropertyValue::Keyword(Keyword::Infinite)]),
    )]);
    let mut set = AnimationSet::new();
    set.update(0.0, &style, &fade_keyframes());
    assert!(set.has_running(1e6));
  }

  #[test]
  fn color_transition_lerps_channels() {
    let old = transition_enabled(
      style_with(PropertyKey::Color, PropertyValue::Color(Rgba::BLACK)),
      2.0,
    );
    let new = transition_enabled(
      style_with(PropertyKey::Color, PropertyValue::Color(Rgba::WHITE)),
      2.0,
    );
    let mut set = TransitionSet::new();
    set.update(0.0, &old, &new);
    let mut style = new.clone();
    set.apply(1.0, &mut style);
    assert_eq!(
      style.get(PropertyKey::Color),
      &PropertyValue::Color(Rgba::new(128, 128, 128, 255))
    );
  }
}
