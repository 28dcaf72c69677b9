//! Property value interpolation
//!
//! Blends two property values at a progress in [0, 1]. Numbers and
//! percentages lerp, integers lerp and round, colors lerp per 8-bit
//! channel, and transform lists animate per-function when their shapes
//! line up, falling back to matrix decomposition when they do not.
//!
//! Values with no defined interpolation swap discretely at the midpoint.
//!
//! Reference: CSS Transitions, animation of property types
//! <https://www.w3.org/TR/css3-transitions/#animatable-types>

use crate::css::transform::{animate_function, interpolate_matrices, TransformFunction, TransformList};
use crate::css::value::{Keyword, Length, PropertyValue, Rgba};

fn lerp(a: f32, b: f32, t: f32) -> f32 {
  a + (b - a) * t
}

fn lerp_channel(a: u8, b: u8, t: f32) -> u8 {
  lerp(a as f32, b as f32, t).round().clamp(0.0, 255.0) as u8
}

pub fn lerp_color(a: Rgba, b: Rgba, t: f32) -> Rgba {
  Rgba::new(
    lerp_channel(a.r, b.r, t),
    lerp_channel(a.g, b.g, t),
    lerp_channel(a.b, b.b, t),
    lerp_channel(a.a, b.a, t),
  )
}

/// Interpolate between two property values.
///
/// `progress` may lie outside [0, 1] while an easing curve overshoots;
/// scalar lerps extrapolate, discrete values use the midpoint rule.
pub fn interpolate(start: &PropertyValue, end: &PropertyValue, progress: f32) -> PropertyValue {
  match (start, end) {
    (PropertyValue::Number(a), PropertyValue::Number(b)) => {
      PropertyValue::Number(lerp(*a, *b, progress))
    }
    (PropertyValue::Integer(a), PropertyValue::Integer(b)) => {
      PropertyValue::Integer(lerp(*a as f32, *b as f32, progress).round() as i64)
    }
    (PropertyValue::Percentage(a), PropertyValue::Percentage(b)) => {
      PropertyValue::Percentage(lerp(*a, *b, progress))
    }
    (PropertyValue::Length(a), PropertyValue::Length(b)) if a.unit == b.unit => {
      PropertyValue::Length(Length::new(lerp(a.value, b.value, progress), a.unit))
    }
    (PropertyValue::Color(a), PropertyValue::Color(b)) => {
      PropertyValue::Color(lerp_color(*a, *b, progress))
    }
    (PropertyValue::Transform(a), PropertyValue::Transform(b)) => {
      PropertyValue::Transform(interpolate_transforms(Some(a), Some(b), progress))
    }
    (PropertyValue::Transform(a), PropertyValue::Keyword(Keyword::None)) => {
      PropertyValue::Transform(interpolate_transforms(Some(a), None, progress))
    }
    (PropertyValue::Keyword(Keyword::None), PropertyValue::Transform(b)) => {
      PropertyValue::Transform(interpolate_transforms(None, Some(b), progress))
    }
    // No defined interpolation: discrete swap at the midpoint.
    _ => {
      if progress < 0.5 {
        start.clone()
      } else {
        end.clone()
      }
    }
  }
}

/// Transform list interpolation with the `none` endpoints folded in.
fn interpolate_transforms(
  start: Option<&TransformList>,
  end: Option<&TransformList>,
  progress: f32,
) -> TransformList {
  match (start, end) {
    (None, None) => TransformList::new(Vec::new()),
    // One endpoint is none: each function animates toward its identity.
    (Some(list), None) => TransformList::new(
      list
        .functions
        .iter()
        .map(|f| animate_function(f, None, progress))
        .collect(),
    ),
    (None, Some(list)) => TransformList::new(
      list
        .functions
        .iter()
        .map(|f| animate_function(f, None, 1.0 - progress))
        .collect(),
    ),
    (Some(a), Some(b)) => {
      if a.same_types_as(b) {
        TransformList::new(
          a.functions
            .iter()
            .zip(b.functions.iter())
            .map(|(f, g)| animate_function(f, Some(g), progress))
            .collect(),
        )
      } else {
        // Shape mismatch: collapse both to matrices and blend those.
        let matrix = interpolate_matrices(&a.to_matrix(), &b.to_matrix(), progress);
        TransformList::new(vec![TransformFunction::Matrix(matrix)])
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::css::transform::Matrix3;
  use crate::css::value::LengthUnit;

  #[test]
  fn numbers_lerp() {
    assert_eq!(
      interpolate(&PropertyValue::Number(0.0), &PropertyValue::Number(1.0), 0.25),
      PropertyValue::Number(0.25)
    );
  }

  #[test]
  fn integers_lerp_and_round() {
    assert_eq!(
      interpolate(&PropertyValue::Integer(0), &PropertyValue::Integer(10), 0.46),
      PropertyValue::Integer(5)
    );
  }

  #[test]
  fn lengths_lerp_when_units_match() {
    assert_eq!(
      interpolate(
        &PropertyValue::Length(Length::px(0.0)),
        &PropertyValue::Length(Length::px(8.0)),
        0.5
      ),
      PropertyValue::Length(Length::px(4.0))
    );
    // Mismatched units fall back to the discrete rule.
    assert_eq!(
      interpolate(
        &PropertyValue::Length(Length::px(0.0)),
        &PropertyValue::Length(Length::new(1.0, LengthUnit::Em)),
        0.75
      ),
      PropertyValue::Length(Length::new(1.0, LengthUnit::Em))
    );
  }

  #[test]
  fn colors_lerp_per_channel() {
    let black = PropertyValue::Color(Rgba::BLACK);
    let white = PropertyValue::Color(Rgba::WHITE);
    assert_eq!(
      interpolate(&black, &white, 0.5),
      PropertyValue::Color(Rgba::new(128, 128, 128, 255))
    );
  }

  #[test]
  fn keywords_swap_at_midpoint() {
    let a = PropertyValue::Keyword(Keyword::Visible);
    let b = PropertyValue::Keyword(Keyword::Hidden);
    assert_eq!(interpolate(&a, &b, 0.49), a);
    assert_eq!(interpolate(&a, &b, 0.5), b);
  }

  #[test]
  fn scale_to_none_animates_toward_identity() {
    let start = PropertyValue::Transform(TransformList::new(vec![TransformFunction::Scale {
      x: 2.0,
      y: 2.0,
    }]));
    let mid = interpolate(&start, &PropertyValue::NONE, 0.5);
    let PropertyValue::Transform(list) = mid else {
      panic!("expected transform");
    };
    match list.functions[0] {
      TransformFunction::Scale { x, y } => {
        assert!((x - 1.5).abs() < 1e-5);
        assert!((y - 1.5).abs() < 1e-5);
      }
      ref other => panic!("expected scale, got {:?}", other),
    }
  }

  #[test]
  fn mismatched_transform_shapes_blend_as_matrices() {
    let a = PropertyValue::Transform(TransformList::new(vec![TransformFunction::Scale {
      x: 2.0,
      y: 2.0,
    }]));
    let b = PropertyValue::Transform(TransformList::new(vec![TransformFunction::Rotate(0.0)]));
    let PropertyValue::Transform(list) = interpolate(&a, &b, 0.5) else {
      panic!("expected transform");
    };
    assert_eq!(list.functions.len(), 1);
    match &list.functions[0] {
      TransformFunction::Matrix(m) => {
        let expected = interpolate_matrices(
          &Matrix3::scaling(2.0, 2.0),
          &Matrix3::IDENTITY,
          0.5,
        );
        assert_eq!(*m, expected);
      }
      other => panic!("expected matrix, got {:?}", other),
    }
  }
}
