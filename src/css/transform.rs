//! CSS transform functions
//!
//! The transform function list value (`transform: translateX(10px) scale(2)`)
//! and the 2D matrix math needed to animate it. When two transform lists
//! match function-for-function they are interpolated per function; when they
//! do not, both collapse into a single matrix which is decomposed,
//! interpolated component-wise and recomposed.
//!
//! Reference: CSS Transforms, interpolation of transforms
//! <https://www.w3.org/TR/css-transforms-1/#interpolation-of-transforms>

use crate::css::value::{Length, LengthUnit};
use std::mem::discriminant;

/// A 3x3 matrix representing a 2D affine transform, row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3 {
  pub m: [[f32; 3]; 3],
}

impl Matrix3 {
  pub const IDENTITY: Matrix3 = Matrix3 {
    m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
  };

  /// matrix(a, b, c, d, e, f) in CSS column order.
  pub fn from_css_values(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
    Matrix3 {
      m: [[a, c, e], [b, d, f], [0.0, 0.0, 1.0]],
    }
  }

  pub fn translation(x: f32, y: f32) -> Self {
    Matrix3 {
      m: [[1.0, 0.0, x], [0.0, 1.0, y], [0.0, 0.0, 1.0]],
    }
  }

  pub fn scaling(x: f32, y: f32) -> Self {
    Matrix3 {
      m: [[x, 0.0, 0.0], [0.0, y, 0.0], [0.0, 0.0, 1.0]],
    }
  }

  /// Rotation by a clockwise angle in radians (y axis points down).
  pub fn rotation(radians: f32) -> Self {
    let (sin, cos) = radians.sin_cos();
    Matrix3 {
      m: [[cos, -sin, 0.0], [sin, cos, 0.0], [0.0, 0.0, 1.0]],
    }
  }

  pub fn multiply(&self, other: &Matrix3) -> Matrix3 {
    let mut out = [[0.0f32; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
      for (j, cell) in row.iter_mut().enumerate() {
        *cell = (0..3).map(|k| self.m[i][k] * other.m[k][j]).sum();
      }
    }
    Matrix3 { m: out }
  }
}

/// The affine components a 2D matrix decomposes into.
#[derive(Debug, Clone, Copy)]
struct Decomposed {
  translate_x: f32,
  translate_y: f32,
  scale_x: f32,
  scale_y: f32,
  skew: f32,
  rotation: f32,
}

fn decompose(matrix: &Matrix3) -> Decomposed {
  let translate_x = matrix.m[0][2];
  let translate_y = matrix.m[1][2];

  // Column basis vectors of the linear part.
  let mut col0 = [matrix.m[0][0], matrix.m[1][0]];
  let mut col1 = [matrix.m[0][1], matrix.m[1][1]];

  let mut scale_x = (col0[0] * col0[0] + col0[1] * col0[1]).sqrt();
  if scale_x != 0.0 {
    col0[0] /= scale_x;
    col0[1] /= scale_x;
  }

  let mut skew = col0[0] * col1[0] + col0[1] * col1[1];
  col1[0] -= skew * col0[0];
  col1[1] -= skew * col0[1];

  let scale_y = (col1[0] * col1[0] + col1[1] * col1[1]).sqrt();
  if scale_y != 0.0 {
    col1[0] /= scale_y;
    col1[1] /= scale_y;
    skew /= scale_y;
  }

  // A negative determinant means one axis is flipped.
  let det = col0[0] * col1[1] - col0[1] * col1[0];
  if det < 0.0 {
    scale_x = -scale_x;
    col0[0] = -col0[0];
    col0[1] = -col0[1];
    skew = -skew;
  }

  let rotation = col0[1].atan2(col0[0]);

  Decomposed {
    translate_x,
    translate_y,
    scale_x,
    scale_y,
    skew,
    rotation,
  }
}

fn recompose(d: &Decomposed) -> Matrix3 {
  let mut result = Matrix3::translation(d.translate_x, d.translate_y).multiply(&Matrix3::rotation(d.rotation));
  if d.skew != 0.0 {
    let skew_matrix = Matrix3 {
      m: [[1.0, d.skew, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };
    result = result.multiply(&skew_matrix);
  }
  result.multiply(&Matrix3::scaling(d.scale_x, d.scale_y))
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
  a * (1.0 - t) + b * t
}

/// Interpolate two 2D matrices by decomposing into translation, rotation,
/// skew and scale, interpolating each component, and recomposing.
pub fn interpolate_matrices(start: &Matrix3, end: &Matrix3, progress: f32) -> Matrix3 {
  let a = decompose(start);
  let mut b = decompose(end);

  // Take the shorter rotation arc.
  if (b.rotation - a.rotation).abs() > std::f32::consts::PI {
    if b.rotation > a.rotation {
      b.rotation -= 2.0 * std::f32::consts::PI;
    } else {
      b.rotation += 2.0 * std::f32::consts::PI;
    }
  }

  recompose(&Decomposed {
    translate_x: lerp(a.translate_x, b.translate_x, progress),
    translate_y: lerp(a.translate_y, b.translate_y, progress),
    scale_x: lerp(a.scale_x, b.scale_x, progress),
    scale_y: lerp(a.scale_y, b.scale_y, progress),
    skew: lerp(a.skew, b.skew, progress),
    rotation: lerp(a.rotation, b.rotation, progress),
  })
}

/// Axis of a translate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateAxis {
  X,
  Y,
}

/// Offset of a translate function; percentages stay symbolic until layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TranslateOffset {
  Length(Length),
  Percentage(f32),
}

/// A single transform operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformFunction {
  Matrix(Matrix3),
  /// Clockwise angle in radians
  Rotate(f32),
  Scale { x: f32, y: f32 },
  Translate { axis: TranslateAxis, offset: TranslateOffset },
}

impl TransformFunction {
  /// Whether two functions animate per-function (same variant, and for
  /// translations the same axis).
  pub fn same_type_as(&self, other: &TransformFunction) -> bool {
    if discriminant(self) != discriminant(other) {
      return false;
    }
    match (self, other) {
      (
        TransformFunction::Translate { axis: a, .. },
        TransformFunction::Translate { axis: b, .. },
      ) => a == b,
      _ => true,
    }
  }

  /// Collapse to a matrix. Relative translate offsets (em, percentages)
  /// cannot be resolved here and contribute no offset; computed-style
  /// absolutization converts em offsets to px before animation runs.
  pub fn to_matrix(&self) -> Matrix3 {
    match *self {
      TransformFunction::Matrix(m) => m,
      TransformFunction::Rotate(radians) => Matrix3::rotation(radians),
      TransformFunction::Scale { x, y } => Matrix3::scaling(x, y),
      TransformFunction::Translate { axis, offset } => {
        let amount = match offset {
          TranslateOffset::Length(length) if length.unit == LengthUnit::Px => length.value,
          _ => 0.0,
        };
        match axis {
          TranslateAxis::X => Matrix3::translation(amount, 0.0),
          TranslateAxis::Y => Matrix3::translation(0.0, amount),
        }
      }
    }
  }
}

/// An ordered list of transform operations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformList {
  pub functions: Vec<TransformFunction>,
}

impl TransformList {
  pub fn new(functions: Vec<TransformFunction>) -> Self {
    Self { functions }
  }

  pub fn to_matrix(&self) -> Matrix3 {
    self
      .functions
      .iter()
      .fold(Matrix3::IDENTITY, |acc, f| acc.multiply(&f.to_matrix()))
  }

  /// True when both lists have the same length and matching function types
  /// position-for-position.
  pub fn same_types_as(&self, other: &TransformList) -> bool {
    self.functions.len() == other.functions.len()
      && self
        .functions
        .iter()
        .zip(other.functions.iter())
        .all(|(a, b)| a.same_type_as(b))
  }
}

/// Animate a single transform function. `end` of `None` means the other
/// endpoint is `none`, so the function animates toward its identity:
/// scale to 1, rotate to 0, translate to 0 of the matching unit.
pub fn animate_function(
  start: &TransformFunction,
  end: Option<&TransformFunction>,
  progress: f32,
) -> TransformFunction {
  match *start {
    TransformFunction::Matrix(start_matrix) => {
      let end_matrix = match end {
        Some(TransformFunction::Matrix(m)) => *m,
        _ => Matrix3::IDENTITY,
      };
      TransformFunction::Matrix(interpolate_matrices(&start_matrix, &end_matrix, progress))
    }
    TransformFunction::Rotate(start_angle) => {
      let end_angle = match end {
        Some(TransformFunction::Rotate(a)) => *a,
        _ => 0.0,
      };
      TransformFunction::Rotate(lerp(start_angle, end_angle, progress))
    }
    TransformFunction::Scale { x, y } => {
      let (end_x, end_y) = match end {
        Some(TransformFunction::Scale { x, y }) => (*x, *y),
        _ => (1.0, 1.0),
      };
      TransformFunction::Scale {
        x: lerp(x, end_x, progress),
        y: lerp(y, end_y, progress),
      }
    }
    TransformFunction::Translate { axis, offset } => {
      let animated = match offset {
        TranslateOffset::Length(length) => {
          let end_value = match end {
            Some(TransformFunction::Translate {
              offset: TranslateOffset::Length(l),
              ..
            }) => l.value,
            _ => 0.0,
          };
          TranslateOffset::Length(Length::new(lerp(length.value, end_value, progress), length.unit))
        }
        TranslateOffset::Percentage(pct) => {
          let end_value = match end {
            Some(TransformFunction::Translate {
              offset: TranslateOffset::Percentage(p),
              ..
            }) => *p,
            _ => 0.0,
          };
          TranslateOffset::Percentage(lerp(pct, end_value, progress))
        }
      };
      TransformFunction::Translate {
        axis,
        offset: animated,
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn assert_close(a: f32, b: f32) {
    assert!((a - b).abs() < 1e-4, "{} != {}", a, b);
  }

  #[test]
  fn scale_animates_toward_identity() {
    let start = TransformFunction::Scale { x: 2.0, y: 2.0 };
    let mid = animate_function(&start, None, 0.5);
    match mid {
      TransformFunction::Scale { x, y } => {
        assert_close(x, 1.5);
        assert_close(y, 1.5);
      }
      other => panic!("expected scale, got {:?}", other),
    }
  }

  #[test]
  fn rotate_interpolates_linearly() {
    let start = TransformFunction::Rotate(0.0);
    let end = TransformFunction::Rotate(std::f32::consts::PI);
    match animate_function(&start, Some(&end), 0.5) {
      TransformFunction::Rotate(angle) => assert_close(angle, std::f32::consts::FRAC_PI_2),
      other => panic!("expected rotate, got {:?}", other),
    }
  }

  #[test]
  fn translate_axes_do_not_match() {
    let x = TransformFunction::Translate {
      axis: TranslateAxis::X,
      offset: TranslateOffset::Length(Length::px(10.0)),
    };
    let y = TransformFunction::Translate {
      axis: TranslateAxis::Y,
      offset: TranslateOffset::Length(Length::px(10.0)),
    };
    assert!(!x.same_type_as(&y));
    assert!(x.same_type_as(&x));
  }

  #[test]
  fn matrix_decomposition_roundtrips() {
    let m = Matrix3::translation(10.0, -4.0)
      .multiply(&Matrix3::rotation(0.7))
      .multiply(&Matrix3::scaling(2.0, 3.0));
    let same = interpolate_matrices(&m, &m, 0.35);
    for i in 0..3 {
      for j in 0..3 {
        assert_close(m.m[i][j], same.m[i][j]);
      }
    }
  }

  #[test]
  fn matrix_interpolation_midpoint_of_translations() {
    let a = Matrix3::translation(0.0, 0.0);
    let b = Matrix3::translation(10.0, 20.0);
    let mid = interpolate_matrices(&a, &b, 0.5);
    assert_close(mid.m[0][2], 5.0);
    assert_close(mid.m[1][2], 10.0);
  }

  #[test]
  fn list_to_matrix_applies_left_to_right() {
    let list = TransformList::new(vec![
      TransformFunction::Translate {
        axis: TranslateAxis::X,
        offset: TranslateOffset::Length(Length::px(10.0)),
      },
      TransformFunction::Scale { x: 2.0, y: 2.0 },
    ]);
    let m = list.to_matrix();
    // Point (1, 0) -> scale -> (2, 0) -> translate -> (12, 0).
    let x = m.m[0][0] * 1.0 + m.m[0][1] * 0.0 + m.m[0][2];
    assert_close(x, 12.0);
  }
}
