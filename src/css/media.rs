//! Media queries
//!
//! The media query subset this engine evaluates: media types plus the
//! viewport size and orientation features. Evaluation happens against a
//! [`MediaContext`] supplied by the embedder; token-level parsing lives in
//! [`crate::css::parser`].
//!
//! Reference: Media Queries Level 3 <https://www.w3.org/TR/css3-mediaqueries/>

use crate::css::value::Length;

/// The media type a query applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaType {
  #[default]
  All,
  Screen,
  Print,
}

impl MediaType {
  pub fn parse(name: &str) -> Option<MediaType> {
    Some(match name.to_ascii_lowercase().as_str() {
      "all" => MediaType::All,
      "screen" => MediaType::Screen,
      "print" => MediaType::Print,
      _ => return None,
    })
  }
}

/// Viewport orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
  Landscape,
  Portrait,
}

/// A single media feature test
///
/// Lengths here must be absolute; font-relative units are rejected at parse
/// time because there is no element context to resolve them against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaFeature {
  MinWidth(Length),
  MaxWidth(Length),
  Width(Length),
  MinHeight(Length),
  MaxHeight(Length),
  Height(Length),
  Orientation(Orientation),
}

/// A media query: optional `not`, a type, and zero or more features
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaQuery {
  pub negated: bool,
  pub media_type: MediaType,
  pub features: Vec<MediaFeature>,
}

/// The evaluation context: what the embedder knows about the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaContext {
  pub media_type: MediaType,
  pub viewport_width: f32,
  pub viewport_height: f32,
}

impl MediaContext {
  pub fn screen(viewport_width: f32, viewport_height: f32) -> Self {
    Self {
      media_type: MediaType::Screen,
      viewport_width,
      viewport_height,
    }
  }

  fn orientation(&self) -> Orientation {
    if self.viewport_height > self.viewport_width {
      Orientation::Portrait
    } else {
      Orientation::Landscape
    }
  }
}

impl MediaQuery {
  /// A query matching every context (`all`).
  pub fn all() -> Self {
    Self::default()
  }

  pub fn evaluate(&self, ctx: &MediaContext) -> bool {
    let type_matches =
      self.media_type == MediaType::All || self.media_type == ctx.media_type;
    let features_match = self.features.iter().all(|f| evaluate_feature(f, ctx));
    (type_matches && features_match) != self.negated
  }
}

fn evaluate_feature(feature: &MediaFeature, ctx: &MediaContext) -> bool {
  // Media feature lengths are absolute by construction.
  let px = |l: &Length| l.to_px(0.0, 0.0);
  match feature {
    MediaFeature::MinWidth(l) => ctx.viewport_width >= px(l),
    MediaFeature::MaxWidth(l) => ctx.viewport_width <= px(l),
    MediaFeature::Width(l) => ctx.viewport_width == px(l),
    MediaFeature::MinHeight(l) => ctx.viewport_height >= px(l),
    MediaFeature::MaxHeight(l) => ctx.viewport_height <= px(l),
    MediaFeature::Height(l) => ctx.viewport_height == px(l),
    MediaFeature::Orientation(o) => *o == ctx.orientation(),
  }
}

/// A comma-separated media query list; matches when any query matches.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaList {
  pub queries: Vec<MediaQuery>,
}

impl MediaList {
  /// An empty media list matches everything, per spec.
  pub fn evaluate(&self, ctx: &MediaContext) -> bool {
    self.queries.is_empty() || self.queries.iter().any(|q| q.evaluate(ctx))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_list_matches_everything() {
    let list = MediaList::default();
    assert!(list.evaluate(&MediaContext::screen(100.0, 100.0)));
  }

  #[test]
  fn min_width_boundary_is_inclusive() {
    let query = MediaQuery {
      negated: false,
      media_type: MediaType::All,
      features: vec![MediaFeature::MinWidth(Length::px(640.0))],
    };
    assert!(query.evaluate(&MediaContext::screen(640.0, 480.0)));
    assert!(!query.evaluate(&MediaContext::screen(639.0, 480.0)));
  }

  #[test]
  fn negation_inverts_the_whole_query() {
    let query = MediaQuery {
      negated: true,
      media_type: MediaType::Screen,
      features: vec![],
    };
    assert!(!query.evaluate(&MediaContext::screen(800.0, 600.0)));
  }

  #[test]
  fn orientation_follows_viewport_aspect() {
    let portrait = MediaQuery {
      negated: false,
      media_type: MediaType::All,
      features: vec![MediaFeature::Orientation(Orientation::Portrait)],
    };
    assert!(portrait.evaluate(&MediaContext::screen(320.0, 480.0)));
    assert!(!portrait.evaluate(&MediaContext::screen(480.0, 320.0)));
  }

  #[test]
  fn list_matches_when_any_query_matches() {
    let list = MediaList {
      queries: vec![
        MediaQuery {
          negated: false,
          media_type: MediaType::Print,
          features: vec![],
        },
        MediaQuery {
          negated: false,
          media_type: MediaType::Screen,
          features: vec![MediaFeature::MaxWidth(Length::px(1000.0))],
        },
      ],
    };
    assert!(list.evaluate(&MediaContext::screen(800.0, 600.0)));
    assert!(!list.evaluate(&MediaContext::screen(1200.0, 600.0)));
  }
}
