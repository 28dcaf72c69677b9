//! Style engine
//!
//! Owns the active stylesheets and the per-element style state, and turns
//! DOM mutations plus the passage of time into fresh computed styles.
//!
//! `update_styles` is the single entry point: it drains the document's
//! mutation log, re-matches and re-cascades the affected subtrees top-down
//! (parents before children, so inheritance reads settled values), then
//! overlays running transitions and keyframe animations. Published styles
//! are immutable `Arc` snapshots; callers can hold them across updates.

use crate::animation::{AnimationSet, Seconds, TransitionSet};
use crate::css::media::MediaContext;
use crate::css::parser::{CollectedDiagnostics, CssParser};
use crate::css::selector::PseudoElement;
use crate::css::types::{FontFaceRule, KeyframesRule, StyleSheet};
use crate::dom::{Document, Mutation, NodeId};
use crate::error::{Result, StyleError};
use crate::style::cascade::resolve_style;
use crate::style::computed::{ComputedStyle, DEFAULT_FONT_SIZE};
use crate::style::matcher::RuleIndex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Style state retained per element.
#[derive(Debug, Clone)]
struct NodeStyles {
  /// Cascade output before animation overlays.
  base: Arc<ComputedStyle>,
  /// Published style with transitions and animations applied.
  style: Arc<ComputedStyle>,
  pseudo: FxHashMap<PseudoElement, Arc<ComputedStyle>>,
  transitions: TransitionSet,
  animations: AnimationSet,
}

/// The style engine.
pub struct StyleEngine {
  sheets: Vec<StyleSheet>,
  media_context: MediaContext,
  rule_index: RuleIndex,
  keyframes: FxHashMap<String, Arc<KeyframesRule>>,
  font_faces: Vec<Arc<FontFaceRule>>,
  node_styles: FxHashMap<NodeId, NodeStyles>,
  root_font_size: f32,
  index_dirty: bool,
  all_dirty: bool,
}

impl StyleEngine {
  pub fn new(media_context: MediaContext) -> Self {
    Self {
      sheets: Vec::new(),
      media_context,
      rule_index: RuleIndex::new(),
      keyframes: FxHashMap::default(),
      font_faces: Vec::new(),
      node_styles: FxHashMap::default(),
      root_font_size: DEFAULT_FONT_SIZE,
      index_dirty: false,
      all_dirty: true,
    }
  }

  /// Append a stylesheet; its rules cascade after previously added sheets.
  pub fn add_stylesheet(&mut self, sheet: StyleSheet) {
    self.sheets.push(sheet);
    self.index_dirty = true;
  }

  pub fn clear_stylesheets(&mut self) {
    self.sheets.clear();
    self.index_dirty = true;
  }

  /// Change the evaluation context for @media rules; all styles recompute.
  pub fn set_media_context(&mut self, media_context: MediaContext) {
    self.media_context = media_context;
    self.index_dirty = true;
  }

  pub fn media_context(&self) -> MediaContext {
    self.media_context
  }

  /// @font-face rules in the active media context, for the embedder's font
  /// loader.
  pub fn font_faces(&self) -> &[Arc<FontFaceRule>] {
    &self.font_faces
  }

  /// Parse `css_text` as a declaration list and install it as the node's
  /// inline style. Diagnostics are returned, not logged away.
  pub fn set_inline_style(
    &self,
    doc: &mut Document,
    node: NodeId,
    css_text: &str,
  ) -> CollectedDiagnostics {
    let mut parser = CssParser::new("inline style");
    let declarations = parser.parse_style_declaration_list(css_text);
    doc.set_inline_style(
      node,
      if declarations.is_empty() {
        None
      } else {
        Some(declarations)
      },
    );
    parser.into_observer()
  }

  /// The published style of an element, animations applied.
  pub fn style(&self, node: NodeId) -> Result<Arc<ComputedStyle>> {
    self
      .node_styles
      .get(&node)
      .map(|s| Arc::clone(&s.style))
      .ok_or_else(|| StyleError::NoComputedStyle { node_id: node.index() }.into())
  }

  pub fn computed_style(&self, node: NodeId) -> Option<Arc<ComputedStyle>> {
    self.node_styles.get(&node).map(|s| Arc::clone(&s.style))
  }

  /// Sample the element's style at an arbitrary instant without advancing
  /// any animation state. Useful for rendering between updates.
  pub fn animated_style(&self, node: NodeId, now: Seconds) -> Result<Arc<ComputedStyle>> {
    let state = self
      .node_styles
      .get(&node)
      .ok_or(StyleError::NoComputedStyle { node_id: node.index() })?;
    if state.transitions.is_empty() && state.animations.is_empty() {
      return Ok(Arc::clone(&state.style));
    }
    let mut animated = (*state.base).clone();
    state
      .animations
      .apply(now, &state.base, &mut animated, self.root_font_size);
    state.transitions.apply(now, &mut animated);
    Ok(animated.into_arc())
  }

  pub fn pseudo_element_style(
    &self,
    node: NodeId,
    pseudo: PseudoElement,
  ) -> Option<Arc<ComputedStyle>> {
    self
      .node_styles
      .get(&node)
      .and_then(|s| s.pseudo.get(&pseudo))
      .map(Arc::clone)
  }

  pub fn keyframes(&self, name: &str) -> Option<Arc<KeyframesRule>> {
    self.keyframes.get(name).map(Arc::clone)
  }

  /// Whether another update is needed purely for animation progress.
  pub fn needs_animation_tick(&self, now: Seconds) -> bool {
    self.node_styles.values().any(|s| {
      s.transitions.next_event(now).is_some() || s.animations.has_running(now)
    })
  }

  /// Recompute styles for everything affected by stylesheet changes, DOM
  /// mutations since the last update, and animation time `now`.
  pub fn update_styles(&mut self, doc: &mut Document, now: Seconds) {
    if self.index_dirty {
      self.rebuild_index();
    }

    let mut dirty_roots: FxHashSet<NodeId> = FxHashSet::default();
    for mutation in doc.take_mutations() {
      match mutation {
        Mutation::ChildListChanged(node) => {
          // Covers :empty on the node, the new children themselves, and
          // sibling-position selectors among all of its children.
          dirty_roots.insert(node);
        }
        Mutation::AttributeChanged(node)
        | Mutation::StateChanged(node)
        | Mutation::InlineStyleChanged(node) => {
          dirty_roots.insert(node);
          if self.rule_index.has_sibling_combinators() {
            for sibling in following_sibling_elements(doc, node) {
              dirty_roots.insert(sibling);
            }
          }
        }
      }
    }

    if self.all_dirty {
      self.recompute_subtree(doc, doc.root(), None, now);
      self.all_dirty = false;
    } else {
      // Drop roots covered by a dirty ancestor, then recompute top-down.
      let mut roots: Vec<NodeId> = dirty_roots
        .iter()
        .copied()
        .filter(|&n| !doc.ancestors(n).any(|a| dirty_roots.contains(&a)))
        .collect();
      roots.sort();
      for root in roots {
        let parent_base = doc
          .parent(root)
          .and_then(|p| self.node_styles.get(&p))
          .map(|s| Arc::clone(&s.base));
        if doc.parent(root).is_some() && parent_base.is_none() {
          // Parent never styled; fall back to a full pass.
          self.recompute_subtree(doc, doc.root(), None, now);
          break;
        }
        self.recompute_subtree(doc, root, parent_base, now);
      }
    }

    self.advance_animations(doc, now);
    self.drop_detached(doc);
  }

  fn rebuild_index(&mut self) {
    self.rule_index.clear();
    self.keyframes.clear();
    self.font_faces.clear();
    for (sheet_index, sheet) in self.sheets.iter().enumerate() {
      let rules = sheet.collect_style_rules(&self.media_context);
      self.rule_index.add_rules(&rules, sheet_index as u32);
      for keyframes in sheet.collect_keyframes(&self.media_context) {
        // Later definitions of the same name win.
        self.keyframes.insert(keyframes.name.clone(), keyframes);
      }
      for rule in &sheet.rules {
        if let crate::css::types::Rule::FontFace(font_face) = rule {
          self.font_faces.push(Arc::clone(font_face));
        }
      }
    }
    self.index_dirty = false;
    self.all_dirty = true;
    log::debug!(
      "rebuilt rule index: {} sheets, {} keyframes, {} font faces",
      self.sheets.len(),
      self.keyframes.len(),
      self.font_faces.len()
    );
  }

  /// Recompute one element and everything below it, parents first.
  fn recompute_subtree(
    &mut self,
    doc: &Document,
    node: NodeId,
    parent_base: Option<Arc<ComputedStyle>>,
    now: Seconds,
  ) {
    if !doc.node(node).is_element() {
      return;
    }

    let matched = self.rule_index.matching_rules(doc, node);
    let inline = doc.element(node).and_then(|e| e.inline_style().cloned());

    let is_root = doc.parent(node).is_none();
    let root_font_size = if is_root {
      DEFAULT_FONT_SIZE
    } else {
      self.root_font_size
    };
    let base = resolve_style(
      &matched,
      None,
      inline.as_ref(),
      parent_base.as_deref(),
      root_font_size,
    );
    if is_root {
      self.root_font_size = base.font_size();
    }

    // Pseudo-element styles inherit from the originating element.
    let mut pseudo = FxHashMap::default();
    for target in [PseudoElement::Before, PseudoElement::After] {
      if matched.iter().any(|m| m.pseudo_element == Some(target)) {
        let style = resolve_style(&matched, Some(target), None, Some(&base), self.root_font_size);
        pseudo.insert(target, style.into_arc());
      }
    }

    let (mut transitions, mut animations) = match self.node_styles.get(&node) {
      Some(existing) => {
        let mut transitions = existing.transitions.clone();
        transitions.update(now, &existing.base, &base);
        (transitions, existing.animations.clone())
      }
      // First style: nothing to transition from.
      None => (TransitionSet::new(), AnimationSet::new()),
    };
    animations.update(now, &base, &self.keyframes);

    let mut animated = base.clone();
    animations.apply(now, &base, &mut animated, self.root_font_size);
    transitions.apply(now, &mut animated);
    transitions.remove_finished(now);
    animations.remove_finished(now);

    let base = base.into_arc();
    self.node_styles.insert(
      node,
      NodeStyles {
        base: Arc::clone(&base),
        style: animated.into_arc(),
        pseudo,
        transitions,
        animations,
      },
    );

    let children: Vec<NodeId> = doc.child_elements(node).collect();
    for child in children {
      self.recompute_subtree(doc, child, Some(Arc::clone(&base)), now);
    }
  }

  /// Refresh the animated overlay of every element with running work, so
  /// time advances even when nothing in the DOM changed.
  fn advance_animations(&mut self, doc: &Document, now: Seconds) {
    let nodes: Vec<NodeId> = self
      .node_styles
      .iter()
      .filter(|(_, s)| !s.transitions.is_empty() || !s.animations.is_empty())
      .map(|(&n, _)| n)
      .collect();
    for node in nodes {
      if !doc.node(node).is_element() {
        continue;
      }
      let Some(state) = self.node_styles.get_mut(&node) else {
        continue;
      };
      let base = Arc::clone(&state.base);
      let mut animated = (*base).clone();
      state.animations.apply(now, &base, &mut animated, self.root_font_size);
      state.transitions.apply(now, &mut animated);
      state.transitions.remove_finished(now);
      state.animations.remove_finished(now);
      state.style = animated.into_arc();
    }
  }

  /// Forget styles of nodes detached from the root.
  fn drop_detached(&mut self, doc: &Document) {
    let root = doc.root();
    self.node_styles.retain(|&node, _| {
      node == root || doc.ancestors(node).any(|a| a == root)
    });
  }
}

fn following_sibling_elements(doc: &Document, node: NodeId) -> Vec<NodeId> {
  let Some(parent) = doc.parent(node) else {
    return Vec::new();
  };
  let children = doc.children(parent);
  let Some(pos) = children.iter().position(|&c| c == node) else {
    return Vec::new();
  };
  children[pos + 1..]
    .iter()
    .copied()
    .filter(|&c| doc.node(c).is_element())
    .collect()
}
