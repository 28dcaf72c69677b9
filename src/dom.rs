//! Element tree
//!
//! A minimal arena-backed document tree: the style engine's view of the DOM.
//! Nodes are addressed by [`NodeId`] indices into the arena, so tree edges
//! are plain indices rather than shared pointers and the whole tree is
//! `Send`.
//!
//! Mutations are recorded in a log the style engine drains on its next
//! update, which is how dirtiness propagates without the tree knowing about
//! styling at all.

use crate::css::types::DeclaredStyle;
use rustc_hash::FxHashMap;

/// Index of a node in its [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// User-interaction state bits consulted by pseudo-class matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementState {
  pub hovered: bool,
  pub focused: bool,
  pub active: bool,
}

/// Element payload: tag, attributes and interaction state.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
  tag_name: String,
  id: Option<String>,
  classes: Vec<String>,
  attributes: FxHashMap<String, String>,
  inline_style: Option<DeclaredStyle>,
  state: ElementState,
}

impl ElementData {
  pub fn tag_name(&self) -> &str {
    &self.tag_name
  }

  pub fn id(&self) -> Option<&str> {
    self.id.as_deref()
  }

  pub fn classes(&self) -> &[String] {
    &self.classes
  }

  pub fn has_class(&self, class: &str) -> bool {
    self.classes.iter().any(|c| c == class)
  }

  pub fn attribute(&self, name: &str) -> Option<&str> {
    self.attributes.get(name).map(String::as_str)
  }

  pub fn inline_style(&self) -> Option<&DeclaredStyle> {
    self.inline_style.as_ref()
  }

  pub fn state(&self) -> ElementState {
    self.state
  }
}

#[derive(Debug, Clone)]
pub enum NodeData {
  Element(ElementData),
  Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
  parent: Option<NodeId>,
  children: Vec<NodeId>,
  data: NodeData,
}

impl Node {
  pub fn data(&self) -> &NodeData {
    &self.data
  }

  pub fn as_element(&self) -> Option<&ElementData> {
    match &self.data {
      NodeData::Element(element) => Some(element),
      NodeData::Text(_) => None,
    }
  }

  pub fn is_element(&self) -> bool {
    matches!(self.data, NodeData::Element(_))
  }
}

/// A recorded tree mutation, drained by the style engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
  /// Children added or removed under this node.
  ChildListChanged(NodeId),
  /// id, class or any other attribute changed on this node.
  AttributeChanged(NodeId),
  /// Hover/focus/active flags changed on this node.
  StateChanged(NodeId),
  /// The inline style block changed on this node.
  InlineStyleChanged(NodeId),
}

impl Mutation {
  pub fn node(self) -> NodeId {
    match self {
      Mutation::ChildListChanged(n)
      | Mutation::AttributeChanged(n)
      | Mutation::StateChanged(n)
      | Mutation::InlineStyleChanged(n) => n,
    }
  }
}

/// The document: a node arena rooted at a single element.
#[derive(Debug, Clone)]
pub struct Document {
  nodes: Vec<Node>,
  root: NodeId,
  mutations: Vec<Mutation>,
}

impl Document {
  /// Create a document whose root is an element with the given tag name.
  pub fn new(root_tag: &str) -> Self {
    let root = Node {
      parent: None,
      children: Vec::new(),
      data: NodeData::Element(ElementData {
        tag_name: root_tag.to_ascii_lowercase(),
        ..ElementData::default()
      }),
    };
    Self {
      nodes: vec![root],
      root: NodeId(0),
      mutations: Vec::new(),
    }
  }

  pub fn root(&self) -> NodeId {
    self.root
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn node(&self, id: NodeId) -> &Node {
    &self.nodes[id.index()]
  }

  pub fn element(&self, id: NodeId) -> Option<&ElementData> {
    self.node(id).as_element()
  }

  // --------------------------------------------------------------------------
  // Construction and mutation
  // --------------------------------------------------------------------------

  /// Create a detached element node.
  pub fn create_element(&mut self, tag_name: &str) -> NodeId {
    self.push_node(NodeData::Element(ElementData {
      tag_name: tag_name.to_ascii_lowercase(),
      ..ElementData::default()
    }))
  }

  /// Create a detached text node.
  pub fn create_text(&mut self, text: &str) -> NodeId {
    self.push_node(NodeData::Text(text.to_string()))
  }

  fn push_node(&mut self, data: NodeData) -> NodeId {
    let id = NodeId(self.nodes.len() as u32);
    self.nodes.push(Node {
      parent: None,
      children: Vec::new(),
      data,
    });
    id
  }

  /// Append a detached node as the last child of `parent`.
  pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
    debug_assert!(self.nodes[child.index()].parent.is_none());
    self.nodes[child.index()].parent = Some(parent);
    self.nodes[parent.index()].children.push(child);
    self.mutations.push(Mutation::ChildListChanged(parent));
  }

  /// Detach a node from its parent. The node and its subtree stay in the
  /// arena but are no longer reachable from the root.
  pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
    let children = &mut self.nodes[parent.index()].children;
    if let Some(pos) = children.iter().position(|&c| c == child) {
      children.remove(pos);
      self.nodes[child.index()].parent = None;
      self.mutations.push(Mutation::ChildListChanged(parent));
    }
  }

  pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
    let Some(element) = self.element_mut(id) else {
      return;
    };
    match name {
      "id" => element.id = Some(value.to_string()),
      "class" => {
        element.classes = value.split_ascii_whitespace().map(String::from).collect()
      }
      _ => {
        element
          .attributes
          .insert(name.to_string(), value.to_string());
      }
    }
    self.mutations.push(Mutation::AttributeChanged(id));
  }

  pub fn add_class(&mut self, id: NodeId, class: &str) {
    let Some(element) = self.element_mut(id) else {
      return;
    };
    if !element.classes.iter().any(|c| c == class) {
      element.classes.push(class.to_string());
      self.mutations.push(Mutation::AttributeChanged(id));
    }
  }

  pub fn remove_class(&mut self, id: NodeId, class: &str) {
    let Some(element) = self.element_mut(id) else {
      return;
    };
    if let Some(pos) = element.classes.iter().position(|c| c == class) {
      element.classes.remove(pos);
      self.mutations.push(Mutation::AttributeChanged(id));
    }
  }

  pub fn set_element_state(&mut self, id: NodeId, state: ElementState) {
    let Some(element) = self.element_mut(id) else {
      return;
    };
    if element.state != state {
      element.state = state;
      self.mutations.push(Mutation::StateChanged(id));
    }
  }

  /// Replace the element's inline style block.
  pub fn set_inline_style(&mut self, id: NodeId, style: Option<DeclaredStyle>) {
    let Some(element) = self.element_mut(id) else {
      return;
    };
    element.inline_style = style;
    self.mutations.push(Mutation::InlineStyleChanged(id));
  }

  pub fn set_text(&mut self, id: NodeId, text: &str) {
    if let NodeData::Text(content) = &mut self.nodes[id.index()].data {
      *content = text.to_string();
      if let Some(parent) = self.nodes[id.index()].parent {
        // :empty depends on text content, so the parent restyles.
        self.mutations.push(Mutation::ChildListChanged(parent));
      }
    }
  }

  fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
    match &mut self.nodes[id.index()].data {
      NodeData::Element(element) => Some(element),
      NodeData::Text(_) => None,
    }
  }

  /// Drain the mutation log accumulated since the last call.
  pub fn take_mutations(&mut self) -> Vec<Mutation> {
    std::mem::take(&mut self.mutations)
  }

  pub fn has_pending_mutations(&self) -> bool {
    !self.mutations.is_empty()
  }

  // --------------------------------------------------------------------------
  // Navigation
  // --------------------------------------------------------------------------

  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.nodes[id.index()].parent
  }

  pub fn children(&self, id: NodeId) -> &[NodeId] {
    &self.nodes[id.index()].children
  }

  pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    self
      .children(id)
      .iter()
      .copied()
      .filter(|&c| self.node(c).is_element())
  }

  pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
    let parent = self.parent(id)?;
    let siblings = self.children(parent);
    let pos = siblings.iter().position(|&c| c == id)?;
    siblings[..pos].iter().copied().next_back()
  }

  /// Nearest preceding sibling that is an element, for `+` matching.
  pub fn previous_sibling_element(&self, id: NodeId) -> Option<NodeId> {
    let parent = self.parent(id)?;
    let siblings = self.children(parent);
    let pos = siblings.iter().position(|&c| c == id)?;
    siblings[..pos]
      .iter()
      .rev()
      .copied()
      .find(|&c| self.node(c).is_element())
  }

  /// All preceding element siblings, nearest first, for `~` matching.
  pub fn preceding_sibling_elements(&self, id: NodeId) -> Vec<NodeId> {
    let Some(parent) = self.parent(id) else {
      return Vec::new();
    };
    let siblings = self.children(parent);
    let Some(pos) = siblings.iter().position(|&c| c == id) else {
      return Vec::new();
    };
    siblings[..pos]
      .iter()
      .rev()
      .copied()
      .filter(|&c| self.node(c).is_element())
      .collect()
  }

  pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(self.parent(id), move |&n| self.parent(n))
  }

  /// `:empty`: no element children and no non-whitespace text children.
  pub fn is_empty_element(&self, id: NodeId) -> bool {
    self.children(id).iter().all(|&c| match self.node(c).data() {
      NodeData::Element(_) => false,
      NodeData::Text(text) => text.chars().all(char::is_whitespace),
    })
  }

  /// Document-order traversal of element nodes starting at `id`.
  pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![id];
    while let Some(node) = stack.pop() {
      if self.node(node).is_element() {
        out.push(node);
        for &child in self.children(node).iter().rev() {
          stack.push(child);
        }
      }
    }
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_tree() -> (Document, NodeId, NodeId, NodeId) {
    let mut doc = Document::new("html");
    let body = doc.create_element("body");
    doc.append_child(doc.root(), body);
    let first = doc.create_element("p");
    let second = doc.create_element("p");
    doc.append_child(body, first);
    doc.append_child(body, second);
    (doc, body, first, second)
  }

  #[test]
  fn append_sets_parent_and_sibling_links() {
    let (doc, body, first, second) = sample_tree();
    assert_eq!(doc.parent(first), Some(body));
    assert_eq!(doc.previous_sibling_element(second), Some(first));
    assert_eq!(doc.previous_sibling_element(first), None);
    let ancestors: Vec<NodeId> = doc.ancestors(second).collect();
    assert_eq!(ancestors, vec![body, doc.root()]);
  }

  #[test]
  fn class_attribute_splits_on_whitespace() {
    let (mut doc, body, ..) = sample_tree();
    doc.set_attribute(body, "class", "a  b\tc");
    let element = doc.element(body).unwrap();
    assert!(element.has_class("a"));
    assert!(element.has_class("b"));
    assert!(element.has_class("c"));
    assert!(!element.has_class("d"));
  }

  #[test]
  fn empty_ignores_whitespace_text() {
    let (mut doc, _, first, second) = sample_tree();
    let blank = doc.create_text("  \n  ");
    doc.append_child(first, blank);
    assert!(doc.is_empty_element(first));
    let text = doc.create_text("hello");
    doc.append_child(second, text);
    assert!(!doc.is_empty_element(second));
  }

  #[test]
  fn mutations_are_logged_and_drained() {
    let (mut doc, body, first, _) = sample_tree();
    doc.take_mutations();
    doc.add_class(first, "x");
    doc.add_class(first, "x"); // no-op, no log entry
    doc.set_element_state(
      first,
      ElementState {
        hovered: true,
        ..ElementState::default()
      },
    );
    doc.remove_child(body, first);
    let mutations = doc.take_mutations();
    assert_eq!(
      mutations,
      vec![
        Mutation::AttributeChanged(first),
        Mutation::StateChanged(first),
        Mutation::ChildListChanged(body),
      ]
    );
    assert!(!doc.has_pending_mutations());
  }

  #[test]
  fn descendant_traversal_is_document_order() {
    let (mut doc, body, first, second) = sample_tree();
    let inner = doc.create_element("span");
    doc.append_child(first, inner);
    let order = doc.descendant_elements(doc.root());
    assert_eq!(order, vec![doc.root(), body, first, inner, second]);
  }
}
