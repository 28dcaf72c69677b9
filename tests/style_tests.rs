use faststyle::css::media::MediaContext;
use faststyle::css::parser::CssParser;
use faststyle::css::properties::PropertyKey;
use faststyle::css::selector::PseudoElement;
use faststyle::css::value::{Keyword, Length, PropertyValue, Rgba};
use faststyle::dom::{Document, ElementState, NodeId};
use faststyle::style::StyleEngine;

fn engine_with(css: &str) -> StyleEngine {
  let mut parser = CssParser::new("test.css");
  let sheet = parser.parse_style_sheet(css);
  let mut engine = StyleEngine::new(MediaContext::screen(1280.0, 720.0));
  engine.add_stylesheet(sheet);
  engine
}

/// html > body > (nav#menu.top, main > p.intro, p)
fn page() -> (Document, NodeId, NodeId, NodeId, NodeId) {
  let mut doc = Document::new("html");
  let body = doc.create_element("body");
  doc.append_child(doc.root(), body);
  let nav = doc.create_element("nav");
  doc.set_attribute(nav, "id", "menu");
  doc.set_attribute(nav, "class", "top");
  doc.append_child(body, nav);
  let main = doc.create_element("main");
  doc.append_child(body, main);
  let intro = doc.create_element("p");
  doc.set_attribute(intro, "class", "intro");
  doc.append_child(main, intro);
  let stray = doc.create_element("p");
  doc.append_child(body, stray);
  (doc, body, nav, intro, stray)
}

fn width_px(engine: &StyleEngine, node: NodeId) -> Option<f32> {
  match engine.style(node).ok()?.get(PropertyKey::Width) {
    PropertyValue::Length(l) => Some(l.value),
    _ => None,
  }
}

#[test]
fn descendant_and_child_combinators_scope_matching() {
  let mut engine = engine_with("body p { width: 10px; } main > p { height: 20px; }");
  let (mut doc, _, _, intro, stray) = page();
  engine.update_styles(&mut doc, 0.0);
  assert_eq!(width_px(&engine, intro), Some(10.0));
  assert_eq!(width_px(&engine, stray), Some(10.0));
  assert_eq!(
    engine.style(intro).unwrap().get(PropertyKey::Height),
    &PropertyValue::Length(Length::px(20.0))
  );
  // stray is a child of body, not main.
  assert_eq!(
    engine.style(stray).unwrap().get(PropertyKey::Height),
    &PropertyValue::AUTO
  );
}

#[test]
fn id_beats_class_beats_type() {
  let mut engine = engine_with(
    "nav { width: 1px; } .top { width: 2px; } #menu { width: 3px; }",
  );
  let (mut doc, _, nav, ..) = page();
  engine.update_styles(&mut doc, 0.0);
  assert_eq!(width_px(&engine, nav), Some(3.0));
}

#[test]
fn color_inherits_but_width_does_not() {
  let mut engine = engine_with("body { color: #123456; width: 600px; }");
  let (mut doc, _, _, intro, _) = page();
  engine.update_styles(&mut doc, 0.0);
  let style = engine.style(intro).unwrap();
  assert_eq!(style.color(), Rgba::new(0x12, 0x34, 0x56, 255));
  assert_eq!(style.get(PropertyKey::Width), &PropertyValue::AUTO);
}

#[test]
fn rem_resolves_against_the_root_font_size() {
  let mut engine = engine_with(
    "html { font-size: 10px; } body { font-size: 30px; } p { padding-top: 2rem; }",
  );
  let (mut doc, _, _, intro, _) = page();
  engine.update_styles(&mut doc, 0.0);
  assert_eq!(
    engine.style(intro).unwrap().get(PropertyKey::PaddingTop),
    &PropertyValue::Length(Length::px(20.0))
  );
}

#[test]
fn opacity_is_clamped_to_the_unit_range() {
  let mut engine = engine_with("nav { opacity: 1.7; } main { opacity: -0.4; }");
  let (mut doc, _, nav, ..) = page();
  engine.update_styles(&mut doc, 0.0);
  assert_eq!(engine.style(nav).unwrap().opacity(), 1.0);
}

#[test]
fn empty_pseudo_class_tracks_text_content() {
  let mut engine = engine_with("p:empty { display: none; }");
  let (mut doc, _, _, intro, _) = page();
  engine.update_styles(&mut doc, 0.0);
  assert_eq!(engine.style(intro).unwrap().display(), Keyword::None);
  let text = doc.create_text("hello");
  doc.append_child(intro, text);
  engine.update_styles(&mut doc, 0.0);
  assert!(engine.style(intro).unwrap().is_displayed());
}

#[test]
fn focus_and_active_states_restyle() {
  let mut engine = engine_with("p:focus { width: 1px; } p:active { width: 2px; }");
  let (mut doc, _, _, intro, _) = page();
  engine.update_styles(&mut doc, 0.0);
  assert_eq!(width_px(&engine, intro), None);
  doc.set_element_state(
    intro,
    ElementState {
      focused: true,
      ..ElementState::default()
    },
  );
  engine.update_styles(&mut doc, 0.0);
  assert_eq!(width_px(&engine, intro), Some(1.0));
  doc.set_element_state(
    intro,
    ElementState {
      active: true,
      ..ElementState::default()
    },
  );
  engine.update_styles(&mut doc, 0.0);
  assert_eq!(width_px(&engine, intro), Some(2.0));
}

#[test]
fn sibling_combinators_match_following_elements() {
  let mut engine = engine_with("nav + main { width: 5px; } nav ~ p { width: 6px; }");
  let (mut doc, _, _, _, stray) = page();
  engine.update_styles(&mut doc, 0.0);
  assert_eq!(width_px(&engine, stray), Some(6.0));
}

#[test]
fn later_stylesheet_wins_at_equal_specificity() {
  let mut parser = CssParser::new("first.css");
  let first = parser.parse_style_sheet("p { width: 1px; }");
  let mut parser = CssParser::new("second.css");
  let second = parser.parse_style_sheet("p { width: 2px; }");
  let mut engine = StyleEngine::new(MediaContext::screen(1280.0, 720.0));
  engine.add_stylesheet(first);
  engine.add_stylesheet(second);
  let (mut doc, _, _, intro, _) = page();
  engine.update_styles(&mut doc, 0.0);
  assert_eq!(width_px(&engine, intro), Some(2.0));
}

#[test]
fn before_pseudo_element_gets_its_own_style() {
  let mut engine = engine_with(
    ".intro::before { content: '> '; color: #ff0000; } .intro { color: #0000ff; }",
  );
  let (mut doc, _, _, intro, _) = page();
  engine.update_styles(&mut doc, 0.0);
  assert_eq!(engine.style(intro).unwrap().color(), Rgba::new(0, 0, 255, 255));
  let before = engine
    .pseudo_element_style(intro, PseudoElement::Before)
    .expect("before style");
  assert_eq!(before.color(), Rgba::new(255, 0, 0, 255));
  assert_eq!(
    before.get(PropertyKey::Content),
    &PropertyValue::String("> ".to_string())
  );
}

#[test]
fn media_gated_rules_react_to_viewport_changes() {
  let mut engine = engine_with(
    "@media screen and (min-width: 1000px) { nav { display: none; } }",
  );
  let (mut doc, _, nav, ..) = page();
  engine.update_styles(&mut doc, 0.0);
  assert_eq!(engine.style(nav).unwrap().display(), Keyword::None);
  engine.set_media_context(MediaContext::screen(800.0, 600.0));
  engine.update_styles(&mut doc, 0.0);
  assert!(engine.style(nav).unwrap().is_displayed());
}

#[test]
fn important_inline_declaration_beats_important_author_rule() {
  let mut engine = engine_with("p { width: 10px !important; }");
  let (mut doc, _, _, intro, _) = page();
  engine.update_styles(&mut doc, 0.0);
  let diagnostics = engine.set_inline_style(&mut doc, intro, "width: 99px !important");
  assert!(diagnostics.warnings.is_empty());
  engine.update_styles(&mut doc, 0.0);
  assert_eq!(width_px(&engine, intro), Some(99.0));
}
