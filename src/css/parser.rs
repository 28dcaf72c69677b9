//! CSS parsing
//!
//! Tokenization is handled by the `cssparser` crate; everything above the
//! token stream is recursive descent written here: selector lists,
//! declaration blocks, at-rule bodies, and the per-property value grammars
//! of the closed property table.
//!
//! Errors follow the CSS error-recovery model ("be lenient"): a bad
//! declaration drops only itself, a bad rule drops only itself, and nothing
//! in here panics or propagates an error past the entry points. Problems
//! are reported through the [`ParserObserver`] channel as
//! `"<source>:<line>:<column>: warning|error: <text>"` with 1-based
//! line/column.

use crate::css::media::{MediaFeature, MediaList, MediaQuery, MediaType, Orientation};
use crate::css::properties::{strip_vendor_prefix, PropertyKey, Shorthand};
use crate::css::selector::{
  Combinator, ComplexSelector, CompoundSelector, PseudoClass, PseudoElement, SimpleSelector,
};
use crate::css::transform::{
  Matrix3, TransformFunction, TransformList, TranslateAxis, TranslateOffset,
};
use crate::css::types::{
  DeclaredStyle, FontFaceRule, FontFaceSource, Keyframe, KeyframesRule, MediaRule, Rule,
  StyleRule, StyleSheet,
};
use crate::css::value::{
  absolute_unit_to_px, angle_to_radians, time_to_seconds, CalcValue, Keyword, Length, LengthUnit,
  PropertyValue, Rgba, TimingFunction,
};
use cssparser::{
  BasicParseError, Delimiter, ParseError, Parser, ParserInput, SourceLocation, Token,
};
use std::sync::Arc;
use url::Url;

/// Receives parse diagnostics.
///
/// Warnings are recoverable (the offending construct was dropped); errors
/// mean the remainder of the current top-level construct was abandoned.
pub trait ParserObserver {
  fn on_warning(&mut self, message: &str);
  fn on_error(&mut self, message: &str);
}

/// Observer that collects diagnostics into vectors.
#[derive(Debug, Default, Clone)]
pub struct CollectedDiagnostics {
  pub warnings: Vec<String>,
  pub errors: Vec<String>,
}

impl ParserObserver for CollectedDiagnostics {
  fn on_warning(&mut self, message: &str) {
    self.warnings.push(message.to_string());
  }

  fn on_error(&mut self, message: &str) {
    self.errors.push(message.to_string());
  }
}

/// Internal error type for value grammars; diagnostics carry the details,
/// the error itself only signals failure.
type ValueError<'i> = ParseError<'i, ()>;

fn value_err<'i>(p: &Parser<'i, '_>) -> ValueError<'i> {
  p.new_custom_error(())
}

/// The CSS parser: entry points plus diagnostic state.
///
/// One parser may be reused across multiple parse calls; rule source order
/// keeps incrementing so rules from consecutive stylesheets stay ordered.
pub struct CssParser<O: ParserObserver = CollectedDiagnostics> {
  source_name: String,
  observer: O,
  /// Base for resolving relative `url()` values, usually the stylesheet's
  /// own URL.
  base_url: Option<Url>,
  next_source_order: u32,
}

impl CssParser<CollectedDiagnostics> {
  pub fn new(source_name: impl Into<String>) -> Self {
    Self::with_observer(source_name, CollectedDiagnostics::default())
  }
}

impl<O: ParserObserver> CssParser<O> {
  pub fn with_observer(source_name: impl Into<String>, observer: O) -> Self {
    Self {
      source_name: source_name.into(),
      observer,
      base_url: None,
      next_source_order: 0,
    }
  }

  pub fn with_base_url(mut self, base_url: Url) -> Self {
    self.base_url = Some(base_url);
    self
  }

  pub fn set_base_url(&mut self, base_url: Option<Url>) {
    self.base_url = base_url;
  }

  pub fn observer(&self) -> &O {
    &self.observer
  }

  pub fn observer_mut(&mut self) -> &mut O {
    &mut self.observer
  }

  pub fn into_observer(self) -> O {
    self.observer
  }

  fn warn(&mut self, location: SourceLocation, text: &str) {
    let message = format!(
      "{}:{}:{}: warning: {}",
      self.source_name,
      location.line + 1,
      location.column,
      text
    );
    log::warn!("{}", message);
    self.observer.on_warning(&message);
  }

  fn error(&mut self, location: SourceLocation, text: &str) {
    let message = format!(
      "{}:{}:{}: error: {}",
      self.source_name,
      location.line + 1,
      location.column,
      text
    );
    log::warn!("{}", message);
    self.observer.on_error(&message);
  }

  // ==========================================================================
  // Entry points
  // ==========================================================================

  /// Parse a stylesheet into its rule sequence.
  pub fn parse_style_sheet(&mut self, text: &str) -> StyleSheet {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let rules = self.parse_rule_list(&mut parser, true);
    StyleSheet { rules }
  }

  /// Parse a single top-level rule; `None` if the text held no valid rule.
  pub fn parse_rule(&mut self, text: &str) -> Option<Rule> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut rules = self.parse_rule_list(&mut parser, true);
    if rules.len() > 1 {
      let location = SourceLocation { line: 0, column: 1 };
      self.warn(location, "expected exactly one rule");
    }
    if rules.is_empty() {
      None
    } else {
      Some(rules.swap_remove(0))
    }
  }

  /// Parse a declaration list, e.g. the text of a style attribute.
  pub fn parse_style_declaration_list(&mut self, text: &str) -> DeclaredStyle {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    self.parse_declaration_list(&mut parser)
  }

  /// Parse the declaration list of an @font-face block.
  pub fn parse_font_face_declaration_list(&mut self, text: &str) -> FontFaceRule {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    self.parse_font_face_declarations(&mut parser)
  }

  /// Parse a single property's value text.
  ///
  /// `!important` is rejected here: it is only meaningful inside a full
  /// declaration list.
  pub fn parse_property_value(&mut self, property: &str, text: &str) -> Option<PropertyValue> {
    let start = SourceLocation { line: 0, column: 1 };
    let lower = property.to_ascii_lowercase();
    let key = match PropertyKey::from_name(&lower) {
      Some(key) => key,
      None => {
        self.warn(start, &format!("unsupported property {}", lower));
        return None;
      }
    };

    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);

    let value = parser.parse_until_before(Delimiter::Bang, |p| {
      let value = self.parse_longhand_value(p, key)?;
      p.expect_exhausted()?;
      Ok::<_, ValueError>(value)
    });

    // Distinguish "!important present" from a plain parse failure.
    if parser.try_parse(|p| -> Result<(), BasicParseError> {
      let token = p.next()?.clone();
      if !matches!(token, Token::Delim('!')) {
        return Err(p.new_basic_unexpected_token_error(token));
      }
      p.expect_ident_matching("important")?;
      Ok(())
    })
    .is_ok()
    {
      self.warn(
        start,
        "!important is not allowed when setting single property values.",
      );
      return None;
    }

    match value {
      Ok(value) => {
        if parser.is_exhausted() {
          Some(value)
        } else {
          self.error(parser.current_source_location(), "unrecoverable syntax error");
          None
        }
      }
      Err(_) => {
        if text.trim().ends_with(';') {
          self.error(parser.current_source_location(), "unrecoverable syntax error");
        } else {
          self.warn(start, "unsupported value");
        }
        None
      }
    }
  }

  /// Parse a comma-separated media query list.
  pub fn parse_media_list(&mut self, text: &str) -> MediaList {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    self.parse_media_queries(&mut parser)
  }

  /// Parse a single media query.
  pub fn parse_media_query(&mut self, text: &str) -> Option<MediaQuery> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let location = parser.current_source_location();
    match parser.parse_entirely(|p| self.parse_one_media_query(p)) {
      Ok(query) => Some(query),
      Err(_) => {
        self.warn(location, "invalid media query");
        None
      }
    }
  }

  // ==========================================================================
  // Rules
  // ==========================================================================

  fn parse_rule_list<'i>(&mut self, parser: &mut Parser<'i, '_>, top_level: bool) -> Vec<Rule> {
    let mut rules = Vec::new();
    loop {
      parser.skip_whitespace();
      let state = parser.state();
      let location = parser.current_source_location();
      let token = match parser.next() {
        Ok(token) => token.clone(),
        Err(_) => break,
      };
      match token {
        // SGML comment delimiters are tolerated at the stylesheet top level.
        Token::CDO | Token::CDC if top_level => continue,
        Token::AtKeyword(name) => {
          let name = name.to_string();
          if let Some(rule) = self.parse_at_rule(parser, &name, location) {
            rules.push(rule);
          }
        }
        _ => {
          parser.reset(&state);
          if let Some(rule) = self.parse_style_rule(parser, location) {
            rules.push(Rule::Style(Arc::new(rule)));
          }
        }
      }
    }
    rules
  }

  fn parse_style_rule<'i>(
    &mut self,
    parser: &mut Parser<'i, '_>,
    location: SourceLocation,
  ) -> Option<StyleRule> {
    let selectors =
      parser.parse_until_before(Delimiter::CurlyBracketBlock, |p| {
        Ok::<_, ValueError>(self.parse_selector_list(p, location))
      });
    let selectors = selectors.unwrap_or_default();

    if parser.expect_curly_bracket_block().is_err() {
      self.error(location, "unrecoverable syntax error");
      return None;
    }
    let declarations = parser
      .parse_nested_block(|p| Ok::<_, ValueError>(self.parse_declaration_list(p)))
      .unwrap_or_default();

    if selectors.is_empty() {
      // Each dropped selector already warned; an empty list drops the rule.
      return None;
    }

    let source_order = self.next_source_order;
    self.next_source_order += 1;
    Some(StyleRule {
      selectors,
      declarations,
      source_order,
    })
  }

  fn parse_at_rule<'i>(
    &mut self,
    parser: &mut Parser<'i, '_>,
    name: &str,
    location: SourceLocation,
  ) -> Option<Rule> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
      "media" => self.parse_media_rule(parser).map(|r| Rule::Media(Arc::new(r))),
      "keyframes" => self
        .parse_keyframes_rule(parser, location)
        .map(|r| Rule::Keyframes(Arc::new(r))),
      "font-face" => self
        .parse_font_face_rule(parser, location)
        .map(|r| Rule::FontFace(Arc::new(r))),
      _ => {
        // Vendor-prefixed forms of supported at-rules are skipped silently;
        // anything else is an invalid rule.
        let known_unprefixed = strip_vendor_prefix(&lower)
          .map(|n| matches!(n, "media" | "keyframes" | "font-face"))
          .unwrap_or(false);
        if !known_unprefixed {
          self.warn(location, "invalid rule");
        }
        skip_at_rule_body(parser);
        None
      }
    }
  }

  fn parse_media_rule<'i>(&mut self, parser: &mut Parser<'i, '_>) -> Option<MediaRule> {
    let media = parser
      .parse_until_before(Delimiter::CurlyBracketBlock, |p| {
        Ok::<_, ValueError>(self.parse_media_queries(p))
      })
      .unwrap_or_default();
    parser.expect_curly_bracket_block().ok()?;
    let rules = parser
      .parse_nested_block(|p| Ok::<_, ValueError>(self.parse_rule_list(p, false)))
      .unwrap_or_default();
    Some(MediaRule { media, rules })
  }

  fn parse_keyframes_rule<'i>(
    &mut self,
    parser: &mut Parser<'i, '_>,
    location: SourceLocation,
  ) -> Option<KeyframesRule> {
    let name = match parser.expect_ident() {
      Ok(name) => name.to_string(),
      Err(_) => {
        self.warn(location, "invalid rule");
        skip_at_rule_body(parser);
        return None;
      }
    };
    if parser.expect_curly_bracket_block().is_err() {
      self.warn(location, "invalid rule");
      return None;
    }
    let keyframes = parser
      .parse_nested_block(|p| Ok::<_, ValueError>(self.parse_keyframe_blocks(p)))
      .unwrap_or_default();
    Some(KeyframesRule { name, keyframes })
  }

  fn parse_keyframe_blocks<'i>(&mut self, parser: &mut Parser<'i, '_>) -> Vec<Keyframe> {
    let mut keyframes = Vec::new();
    loop {
      parser.skip_whitespace();
      if parser.is_exhausted() {
        break;
      }
      let location = parser.current_source_location();
      let offsets = parser.parse_until_before(Delimiter::CurlyBracketBlock, |p| {
        p.parse_comma_separated(|p| {
          let location = p.current_source_location();
          match p.next()?.clone() {
            Token::Ident(ident) if ident.eq_ignore_ascii_case("from") => Ok(0.0),
            Token::Ident(ident) if ident.eq_ignore_ascii_case("to") => Ok(1.0),
            Token::Percentage { unit_value, .. } if (0.0..=1.0).contains(&unit_value) => {
              Ok(unit_value)
            }
            _ => Err(value_err_at(p, location)),
          }
        })
      });
      if parser.expect_curly_bracket_block().is_err() {
        break;
      }
      let style = parser
        .parse_nested_block(|p| Ok::<_, ValueError>(self.parse_declaration_list(p)))
        .unwrap_or_default();
      match offsets {
        Ok(offsets) if !offsets.is_empty() => keyframes.push(Keyframe { offsets, style }),
        _ => self.warn(location, "invalid keyframe offset"),
      }
    }
    keyframes
  }

  fn parse_font_face_rule<'i>(
    &mut self,
    parser: &mut Parser<'i, '_>,
    location: SourceLocation,
  ) -> Option<FontFaceRule> {
    if parser.expect_curly_bracket_block().is_err() {
      self.warn(location, "invalid rule");
      skip_at_rule_body(parser);
      return None;
    }
    parser
      .parse_nested_block(|p| Ok::<_, ValueError>(self.parse_font_face_declarations(p)))
      .ok()
  }

  fn parse_font_face_declarations<'i>(&mut self, parser: &mut Parser<'i, '_>) -> FontFaceRule {
    let mut rule = FontFaceRule::default();
    let base = self.base_url.clone();
    loop {
      parser.skip_whitespace();
      if parser.is_exhausted() {
        break;
      }
      let location = parser.current_source_location();
      let result = parser.parse_until_after(Delimiter::Semicolon, |p| {
        let name = p.expect_ident()?.to_ascii_lowercase();
        p.expect_colon()?;
        p.skip_whitespace();
        match name.as_str() {
          "font-family" => {
            let family = match p.next()?.clone() {
              Token::QuotedString(s) => s.to_string(),
              Token::Ident(s) => s.to_string(),
              _ => return Err(value_err(p)),
            };
            rule.family = Some(family);
          }
          "src" => {
            let sources = p.parse_comma_separated(|p| {
              let source = match p.next()?.clone() {
                Token::UnquotedUrl(url) => FontFaceSource::Url(resolve_url(base.as_ref(), &url)),
                Token::Function(f) if f.eq_ignore_ascii_case("url") => {
                  let url =
                    p.parse_nested_block(|p| Ok::<_, ValueError>(p.expect_string()?.to_string()))?;
                  FontFaceSource::Url(resolve_url(base.as_ref(), &url))
                }
                Token::Function(f) if f.eq_ignore_ascii_case("local") => {
                  let name = p.parse_nested_block(|p| {
                    let name = match p.next()?.clone() {
                      Token::QuotedString(s) => s.to_string(),
                      Token::Ident(s) => s.to_string(),
                      _ => return Err(value_err(p)),
                    };
                    Ok::<_, ValueError>(name)
                  })?;
                  FontFaceSource::Local(name)
                }
                _ => return Err(value_err(p)),
              };
              // Optional format() hint, accepted and discarded.
              let _ = p.try_parse(|p| -> Result<(), ValueError> {
                match p.next()?.clone() {
                  Token::Function(f) if f.eq_ignore_ascii_case("format") => {
                    p.parse_nested_block(|p| {
                      while p.next().is_ok() {}
                      Ok::<_, ValueError>(())
                    })?;
                    Ok(())
                  }
                  _ => Err(value_err(p)),
                }
              });
              Ok(source)
            })?;
            rule.sources = sources;
          }
          _ => return Err(value_err(p)),
        }
        Ok::<_, ValueError>(())
      });
      if result.is_err() {
        self.warn(location, "invalid declaration");
      }
    }
    rule
  }

  // ==========================================================================
  // Selectors
  // ==========================================================================

  fn parse_selector_list<'i>(
    &mut self,
    parser: &mut Parser<'i, '_>,
    rule_location: SourceLocation,
  ) -> Vec<ComplexSelector> {
    let mut selectors = Vec::new();
    loop {
      parser.skip_whitespace();
      if parser.is_exhausted() {
        break;
      }
      let result = parser.parse_until_before(Delimiter::Comma, |p| {
        self.parse_complex_selector(p, rule_location)
      });
      match result {
        Ok(selector) => selectors.push(selector),
        // Warning already emitted; the sibling selectors still apply.
        Err(_) => {}
      }
      if parser.next().is_err() {
        break; // exhausted; otherwise the comma was consumed
      }
    }
    selectors
  }

  fn parse_complex_selector<'i>(
    &mut self,
    parser: &mut Parser<'i, '_>,
    rule_location: SourceLocation,
  ) -> Result<ComplexSelector, ValueError<'i>> {
    let mut compounds: Vec<CompoundSelector> = Vec::new();
    let mut combinators: Vec<Combinator> = Vec::new();
    let mut current: Vec<SimpleSelector> = Vec::new();
    let mut pending: Option<Combinator> = None;

    loop {
      let state = parser.state();
      let token = match parser.next_including_whitespace() {
        Ok(token) => token.clone(),
        Err(_) => break,
      };
      match token {
        Token::WhiteSpace(_) => {
          if !current.is_empty() && pending.is_none() {
            pending = Some(Combinator::Descendant);
          }
        }
        Token::Delim('>') => pending = Some(Combinator::Child),
        Token::Delim('+') => pending = Some(Combinator::NextSibling),
        Token::Delim('~') => pending = Some(Combinator::FollowingSibling),
        _ => {
          parser.reset(&state);
          let simple = self.parse_simple_selector(parser, rule_location)?;
          if let Some(combinator) = pending.take() {
            if current.is_empty() {
              // Leading combinator, e.g. "> div".
              return Err(value_err(parser));
            }
            compounds.push(CompoundSelector::new(std::mem::take(&mut current)));
            combinators.push(combinator);
          }
          current.push(simple);
        }
      }
    }

    if current.is_empty() {
      if !compounds.is_empty() {
        // Trailing combinator, e.g. "div >".
        self.warn(rule_location, "invalid rule");
      }
      return Err(value_err(parser));
    }
    compounds.push(CompoundSelector::new(current));

    // A pseudo-element may only appear on the rightmost compound.
    let last = compounds.len() - 1;
    for (i, compound) in compounds.iter().enumerate() {
      let pseudo_count = compound
        .simple_selectors()
        .iter()
        .filter(|s| matches!(s, SimpleSelector::PseudoElement(_)))
        .count();
      if pseudo_count > 1 || (pseudo_count == 1 && i != last) {
        self.warn(rule_location, "unsupported pseudo-element placement");
        return Err(value_err(parser));
      }
    }

    Ok(ComplexSelector::new(compounds, combinators))
  }

  fn parse_simple_selector<'i>(
    &mut self,
    parser: &mut Parser<'i, '_>,
    rule_location: SourceLocation,
  ) -> Result<SimpleSelector, ValueError<'i>> {
    match parser.next_including_whitespace()?.clone() {
      Token::Ident(name) => Ok(SimpleSelector::Type(name.to_ascii_lowercase())),
      Token::Delim('*') => Ok(SimpleSelector::Universal),
      Token::Delim('.') => match parser.next_including_whitespace()?.clone() {
        Token::Ident(name) => Ok(SimpleSelector::Class(name.to_string())),
        _ => Err(value_err(parser)),
      },
      Token::IDHash(name) => Ok(SimpleSelector::Id(name.to_string())),
      Token::Colon => self.parse_pseudo(parser, rule_location),
      _ => Err(value_err(parser)),
    }
  }

  fn parse_pseudo<'i>(
    &mut self,
    parser: &mut Parser<'i, '_>,
    rule_location: SourceLocation,
  ) -> Result<SimpleSelector, ValueError<'i>> {
    match parser.next_including_whitespace()?.clone() {
      // Double colon: always a pseudo-element.
      Token::Colon => {
        let name = match parser.next_including_whitespace()?.clone() {
          Token::Ident(name) => name.to_ascii_lowercase(),
          _ => return Err(value_err(parser)),
        };
        match name.as_str() {
          "before" => Ok(SimpleSelector::PseudoElement(PseudoElement::Before)),
          "after" => Ok(SimpleSelector::PseudoElement(PseudoElement::After)),
          _ => {
            self.warn(rule_location, "unsupported pseudo-element");
            Err(value_err(parser))
          }
        }
      }
      Token::Ident(name) => {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
          "active" => Ok(SimpleSelector::PseudoClass(PseudoClass::Active)),
          "empty" => Ok(SimpleSelector::PseudoClass(PseudoClass::Empty)),
          "focus" => Ok(SimpleSelector::PseudoClass(PseudoClass::Focus)),
          "hover" => Ok(SimpleSelector::PseudoClass(PseudoClass::Hover)),
          // Single-colon forms of the generated-content pseudo-elements.
          "before" => Ok(SimpleSelector::PseudoElement(PseudoElement::Before)),
          "after" => Ok(SimpleSelector::PseudoElement(PseudoElement::After)),
          _ => {
            self.warn(rule_location, "unsupported pseudo-class");
            Err(value_err(parser))
          }
        }
      }
      Token::Function(name) if name.eq_ignore_ascii_case("not") => {
        let inner = parser.parse_nested_block(|p| {
          let mut simple = Vec::new();
          loop {
            let state = p.state();
            match p.next_including_whitespace() {
              Err(_) => break,
              Ok(Token::WhiteSpace(_)) => {
                if simple.is_empty() {
                  continue; // leading whitespace
                }
                if p.is_exhausted() {
                  break; // trailing whitespace
                }
                // Whitespace between simple selectors would make the argument
                // a complex selector, which :not() does not accept.
                return Err(value_err(p));
              }
              Ok(_) => p.reset(&state),
            }
            let s = self.parse_simple_selector(p, rule_location)?;
            if matches!(s, SimpleSelector::PseudoElement(_))
              || matches!(s, SimpleSelector::PseudoClass(PseudoClass::Not(_)))
            {
              return Err(value_err(p));
            }
            simple.push(s);
          }
          if simple.is_empty() {
            return Err(value_err(p));
          }
          Ok::<_, ValueError>(CompoundSelector::new(simple))
        });
        match inner {
          Ok(compound) => Ok(SimpleSelector::PseudoClass(PseudoClass::Not(Box::new(
            compound,
          )))),
          Err(_) => {
            self.warn(rule_location, "unsupported selector within :not()");
            Err(value_err(parser))
          }
        }
      }
      _ => Err(value_err(parser)),
    }
  }

  // ==========================================================================
  // Declarations
  // ==========================================================================

  fn parse_declaration_list<'i>(&mut self, parser: &mut Parser<'i, '_>) -> DeclaredStyle {
    let mut style = DeclaredStyle::new();
    loop {
      parser.skip_whitespace();
      if parser.is_exhausted() {
        break;
      }
      let location = parser.current_source_location();
      let result = parser.parse_until_after(Delimiter::Semicolon, |p| {
        self.parse_declaration(p, location)
      });
      match result {
        Ok(Some(declarations)) => {
          for (key, value, important) in declarations {
            style.set(key, value, important);
          }
        }
        Ok(None) => {} // already warned with a more specific message
        Err(_) => self.warn(location, "invalid declaration"),
      }
    }
    style
  }

  #[allow(clippy::type_complexity)]
  fn parse_declaration<'i>(
    &mut self,
    parser: &mut Parser<'i, '_>,
    location: SourceLocation,
  ) -> Result<Option<Vec<(PropertyKey, PropertyValue, bool)>>, ValueError<'i>> {
    let name = parser.expect_ident()?.to_ascii_lowercase();
    parser.expect_colon()?;

    enum Target {
      Longhand(PropertyKey),
      Shorthand(Shorthand),
    }

    let target = if let Some(key) = PropertyKey::from_name(&name) {
      Target::Longhand(key)
    } else if let Some(shorthand) = Shorthand::from_name(&name) {
      Target::Shorthand(shorthand)
    } else if let Some(unprefixed) = strip_vendor_prefix(&name) {
      if PropertyKey::from_name(unprefixed).is_some() || Shorthand::from_name(unprefixed).is_some()
      {
        // A vendor copy of a supported property: silently ignored.
        consume_remaining(parser);
        return Ok(None);
      } else {
        self.warn(location, &format!("unsupported property {}", name));
        consume_remaining(parser);
        return Ok(None);
      }
    } else {
      self.warn(location, &format!("unsupported property {}", name));
      consume_remaining(parser);
      return Ok(None);
    };

    let value_result = parser.parse_until_before(Delimiter::Bang, |p| {
      p.skip_whitespace();
      let value_location = p.current_source_location();
      let parsed = match &target {
        Target::Longhand(key) => {
          let value = self.parse_longhand_value(p, *key)?;
          vec![(*key, value)]
        }
        Target::Shorthand(shorthand) => self.parse_shorthand_value(p, *shorthand)?,
      };
      p.skip_whitespace();
      if !p.is_exhausted() {
        return Err(value_err(p));
      }
      Ok::<_, ValueError>((parsed, value_location))
    });

    let important = parser
      .try_parse(|p| -> Result<(), BasicParseError> {
        let token = p.next()?.clone();
        if !matches!(token, Token::Delim('!')) {
          return Err(p.new_basic_unexpected_token_error(token));
        }
        p.expect_ident_matching("important")?;
        Ok(())
      })
      .is_ok();

    match value_result {
      Ok((values, _)) => Ok(Some(
        values
          .into_iter()
          .map(|(key, value)| (key, value, important))
          .collect(),
      )),
      Err(_) => {
        // Re-derive the value start column for the warning. The bang-bounded
        // region was consumed either way, so recovery already happened.
        self.warn(location_of_value(location, &name), "unsupported value");
        Ok(None)
      }
    }
  }

  // ==========================================================================
  // Longhand value grammars
  // ==========================================================================

  fn parse_longhand_value<'i>(
    &mut self,
    p: &mut Parser<'i, '_>,
    key: PropertyKey,
  ) -> Result<PropertyValue, ValueError<'i>> {
    // CSS-wide keywords apply to every property.
    if let Some(wide) = try_parse_css_wide(p) {
      return Ok(wide);
    }

    use PropertyKey::*;
    match key {
      AnimationDelay | AnimationDuration | TransitionDelay | TransitionDuration => {
        let times = p.parse_comma_separated(|p| parse_time(p))?;
        Ok(PropertyValue::TimeList(times))
      }
      AnimationDirection => parse_keyword_list(
        p,
        &[
          Keyword::Normal,
          Keyword::Reverse,
          Keyword::Alternate,
          Keyword::AlternateReverse,
        ],
      ),
      AnimationFillMode => parse_keyword_list(
        p,
        &[Keyword::None, Keyword::Forwards, Keyword::Backwards, Keyword::Both],
      ),
      AnimationIterationCount => {
        let items = p.parse_comma_separated(|p| {
          if p
            .try_parse(|p| p.expect_ident_matching("infinite"))
            .is_ok()
          {
            return Ok(PropertyValue::Keyword(Keyword::Infinite));
          }
          let n = p.expect_number()?;
          if n < 0.0 {
            return Err(value_err(p));
          }
          Ok(PropertyValue::Number(n))
        })?;
        Ok(PropertyValue::List(items))
      }
      AnimationName => {
        if p.try_parse(|p| p.expect_ident_matching("none")).is_ok() {
          p.expect_exhausted()?;
          return Ok(PropertyValue::NONE);
        }
        let names = p.parse_comma_separated(|p| {
          let name = match p.next()?.clone() {
            Token::Ident(name) => name.to_string(),
            Token::QuotedString(name) => name.to_string(),
            _ => return Err(value_err(p)),
          };
          Ok(PropertyValue::String(name))
        })?;
        Ok(PropertyValue::List(names))
      }
      AnimationTimingFunction | TransitionTimingFunction => {
        let functions = p.parse_comma_separated(|p| self.parse_timing_function(p))?;
        Ok(PropertyValue::TimingFunctionList(functions))
      }
      BackgroundColor | BorderBottomColor | BorderLeftColor | BorderRightColor
      | BorderTopColor | Color => Ok(PropertyValue::Color(parse_color(p)?)),
      BackgroundImage => {
        if p.try_parse(|p| p.expect_ident_matching("none")).is_ok() {
          return Ok(PropertyValue::NONE);
        }
        let base = self.base_url.clone();
        let images = p.parse_comma_separated(|p| parse_url(p, base.as_ref()))?;
        Ok(PropertyValue::List(images))
      }
      BackgroundPosition => parse_background_position(p),
      BackgroundRepeat => {
        let horizontal = parse_one_keyword(p, &[Keyword::Repeat, Keyword::NoRepeat])?;
        let vertical = p
          .try_parse(|p| parse_one_keyword(p, &[Keyword::Repeat, Keyword::NoRepeat]))
          .unwrap_or(horizontal);
        Ok(PropertyValue::List(vec![
          PropertyValue::Keyword(horizontal),
          PropertyValue::Keyword(vertical),
        ]))
      }
      BackgroundSize => {
        if let Ok(keyword) = p.try_parse(|p| parse_one_keyword(p, &[Keyword::Contain, Keyword::Cover]))
        {
          return Ok(PropertyValue::Keyword(keyword));
        }
        let width = parse_size_component(p)?;
        let height = p
          .try_parse(parse_size_component)
          .unwrap_or(PropertyValue::AUTO);
        Ok(PropertyValue::List(vec![width, height]))
      }
      BorderBottomStyle | BorderLeftStyle | BorderRightStyle | BorderTopStyle => Ok(
        PropertyValue::Keyword(parse_one_keyword(
          p,
          &[Keyword::None, Keyword::Hidden, Keyword::Solid],
        )?),
      ),
      BorderBottomWidth | BorderLeftWidth | BorderRightWidth | BorderTopWidth => {
        Ok(PropertyValue::Length(parse_border_width(p)?))
      }
      BorderRadius => {
        if let Ok(pct) = p.try_parse(|p| p.expect_percentage()) {
          return Ok(PropertyValue::Percentage(pct * 100.0));
        }
        Ok(PropertyValue::Length(parse_non_negative_length(p)?))
      }
      Bottom | Left | Right | Top => parse_auto_length_percentage(p),
      Content => {
        if let Some(keyword) =
          try_parse_keyword(p, &[Keyword::Normal, Keyword::None])
        {
          return Ok(PropertyValue::Keyword(keyword));
        }
        if let Ok(url) = p.try_parse(|p| parse_url(p, self.base_url.as_ref())) {
          return Ok(url);
        }
        let s = p.expect_string()?.to_string();
        Ok(PropertyValue::String(s))
      }
      Display => Ok(PropertyValue::Keyword(parse_one_keyword(
        p,
        &[
          Keyword::Block,
          Keyword::Inline,
          Keyword::InlineBlock,
          Keyword::None,
        ],
      )?)),
      FontFamily => parse_font_family(p),
      FontSize => parse_length_percentage(p, false),
      FontStyle => Ok(PropertyValue::Keyword(parse_one_keyword(
        p,
        &[Keyword::Normal, Keyword::Italic, Keyword::Oblique],
      )?)),
      FontWeight => parse_font_weight(p),
      Height | Width => parse_auto_length_percentage(p),
      LineHeight => {
        if let Some(keyword) = try_parse_keyword(p, &[Keyword::Normal]) {
          return Ok(PropertyValue::Keyword(keyword));
        }
        if let Ok(n) = p.try_parse(|p| -> Result<f32, ValueError<'i>> {
          match p.next()?.clone() {
            Token::Number { value, .. } if value >= 0.0 => Ok(value),
            _ => Err(value_err(p)),
          }
        }) {
          return Ok(PropertyValue::Number(n));
        }
        parse_length_percentage(p, false)
      }
      MarginBottom | MarginLeft | MarginRight | MarginTop => parse_auto_length_percentage(p),
      MaxHeight | MaxWidth => {
        if let Some(keyword) = try_parse_keyword(p, &[Keyword::None]) {
          return Ok(PropertyValue::Keyword(keyword));
        }
        parse_length_percentage(p, false)
      }
      MinHeight | MinWidth => parse_length_percentage(p, false),
      Opacity => {
        let n = p.expect_number()?;
        Ok(PropertyValue::Number(n))
      }
      Overflow => Ok(PropertyValue::Keyword(parse_one_keyword(
        p,
        &[Keyword::Visible, Keyword::Hidden],
      )?)),
      OverflowWrap => Ok(PropertyValue::Keyword(parse_one_keyword(
        p,
        &[Keyword::Normal, Keyword::BreakWord],
      )?)),
      PaddingBottom | PaddingLeft | PaddingRight | PaddingTop | TextIndent => {
        parse_length_percentage(p, false)
      }
      Position => Ok(PropertyValue::Keyword(parse_one_keyword(
        p,
        &[Keyword::Static, Keyword::Relative, Keyword::Absolute],
      )?)),
      TabSize => {
        let i = p.expect_integer()?;
        if i < 0 {
          return Err(value_err(p));
        }
        Ok(PropertyValue::Integer(i64::from(i)))
      }
      TextAlign => Ok(PropertyValue::Keyword(parse_one_keyword(
        p,
        &[Keyword::Left, Keyword::Center, Keyword::Right],
      )?)),
      TextOverflow => Ok(PropertyValue::Keyword(parse_one_keyword(
        p,
        &[Keyword::Clip, Keyword::Ellipsis],
      )?)),
      TextTransform => Ok(PropertyValue::Keyword(parse_one_keyword(
        p,
        &[Keyword::None, Keyword::Uppercase],
      )?)),
      Transform => self.parse_transform_list(p),
      TransitionProperty => parse_transition_property(p),
      VerticalAlign => Ok(PropertyValue::Keyword(parse_one_keyword(
        p,
        &[Keyword::Baseline, Keyword::Top, Keyword::Middle, Keyword::Bottom],
      )?)),
      Visibility => Ok(PropertyValue::Keyword(parse_one_keyword(
        p,
        &[Keyword::Visible, Keyword::Hidden],
      )?)),
      WhiteSpace => Ok(PropertyValue::Keyword(parse_one_keyword(
        p,
        &[Keyword::Normal, Keyword::NoWrap, Keyword::Pre],
      )?)),
      ZIndex => {
        if let Some(keyword) = try_parse_keyword(p, &[Keyword::Auto]) {
          return Ok(PropertyValue::Keyword(keyword));
        }
        let i = p.expect_integer()?;
        Ok(PropertyValue::Integer(i64::from(i)))
      }
    }
  }

  fn parse_timing_function<'i>(
    &mut self,
    p: &mut Parser<'i, '_>,
  ) -> Result<TimingFunction, ValueError<'i>> {
    let location = p.current_source_location();
    match p.next()?.clone() {
      Token::Ident(name) => match name.to_ascii_lowercase().as_str() {
        "linear" => Ok(TimingFunction::LINEAR),
        "ease" => Ok(TimingFunction::EASE),
        "ease-in" => Ok(TimingFunction::EASE_IN),
        "ease-out" => Ok(TimingFunction::EASE_OUT),
        "ease-in-out" => Ok(TimingFunction::EASE_IN_OUT),
        "step-start" => Ok(TimingFunction::STEP_START),
        "step-end" => Ok(TimingFunction::STEP_END),
        _ => Err(value_err(p)),
      },
      Token::Function(name) if name.eq_ignore_ascii_case("cubic-bezier") => {
        let points = p.parse_nested_block(|p| {
          let x1 = p.expect_number()?;
          p.expect_comma()?;
          let y1 = p.expect_number()?;
          p.expect_comma()?;
          let x2 = p.expect_number()?;
          p.expect_comma()?;
          let y2 = p.expect_number()?;
          Ok::<_, ValueError>((x1, y1, x2, y2))
        })?;
        let (x1, y1, x2, y2) = points;
        if !(0.0..=1.0).contains(&x1) || !(0.0..=1.0).contains(&x2) {
          // Defined fallback so processing continues with a usable curve.
          self.error(
            location,
            "cubic-bezier control point x values must be in the range [0, 1].",
          );
          return Ok(TimingFunction::EASE);
        }
        Ok(TimingFunction::CubicBezier { x1, y1, x2, y2 })
      }
      Token::Function(name) if name.eq_ignore_ascii_case("steps") => {
        let (count, at_start) = p.parse_nested_block(|p| {
          let count = p.expect_integer()?;
          if count <= 0 {
            return Err(value_err(p));
          }
          let at_start = if p.try_parse(|p| p.expect_comma()).is_ok() {
            match p.next()?.clone() {
              Token::Ident(pos) if pos.eq_ignore_ascii_case("start") => true,
              Token::Ident(pos) if pos.eq_ignore_ascii_case("end") => false,
              _ => return Err(value_err(p)),
            }
          } else {
            false
          };
          Ok::<_, ValueError>((count, at_start))
        })?;
        Ok(TimingFunction::Steps { count, at_start })
      }
      _ => Err(value_err(p)),
    }
  }

  fn parse_transform_list<'i>(
    &mut self,
    p: &mut Parser<'i, '_>,
  ) -> Result<PropertyValue, ValueError<'i>> {
    if p.try_parse(|p| p.expect_ident_matching("none")).is_ok() {
      return Ok(PropertyValue::NONE);
    }
    let mut functions = Vec::new();
    loop {
      p.skip_whitespace();
      if p.is_exhausted() {
        break;
      }
      let location = p.current_source_location();
      match self.parse_transform_function(p) {
        Ok(function) => functions.push(function),
        Err(e) => {
          self.warn(location, "invalid transform function");
          return Err(e);
        }
      }
    }
    if functions.is_empty() {
      return Err(value_err(p));
    }
    Ok(PropertyValue::Transform(TransformList::new(functions)))
  }

  fn parse_transform_function<'i>(
    &mut self,
    p: &mut Parser<'i, '_>,
  ) -> Result<TransformFunction, ValueError<'i>> {
    let name = match p.next()?.clone() {
      Token::Function(name) => name.to_ascii_lowercase(),
      _ => return Err(value_err(p)),
    };
    p.parse_nested_block(|p| match name.as_str() {
      "matrix" => {
        let mut values = [0.0f32; 6];
        for (i, value) in values.iter_mut().enumerate() {
          if i > 0 {
            p.expect_comma()?;
          }
          *value = p.expect_number()?;
        }
        Ok(TransformFunction::Matrix(Matrix3::from_css_values(
          values[0], values[1], values[2], values[3], values[4], values[5],
        )))
      }
      "rotate" => {
        let angle = parse_angle(p)?;
        Ok(TransformFunction::Rotate(angle))
      }
      "scale" => {
        let x = p.expect_number()?;
        let y = if p.try_parse(|p| p.expect_comma()).is_ok() {
          p.expect_number()?
        } else {
          x
        };
        Ok(TransformFunction::Scale { x, y })
      }
      "scalex" => Ok(TransformFunction::Scale {
        x: p.expect_number()?,
        y: 1.0,
      }),
      "scaley" => Ok(TransformFunction::Scale {
        x: 1.0,
        y: p.expect_number()?,
      }),
      "translatex" => Ok(TransformFunction::Translate {
        axis: TranslateAxis::X,
        offset: parse_translate_offset(p)?,
      }),
      "translatey" => Ok(TransformFunction::Translate {
        axis: TranslateAxis::Y,
        offset: parse_translate_offset(p)?,
      }),
      _ => Err(value_err(p)),
    })
  }

  // ==========================================================================
  // Shorthands
  // ==========================================================================

  #[allow(clippy::type_complexity)]
  fn parse_shorthand_value<'i>(
    &mut self,
    p: &mut Parser<'i, '_>,
    shorthand: Shorthand,
  ) -> Result<Vec<(PropertyKey, PropertyValue)>, ValueError<'i>> {
    // CSS-wide keywords distribute over every longhand in the reset list.
    if let Some(wide) = try_parse_css_wide(p) {
      return Ok(
        shorthand
          .longhands()
          .iter()
          .map(|&key| (key, wide.clone()))
          .collect(),
      );
    }

    let mut out: Vec<(PropertyKey, PropertyValue)> = Vec::new();
    match shorthand {
      Shorthand::Margin => parse_box_shorthand(p, Shorthand::Margin, parse_auto_length_percentage, &mut out)?,
      Shorthand::Padding => {
        parse_box_shorthand(p, Shorthand::Padding, |p| parse_length_percentage(p, false), &mut out)?
      }
      Shorthand::BorderColor => parse_box_shorthand(
        p,
        Shorthand::BorderColor,
        |p| Ok(PropertyValue::Color(parse_color(p)?)),
        &mut out,
      )?,
      Shorthand::BorderStyle => parse_box_shorthand(
        p,
        Shorthand::BorderStyle,
        |p| {
          Ok(PropertyValue::Keyword(parse_one_keyword(
            p,
            &[Keyword::None, Keyword::Hidden, Keyword::Solid],
          )?))
        },
        &mut out,
      )?,
      Shorthand::BorderWidth => parse_box_shorthand(
        p,
        Shorthand::BorderWidth,
        |p| Ok(PropertyValue::Length(parse_border_width(p)?)),
        &mut out,
      )?,
      Shorthand::Border
      | Shorthand::BorderTop
      | Shorthand::BorderRight
      | Shorthand::BorderBottom
      | Shorthand::BorderLeft => parse_border_shorthand(p, shorthand, &mut out)?,
      Shorthand::Background => {
        let base = self.base_url.clone();
        parse_background_shorthand(p, base.as_ref(), &mut out)?
      }
      Shorthand::Font => parse_font_shorthand(p, &mut out)?,
      Shorthand::Transition => parse_transition_shorthand(p, self, &mut out)?,
      Shorthand::Animation => parse_animation_shorthand(p, self, &mut out)?,
    }

    // Shorthand expansion is total: unspecified longhands reset to initial.
    for &key in shorthand.longhands() {
      if !out.iter().any(|(k, _)| *k == key) {
        out.push((key, key.initial_value()));
      }
    }
    Ok(out)
  }

  // ==========================================================================
  // Media queries
  // ==========================================================================

  fn parse_media_queries<'i>(&mut self, parser: &mut Parser<'i, '_>) -> MediaList {
    let mut queries = Vec::new();
    loop {
      parser.skip_whitespace();
      if parser.is_exhausted() {
        break;
      }
      let location = parser.current_source_location();
      let result =
        parser.parse_until_before(Delimiter::Comma, |p| self.parse_one_media_query(p));
      match result {
        Ok(query) => queries.push(query),
        Err(_) => {
          self.warn(location, "invalid media query");
          // An unparseable query is "not all": it matches nothing but the
          // rest of the list still applies.
          queries.push(MediaQuery {
            negated: true,
            media_type: MediaType::All,
            features: Vec::new(),
          });
        }
      }
      if parser.next().is_err() {
        break;
      }
    }
    MediaList { queries }
  }

  fn parse_one_media_query<'i>(
    &mut self,
    p: &mut Parser<'i, '_>,
  ) -> Result<MediaQuery, ValueError<'i>> {
    let mut query = MediaQuery::all();
    let mut saw_anything = false;

    if p.try_parse(|p| p.expect_ident_matching("not")).is_ok() {
      query.negated = true;
      saw_anything = true;
    } else if p.try_parse(|p| p.expect_ident_matching("only")).is_ok() {
      // "only" exists for legacy parsers; no effect here.
      saw_anything = true;
    }

    if let Ok(media_type) = p.try_parse(|p| -> Result<MediaType, ValueError<'i>> {
      match p.next()?.clone() {
        Token::Ident(name) => MediaType::parse(&name).ok_or_else(|| value_err(p)),
        _ => Err(value_err(p)),
      }
    }) {
      query.media_type = media_type;
      saw_anything = true;
      if p.is_exhausted() {
        return Ok(query);
      }
      p.expect_ident_matching("and")?;
    } else if (query.negated || saw_anything) && p.is_exhausted() {
      // "not" alone is not a query.
      return Err(value_err(p));
    }

    loop {
      p.skip_whitespace();
      if p.is_exhausted() {
        if query.features.is_empty() && !saw_anything {
          return Err(value_err(p));
        }
        break;
      }
      match p.next()?.clone() {
        Token::ParenthesisBlock => {
          let feature = p.parse_nested_block(|p| parse_media_feature(p))?;
          query.features.push(feature);
          saw_anything = true;
        }
        Token::Ident(name) if name.eq_ignore_ascii_case("and") => continue,
        _ => return Err(value_err(p)),
      }
    }
    Ok(query)
  }
}

// ============================================================================
// Free parsing helpers (no diagnostics needed)
// ============================================================================

fn value_err_at<'i>(p: &Parser<'i, '_>, _location: SourceLocation) -> ValueError<'i> {
  p.new_custom_error(())
}

/// Consume everything left in the current delimited region.
fn consume_remaining(parser: &mut Parser) {
  while parser.next().is_ok() {}
}

/// Skip an at-rule body: everything up to and including the next `;` at this
/// nesting level, or the next block.
fn skip_at_rule_body(parser: &mut Parser) {
  loop {
    match parser.next() {
      Ok(Token::Semicolon) => break,
      Ok(Token::CurlyBracketBlock) => break, // block contents auto-skipped
      Ok(_) => continue,
      Err(_) => break,
    }
  }
}

/// Column of the first value token given the declaration start and property
/// name length ("name: " prefix).
fn location_of_value(declaration: SourceLocation, name: &str) -> SourceLocation {
  SourceLocation {
    line: declaration.line,
    column: declaration.column + name.len() as u32 + 2,
  }
}

fn try_parse_css_wide(p: &mut Parser) -> Option<PropertyValue> {
  let keyword = p
    .try_parse(|p| -> Result<Keyword, BasicParseError> {
      let ident = p.expect_ident()?.clone();
      let keyword = match ident.to_ascii_lowercase().as_str() {
        "inherit" => Keyword::Inherit,
        "initial" => Keyword::Initial,
        _ => return Err(p.new_basic_unexpected_token_error(Token::Ident(ident.clone()))),
      };
      p.expect_exhausted()?;
      Ok(keyword)
    })
    .ok()?;
  Some(PropertyValue::Keyword(keyword))
}

fn try_parse_keyword(p: &mut Parser, allowed: &[Keyword]) -> Option<Keyword> {
  p.try_parse(|p| parse_one_keyword(p, allowed)).ok()
}

fn parse_one_keyword<'i>(p: &mut Parser<'i, '_>, allowed: &[Keyword]) -> Result<Keyword, ValueError<'i>> {
  let ident = p.expect_ident()?.clone();
  let keyword = Keyword::from_ident(&ident).ok_or_else(|| value_err(p))?;
  if allowed.contains(&keyword) {
    Ok(keyword)
  } else {
    Err(value_err(p))
  }
}

fn parse_keyword_list<'i>(
  p: &mut Parser<'i, '_>,
  allowed: &[Keyword],
) -> Result<PropertyValue, ValueError<'i>> {
  let items = p.parse_comma_separated(|p| {
    Ok(PropertyValue::Keyword(parse_one_keyword(p, allowed)?))
  })?;
  Ok(PropertyValue::List(items))
}

fn parse_time<'i>(p: &mut Parser<'i, '_>) -> Result<f32, ValueError<'i>> {
  match p.next()?.clone() {
    Token::Dimension { value, unit, .. } => {
      time_to_seconds(value, &unit).ok_or_else(|| value_err(p))
    }
    // Unitless zero is tolerated.
    Token::Number { value, .. } if value == 0.0 => Ok(0.0),
    _ => Err(value_err(p)),
  }
}

fn parse_angle<'i>(p: &mut Parser<'i, '_>) -> Result<f32, ValueError<'i>> {
  match p.next()?.clone() {
    Token::Dimension { value, unit, .. } => {
      angle_to_radians(value, &unit).ok_or_else(|| value_err(p))
    }
    Token::Number { value, .. } if value == 0.0 => Ok(0.0),
    _ => Err(value_err(p)),
  }
}

fn parse_length<'i>(p: &mut Parser<'i, '_>) -> Result<Length, ValueError<'i>> {
  match p.next()?.clone() {
    Token::Dimension { value, unit, .. } => {
      if let Some(px) = absolute_unit_to_px(value, &unit) {
        return Ok(Length::px(px));
      }
      match unit.to_ascii_lowercase().as_str() {
        "em" => Ok(Length::new(value, LengthUnit::Em)),
        "rem" => Ok(Length::new(value, LengthUnit::Rem)),
        _ => Err(value_err(p)),
      }
    }
    Token::Number { value, .. } if value == 0.0 => Ok(Length::px(0.0)),
    _ => Err(value_err(p)),
  }
}

/// `<length> | <percentage>`: the argument of translateX()/translateY().
/// Unitless zero is tolerated like any other length.
fn parse_translate_offset<'i>(p: &mut Parser<'i, '_>) -> Result<TranslateOffset, ValueError<'i>> {
  if let Ok(pct) = p.try_parse(|p| p.expect_percentage()) {
    return Ok(TranslateOffset::Percentage(pct * 100.0));
  }
  Ok(TranslateOffset::Length(parse_length(p)?))
}

fn parse_non_negative_length<'i>(p: &mut Parser<'i, '_>) -> Result<Length, ValueError<'i>> {
  let length = parse_length(p)?;
  if length.value < 0.0 {
    return Err(value_err(p));
  }
  Ok(length)
}

fn parse_border_width<'i>(p: &mut Parser<'i, '_>) -> Result<Length, ValueError<'i>> {
  if let Ok(named) = p.try_parse(|p| -> Result<Length, ValueError<'i>> {
    let ident = p.expect_ident()?.clone();
    match ident.to_ascii_lowercase().as_str() {
      "thin" => Ok(Length::px(1.0)),
      "medium" => Ok(Length::px(3.0)),
      "thick" => Ok(Length::px(5.0)),
      _ => Err(value_err(p)),
    }
  }) {
    return Ok(named);
  }
  parse_non_negative_length(p)
}

/// length | percentage | calc(); negative lengths optionally rejected.
fn parse_length_percentage<'i>(
  p: &mut Parser<'i, '_>,
  allow_negative: bool,
) -> Result<PropertyValue, ValueError<'i>> {
  if let Ok(calc) = p.try_parse(parse_calc) {
    return Ok(PropertyValue::Calc(calc));
  }
  if let Ok(pct) = p.try_parse(|p| p.expect_percentage()) {
    return Ok(PropertyValue::Percentage(pct * 100.0));
  }
  let length = parse_length(p)?;
  if !allow_negative && length.value < 0.0 {
    return Err(value_err(p));
  }
  Ok(PropertyValue::Length(length))
}

fn parse_auto_length_percentage<'i>(p: &mut Parser<'i, '_>) -> Result<PropertyValue, ValueError<'i>> {
  if p.try_parse(|p| p.expect_ident_matching("auto")).is_ok() {
    return Ok(PropertyValue::AUTO);
  }
  if let Ok(calc) = p.try_parse(parse_calc) {
    return Ok(PropertyValue::Calc(calc));
  }
  if let Ok(pct) = p.try_parse(|p| p.expect_percentage()) {
    return Ok(PropertyValue::Percentage(pct * 100.0));
  }
  Ok(PropertyValue::Length(parse_length(p)?))
}

/// calc() limited to a sum of one length and one percentage, either order.
fn parse_calc<'i>(p: &mut Parser<'i, '_>) -> Result<CalcValue, ValueError<'i>> {
  match p.next()?.clone() {
    Token::Function(name) if name.eq_ignore_ascii_case("calc") => {}
    _ => return Err(value_err(p)),
  }
  p.parse_nested_block(|p| {
    let mut length: Option<Length> = None;
    let mut percentage: Option<f32> = None;
    let mut sign = 1.0f32;
    loop {
      p.skip_whitespace();
      if p.is_exhausted() {
        break;
      }
      match p.next()?.clone() {
        Token::Delim('+') => sign = 1.0,
        Token::Delim('-') => sign = -1.0,
        Token::Percentage { unit_value, .. } => {
          if percentage.is_some() {
            return Err(value_err(p));
          }
          percentage = Some(sign * unit_value * 100.0);
          sign = 1.0;
        }
        Token::Dimension { value, unit, .. } => {
          if length.is_some() {
            return Err(value_err(p));
          }
          let l = if let Some(px) = absolute_unit_to_px(value, &unit) {
            Length::px(sign * px)
          } else {
            match unit.to_ascii_lowercase().as_str() {
              "em" => Length::new(sign * value, LengthUnit::Em),
              "rem" => Length::new(sign * value, LengthUnit::Rem),
              _ => return Err(value_err(p)),
            }
          };
          length = Some(l);
          sign = 1.0;
        }
        _ => return Err(value_err(p)),
      }
    }
    if length.is_none() && percentage.is_none() {
      return Err(value_err(p));
    }
    Ok(CalcValue {
      length: length.unwrap_or(Length::px(0.0)),
      percentage: percentage.unwrap_or(0.0),
    })
  })
}

/// Join a raw `url()` value against the stylesheet base, falling back to the
/// raw text when there is no base or it does not join.
fn resolve_url(base: Option<&Url>, raw: &str) -> String {
  match base.and_then(|b| b.join(raw).ok()) {
    Some(url) => url.into(),
    None => raw.to_string(),
  }
}

fn parse_url<'i>(p: &mut Parser<'i, '_>, base: Option<&Url>) -> Result<PropertyValue, ValueError<'i>> {
  match p.next()?.clone() {
    Token::UnquotedUrl(url) => Ok(PropertyValue::Url(resolve_url(base, &url))),
    Token::Function(name) if name.eq_ignore_ascii_case("url") => {
      let url = p.parse_nested_block(|p| Ok::<_, ValueError>(p.expect_string()?.to_string()))?;
      Ok(PropertyValue::Url(resolve_url(base, &url)))
    }
    _ => Err(value_err(p)),
  }
}

fn parse_hex_color(hex: &str) -> Option<Rgba> {
  let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
  let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
  match hex.len() {
    3 => Some(Rgba::new(
      digit(0)? * 17,
      digit(1)? * 17,
      digit(2)? * 17,
      255,
    )),
    4 => Some(Rgba::new(
      digit(0)? * 17,
      digit(1)? * 17,
      digit(2)? * 17,
      digit(3)? * 17,
    )),
    6 => Some(Rgba::new(pair(0)?, pair(2)?, pair(4)?, 255)),
    8 => Some(Rgba::new(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
    _ => None,
  }
}

fn parse_color<'i>(p: &mut Parser<'i, '_>) -> Result<Rgba, ValueError<'i>> {
  match p.next()?.clone() {
    Token::Hash(hex) | Token::IDHash(hex) => {
      parse_hex_color(&hex).ok_or_else(|| value_err(p))
    }
    Token::Ident(name) => {
      if name.eq_ignore_ascii_case("transparent") {
        return Ok(Rgba::TRANSPARENT);
      }
      // Named colors via the same table the rest of the ecosystem uses.
      match csscolorparser::parse(&name) {
        Ok(color) => {
          let [r, g, b, a] = color.to_rgba8();
          Ok(Rgba::new(r, g, b, a))
        }
        Err(_) => Err(value_err(p)),
      }
    }
    Token::Function(name)
      if name.eq_ignore_ascii_case("rgb") || name.eq_ignore_ascii_case("rgba") =>
    {
      p.parse_nested_block(|p| {
        let channel = |p: &mut Parser<'i, '_>| -> Result<i32, ValueError<'i>> {
          match p.next()?.clone() {
            Token::Number { value, .. } => Ok(value.round() as i32),
            Token::Percentage { unit_value, .. } => Ok((unit_value * 255.0).round() as i32),
            _ => Err(value_err(p)),
          }
        };
        let r = channel(p)?;
        p.expect_comma()?;
        let g = channel(p)?;
        p.expect_comma()?;
        let b = channel(p)?;
        let alpha = if p.try_parse(|p| p.expect_comma()).is_ok() {
          p.expect_number()?
        } else {
          1.0
        };
        Ok(Rgba::from_clamped(r, g, b, alpha))
      })
    }
    _ => Err(value_err(p)),
  }
}

fn parse_size_component<'i>(p: &mut Parser<'i, '_>) -> Result<PropertyValue, ValueError<'i>> {
  if p.try_parse(|p| p.expect_ident_matching("auto")).is_ok() {
    return Ok(PropertyValue::AUTO);
  }
  parse_length_percentage(p, false)
}

/// One background-position component token.
#[derive(Clone, Copy)]
enum PositionComponent {
  KeywordX(Keyword), // left | right
  KeywordY(Keyword), // top | bottom
  Center,
  Offset(f32, bool), // (value, is_percentage); lengths resolved later
  OffsetLength(Length),
}

fn parse_background_position<'i>(p: &mut Parser<'i, '_>) -> Result<PropertyValue, ValueError<'i>> {
  let mut components: Vec<PositionComponent> = Vec::new();
  while components.len() < 4 {
    let parsed = p.try_parse(|p| -> Result<PositionComponent, ValueError<'i>> {
      if let Ok(pct) = p.try_parse(|p| p.expect_percentage()) {
        return Ok(PositionComponent::Offset(pct * 100.0, true));
      }
      if let Ok(length) = p.try_parse(parse_length) {
        return Ok(PositionComponent::OffsetLength(length));
      }
      let ident = p.expect_ident()?.clone();
      match ident.to_ascii_lowercase().as_str() {
        "left" => Ok(PositionComponent::KeywordX(Keyword::Left)),
        "right" => Ok(PositionComponent::KeywordX(Keyword::Right)),
        "top" => Ok(PositionComponent::KeywordY(Keyword::Top)),
        "bottom" => Ok(PositionComponent::KeywordY(Keyword::Bottom)),
        "center" => Ok(PositionComponent::Center),
        _ => Err(value_err(p)),
      }
    });
    match parsed {
      Ok(component) => components.push(component),
      Err(_) => break,
    }
  }
  if components.is_empty() {
    return Err(value_err(p));
  }

  let to_value = |c: &PositionComponent| -> PropertyValue {
    match c {
      PositionComponent::KeywordX(k) | PositionComponent::KeywordY(k) => PropertyValue::Keyword(*k),
      PositionComponent::Center => PropertyValue::Keyword(Keyword::Center),
      PositionComponent::Offset(v, _) => PropertyValue::Percentage(*v),
      PositionComponent::OffsetLength(l) => PropertyValue::Length(*l),
    }
  };

  // Pair up into horizontal and vertical positions. The 3/4-value forms pair
  // an edge keyword with a following offset.
  let (x, y): (PropertyValue, PropertyValue) = match components.len() {
    1 => (
      to_value(&components[0]),
      PropertyValue::Keyword(Keyword::Center),
    ),
    2 => {
      let (a, b) = (&components[0], &components[1]);
      // "top left" style orderings swap into (x, y).
      let a_is_y = matches!(a, PositionComponent::KeywordY(_));
      let b_is_x = matches!(b, PositionComponent::KeywordX(_));
      if a_is_y || b_is_x {
        if matches!(b, PositionComponent::KeywordY(_)) && a_is_y {
          return Err(value_err(p)); // "top bottom"
        }
        (to_value(b), to_value(a))
      } else {
        if matches!(a, PositionComponent::KeywordX(_))
          && matches!(b, PositionComponent::KeywordX(_))
        {
          return Err(value_err(p)); // "left right"
        }
        (to_value(a), to_value(b))
      }
    }
    len @ (3 | 4) => {
      let mut x: Option<PropertyValue> = None;
      let mut y: Option<PropertyValue> = None;
      let mut i = 0;
      while i < len {
        match &components[i] {
          PositionComponent::KeywordX(k) => {
            let mut pair = vec![PropertyValue::Keyword(*k)];
            if let Some(PositionComponent::Offset(..) | PositionComponent::OffsetLength(_)) =
              components.get(i + 1)
            {
              pair.push(to_value(&components[i + 1]));
              i += 1;
            }
            if x.is_some() {
              return Err(value_err(p));
            }
            x = Some(if pair.len() == 1 {
              PropertyValue::Keyword(*k)
            } else {
              PropertyValue::List(pair)
            });
          }
          PositionComponent::KeywordY(k) => {
            let mut pair = vec![PropertyValue::Keyword(*k)];
            if let Some(PositionComponent::Offset(..) | PositionComponent::OffsetLength(_)) =
              components.get(i + 1)
            {
              pair.push(to_value(&components[i + 1]));
              i += 1;
            }
            if y.is_some() {
              return Err(value_err(p));
            }
            y = Some(if pair.len() == 1 {
              PropertyValue::Keyword(*k)
            } else {
              PropertyValue::List(pair)
            });
          }
          PositionComponent::Center => {
            if x.is_none() {
              x = Some(PropertyValue::Keyword(Keyword::Center));
            } else if y.is_none() {
              y = Some(PropertyValue::Keyword(Keyword::Center));
            } else {
              return Err(value_err(p));
            }
          }
          _ => return Err(value_err(p)),
        }
        i += 1;
      }
      match (x, y) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(value_err(p)),
      }
    }
    _ => return Err(value_err(p)),
  };
  Ok(PropertyValue::List(vec![x, y]))
}

fn parse_font_family<'i>(p: &mut Parser<'i, '_>) -> Result<PropertyValue, ValueError<'i>> {
  let families = p.parse_comma_separated(|p| {
    if let Ok(s) = p.try_parse(|p| -> Result<String, ValueError<'i>> {
      Ok(p.expect_string()?.to_string())
    }) {
      return Ok(PropertyValue::String(s));
    }
    // An unquoted family is a sequence of identifiers; generic families are
    // single reserved identifiers.
    let mut words: Vec<String> = Vec::new();
    while let Ok(ident) = p.try_parse(|p| -> Result<String, ValueError<'i>> {
      Ok(p.expect_ident()?.to_string())
    }) {
      words.push(ident);
    }
    if words.is_empty() {
      return Err(value_err(p));
    }
    if words.len() == 1 {
      if let Some(
        generic @ (Keyword::Serif
        | Keyword::SansSerif
        | Keyword::Monospace
        | Keyword::Cursive
        | Keyword::Fantasy),
      ) = Keyword::from_ident(&words[0])
      {
        return Ok(PropertyValue::Keyword(generic));
      }
    }
    Ok(PropertyValue::String(words.join(" ")))
  })?;
  Ok(PropertyValue::List(families))
}

fn parse_font_weight<'i>(p: &mut Parser<'i, '_>) -> Result<PropertyValue, ValueError<'i>> {
  if let Some(keyword) = try_parse_keyword(p, &[Keyword::Normal, Keyword::Bold]) {
    return Ok(PropertyValue::Keyword(keyword));
  }
  let i = p.expect_integer()?;
  if !(100..=900).contains(&i) || i % 100 != 0 {
    return Err(value_err(p));
  }
  Ok(PropertyValue::Integer(i64::from(i)))
}

fn parse_transition_property<'i>(p: &mut Parser<'i, '_>) -> Result<PropertyValue, ValueError<'i>> {
  if p.try_parse(|p| {
    p.expect_ident_matching("none")?;
    p.expect_exhausted()
  })
  .is_ok()
  {
    return Ok(PropertyValue::NONE);
  }
  if p.try_parse(|p| {
    p.expect_ident_matching("all")?;
    p.expect_exhausted()
  })
  .is_ok()
  {
    return Ok(PropertyValue::Keyword(Keyword::All));
  }
  let keys = p.parse_comma_separated(|p| {
    let name = p.expect_ident()?.to_ascii_lowercase();
    PropertyKey::from_name(&name).ok_or_else(|| value_err(p))
  })?;
  Ok(PropertyValue::PropertyKeyList(keys))
}

fn parse_media_feature<'i>(p: &mut Parser<'i, '_>) -> Result<MediaFeature, ValueError<'i>> {
  let name = p.expect_ident()?.to_ascii_lowercase();
  p.expect_colon()?;
  p.skip_whitespace();
  let feature = match name.as_str() {
    "min-width" => MediaFeature::MinWidth(parse_media_length(p)?),
    "max-width" => MediaFeature::MaxWidth(parse_media_length(p)?),
    "width" => MediaFeature::Width(parse_media_length(p)?),
    "min-height" => MediaFeature::MinHeight(parse_media_length(p)?),
    "max-height" => MediaFeature::MaxHeight(parse_media_length(p)?),
    "height" => MediaFeature::Height(parse_media_length(p)?),
    "orientation" => {
      let value = p.expect_ident()?.to_ascii_lowercase();
      match value.as_str() {
        "landscape" => MediaFeature::Orientation(Orientation::Landscape),
        "portrait" => MediaFeature::Orientation(Orientation::Portrait),
        _ => return Err(value_err(p)),
      }
    }
    _ => return Err(value_err(p)),
  };
  p.expect_exhausted()?;
  Ok(feature)
}

/// Media feature lengths must be absolute; there is no element to resolve
/// font-relative units against.
fn parse_media_length<'i>(p: &mut Parser<'i, '_>) -> Result<Length, ValueError<'i>> {
  let length = parse_length(p)?;
  if !length.is_absolute() {
    return Err(value_err(p));
  }
  Ok(length)
}

// ============================================================================
// Shorthand helpers
// ============================================================================

/// Expand a 1-4 value box shorthand: 1 -> all sides, 2 -> [vertical,
/// horizontal], 3 -> [top, horizontal, bottom], 4 -> [top, right, bottom,
/// left].
fn parse_box_shorthand<'i>(
  p: &mut Parser<'i, '_>,
  shorthand: Shorthand,
  mut component: impl FnMut(&mut Parser<'i, '_>) -> Result<PropertyValue, ValueError<'i>>,
  out: &mut Vec<(PropertyKey, PropertyValue)>,
) -> Result<(), ValueError<'i>> {
  let mut values = Vec::new();
  while values.len() < 4 {
    match p.try_parse(&mut component) {
      Ok(value) => values.push(value),
      Err(_) => break,
    }
  }
  let [top, right, bottom, left] = match values.len() {
    1 => [values[0].clone(), values[0].clone(), values[0].clone(), values[0].clone()],
    2 => [values[0].clone(), values[1].clone(), values[0].clone(), values[1].clone()],
    3 => [values[0].clone(), values[1].clone(), values[2].clone(), values[1].clone()],
    4 => [values[0].clone(), values[1].clone(), values[2].clone(), values[3].clone()],
    _ => return Err(value_err(p)),
  };
  // Longhand order is [top, right, bottom, left] for every box shorthand.
  let keys = shorthand.longhands();
  out.push((keys[0], top));
  out.push((keys[1], right));
  out.push((keys[2], bottom));
  out.push((keys[3], left));
  Ok(())
}

/// border / border-<side>: width, style and color in any order.
fn parse_border_shorthand<'i>(
  p: &mut Parser<'i, '_>,
  shorthand: Shorthand,
  out: &mut Vec<(PropertyKey, PropertyValue)>,
) -> Result<(), ValueError<'i>> {
  let mut color: Option<Rgba> = None;
  let mut style: Option<Keyword> = None;
  let mut width: Option<Length> = None;

  loop {
    p.skip_whitespace();
    if p.is_exhausted() {
      break;
    }
    if style.is_none() {
      if let Ok(s) =
        p.try_parse(|p| parse_one_keyword(p, &[Keyword::None, Keyword::Hidden, Keyword::Solid]))
      {
        style = Some(s);
        continue;
      }
    }
    if width.is_none() {
      if let Ok(w) = p.try_parse(parse_border_width) {
        width = Some(w);
        continue;
      }
    }
    if color.is_none() {
      if let Ok(c) = p.try_parse(parse_color) {
        color = Some(c);
        continue;
      }
    }
    return Err(value_err(p));
  }
  if color.is_none() && style.is_none() && width.is_none() {
    return Err(value_err(p));
  }

  for &key in shorthand.longhands() {
    let name = key.name();
    let value = if name.ends_with("-color") {
      color.map(PropertyValue::Color)
    } else if name.ends_with("-style") {
      style.map(PropertyValue::Keyword)
    } else {
      width.map(PropertyValue::Length)
    };
    if let Some(value) = value {
      out.push((key, value));
    }
  }
  Ok(())
}

/// background: color, image, position [/ size] and repeat in any order.
fn parse_background_shorthand<'i>(
  p: &mut Parser<'i, '_>,
  base: Option<&Url>,
  out: &mut Vec<(PropertyKey, PropertyValue)>,
) -> Result<(), ValueError<'i>> {
  let mut color: Option<Rgba> = None;
  let mut image: Option<PropertyValue> = None;
  let mut position: Option<PropertyValue> = None;
  let mut size: Option<PropertyValue> = None;
  let mut repeat: Option<PropertyValue> = None;

  loop {
    p.skip_whitespace();
    if p.is_exhausted() {
      break;
    }
    if image.is_none() {
      if let Ok(url) = p.try_parse(|p| parse_url(p, base)) {
        image = Some(PropertyValue::List(vec![url]));
        continue;
      }
      if p.try_parse(|p| p.expect_ident_matching("none")).is_ok() {
        image = Some(PropertyValue::NONE);
        continue;
      }
    }
    if repeat.is_none() {
      if let Ok(keyword) = p.try_parse(|p| parse_one_keyword(p, &[Keyword::Repeat, Keyword::NoRepeat]))
      {
        let vertical = p
          .try_parse(|p| parse_one_keyword(p, &[Keyword::Repeat, Keyword::NoRepeat]))
          .unwrap_or(keyword);
        repeat = Some(PropertyValue::List(vec![
          PropertyValue::Keyword(keyword),
          PropertyValue::Keyword(vertical),
        ]));
        continue;
      }
    }
    if position.is_none() {
      if let Ok(pos) = p.try_parse(parse_background_position) {
        position = Some(pos);
        // Optional "/ size".
        if p.try_parse(|p| -> Result<(), ValueError<'i>> {
          match p.next()?.clone() {
            Token::Delim('/') => Ok(()),
            _ => Err(value_err(p)),
          }
        })
        .is_ok()
        {
          if let Ok(keyword) =
            p.try_parse(|p| parse_one_keyword(p, &[Keyword::Contain, Keyword::Cover]))
          {
            size = Some(PropertyValue::Keyword(keyword));
          } else {
            let w = parse_size_component(p)?;
            let h = p.try_parse(parse_size_component).unwrap_or(PropertyValue::AUTO);
            size = Some(PropertyValue::List(vec![w, h]));
          }
        }
        continue;
      }
    }
    if color.is_none() {
      if let Ok(c) = p.try_parse(parse_color) {
        color = Some(c);
        continue;
      }
    }
    return Err(value_err(p));
  }

  if color.is_none() && image.is_none() && position.is_none() && repeat.is_none() {
    return Err(value_err(p));
  }
  if let Some(c) = color {
    out.push((PropertyKey::BackgroundColor, PropertyValue::Color(c)));
  }
  if let Some(i) = image {
    out.push((PropertyKey::BackgroundImage, i));
  }
  if let Some(pos) = position {
    out.push((PropertyKey::BackgroundPosition, pos));
  }
  if let Some(s) = size {
    out.push((PropertyKey::BackgroundSize, s));
  }
  if let Some(r) = repeat {
    out.push((PropertyKey::BackgroundRepeat, r));
  }
  Ok(())
}

/// font: [style || weight]? size [/ line-height]? family
fn parse_font_shorthand<'i>(
  p: &mut Parser<'i, '_>,
  out: &mut Vec<(PropertyKey, PropertyValue)>,
) -> Result<(), ValueError<'i>> {
  let mut style: Option<PropertyValue> = None;
  let mut weight: Option<PropertyValue> = None;

  // Leading optional keywords until the size is found.
  let size = loop {
    if let Ok(size) = p.try_parse(|p| parse_length_percentage(p, false)) {
      break size;
    }
    if style.is_none() {
      if let Some(keyword) = try_parse_keyword(p, &[Keyword::Italic, Keyword::Oblique]) {
        style = Some(PropertyValue::Keyword(keyword));
        continue;
      }
    }
    if weight.is_none() {
      if let Ok(w) = p.try_parse(parse_font_weight) {
        if !w.is_keyword(Keyword::Normal) {
          weight = Some(w);
          continue;
        }
      }
    }
    if p.try_parse(|p| p.expect_ident_matching("normal")).is_ok() {
      // "normal" may satisfy style or weight; both default to normal anyway.
      continue;
    }
    return Err(value_err(p));
  };

  let line_height = if p
    .try_parse(|p| -> Result<(), ValueError<'i>> {
      match p.next()?.clone() {
        Token::Delim('/') => Ok(()),
        _ => Err(value_err(p)),
      }
    })
    .is_ok()
  {
    if let Ok(n) = p.try_parse(|p| p.expect_number()) {
      Some(PropertyValue::Number(n))
    } else {
      Some(parse_length_percentage(p, false)?)
    }
  } else {
    None
  };

  let family = parse_font_family(p)?;

  out.push((PropertyKey::FontSize, size));
  out.push((PropertyKey::FontFamily, family));
  if let Some(style) = style {
    out.push((PropertyKey::FontStyle, style));
  }
  if let Some(weight) = weight {
    out.push((PropertyKey::FontWeight, weight));
  }
  if let Some(line_height) = line_height {
    out.push((PropertyKey::LineHeight, line_height));
  }
  Ok(())
}

/// transition: comma-separated `[property] [duration] [timing] [delay]`
/// items, aggregated into the four longhand lists.
fn parse_transition_shorthand<'i, O: ParserObserver>(
  p: &mut Parser<'i, '_>,
  parser: &mut CssParser<O>,
  out: &mut Vec<(PropertyKey, PropertyValue)>,
) -> Result<(), ValueError<'i>> {
  struct Item {
    property: Option<PropertyValue>,
    duration: f32,
    delay: f32,
    timing: TimingFunction,
  }

  let items = p.parse_comma_separated(|p| {
    let mut property: Option<PropertyValue> = None;
    let mut duration: Option<f32> = None;
    let mut delay: Option<f32> = None;
    let mut timing: Option<TimingFunction> = None;
    loop {
      p.skip_whitespace();
      if p.is_exhausted() {
        break;
      }
      if let Ok(time) = p.try_parse(parse_time) {
        if duration.is_none() {
          duration = Some(time);
        } else if delay.is_none() {
          delay = Some(time);
        } else {
          return Err(value_err(p));
        }
        continue;
      }
      if timing.is_none() {
        if let Ok(t) = p.try_parse(|p| parser.parse_timing_function(p)) {
          timing = Some(t);
          continue;
        }
      }
      if property.is_none() {
        if p.try_parse(|p| p.expect_ident_matching("none")).is_ok() {
          property = Some(PropertyValue::NONE);
          continue;
        }
        if p.try_parse(|p| p.expect_ident_matching("all")).is_ok() {
          property = Some(PropertyValue::Keyword(Keyword::All));
          continue;
        }
        if let Ok(key) = p.try_parse(|p| -> Result<PropertyKey, ValueError<'i>> {
          let name = p.expect_ident()?.to_ascii_lowercase();
          PropertyKey::from_name(&name).ok_or_else(|| value_err(p))
        }) {
          property = Some(PropertyValue::PropertyKeyList(vec![key]));
          continue;
        }
      }
      return Err(value_err(p));
    }
    if property.is_none() && duration.is_none() && delay.is_none() && timing.is_none() {
      return Err(value_err(p));
    }
    Ok(Item {
      property,
      duration: duration.unwrap_or(0.0),
      delay: delay.unwrap_or(0.0),
      timing: timing.unwrap_or(TimingFunction::EASE),
    })
  })?;

  let mut durations = Vec::new();
  let mut delays = Vec::new();
  let mut timings = Vec::new();
  let mut keys: Vec<PropertyKey> = Vec::new();
  let mut all = false;
  let mut none = false;
  for item in &items {
    durations.push(item.duration);
    delays.push(item.delay);
    timings.push(item.timing);
    match &item.property {
      Some(PropertyValue::Keyword(Keyword::All)) | None => all = true,
      Some(PropertyValue::Keyword(Keyword::None)) => none = true,
      Some(PropertyValue::PropertyKeyList(list)) => keys.extend(list.iter().copied()),
      _ => {}
    }
  }
  let property = if none && items.len() == 1 {
    PropertyValue::NONE
  } else if all {
    PropertyValue::Keyword(Keyword::All)
  } else {
    PropertyValue::PropertyKeyList(keys)
  };

  out.push((PropertyKey::TransitionProperty, property));
  out.push((PropertyKey::TransitionDuration, PropertyValue::TimeList(durations)));
  out.push((PropertyKey::TransitionDelay, PropertyValue::TimeList(delays)));
  out.push((
    PropertyKey::TransitionTimingFunction,
    PropertyValue::TimingFunctionList(timings),
  ));
  Ok(())
}

/// animation: comma-separated items of name, duration, timing, delay,
/// iteration count, direction and fill mode in free order (times are
/// positional: first is duration, second is delay).
fn parse_animation_shorthand<'i, O: ParserObserver>(
  p: &mut Parser<'i, '_>,
  parser: &mut CssParser<O>,
  out: &mut Vec<(PropertyKey, PropertyValue)>,
) -> Result<(), ValueError<'i>> {
  struct Item {
    name: Option<PropertyValue>,
    duration: f32,
    delay: f32,
    timing: TimingFunction,
    iteration: PropertyValue,
    direction: Keyword,
    fill: Keyword,
  }

  let items = p.parse_comma_separated(|p| {
    let mut name: Option<PropertyValue> = None;
    let mut duration: Option<f32> = None;
    let mut delay: Option<f32> = None;
    let mut timing: Option<TimingFunction> = None;
    let mut iteration: Option<PropertyValue> = None;
    let mut direction: Option<Keyword> = None;
    let mut fill: Option<Keyword> = None;
    loop {
      p.skip_whitespace();
      if p.is_exhausted() {
        break;
      }
      if let Ok(time) = p.try_parse(parse_time) {
        if duration.is_none() {
          duration = Some(time);
        } else if delay.is_none() {
          delay = Some(time);
        } else {
          return Err(value_err(p));
        }
        continue;
      }
      if iteration.is_none() {
        if let Ok(n) = p.try_parse(|p| -> Result<f32, ValueError<'i>> {
          let n = p.expect_number()?;
          if n < 0.0 {
            return Err(value_err(p));
          }
          Ok(n)
        }) {
          iteration = Some(PropertyValue::Number(n));
          continue;
        }
      }
      if timing.is_none() {
        if let Ok(t) = p.try_parse(|p| parser.parse_timing_function(p)) {
          timing = Some(t);
          continue;
        }
      }
      let ident = p.expect_ident()?.to_ascii_lowercase();
      match ident.as_str() {
        "infinite" if iteration.is_none() => {
          iteration = Some(PropertyValue::Keyword(Keyword::Infinite))
        }
        "normal" | "reverse" | "alternate" | "alternate-reverse" if direction.is_none() => {
          direction = Keyword::from_ident(&ident)
        }
        "forwards" | "backwards" | "both" if fill.is_none() => fill = Keyword::from_ident(&ident),
        "none" if name.is_none() => name = Some(PropertyValue::NONE),
        _ if name.is_none() => name = Some(PropertyValue::String(ident)),
        _ => return Err(value_err(p)),
      }
    }
    if name.is_none() && duration.is_none() {
      return Err(value_err(p));
    }
    Ok(Item {
      name,
      duration: duration.unwrap_or(0.0),
      delay: delay.unwrap_or(0.0),
      timing: timing.unwrap_or(TimingFunction::EASE),
      iteration: iteration.unwrap_or(PropertyValue::Number(1.0)),
      direction: direction.unwrap_or(Keyword::Normal),
      fill: fill.unwrap_or(Keyword::None),
    })
  })?;

  let mut names = Vec::new();
  let mut any_name = false;
  let mut durations = Vec::new();
  let mut delays = Vec::new();
  let mut timings = Vec::new();
  let mut iterations = Vec::new();
  let mut directions = Vec::new();
  let mut fills = Vec::new();
  for item in items {
    match item.name {
      Some(PropertyValue::String(name)) => {
        names.push(PropertyValue::String(name));
        any_name = true;
      }
      _ => names.push(PropertyValue::NONE),
    }
    durations.push(item.duration);
    delays.push(item.delay);
    timings.push(item.timing);
    iterations.push(item.iteration);
    directions.push(PropertyValue::Keyword(item.direction));
    fills.push(PropertyValue::Keyword(item.fill));
  }

  out.push((
    PropertyKey::AnimationName,
    if any_name {
      PropertyValue::List(names)
    } else {
      PropertyValue::NONE
    },
  ));
  out.push((PropertyKey::AnimationDuration, PropertyValue::TimeList(durations)));
  out.push((PropertyKey::AnimationDelay, PropertyValue::TimeList(delays)));
  out.push((
    PropertyKey::AnimationTimingFunction,
    PropertyValue::TimingFunctionList(timings),
  ));
  out.push((PropertyKey::AnimationIterationCount, PropertyValue::List(iterations)));
  out.push((PropertyKey::AnimationDirection, PropertyValue::List(directions)));
  out.push((PropertyKey::AnimationFillMode, PropertyValue::List(fills)));
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse_sheet(css: &str) -> (StyleSheet, CollectedDiagnostics) {
    let mut parser = CssParser::new("test.css");
    let sheet = parser.parse_style_sheet(css);
    (sheet, parser.into_observer())
  }

  #[test]
  fn class_rule_parses_to_class_selector() {
    let (sheet, diagnostics) = parse_sheet(".my-class {}");
    assert!(diagnostics.warnings.is_empty());
    assert_eq!(sheet.style_rule_count(), 1);
    let Rule::Style(rule) = &sheet.rules[0] else {
      panic!("expected style rule");
    };
    assert_eq!(rule.selectors.len(), 1);
    let compound = rule.selectors[0].subject();
    assert_eq!(compound.simple_selectors().len(), 1);
    match &compound.simple_selectors()[0] {
      SimpleSelector::Class(name) => assert_eq!(name, "my-class"),
      other => panic!("expected class selector, got {:?}", other),
    }
  }

  #[test]
  fn sgml_comment_delimiters_are_tolerated_at_top_level() {
    let (sheet, diagnostics) = parse_sheet("<!-- .a { color: red; } -->");
    assert!(diagnostics.warnings.is_empty(), "{:?}", diagnostics.warnings);
    assert_eq!(sheet.style_rule_count(), 1);
  }

  #[test]
  fn empty_not_argument_is_rejected() {
    let (sheet, diagnostics) = parse_sheet(":not() {}");
    assert_eq!(sheet.style_rule_count(), 0);
    assert_eq!(
      diagnostics.warnings,
      vec!["test.css:1:1: warning: unsupported selector within :not()"]
    );
  }

  #[test]
  fn complex_selector_inside_not_is_rejected() {
    let (sheet, diagnostics) = parse_sheet(":not(div span) {}");
    assert_eq!(sheet.style_rule_count(), 0);
    assert_eq!(
      diagnostics.warnings,
      vec!["test.css:1:1: warning: unsupported selector within :not()"]
    );
  }

  #[test]
  fn unknown_at_rule_warns_invalid_rule() {
    let (sheet, diagnostics) = parse_sheet("@pony { mane: rainbow; }");
    assert!(sheet.rules.is_empty());
    assert_eq!(diagnostics.warnings.len(), 1);
    assert!(diagnostics.warnings[0].contains("invalid rule"));
  }

  #[test]
  fn vendor_prefixed_keyframes_skip_silently() {
    let (sheet, diagnostics) = parse_sheet("@-webkit-keyframes foo { from { opacity: 0; } }");
    assert!(sheet.rules.is_empty());
    assert!(diagnostics.warnings.is_empty());
  }

  #[test]
  fn important_is_rejected_in_single_property_values() {
    let mut parser = CssParser::new("test.css");
    let value = parser.parse_property_value("color", "#f0000d !important");
    assert!(value.is_none());
    assert_eq!(
      parser.observer().warnings,
      vec![
        "test.css:1:1: warning: !important is not allowed when setting single property values."
      ]
    );
  }

  #[test]
  fn trailing_semicolon_in_property_value_is_unrecoverable() {
    let mut parser = CssParser::new("test.css");
    let value = parser.parse_property_value("color", "#baaaad;");
    assert!(value.is_none());
    assert_eq!(parser.observer().errors.len(), 1);
    assert!(parser.observer().errors[0].contains("unrecoverable syntax error"));
  }

  #[test]
  fn hex_colors_parse() {
    let mut parser = CssParser::new("test.css");
    assert_eq!(
      parser.parse_property_value("color", "#112233"),
      Some(PropertyValue::Color(Rgba::new(0x11, 0x22, 0x33, 0xFF)))
    );
    assert_eq!(
      parser.parse_property_value("color", "#fff"),
      Some(PropertyValue::Color(Rgba::WHITE))
    );
  }

  #[test]
  fn iteration_count_list_mixes_numbers_and_infinite() {
    let mut parser = CssParser::new("test.css");
    let value = parser
      .parse_property_value("animation-iteration-count", "1, infinite, 0.5")
      .expect("value");
    assert_eq!(
      value,
      PropertyValue::List(vec![
        PropertyValue::Number(1.0),
        PropertyValue::Keyword(Keyword::Infinite),
        PropertyValue::Number(0.5),
      ])
    );
  }

  #[test]
  fn out_of_range_cubic_bezier_substitutes_ease() {
    let mut parser = CssParser::new("test.css");
    let value = parser
      .parse_property_value("transition-timing-function", "cubic-bezier(2, 0, 0.5, 0)")
      .expect("fallback value");
    assert_eq!(
      value,
      PropertyValue::TimingFunctionList(vec![TimingFunction::EASE])
    );
    assert_eq!(parser.observer().errors.len(), 1);
    assert!(parser.observer().errors[0]
      .contains("cubic-bezier control point x values must be in the range [0, 1]."));
  }

  #[test]
  fn keyframes_rule_parses_offsets_and_styles() {
    let mut parser = CssParser::new("test.css");
    let rule = parser
      .parse_rule("@keyframes foo { from { opacity: 0.25; } 25%, 75% { opacity: 0.5; } to { opacity: 0.75; } }")
      .expect("rule");
    let Rule::Keyframes(keyframes) = rule else {
      panic!("expected keyframes rule");
    };
    assert_eq!(keyframes.name, "foo");
    assert_eq!(keyframes.keyframes.len(), 3);
    assert_eq!(keyframes.keyframes[1].offsets, vec![0.25, 0.75]);
    let offsets: Vec<f32> = keyframes.sorted_offsets().iter().map(|(o, _)| *o).collect();
    assert_eq!(offsets, vec![0.0, 0.25, 0.75, 1.0]);
  }

  #[test]
  fn media_query_parses_type_and_features() {
    let mut parser = CssParser::new("test.css");
    let query = parser
      .parse_media_query("screen and (min-width: 640px)")
      .expect("query");
    assert_eq!(query.media_type, MediaType::Screen);
    assert_eq!(query.features.len(), 1);
  }

  #[test]
  fn font_face_declarations_parse_family_and_sources() {
    let mut parser = CssParser::new("test.css");
    let rule = parser.parse_font_face_declaration_list(
      "font-family: 'My Font'; src: url('font.woff') format('woff'), local(Arial);",
    );
    assert_eq!(rule.family.as_deref(), Some("My Font"));
    assert_eq!(
      rule.sources,
      vec![
        FontFaceSource::Url("font.woff".to_string()),
        FontFaceSource::Local("Arial".to_string()),
      ]
    );
  }

  #[test]
  fn transform_list_parses_functions() {
    let mut parser = CssParser::new("test.css");
    let value = parser
      .parse_property_value("transform", "translateX(10px) rotate(90deg) scale(2)")
      .expect("value");
    let PropertyValue::Transform(list) = value else {
      panic!("expected transform list");
    };
    assert_eq!(list.functions.len(), 3);
    match list.functions[1] {
      TransformFunction::Rotate(angle) => {
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-5)
      }
      other => panic!("expected rotate, got {:?}", other),
    }
  }

  #[test]
  fn translate_accepts_percentages_and_unitless_zero() {
    let mut parser = CssParser::new("test.css");
    let value = parser
      .parse_property_value("transform", "translateX(20%) translateY(0)")
      .expect("value");
    let PropertyValue::Transform(list) = value else {
      panic!("expected transform list");
    };
    assert_eq!(
      list.functions[0],
      TransformFunction::Translate {
        axis: TranslateAxis::X,
        offset: TranslateOffset::Percentage(20.0),
      }
    );
    assert_eq!(
      list.functions[1],
      TransformFunction::Translate {
        axis: TranslateAxis::Y,
        offset: TranslateOffset::Length(Length::px(0.0)),
      }
    );
  }

  #[test]
  fn invalid_transform_function_warns() {
    let mut parser = CssParser::new("test.css");
    let value = parser.parse_property_value("transform", "spin(14turn)");
    assert!(value.is_none());
    assert!(parser
      .observer()
      .warnings
      .iter()
      .any(|w| w.contains("invalid transform function")));
  }
}
