//! OOB marker grammar.
//!
//! `<strategy>[:<selector>] [swap:<duration>] [settle:<duration>]`
//!
//! The value is split into whitespace tokens; the first carries the strategy and
//! the start of an optional selector, `swap:`/`settle:` tokens are timing
//! modifiers, and any other token continues the selector.

use std::time::Duration;

use tracing::debug;

use oobswap_fragment::{ElementNode, FragmentNode};
use oobswap_shared::{SwapStrategy, parse_interval};

/// Marker attribute, primary and `data-` spelling.
pub const MARKER_ATTRS: [&str; 2] = ["hx-swap-oob", "data-hx-swap-oob"];

/// Target override attribute, primary and `data-` spelling.
pub const TARGET_ATTRS: [&str; 2] = ["hx-oob-target", "data-hx-oob-target"];

/// Raw marker value of an element, if it carries one.
pub fn marker_value(el: &ElementNode) -> Option<&str> {
    MARKER_ATTRS.iter().find_map(|name| el.attr(name))
}

/// Whether `node` is an OOB-marked element.
pub fn is_oob(node: &FragmentNode) -> bool {
    node.as_element().is_some_and(|el| marker_value(el).is_some())
}

/// Non-empty target override of an element.
pub fn target_override(el: &ElementNode) -> Option<&str> {
    TARGET_ATTRS
        .iter()
        .filter_map(|name| el.attr(name))
        .map(str::trim)
        .find(|v| !v.is_empty())
}

/// Drop marker and override attributes, leaving what goes into the document.
pub fn strip_markers(el: &mut ElementNode) {
    el.attrs.retain(|a| {
        let name = a.name.as_str();
        !MARKER_ATTRS.contains(&name) && !TARGET_ATTRS.contains(&name)
    });
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    /// `strategy` or `strategy:selector-start`.
    Head {
        strategy: &'a str,
        selector: Option<&'a str>,
    },
    /// `swap:10ms`, `settle:1s`.
    Modifier { key: &'a str, value: &'a str },
    /// Continuation of the selector.
    Word(&'a str),
}

fn tokenize(value: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for (i, raw) in value.split_whitespace().enumerate() {
        if i == 0 {
            let (strategy, selector) = match raw.split_once(':') {
                Some((strategy, selector)) => (strategy, Some(selector)),
                None => (raw, None),
            };
            tokens.push(Token::Head { strategy, selector });
            continue;
        }
        match raw.split_once(':') {
            Some((key @ ("swap" | "settle"), value)) => tokens.push(Token::Modifier { key, value }),
            _ => tokens.push(Token::Word(raw)),
        }
    }
    tokens
}

// ---------------------------------------------------------------------------
// OobDirective
// ---------------------------------------------------------------------------

/// Typed form of an OOB marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OobDirective {
    pub strategy: SwapStrategy,
    /// Inline `:<selector>` suffix.
    pub selector: Option<String>,
    /// Value of the override attribute; wins over `selector` and `id`.
    pub target_override: Option<String>,
    pub swap_delay: Option<Duration>,
    pub settle_delay: Option<Duration>,
}

impl OobDirective {
    /// Parse a marker value. Never fails; unknown pieces fall back to defaults.
    pub fn parse(value: &str) -> Self {
        let mut directive = Self {
            strategy: SwapStrategy::Default,
            selector: None,
            target_override: None,
            swap_delay: None,
            settle_delay: None,
        };
        let mut selector_parts: Vec<&str> = Vec::new();

        for token in tokenize(value) {
            match token {
                Token::Head { strategy, selector } => {
                    directive.strategy = SwapStrategy::from_keyword(strategy).unwrap_or_else(|| {
                        debug!(strategy, "unknown OOB strategy, using default");
                        SwapStrategy::Default
                    });
                    selector_parts.extend(selector.filter(|s| !s.is_empty()));
                }
                Token::Modifier { key, value } => match parse_interval(value) {
                    Some(delay) if key == "swap" => directive.swap_delay = Some(delay),
                    Some(delay) => directive.settle_delay = Some(delay),
                    None => debug!(key, value, "ignoring unparseable OOB timing"),
                },
                Token::Word(word) => {
                    if selector_parts.is_empty() {
                        debug!(word, "ignoring stray token in OOB marker");
                    } else {
                        selector_parts.push(word);
                    }
                }
            }
        }

        if !selector_parts.is_empty() {
            directive.selector = Some(selector_parts.join(" "));
        }
        directive
    }

    /// Directive of an OOB-marked element, with its override attribute applied.
    pub fn from_element(el: &ElementNode) -> Option<Self> {
        let mut directive = Self::parse(marker_value(el)?);
        directive.target_override = target_override(el).map(str::to_owned);
        Some(directive)
    }

    /// The selector to evaluate, if any: override first, then the inline suffix.
    pub fn target_selector(&self) -> Option<&str> {
        self.target_override.as_deref().or(self.selector.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oobswap_fragment::Attribute;

    #[test]
    fn bare_strategies() {
        assert_eq!(OobDirective::parse("true").strategy, SwapStrategy::Default);
        assert_eq!(OobDirective::parse("outerHTML").strategy, SwapStrategy::OuterHtml);
        assert_eq!(OobDirective::parse("innerHTML").strategy, SwapStrategy::InnerHtml);
        assert_eq!(OobDirective::parse("delete").strategy, SwapStrategy::Delete);
    }

    #[test]
    fn unknown_or_empty_strategy_is_default() {
        assert_eq!(OobDirective::parse("morph").strategy, SwapStrategy::Default);
        assert_eq!(OobDirective::parse("").strategy, SwapStrategy::Default);
    }

    #[test]
    fn selector_suffix_with_spaces() {
        let d = OobDirective::parse("innerHTML:#list li.item swap:10ms");
        assert_eq!(d.strategy, SwapStrategy::InnerHtml);
        assert_eq!(d.selector.as_deref(), Some("#list li.item"));
        assert_eq!(d.swap_delay, Some(Duration::from_millis(10)));
        assert_eq!(d.settle_delay, None);
    }

    #[test]
    fn pseudo_class_colons_stay_in_selector() {
        let d = OobDirective::parse("outerHTML:li:first-child");
        assert_eq!(d.selector.as_deref(), Some("li:first-child"));
    }

    #[test]
    fn timing_modifiers() {
        let d = OobDirective::parse("true swap:1s settle:250");
        assert_eq!(d.selector, None);
        assert_eq!(d.swap_delay, Some(Duration::from_secs(1)));
        assert_eq!(d.settle_delay, Some(Duration::from_millis(250)));
    }

    #[test]
    fn bad_timing_is_ignored() {
        let d = OobDirective::parse("innerHTML swap:soon");
        assert_eq!(d.strategy, SwapStrategy::InnerHtml);
        assert_eq!(d.swap_delay, None);
    }

    #[test]
    fn empty_selector_suffix_is_absent() {
        assert_eq!(OobDirective::parse("true:").selector, None);
    }

    #[test]
    fn override_attribute_wins() {
        let el = ElementNode::new(
            "div",
            vec![
                Attribute::new("data-hx-swap-oob", "innerHTML:#inline"),
                Attribute::new("hx-oob-target", "[data-foo]"),
            ],
        );
        let d = OobDirective::from_element(&el).expect("marked");
        assert_eq!(d.selector.as_deref(), Some("#inline"));
        assert_eq!(d.target_selector(), Some("[data-foo]"));
    }

    #[test]
    fn unmarked_element_has_no_directive() {
        let el = ElementNode::new("div", vec![Attribute::new("id", "x")]);
        assert!(OobDirective::from_element(&el).is_none());
    }

    #[test]
    fn strip_markers_keeps_other_attributes() {
        let mut el = ElementNode::new(
            "div",
            vec![
                Attribute::new("id", "d1"),
                Attribute::new("hx-swap-oob", "true"),
                Attribute::new("data-hx-oob-target", "#x"),
                Attribute::new("foo", "bar"),
            ],
        );
        strip_markers(&mut el);
        let names: Vec<_> = el.attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["id", "foo"]);
    }
}
