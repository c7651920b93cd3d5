//! Catalog response parser
//!
//! The catalog answers with XML in which every field of interest is an
//! attribute (`<link id=".." value=".."/>`, `<width value=".."/>`). Rather than
//! pattern-matching fields out of the raw text, the payload is first turned into
//! a small element tree (tags and attributes only), then each `<item>` is read
//! independently so one malformed record never costs its siblings.
//!
//! The tree builder is deliberately forgiving:
//! - `<?..?>`, comments and `<!..>` declarations are skipped
//! - stray close tags are ignored
//! - elements still open at end of input are closed implicitly

use bgcull_common::collection::{BoxDimensions, ExpansionLink, ItemId};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Link type marking an expansion relationship
const EXPANSION_LINK_TYPE: &str = "boardgameexpansion";

/// Parsed XML element (attributes and child elements; text is discarded)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: HashMap<String, String>,
    pub children: Vec<Element>,
}

impl Element {
    fn new(name: &str, attrs: HashMap<String, String>) -> Self {
        Self {
            name: name.to_string(),
            attrs,
            children: Vec::new(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// `value` attribute of child `name`, parsed as a number
    fn child_value_f64(&self, name: &str) -> Option<f64> {
        self.child(name)?.attr("value")?.trim().parse().ok()
    }
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r#"<(/?)([A-Za-z_][\w:.\-]*)((?:\s+[^\s=/>]+\s*=\s*(?:"[^"]*"|'[^']*'))*)\s*(/?)>"#)
            .expect("tag pattern is valid")
    })
}

fn attr_regex() -> &'static Regex {
    static ATTR: OnceLock<Regex> = OnceLock::new();
    ATTR.get_or_init(|| {
        Regex::new(r#"([^\s=/>]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("attribute pattern is valid")
    })
}

/// Build the element forest for `payload`
pub fn parse_elements(payload: &str) -> Vec<Element> {
    let mut roots: Vec<Element> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();

    for caps in tag_regex().captures_iter(payload) {
        let closing = !caps[1].is_empty();
        let name = &caps[2];
        let self_closing = !caps[4].is_empty();

        if closing {
            // Ignore a close tag with no matching open element
            let Some(pos) = stack.iter().rposition(|e| e.name == name) else {
                continue;
            };
            while stack.len() > pos {
                if let Some(done) = stack.pop() {
                    attach(&mut stack, &mut roots, done);
                }
            }
            continue;
        }

        let element = Element::new(name, parse_attrs(&caps[3]));
        if self_closing {
            attach(&mut stack, &mut roots, element);
        } else {
            stack.push(element);
        }
    }

    while let Some(open) = stack.pop() {
        attach(&mut stack, &mut roots, open);
    }

    roots
}

fn attach(stack: &mut [Element], roots: &mut Vec<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => roots.push(element),
    }
}

fn parse_attrs(raw: &str) -> HashMap<String, String> {
    attr_regex()
        .captures_iter(raw)
        .map(|c| {
            let value = c.get(2).or_else(|| c.get(3)).map(|m| m.as_str()).unwrap_or("");
            (c[1].to_string(), decode_entities(value))
        })
        .collect()
}

/// Decode the predefined XML entities and numeric character references
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => {
                    if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse::<u32>().ok().and_then(char::from_u32)
                    } else {
                        None
                    }
                }
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Catalog `<item>` records in the payload, with their parsed identifiers
///
/// Items may sit at the top level or inside an `<items>` wrapper. Items without a
/// numeric `id` are skipped.
fn catalog_items(roots: &[Element]) -> Vec<(ItemId, &Element)> {
    let mut items = Vec::new();
    for root in roots {
        let candidates: Vec<&Element> = match root.name.as_str() {
            "items" => root.children_named("item").collect(),
            "item" => vec![root],
            _ => Vec::new(),
        };

        for item in candidates {
            match item.attr("id").and_then(|id| id.trim().parse::<ItemId>().ok()) {
                Some(id) => items.push((id, item)),
                None => debug!(id = ?item.attr("id"), "Skipping catalog item without numeric id"),
            }
        }
    }
    items
}

/// Extract expansion links per item
///
/// Every item in the payload appears in the result; an item with no inbound
/// expansion link maps to an empty list (checked, not an expansion).
pub fn parse_expansions(payload: &str) -> HashMap<ItemId, Vec<ExpansionLink>> {
    let roots = parse_elements(payload);
    let mut result = HashMap::new();

    for (id, item) in catalog_items(&roots) {
        let links = item
            .children_named("link")
            .filter(|link| link.attr("type") == Some(EXPANSION_LINK_TYPE))
            .filter(|link| link.attr("inbound") == Some("true"))
            .filter_map(|link| {
                let base_id = link.attr("id")?.trim().parse::<ItemId>().ok()?;
                let base_name = link.attr("value").unwrap_or_default();
                Some(ExpansionLink::new(base_id, base_name))
            })
            .collect();
        result.insert(id, links);
    }

    if result.is_empty() {
        debug!(bytes = payload.len(), "No catalog items found in expansion payload");
    }
    result
}

/// Extract box dimensions per item
///
/// The first version with width, length and depth all present and positive
/// wins. Items with no usable version are left out.
pub fn parse_dimensions(payload: &str) -> HashMap<ItemId, BoxDimensions> {
    let roots = parse_elements(payload);
    let mut result = HashMap::new();

    for (id, item) in catalog_items(&roots) {
        let Some(versions) = item.child("versions") else {
            continue;
        };

        let found = versions.children_named("item").find_map(|version| {
            BoxDimensions::from_measurements(
                version.child_value_f64("width")?,
                version.child_value_f64("length")?,
                version.child_value_f64("depth")?,
            )
        });

        if let Some(dims) = found {
            result.insert(id, dims);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPANSION_PAYLOAD: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<items termsofuse="https://boardgamegeek.com/xmlapi/termsofuse">
    <item type="boardgame" id="822">
        <name type="primary" sortindex="1" value="Carcassonne" />
        <link type="boardgamecategory" id="1035" value="Medieval" />
        <link type="boardgameexpansion" id="2993" value="Carcassonne: Expansion 1 &#8211; Inns &amp; Cathedrals" />
    </item>
    <item type="boardgameexpansion" id="2993">
        <name type="primary" sortindex="1" value="Carcassonne: Expansion 1 - Inns &amp; Cathedrals" />
        <description>Adds &lt;b&gt;large&lt;/b&gt; meeples</description>
        <link type="boardgameexpansion" id="822" value="Carcassonne" inbound="true"/>
        <link type="boardgameexpansion" id="131742" value="Carcassonne: Big Box 4" inbound="true"/>
    </item>
</items>"#;

    #[test]
    fn test_element_tree_nests_children() {
        let roots = parse_elements("<a x=\"1\"><b/><c><d y='2'/></c></a>");
        assert_eq!(roots.len(), 1);
        let a = &roots[0];
        assert_eq!(a.attr("x"), Some("1"));
        assert_eq!(a.children.len(), 2);
        assert_eq!(a.child("c").unwrap().child("d").unwrap().attr("y"), Some("2"));
    }

    #[test]
    fn test_stray_close_and_truncation_tolerated() {
        let roots = parse_elements("</zzz><items><item id=\"1\"><link id=\"2\"/>");
        assert_eq!(roots.len(), 1);
        let item = roots[0].child("item").unwrap();
        assert_eq!(item.children.len(), 1);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Inns &amp; Cathedrals"), "Inns & Cathedrals");
        assert_eq!(decode_entities("A &#8211; B"), "A \u{2013} B");
        assert_eq!(decode_entities("&#x41;&lt;&gt;&quot;&apos;"), "A<>\"'");
        assert_eq!(decode_entities("AT&T & co"), "AT&T & co");
    }

    #[test]
    fn test_parse_expansions_collects_inbound_links() {
        let result = parse_expansions(EXPANSION_PAYLOAD);

        assert_eq!(result.len(), 2);
        // Base game: outbound expansion link is not an "expansion of" relation
        assert_eq!(result[&822], Vec::<ExpansionLink>::new());
        assert_eq!(
            result[&2993],
            vec![
                ExpansionLink::new(822, "Carcassonne"),
                ExpansionLink::new(131742, "Carcassonne: Big Box 4"),
            ]
        );
    }

    #[test]
    fn test_malformed_item_does_not_abort_siblings() {
        let payload = r#"<items>
            <item id="abc"><link type="boardgameexpansion" id="1" value="X" inbound="true"/></item>
            <item id="7"><link type="boardgameexpansion" id="oops" value="Bad" inbound="true"/>
                <link type="boardgameexpansion" id="5" value="Good" inbound="true"/></item>
        </items>"#;

        let result = parse_expansions(payload);

        assert_eq!(result.len(), 1);
        assert_eq!(result[&7], vec![ExpansionLink::new(5, "Good")]);
    }

    #[test]
    fn test_unrecognisable_payload_is_empty() {
        assert!(parse_expansions("Your request for this collection has been accepted").is_empty());
        assert!(parse_dimensions("").is_empty());
    }

    #[test]
    fn test_parse_dimensions_picks_first_complete_version() {
        let payload = r#"<items>
            <item type="boardgame" id="13">
                <versions>
                    <item type="boardgameversion" id="1">
                        <width value="0" /><length value="11.5" /><depth value="3" />
                    </item>
                    <item type="boardgameversion" id="2">
                        <width value="11.69291" /><length value="11.69291" />
                    </item>
                    <item type="boardgameversion" id="3">
                        <width value="11.69291" /><length value="11.69291" /><depth value="2.75591" />
                    </item>
                    <item type="boardgameversion" id="4">
                        <width value="12" /><length value="12" /><depth value="3" />
                    </item>
                </versions>
            </item>
            <item type="boardgame" id="14">
                <versions>
                    <item type="boardgameversion" id="5">
                        <width value="0" /><length value="0" /><depth value="0" />
                    </item>
                </versions>
            </item>
            <item type="boardgame" id="15" />
        </items>"#;

        let result = parse_dimensions(payload);

        assert_eq!(result.len(), 1);
        let dims = result[&13];
        assert_eq!(dims.width, 11.69);
        assert_eq!(dims.length, 11.69);
        assert_eq!(dims.depth, 2.76);
        assert_eq!(dims.volume, 376.8);
    }
}
