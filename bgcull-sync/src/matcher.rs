//! Name-based expansion matching
//!
//! Fallback used only when the catalog refuses the authorized path. Works from
//! item names alone: titles sharing a prefix before a subtitle separator
//! ("Carcassonne: Hunters and Gatherers") are grouped, and the bare base title
//! (or the shortest member) is taken as the base game of the group.
//!
//! This is a heuristic and will misfire on unrelated titles that happen to share
//! a prefix.

use bgcull_common::collection::{ExpansionLink, ItemId, NamedItem};
use std::collections::HashMap;

/// Subtitle separators in priority order; the first one present (past position 0) wins
const SEPARATORS: [&str; 3] = [":", " - ", " \u{2013} "];

/// Prefixes shorter than this (in characters) are ignored
const MIN_PREFIX_CHARS: usize = 3;

/// Candidate base-title prefix of `name`, lower-cased
///
/// Takes the text before the first separator, in [`SEPARATORS`] order, that
/// occurs past position 0. A colon outranks a dash even when the dash comes
/// earlier in the name.
pub fn candidate_prefix(name: &str) -> Option<String> {
    let cut = SEPARATORS
        .iter()
        .find_map(|sep| name.find(sep).filter(|&pos| pos > 0))?;

    let prefix = name[..cut].trim().to_lowercase();
    (prefix.chars().count() >= MIN_PREFIX_CHARS).then_some(prefix)
}

/// Derive probable expansion links for every item from names alone
///
/// Every input item appears in the result; items with no match map to an empty
/// list. An item receives at most one link.
pub fn match_by_name(items: &[NamedItem]) -> HashMap<ItemId, Vec<ExpansionLink>> {
    // Exact-name lookup, first item with a given name wins
    let mut by_name: HashMap<String, &NamedItem> = HashMap::new();
    for item in items {
        by_name.entry(item.name.trim().to_lowercase()).or_insert(item);
    }

    // Group by prefix, keeping first-seen group order for deterministic output
    let mut group_order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&NamedItem>> = HashMap::new();
    for item in items {
        if let Some(prefix) = candidate_prefix(&item.name) {
            let members = groups.entry(prefix.clone()).or_insert_with(|| {
                group_order.push(prefix);
                Vec::new()
            });
            members.push(item);
        }
    }

    let mut result: HashMap<ItemId, Vec<ExpansionLink>> =
        items.iter().map(|item| (item.id, Vec::new())).collect();

    for prefix in &group_order {
        let members = &groups[prefix];
        let exact_base = by_name.get(prefix.as_str()).copied();

        let base = match members.as_slice() {
            [only] => match exact_base {
                Some(base) if base.id != only.id => base,
                _ => continue,
            },
            _ => match exact_base {
                Some(base) => base,
                None => match members.iter().min_by_key(|m| m.name.chars().count()) {
                    Some(shortest) => *shortest,
                    None => continue,
                },
            },
        };

        for member in members {
            if member.id == base.id {
                continue;
            }
            if let Some(links) = result.get_mut(&member.id) {
                if links.is_empty() {
                    links.push(ExpansionLink::new(base.id, base.name.clone()));
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(names: &[(ItemId, &str)]) -> Vec<NamedItem> {
        names.iter().map(|(id, name)| NamedItem::new(*id, *name)).collect()
    }

    #[test]
    fn test_candidate_prefix_separators() {
        assert_eq!(candidate_prefix("Carcassonne: The River"), Some("carcassonne".to_string()));
        assert_eq!(candidate_prefix("Dominion - Intrigue"), Some("dominion".to_string()));
        assert_eq!(candidate_prefix("Dominion \u{2013} Seaside"), Some("dominion".to_string()));
    }

    #[test]
    fn test_candidate_prefix_separator_priority() {
        // Colon outranks an earlier dash
        assert_eq!(
            candidate_prefix("Star Wars - Rebellion: Rise of the Empire"),
            Some("star wars - rebellion".to_string())
        );
        // Dash outranks an earlier en dash
        assert_eq!(
            candidate_prefix("Arkham \u{2013} Horror - Dunwich"),
            Some("arkham \u{2013} horror".to_string())
        );
        // A colon at position 0 is skipped in favour of the next separator
        assert_eq!(
            candidate_prefix(":Prelude - Part Two"),
            Some(":prelude".to_string())
        );
    }

    #[test]
    fn test_candidate_prefix_rejections() {
        assert_eq!(candidate_prefix("Catan"), None);
        assert_eq!(candidate_prefix(":Leading colon"), None);
        assert_eq!(candidate_prefix("X: The Game"), None);
        assert_eq!(candidate_prefix("Go: Deluxe"), None);
        assert_eq!(candidate_prefix("Well-Known"), None);
    }

    #[test]
    fn test_single_member_with_exact_base() {
        let result = match_by_name(&items(&[
            (822, "Carcassonne"),
            (4390, "Carcassonne: Hunters and Gatherers"),
            (13, "Catan"),
        ]));

        assert_eq!(result.len(), 3);
        assert!(result[&822].is_empty());
        assert_eq!(result[&4390], vec![ExpansionLink::new(822, "Carcassonne")]);
        assert!(result[&13].is_empty());
    }

    #[test]
    fn test_single_member_without_base_is_unmatched() {
        let result = match_by_name(&items(&[(1, "Pandemic: Legacy"), (2, "Catan")]));
        assert!(result[&1].is_empty());
        assert!(result[&2].is_empty());
    }

    #[test]
    fn test_group_prefers_exact_base_name() {
        let result = match_by_name(&items(&[
            (10, "Dominion: Intrigue"),
            (11, "Dominion: Seaside"),
            (12, "Dominion"),
        ]));

        assert_eq!(result[&10], vec![ExpansionLink::new(12, "Dominion")]);
        assert_eq!(result[&11], vec![ExpansionLink::new(12, "Dominion")]);
        assert!(result[&12].is_empty());
    }

    #[test]
    fn test_group_without_exact_base_uses_shortest_member() {
        let result = match_by_name(&items(&[
            (20, "Arkham Horror: The Card Game - Dunwich"),
            (21, "Arkham Horror: Dunwich"),
            (22, "Arkham Horror: The Dunwich Legacy Box"),
        ]));

        assert!(result[&21].is_empty());
        assert_eq!(result[&20], vec![ExpansionLink::new(21, "Arkham Horror: Dunwich")]);
        assert_eq!(result[&22], vec![ExpansionLink::new(21, "Arkham Horror: Dunwich")]);
    }

    #[test]
    fn test_base_match_is_case_insensitive() {
        let result = match_by_name(&items(&[(1, "TICKET TO RIDE"), (2, "Ticket to Ride: Europa 1912")]));
        assert_eq!(result[&2], vec![ExpansionLink::new(1, "TICKET TO RIDE")]);
    }

    #[test]
    fn test_empty_input() {
        assert!(match_by_name(&[]).is_empty());
    }
}
