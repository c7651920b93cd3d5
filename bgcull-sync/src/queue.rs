//! Interview queue ordering
//!
//! Pure function over the collection, prior decisions and the expansion cache.
//! Re-invoking it as new cache data arrives is safe; callers re-locate the active
//! item by identifier ([`position_of`]), never by index.
//!
//! **Default mode:**
//! 1. Items acquired within the last year are left out entirely (grace period)
//! 2. Expansions of another owned item are deferred to the end, alphabetically
//! 3. Standalone items are tiered:
//!    - Tier 1: never played, oldest acquisition first
//!    - Tier 2: played, but not within the last 3 years, lowest rating first
//!    - Tier 3: everything else, least recently played first
//! 4. Result: Tier 1, Tier 2, Tier 3, deferred expansions

use crate::store::CacheMap;
use bgcull_common::collection::{ExpansionLink, Item, ItemId};
use chrono::{Months, NaiveDate};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

const GRACE_PERIOD_MONTHS: u32 = 12;
const RECENT_PLAY_MONTHS: u32 = 36;

/// Requested queue ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderMode {
    #[default]
    Default,
    Shuffle,
    Alphabetical,
    Rating,
}

/// Build the ordered queue of item ids still awaiting a decision
pub fn build_queue(
    items: &[Item],
    decided: &HashSet<ItemId>,
    expansions: &CacheMap<Vec<ExpansionLink>>,
    mode: OrderMode,
    today: NaiveDate,
) -> Vec<ItemId> {
    let mut pending: Vec<&Item> = items.iter().filter(|item| !decided.contains(&item.id)).collect();

    match mode {
        OrderMode::Default => default_order(items, pending, expansions, today),
        OrderMode::Shuffle => {
            pending.shuffle(&mut rand::thread_rng());
            pending.iter().map(|item| item.id).collect()
        }
        OrderMode::Alphabetical => {
            pending.sort_by(|a, b| by_name(a, b));
            pending.iter().map(|item| item.id).collect()
        }
        OrderMode::Rating => {
            pending.sort_by(|a, b| rating_of(a).total_cmp(&rating_of(b)).then_with(|| by_name(a, b)));
            pending.iter().map(|item| item.id).collect()
        }
    }
}

/// Index of `id` in a (re)built queue
pub fn position_of(queue: &[ItemId], id: ItemId) -> Option<usize> {
    queue.iter().position(|&queued| queued == id)
}

fn default_order(
    all_items: &[Item],
    pending: Vec<&Item>,
    expansions: &CacheMap<Vec<ExpansionLink>>,
    today: NaiveDate,
) -> Vec<ItemId> {
    let grace_start = today.checked_sub_months(Months::new(GRACE_PERIOD_MONTHS));
    let recent_start = today.checked_sub_months(Months::new(RECENT_PLAY_MONTHS));
    let owned: HashSet<ItemId> = all_items.iter().map(|item| item.id).collect();

    let mut deferred = Vec::new();
    let mut never_played = Vec::new();
    let mut stale = Vec::new();
    let mut recent = Vec::new();

    for item in pending {
        if in_grace_period(item, grace_start) {
            continue;
        }

        let is_owned_expansion = expansions
            .get(&item.id)
            .is_some_and(|links| links.iter().any(|link| link.base_id != item.id && owned.contains(&link.base_id)));

        if is_owned_expansion {
            deferred.push(item);
        } else if item.play_count == 0 {
            never_played.push(item);
        } else if !played_since(item, recent_start) {
            stale.push(item);
        } else {
            recent.push(item);
        }
    }

    never_played.sort_by(|a, b| a.acquired_on.cmp(&b.acquired_on).then_with(|| by_name(a, b)));
    stale.sort_by(|a, b| rating_of(a).total_cmp(&rating_of(b)).then_with(|| by_name(a, b)));
    recent.sort_by(|a, b| last_played_or_epoch(a).cmp(&last_played_or_epoch(b)).then_with(|| by_name(a, b)));
    deferred.sort_by(|a, b| by_name(a, b));

    never_played
        .into_iter()
        .chain(stale)
        .chain(recent)
        .chain(deferred)
        .map(|item| item.id)
        .collect()
}

/// Acquired on or after the grace cutoff; unknown acquisition dates never are
fn in_grace_period(item: &Item, grace_start: Option<NaiveDate>) -> bool {
    match (item.acquired_on, grace_start) {
        (Some(acquired), Some(cutoff)) => acquired >= cutoff,
        _ => false,
    }
}

fn played_since(item: &Item, cutoff: Option<NaiveDate>) -> bool {
    match (item.last_played, cutoff) {
        (Some(played), Some(cutoff)) => played >= cutoff,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

fn rating_of(item: &Item) -> f64 {
    item.rating.unwrap_or(0.0)
}

fn last_played_or_epoch(item: &Item) -> NaiveDate {
    item.last_played.unwrap_or_default()
}

fn by_name(a: &Item, b: &Item) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.id.cmp(&b.id))
}
