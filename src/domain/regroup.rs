//! Regrouping fetched evolution maps by metric key, ranking keys by sample
//! volume, and computing the shared bucket trim for a comparison set.
use tracing::warn;

use crate::domain::model::{Evolution, TaggedEvolutions};

/// Counts below `total * TRIM_CUTOFF_FACTOR` are trimmable.
pub const TRIM_CUTOFF_FACTOR: f64 = 0.0001;
/// Trimming never reduces an evolution below this many buckets.
pub const MIN_TRIMMED_BUCKETS: usize = 3;

/// One evolution inside a key's comparison set, still carrying the compare
/// tag it was fetched under.
#[derive(Debug, Clone)]
pub struct GroupMember {
    pub tag: Option<String>,
    pub evolution: Evolution,
}

/// All series for one metric key, members in tag-sorted fetch order.
#[derive(Debug, Clone)]
pub struct KeyGroup {
    pub key: String,
    pub members: Vec<GroupMember>,
}

impl KeyGroup {
    /// Total sample volume across all members' aggregate histograms.
    pub fn total_count(&self) -> u64 {
        self.members
            .iter()
            .map(|m| m.evolution.histogram().count)
            .sum()
    }
}

/// Re-key from per-tag maps to per-metric-key groups. The input arrives
/// keyed by compare tag first; charts want all of one key's series together,
/// so the nesting flips here. Group order follows first encounter while
/// walking the tag-sorted maps.
pub fn regroup_by_key(maps: Vec<TaggedEvolutions>) -> Vec<KeyGroup> {
    let mut groups: Vec<KeyGroup> = Vec::new();
    for map in maps {
        for (key, evolution) in map.evolutions {
            let member = GroupMember {
                tag: map.tag.clone(),
                evolution,
            };
            match groups.iter_mut().find(|g| g.key == key) {
                Some(group) => group.members.push(member),
                None => groups.push(KeyGroup {
                    key,
                    members: vec![member],
                }),
            }
        }
    }
    groups
}

/// Keep at most `key_limit` groups, ranked by total sample count descending.
/// Ties keep their encounter order (the sort is stable), and the survivors
/// are returned in rank order.
pub fn limit_keys(mut groups: Vec<KeyGroup>, key_limit: usize) -> Vec<KeyGroup> {
    if groups.len() <= key_limit {
        return groups;
    }
    groups.sort_by_key(|g| std::cmp::Reverse(g.total_count()));
    groups.truncate(key_limit);
    groups
}

/// Sort tagged maps descending by tag so series-to-colour assignment is
/// reproducible across renders with identical inputs. Legend colouring
/// downstream is positional, so this ordering is load-bearing.
pub fn sort_by_tag(maps: &mut [TaggedEvolutions]) {
    if maps.iter().any(|m| m.tag.is_some()) {
        maps.sort_by(|a, b| b.tag.cmp(&a.tag));
    }
}

/// The largest uniform (left, right) bucket trim that leaves every evolution
/// at least [`MIN_TRIMMED_BUCKETS`] buckets and removes no bucket any sibling
/// counts as significant.
pub fn shared_trims(evolutions: &[&Evolution]) -> (usize, usize) {
    let mut min_left = usize::MAX;
    let mut min_right = usize::MAX;
    for evolution in evolutions {
        let histogram = evolution.histogram();
        let counts: Vec<u64> = histogram.buckets.iter().map(|b| b.count).collect();
        let cutoff = TRIM_CUTOFF_FACTOR * histogram.count as f64;
        let mut left = 0;
        let mut right = 0;
        while left < counts.len()
            && (counts[left] as f64) < cutoff
            && counts.len() - left - right > MIN_TRIMMED_BUCKETS
        {
            left += 1;
        }
        while right < counts.len() - left
            && (counts[counts.len() - 1 - right] as f64) < cutoff
            && counts.len() - left - right > MIN_TRIMMED_BUCKETS
        {
            right += 1;
        }
        min_left = min_left.min(left);
        min_right = min_right.min(right);
    }
    if min_left == usize::MAX {
        warn!("trim requested for an empty comparison set");
        return (0, 0);
    }
    (min_left, min_right)
}
