//! Merge policies for new discoveries.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::{render_records, StoreState};
use crate::scan::Discovery;
use crate::version::VersionRecord;

/// How a run's discoveries are folded into the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Union with the prior list keyed by package URL, re-sort everything,
    /// rewrite only what changed. Re-running over an unchanged remote window
    /// mutates nothing.
    #[default]
    FullRebuild,

    /// Sort only this run's discoveries and prepend them to the prior file
    /// verbatim. Duplicates across runs are kept.
    Append,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::FullRebuild => f.write_str("full"),
            MergePolicy::Append => f.write_str("append"),
        }
    }
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" | "full-rebuild" | "rebuild" => Ok(MergePolicy::FullRebuild),
            "append" | "prepend" => Ok(MergePolicy::Append),
            other => Err(format!("unknown merge policy {:?}, expected full or append", other)),
        }
    }
}

/// Outcome of a merge: the resulting list and which files must change.
///
/// `None` for a file means "leave it untouched".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    /// Cumulative list after the merge.
    pub records: Vec<VersionRecord>,
    /// New cumulative list content.
    pub all: Option<String>,
    /// New cursor value.
    pub cursor: Option<u64>,
    /// New latest pointer.
    pub latest: Option<String>,
    /// Discoveries whose package URL was not already in the list.
    pub new_records: usize,
    /// Whether the top of the list moved to a different package URL.
    pub latest_changed: bool,
}

impl MergePlan {
    /// Whether applying the plan writes nothing.
    pub fn is_noop(&self) -> bool {
        self.all.is_none() && self.cursor.is_none() && self.latest.is_none()
    }
}

/// Decide what a run's discoveries do to the store.
///
/// `found` may be in any order. An empty `found` never touches any file.
pub fn merge(state: &StoreState, found: &[Discovery], policy: MergePolicy) -> MergePlan {
    let max_build = match found.iter().map(|d| d.build_number).max() {
        Some(build) => build,
        None => {
            return MergePlan {
                records: state.records.clone(),
                ..MergePlan::default()
            }
        }
    };

    // Arrival order is nondeterministic; fix it before any first-wins rule.
    let mut found: Vec<&Discovery> = found.iter().collect();
    found.sort_by_key(|d| d.build_number);

    match policy {
        MergePolicy::FullRebuild => full_rebuild(state, &found, max_build),
        MergePolicy::Append => append(state, &found, max_build),
    }
}

fn full_rebuild(state: &StoreState, found: &[&Discovery], max_build: u64) -> MergePlan {
    let previous_top = state.top().map(|r| r.package_url.as_str());

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(state.records.len() + found.len());
    for record in &state.records {
        if seen.insert(record.package_url.as_str()) {
            records.push(record.clone());
        }
    }

    let mut new_records = 0;
    for discovery in found {
        if seen.insert(discovery.record.package_url.as_str()) {
            records.push(discovery.record.clone());
            new_records += 1;
        }
    }

    records.sort_by(VersionRecord::newest_first);

    let content = render_records(&records);
    let all = (content != state.all_content).then_some(content);

    // Rediscovering known packages is not progress; the cursor stays put.
    let cursor = (new_records > 0 && max_build > state.cursor).then_some(max_build);

    let top = records.first().map(|r| r.package_url.as_str());
    let latest_changed = top != previous_top;
    let latest = if latest_changed {
        top.map(str::to_string)
    } else {
        None
    };

    MergePlan {
        records,
        all,
        cursor,
        latest,
        new_records,
        latest_changed,
    }
}

fn append(state: &StoreState, found: &[&Discovery], max_build: u64) -> MergePlan {
    let previous_top = state.top().map(|r| r.package_url.clone());
    let known: HashSet<&str> = state
        .records
        .iter()
        .map(|r| r.package_url.as_str())
        .collect();

    let mut fresh: Vec<VersionRecord> = found.iter().map(|d| d.record.clone()).collect();
    fresh.sort_by(VersionRecord::newest_first);

    let new_records = fresh
        .iter()
        .map(|r| r.package_url.as_str())
        .filter(|url| !known.contains(url))
        .collect::<HashSet<_>>()
        .len();

    let mut content = render_records(&fresh);
    content.push_str(&state.all_content);

    // `fresh` is non-empty here: merge() returns early on an empty window.
    let latest = fresh.first().map(|r| r.package_url.clone());
    let latest_changed = latest != previous_top;

    let mut records = fresh;
    records.extend(state.records.iter().cloned());

    MergePlan {
        records,
        all: Some(content),
        cursor: Some(max_build.max(state.cursor)),
        latest,
        new_records,
        latest_changed,
    }
}
