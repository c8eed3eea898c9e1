//! Merging imported reports into the working set

use std::collections::HashSet;

use tracing::debug;

use crate::types::TestPath;

/// One past the highest id in `paths`, or 1 for an empty set
pub fn next_path_id(paths: &[TestPath]) -> i64 {
    paths.iter().map(|p| p.id).max().unwrap_or(0).max(0) + 1
}

/// First free title of the form `base`, `base (1)`, `base (2)`, ...
fn unique_title(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{} ({})", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Append `incoming` to `current` with fresh ids and collision-free titles.
///
/// Ids continue from the current maximum. A title already present in the
/// working set, or assigned earlier in the same batch, gets the first free
/// numeric suffix. `current` is not modified.
pub fn merge_into_working_set(current: &[TestPath], incoming: Vec<TestPath>) -> Vec<TestPath> {
    let mut next_id = next_path_id(current);
    let mut taken: HashSet<String> = current.iter().map(|p| p.title.clone()).collect();

    let mut merged = current.to_vec();
    merged.reserve(incoming.len());
    for report in incoming {
        let title = unique_title(&report.title, &taken);
        if title != report.title {
            debug!(original = %report.title, renamed = %title, "resolved title collision");
        }
        taken.insert(title.clone());
        merged.push(TestPath {
            id: next_id,
            title,
            ..report
        });
        next_id += 1;
    }
    merged
}

/// Give every path a distinct id. The first path with a given id keeps it;
/// later repeats get ids above the current maximum, in order.
pub fn with_unique_ids(paths: Vec<TestPath>) -> Vec<TestPath> {
    let mut next_id = next_path_id(&paths);
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .map(|path| {
            if seen.insert(path.id) {
                return path;
            }
            let id = next_id;
            next_id += 1;
            debug!(title = %path.title, from = path.id, to = id, "renumbered duplicate path id");
            seen.insert(id);
            TestPath { id, ..path }
        })
        .collect()
}

/// Append reports to the comparison set as they are
pub fn append_to_comparison(current: &[TestPath], incoming: Vec<TestPath>) -> Vec<TestPath> {
    let mut combined = current.to_vec();
    combined.extend(incoming);
    combined
}
