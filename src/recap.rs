//! recap.rs — Per-group count sentences fed to the narrative model.
//!
//! Two passes: count per (STATE, TYPE, LOKASI, GRADE), then merge the
//! locations of each (STATE, TYPE, GRADE) group. Groups come out in the order
//! their first record appeared.

use std::collections::HashMap;

use crate::record::FlatRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecapGroup {
    pub state: String,
    pub container_type: String,
    pub grade: String,
    pub count: u64,
    /// Distinct locations, first-seen order.
    pub locations: Vec<String>,
}

impl RecapGroup {
    pub fn sentence(&self) -> String {
        format!(
            "At {}, there are {} containers with STATE {}, TYPE {}, and GRADE {}.",
            self.locations.join(", "),
            self.count,
            self.state,
            self.container_type,
            self.grade
        )
    }
}

pub fn group_recap(records: &[FlatRecord]) -> Vec<RecapGroup> {
    // Pass 1: (state, type, location, grade) -> count
    let mut fine: Vec<((&str, &str, &str, &str), u64)> = Vec::new();
    let mut fine_index: HashMap<(&str, &str, &str, &str), usize> = HashMap::new();
    for (location, state, container_type, grade) in records.iter().filter_map(FlatRecord::pivot_key) {
        let key = (state, container_type, location, grade);
        let i = *fine_index.entry(key).or_insert_with(|| {
            fine.push((key, 0));
            fine.len() - 1
        });
        fine[i].1 += 1;
    }

    // Pass 2: merge locations under (state, type, grade)
    let mut groups: Vec<RecapGroup> = Vec::new();
    let mut group_index: HashMap<(&str, &str, &str), usize> = HashMap::new();
    for ((state, container_type, location, grade), count) in fine {
        let i = *group_index.entry((state, container_type, grade)).or_insert_with(|| {
            groups.push(RecapGroup {
                state: state.to_string(),
                container_type: container_type.to_string(),
                grade: grade.to_string(),
                count: 0,
                locations: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[i];
        group.count += count;
        if !group.locations.iter().any(|l| l == location) {
            group.locations.push(location.to_string());
        }
    }

    groups
}

/// One sentence per merged group with a non-zero count.
pub fn aggregate_recap(records: &[FlatRecord]) -> Vec<String> {
    sentences_for(&group_recap(records))
}

/// Sentences for the given groups, skipping any with a zero count.
pub fn sentences_for(groups: &[RecapGroup]) -> Vec<String> {
    groups.iter().filter(|g| g.count > 0).map(RecapGroup::sentence).collect()
}

/// Recap sentences as the single text block the narrative prompt expects.
pub fn recap_text(sentences: &[String]) -> String {
    sentences.join(" ")
}
