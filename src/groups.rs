//! Group selection and check preview
//!
//! Group names are compared literally: "Sports" and "sports " are different
//! groups.

use std::collections::BTreeMap;

use crate::models::ChannelEntry;
use crate::prober::DEFAULT_GRACE;

/// Split a comma-separated selection into trimmed, non-empty, unique names
pub fn parse_selected_groups(selection: &str) -> Vec<String> {
    let mut groups: Vec<String> = Vec::new();
    for group in selection.split(',').map(str::trim).filter(|g| !g.is_empty()) {
        if !groups.iter().any(|g| g == group) {
            groups.push(group.to_string());
        }
    }
    groups
}

/// Keep channels in the selected groups; an empty selection keeps everything
pub fn filter_by_groups(channels: &[ChannelEntry], selected: &[String]) -> Vec<ChannelEntry> {
    if selected.is_empty() {
        return channels.to_vec();
    }
    channels
        .iter()
        .filter(|ch| selected.iter().any(|g| *g == ch.group))
        .cloned()
        .collect()
}

/// Sorted, de-duplicated group names present in the playlist
pub fn available_groups(channels: &[ChannelEntry]) -> Vec<String> {
    group_counts(channels).into_keys().collect()
}

/// Channel count per group, sorted by group name
pub fn group_counts(channels: &[ChannelEntry]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for ch in channels {
        *counts.entry(ch.group.clone()).or_insert(0) += 1;
    }
    counts
}

/// What a check run with the given settings would cover
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub total_to_check: usize,
    pub group_counts: BTreeMap<String, usize>,
    /// Requested groups present in the playlist, in request order
    pub matched_groups: Vec<String>,
    /// Requested groups with no channels, in request order
    pub missing_groups: Vec<String>,
    pub available_groups: Vec<String>,
    pub all_groups: bool,
    pub timeout_secs: u64,
    pub estimated_minutes: f64,
}

/// Rough wall-clock estimate: every channel may take its full probe budget
pub fn estimate_minutes(channel_count: usize, timeout_secs: u64) -> f64 {
    let per_channel = timeout_secs.saturating_add(DEFAULT_GRACE.as_secs());
    (channel_count as f64 * per_channel as f64) / 60.0
}

pub fn preview(channels: &[ChannelEntry], selected: &[String], timeout_secs: u64) -> Preview {
    let available = available_groups(channels);
    let to_check = filter_by_groups(channels, selected);

    let (matched_groups, missing_groups): (Vec<String>, Vec<String>) = selected
        .iter()
        .cloned()
        .partition(|g| available.contains(g));

    Preview {
        total_to_check: to_check.len(),
        group_counts: group_counts(&to_check),
        matched_groups,
        missing_groups,
        available_groups: available,
        all_groups: selected.is_empty(),
        timeout_secs,
        estimated_minutes: estimate_minutes(to_check.len(), timeout_secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &str, group: &str) -> ChannelEntry {
        ChannelEntry {
            name: name.to_string(),
            group: group.to_string(),
            logo: String::new(),
            url: format!("http://example.com/{}.ts", name),
        }
    }

    fn sample() -> Vec<ChannelEntry> {
        vec![
            channel("espn", "Sports"),
            channel("cnn", "News"),
            channel("fox", "Sports"),
            channel("bbc", "News"),
            channel("misc", "No Group"),
        ]
    }

    #[test]
    fn test_parse_selected_groups() {
        assert_eq!(parse_selected_groups(""), Vec::<String>::new());
        assert_eq!(parse_selected_groups(" , ,"), Vec::<String>::new());
        assert_eq!(parse_selected_groups("Sports, News ,Sports"), vec!["Sports", "News"]);
    }

    #[test]
    fn test_empty_selection_is_no_filter() {
        let channels = sample();
        assert_eq!(filter_by_groups(&channels, &[]), channels);
    }

    #[test]
    fn test_filter_preserves_order() {
        let filtered = filter_by_groups(&sample(), &["Sports".to_string()]);
        let names: Vec<&str> = filtered.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["espn", "fox"]);
    }

    #[test]
    fn test_group_names_are_literal() {
        let filtered = filter_by_groups(&sample(), &["sports".to_string()]);
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_available_groups_sorted() {
        assert_eq!(available_groups(&sample()), vec!["News", "No Group", "Sports"]);
    }

    #[test]
    fn test_preview_with_selection() {
        let selected = parse_selected_groups("Sports, Movies");
        let p = preview(&sample(), &selected, 10);
        assert_eq!(p.total_to_check, 2);
        assert_eq!(p.matched_groups, vec!["Sports"]);
        assert_eq!(p.missing_groups, vec!["Movies"]);
        assert_eq!(p.group_counts.get("Sports"), Some(&2));
        assert_eq!(p.group_counts.len(), 1);
        assert!(!p.all_groups);
        assert!((p.estimated_minutes - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_preview_all_groups() {
        let p = preview(&sample(), &[], 25);
        assert!(p.all_groups);
        assert_eq!(p.total_to_check, 5);
        assert_eq!(p.group_counts.get("News"), Some(&2));
        assert!(p.missing_groups.is_empty());
        // 5 channels * 30s
        assert!((p.estimated_minutes - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_saturates_on_huge_timeout() {
        let minutes = estimate_minutes(3, u64::MAX);
        assert!(minutes.is_finite());
        assert!(minutes > 0.0);
    }
}
