//! Operator dashboard summary.
//!
//! # Invariants
//! - Most viewed path is the first path, in first-seen order, to reach the
//!   strict maximum count.
//! - Recent views are newest first; equal timestamps keep input order.

use crate::clock::parse_timestamp;
use crate::model::page_view::PageViewRecord;
use crate::model::signup::SignupRecord;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;

pub const DEFAULT_RECENT_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_signups: usize,
    pub total_page_views: usize,
    pub most_viewed_path: Option<String>,
    pub most_viewed_count: usize,
    pub recent_page_views: Vec<PageViewRecord>,
}

pub fn dashboard_summary(
    users: &[SignupRecord],
    page_views: &[PageViewRecord],
    recent_limit: usize,
) -> DashboardSummary {
    let (most_viewed_path, most_viewed_count) = most_viewed(page_views);
    DashboardSummary {
        total_signups: users.len(),
        total_page_views: page_views.len(),
        most_viewed_path,
        most_viewed_count,
        recent_page_views: recent(page_views, recent_limit),
    }
}

/// Coarse platform label for a user agent string.
pub fn classify_device(user_agent: &str) -> &'static str {
    if user_agent.trim().is_empty() {
        return "Unknown";
    }
    const RULES: &[(&[&str], &str)] = &[
        (&["iPhone", "iPad"], "iOS"),
        (&["Android"], "Android"),
        (&["Windows"], "Windows"),
        (&["Mac"], "Mac"),
        (&["Linux"], "Linux"),
    ];
    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| user_agent.contains(needle)))
        .map_or("Desktop", |&(_, label)| label)
}

fn most_viewed(page_views: &[PageViewRecord]) -> (Option<String>, usize) {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for view in page_views {
        let count = counts.entry(view.path.as_str()).or_insert(0);
        if *count == 0 {
            order.push(view.path.as_str());
        }
        *count += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for path in order {
        let count = counts[path];
        if best.map_or(true, |(_, max)| count > max) {
            best = Some((path, count));
        }
    }
    best.map_or((None, 0), |(path, count)| (Some(path.to_string()), count))
}

fn recent(page_views: &[PageViewRecord], limit: usize) -> Vec<PageViewRecord> {
    let mut sorted = page_views.to_vec();
    // Unparseable timestamps sort last.
    sorted.sort_by_key(|view| Reverse(parse_timestamp(&view.timestamp)));
    sorted.truncate(limit);
    sorted
}
