//! Display-name heuristic for new proposals.
//!
//! Naming stays in orchestration, decoupled from the opaque clustering
//! algorithm: majority major first, then shared interest tags, then a
//! timestamped fallback.

use chrono::{DateTime, Utc};

use affinity_core::MajorCount;

/// Tags must be shared by at least this many distinct members to count.
pub const MIN_TAG_HOLDERS: i64 = 2;

/// At most this many tags appear in a tag-based name.
pub const MAX_NAME_TAGS: usize = 2;

/// Compute the display name for a cluster of `member_count` users.
///
/// `majors` is the per-major member histogram (most common first) and
/// `shared_tags` the ranked tags held by at least [`MIN_TAG_HOLDERS`]
/// members.
pub fn proposal_name(
    member_count: usize,
    majors: &[MajorCount],
    shared_tags: &[String],
    now: DateTime<Utc>,
) -> String {
    // Strict majority: more than half the members share one major.
    if let Some(top) = majors.first() {
        if top.count * 2 > member_count as i64 {
            return format!("Study Group – {}", top.name);
        }
    }

    if !shared_tags.is_empty() {
        let tags: Vec<&str> = shared_tags
            .iter()
            .take(MAX_NAME_TAGS)
            .map(String::as_str)
            .collect();
        return format!("Group {}", tags.join(", "));
    }

    format!("Suggested Study Group #{}", now.format("%Y%m%d%H%M"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn major(name: &str, count: i64) -> MajorCount {
        MajorCount {
            name: name.to_string(),
            count,
        }
    }

    #[test]
    fn test_strict_majority_major_wins() {
        // 3 of 4 share CS, a strict majority.
        let majors = vec![major("CS", 3), major("Math", 1)];
        let name = proposal_name(4, &majors, &["algorithms".to_string()], Utc::now());
        assert_eq!(name, "Study Group – CS");
    }

    #[test]
    fn test_exact_half_is_not_a_majority() {
        // 2 of 4 is not > half; falls through to tags.
        let majors = vec![major("CS", 2), major("Math", 2)];
        let name = proposal_name(4, &majors, &["databases".to_string()], Utc::now());
        assert_eq!(name, "Group databases");
    }

    #[test]
    fn test_tag_name_takes_top_two() {
        let tags = vec![
            "algorithms".to_string(),
            "databases".to_string(),
            "compilers".to_string(),
        ];
        let name = proposal_name(5, &[], &tags, Utc::now());
        assert_eq!(name, "Group algorithms, databases");
        assert!(!name.contains("compilers"));
    }

    #[test]
    fn test_single_shared_tag() {
        let tags = vec!["algorithms".to_string()];
        let name = proposal_name(5, &[major("CS", 2)], &tags, Utc::now());
        assert_eq!(name, "Group algorithms");
    }

    #[test]
    fn test_timestamped_fallback() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let name = proposal_name(5, &[], &[], now);
        assert_eq!(name, "Suggested Study Group #202603141509");
    }

    #[test]
    fn test_majority_in_singleton_histogram() {
        // All 5 share one major.
        let name = proposal_name(5, &[major("Mechatronics", 5)], &[], Utc::now());
        assert_eq!(name, "Study Group – Mechatronics");
    }
}
