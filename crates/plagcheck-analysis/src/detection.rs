//! Plagiarism detection core (§4.4.1). Pure given its inputs: no I/O, no clock
//! reads beyond what's passed in, so this is unit-testable without mocks.

use crate::models::{DetectionOutcome, PeerComparison};
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

pub const ALGORITHM_NAME: &str = "digest-comparison";

/// Normalizes a digest for comparison: lowercase, trimmed.
fn normalize(digest: &str) -> String {
    digest.trim().to_ascii_lowercase()
}

/// Positional character-match percentage between two equal-length, normalized
/// digests. Mismatched lengths are a structural error (returns `None`) and are
/// skipped by the caller with a warning (§4.4.1c).
pub fn compare_digests(a: &str, b: &str) -> Option<u8> {
    let a = normalize(a);
    let b = normalize(b);
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    if a == b {
        return Some(100);
    }
    let matches = a
        .bytes()
        .zip(b.bytes())
        .filter(|(x, y)| x == y)
        .count();
    Some(((matches * 100) / a.len()) as u8)
}

pub struct DetectionInput {
    pub work_id: Uuid,
    pub student_id: Uuid,
    pub current_digest: String,
    pub current_size: i64,
    pub threshold: u8,
    pub started_at: DateTime<Utc>,
}

/// §4.4.1d-g: scans peers, tracks the highest match, applies the same-student
/// exemption, and breaks ties by preferring the oldest submission.
pub fn detect(input: &DetectionInput, peers: &[PeerComparison]) -> DetectionOutcome {
    let mut compared_digests = Vec::new();
    let mut best: Option<&PeerComparison> = None;
    let mut best_match: u8 = 0;

    for peer in peers {
        compared_digests.push(peer.digest.clone());
        let pct = match compare_digests(&input.current_digest, &peer.digest) {
            Some(p) => p,
            None => continue,
        };
        let is_better = pct > best_match
            || (pct == best_match
                && best
                    .map(|b| peer.submitted_at < b.submitted_at)
                    .unwrap_or(false));
        if is_better {
            best_match = pct;
            best = Some(peer);
        }
    }

    let (plagiarism_flag, original_work_id, match_percentage) = match best {
        Some(peer) if best_match >= input.threshold && peer.student_id != input.student_id => {
            (true, Some(peer.work_id), best_match as i32)
        }
        Some(_) => (false, None, best_match as i32),
        None => (false, None, 0),
    };

    let completed_at = Utc::now();
    let per_peer: Vec<_> = peers
        .iter()
        .map(|p| {
            json!({
                "work_id": p.work_id,
                "student_id": p.student_id,
                "match_percentage": p.match_percentage,
                "digest": p.digest,
                "compared_at": p.compared_at,
            })
        })
        .collect();

    let details = json!({
        "peers": per_peer,
        "file_info": { "size": input.current_size },
        "analysis_metadata": {
            "algorithm": ALGORITHM_NAME,
            "similarity_method": ALGORITHM_NAME,
            "version": 1,
            "threshold": input.threshold,
            "started_at": input.started_at,
            "completed_at": completed_at,
        }
    });

    DetectionOutcome {
        plagiarism_flag,
        original_work_id,
        match_percentage,
        compared_digests,
        compared_files_count: peers.len() as i32,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(work_id: Uuid, student_id: Uuid, digest: &str, submitted_at: DateTime<Utc>) -> PeerComparison {
        PeerComparison {
            work_id,
            student_id,
            match_percentage: 0,
            digest: digest.to_string(),
            compared_at: Utc::now(),
            submitted_at,
        }
    }

    #[test]
    fn identical_digests_are_a_full_match() {
        assert_eq!(compare_digests("abc123", "abc123"), Some(100));
    }

    #[test]
    fn case_and_whitespace_are_normalized() {
        assert_eq!(compare_digests(" ABC123 ", "abc123"), Some(100));
    }

    #[test]
    fn mismatched_lengths_are_skipped() {
        assert_eq!(compare_digests("abc", "abcd"), None);
    }

    #[test]
    fn partial_match_reports_positional_percentage() {
        // 2 of 4 bytes equal -> 50%
        assert_eq!(compare_digests("aabb", "aacc"), Some(50));
    }

    #[test]
    fn no_peers_yields_not_plagiarized_zero_match() {
        let input = DetectionInput {
            work_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            current_digest: "abc123".to_string(),
            current_size: 100,
            threshold: 80,
            started_at: Utc::now(),
        };
        let outcome = detect(&input, &[]);
        assert!(!outcome.plagiarism_flag);
        assert_eq!(outcome.match_percentage, 0);
        assert_eq!(outcome.compared_files_count, 0);
    }

    #[test]
    fn same_student_match_never_flags_plagiarism() {
        let student = Uuid::new_v4();
        let input = DetectionInput {
            work_id: Uuid::new_v4(),
            student_id: student,
            current_digest: "abc123".to_string(),
            current_size: 100,
            threshold: 80,
            started_at: Utc::now(),
        };
        let peers = vec![peer(Uuid::new_v4(), student, "abc123", Utc::now())];
        let outcome = detect(&input, &peers);
        assert!(!outcome.plagiarism_flag);
        assert_eq!(outcome.match_percentage, 100);
    }

    #[test]
    fn different_student_full_match_flags_plagiarism() {
        let input = DetectionInput {
            work_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            current_digest: "abc123".to_string(),
            current_size: 100,
            threshold: 80,
            started_at: Utc::now(),
        };
        let other_student = Uuid::new_v4();
        let other_work = Uuid::new_v4();
        let peers = vec![peer(other_work, other_student, "abc123", Utc::now())];
        let outcome = detect(&input, &peers);
        assert!(outcome.plagiarism_flag);
        assert_eq!(outcome.original_work_id, Some(other_work));
        assert_eq!(outcome.match_percentage, 100);
    }

    #[test]
    fn ties_prefer_the_oldest_submission() {
        let input = DetectionInput {
            work_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            current_digest: "abc123".to_string(),
            current_size: 100,
            threshold: 80,
            started_at: Utc::now(),
        };
        let older_work = Uuid::new_v4();
        let newer_work = Uuid::new_v4();
        let older = peer(older_work, Uuid::new_v4(), "abc123", Utc::now() - chrono::Duration::days(2));
        let newer = peer(newer_work, Uuid::new_v4(), "abc123", Utc::now() - chrono::Duration::days(1));
        let outcome = detect(&input, &[newer, older]);
        assert_eq!(outcome.original_work_id, Some(older_work));
    }

    #[test]
    fn below_threshold_match_does_not_flag() {
        let input = DetectionInput {
            work_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            current_digest: "aabb".to_string(),
            current_size: 4,
            threshold: 80,
            started_at: Utc::now(),
        };
        let peers = vec![peer(Uuid::new_v4(), Uuid::new_v4(), "aacc", Utc::now())];
        let outcome = detect(&input, &peers);
        assert!(!outcome.plagiarism_flag);
        assert_eq!(outcome.match_percentage, 50);
    }
}
