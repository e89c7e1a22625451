use std::collections::{BTreeMap, HashMap};

use bas_types::{ExecutionResult, ResultStatus, ScoreCounts, SecurityScore, Technique};

/// `total` counts terminal statuses excluding `skipped` and `pending`:
/// success, blocked, detected, failed, timeout.
fn counts_toward_total(status: ResultStatus) -> bool {
    matches!(
        status,
        ResultStatus::Success
            | ResultStatus::Blocked
            | ResultStatus::Detected
            | ResultStatus::Failed
            | ResultStatus::Timeout
    )
}

fn weighted_overall(results: &[&ExecutionResult]) -> (f64, ScoreCounts) {
    let mut counts = ScoreCounts::default();
    for r in results {
        if !counts_toward_total(r.status) {
            continue;
        }
        counts.total += 1;
        match r.status {
            ResultStatus::Blocked => counts.blocked += 1,
            ResultStatus::Detected => counts.detected += 1,
            ResultStatus::Success => counts.successful += 1,
            _ => {}
        }
    }
    let overall = if counts.total == 0 {
        100.0
    } else {
        (counts.blocked as f64 * 100.0 + counts.detected as f64 * 50.0)
            / (counts.total as f64 * 100.0)
            * 100.0
    };
    (overall, counts)
}

/// `overall = (blocked*100 + detected*50) / (total*100) * 100`; when
/// `total == 0` the convention is `overall = 100` with zero counts.
/// `techniques` is used only to build the by-tactic breakdown; a result
/// whose technique id isn't in the map contributes to the overall score
/// but to no tactic sub-score.
pub fn calculate(
    results: &[ExecutionResult],
    techniques: &HashMap<String, Technique>,
) -> SecurityScore {
    let all: Vec<&ExecutionResult> = results.iter().collect();
    let (overall, counts) = weighted_overall(&all);

    let mut by_tactic_results: BTreeMap<String, Vec<&ExecutionResult>> = BTreeMap::new();
    for result in &all {
        let Some(technique) = techniques.get(&result.technique_id) else {
            continue;
        };
        for tactic in &technique.tactics {
            by_tactic_results
                .entry(tactic.clone())
                .or_default()
                .push(result);
        }
    }

    let by_tactic = by_tactic_results
        .into_iter()
        .map(|(tactic, results)| (tactic, weighted_overall(&results).0))
        .collect();

    SecurityScore {
        overall,
        by_tactic,
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bas_types::Platform;

    fn result(status: ResultStatus) -> ExecutionResult {
        let mut r = ExecutionResult::pending(
            "r1",
            "exec-1",
            "task-1",
            "T1082",
            "a1",
            None,
            "systeminfo",
        );
        r.status = status;
        r
    }

    fn technique_map() -> HashMap<String, Technique> {
        let mut map = HashMap::new();
        map.insert(
            "T1082".to_string(),
            Technique {
                id: "T1082".to_string(),
                name: "System Information Discovery".to_string(),
                tactics: vec!["discovery".to_string()],
                platforms: vec![Platform::Windows],
                executors: Vec::new(),
                is_safe: true,
            },
        );
        map
    }

    #[test]
    fn all_blocked_scores_one_hundred() {
        let results = vec![result(ResultStatus::Blocked), result(ResultStatus::Blocked)];
        let score = calculate(&results, &technique_map());
        assert_eq!(score.overall, 100.0);
    }

    #[test]
    fn all_success_scores_zero() {
        let results = vec![result(ResultStatus::Success)];
        let score = calculate(&results, &technique_map());
        assert_eq!(score.overall, 0.0);
    }

    #[test]
    fn all_detected_scores_fifty() {
        let results = vec![result(ResultStatus::Detected)];
        let score = calculate(&results, &technique_map());
        assert_eq!(score.overall, 50.0);
    }

    #[test]
    fn empty_set_conventionally_scores_one_hundred() {
        let score = calculate(&[], &technique_map());
        assert_eq!(score.overall, 100.0);
        assert_eq!(score.counts.total, 0);
    }

    #[test]
    fn skipped_and_pending_are_excluded_from_total() {
        let results = vec![
            result(ResultStatus::Success),
            result(ResultStatus::Skipped),
            result(ResultStatus::Pending),
        ];
        let score = calculate(&results, &technique_map());
        assert_eq!(score.counts.total, 1);
    }

    #[test]
    fn mixed_results_preserve_weighted_sum() {
        // 1 blocked + 1 detected + 2 success => total 4
        // (1*100 + 1*50) / (4*100) * 100 = 150/400*100 = 37.5
        let results = vec![
            result(ResultStatus::Blocked),
            result(ResultStatus::Detected),
            result(ResultStatus::Success),
            result(ResultStatus::Success),
        ];
        let score = calculate(&results, &technique_map());
        assert_eq!(score.overall, 37.5);
    }

    #[test]
    fn by_tactic_breakdown_groups_by_technique_tactics() {
        let results = vec![result(ResultStatus::Blocked)];
        let score = calculate(&results, &technique_map());
        assert_eq!(score.by_tactic.get("discovery"), Some(&100.0));
    }
}
