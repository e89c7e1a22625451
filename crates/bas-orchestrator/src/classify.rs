use bas_types::ResultStatus;
use bas_wire::{DetectionHint, TaskResultPayload};

/// Classifies a `task_result` payload into a terminal `ResultStatus`
/// (SPEC_FULL.md §9, open question #1). An explicit `detection_hint` from an
/// external EDR integration always wins; otherwise the sentinel timeout
/// string, then the agent-reported `success`/`exit_code` pair, decide.
pub fn classify_result(payload: &TaskResultPayload) -> ResultStatus {
    if let Some(hint) = payload.detection_hint {
        return match hint {
            DetectionHint::Blocked => ResultStatus::Blocked,
            DetectionHint::Detected => ResultStatus::Detected,
        };
    }
    if payload.output == "Command timed out" {
        return ResultStatus::Timeout;
    }
    if payload.success && payload.exit_code == 0 {
        return ResultStatus::Success;
    }
    ResultStatus::Failed
}
