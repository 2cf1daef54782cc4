//! Deterministic fallback plan synthesis
//!
//! Builds a plan purely from the project context, with no generative-model
//! involvement. Used whenever the backend is unconfigured, fails, or
//! returns unusable content. Given identical context and mode, two
//! syntheses produce identical phase titles, step counts, and references;
//! only timestamps differ.

use chrono::Utc;
use tracing::debug;

use super::document::{Phase, PlanDocument, PlanMode, PlanRequest, Step};
use crate::scan::{ProjectContext, ScannedFile};

/// Reasoning attached to every heuristically generated step
const FALLBACK_REASONING: &str =
    "Heuristically generated from the project scan because the generative backend was unavailable or failed.";

/// Floor on the analysis slice of the multi-phase partition
const MIN_ANALYSIS_SLICE: usize = 2;

/// Synthesize a complete fallback plan for a request
pub fn synthesize_fallback(request: &PlanRequest, context: &ProjectContext, file_cap: usize) -> PlanDocument {
    debug!(mode = %request.mode, file_cap, "Synthesizing deterministic fallback plan");

    PlanDocument {
        task: request.task.clone(),
        mode: request.mode,
        summary: fallback_summary(&request.task),
        generated_at: Utc::now(),
        phases: fallback_phases(request.mode, context, file_cap),
        raw_text: None,
    }
}

/// Build just the fallback phases
///
/// Also used by the normalizer to substitute for an empty `phases` array
/// in otherwise-parseable backend output.
pub fn fallback_phases(mode: PlanMode, context: &ProjectContext, file_cap: usize) -> Vec<Phase> {
    let files = context.capped_files(file_cap);

    match mode {
        PlanMode::SinglePhase => vec![single_phase(files, context.manifest())],
        PlanMode::MultiPhase => multi_phase(files, context),
    }
}

fn fallback_summary(task: &str) -> String {
    format!("Heuristic plan for \"{}\", derived from the project scan without model assistance.", task)
}

/// One "Implementation" phase: a step per capped file plus a fixed
/// validation step referencing the project manifest
fn single_phase(files: &[ScannedFile], manifest: Option<&str>) -> Phase {
    let mut steps: Vec<Step> = files
        .iter()
        .enumerate()
        .map(|(idx, file)| file_step(1, idx, "Inspect", format!("Inspect `{}` for task-relevant changes.", file.path), &file.path))
        .collect();

    steps.push(Step {
        id: format!("step-1-{}", steps.len() + 1),
        title: "Validate changes".to_string(),
        description: "Run the project's build and test suite to confirm the changes hold together.".to_string(),
        references: manifest.map(String::from).into_iter().collect(),
        reasoning: Some(FALLBACK_REASONING.to_string()),
        estimated_effort: None,
    });

    Phase {
        id: "phase-1".to_string(),
        title: "Implementation".to_string(),
        summary: "Work through the scanned files and validate the result.".to_string(),
        steps,
    }
}

/// Three phases over three contiguous, non-overlapping slices of the
/// capped file list
fn multi_phase(files: &[ScannedFile], context: &ProjectContext) -> Vec<Phase> {
    let (analysis_len, implementation_len) = partition_lengths(files.len());
    let (analysis, rest) = files.split_at(analysis_len);
    let (implementation, validation) = rest.split_at(implementation_len);

    let analysis_steps: Vec<Step> = analysis
        .iter()
        .enumerate()
        .map(|(idx, file)| {
            file_step(
                1,
                idx,
                "Review",
                format!("Review `{}` to understand how it relates to the task.", file.path),
                &file.path,
            )
        })
        .collect();

    let mut implementation_steps: Vec<Step> = implementation
        .iter()
        .enumerate()
        .map(|(idx, file)| {
            file_step(
                2,
                idx,
                "Update",
                format!("Apply task-relevant changes to `{}`.", file.path),
                &file.path,
            )
        })
        .collect();
    implementation_steps.push(Step {
        id: format!("step-2-{}", implementation_steps.len() + 1),
        title: "Share learnings".to_string(),
        description: "Capture what was discovered during implementation and flag anything that changes the remaining plan.".to_string(),
        references: Vec::new(),
        reasoning: Some(FALLBACK_REASONING.to_string()),
        estimated_effort: None,
    });

    let mut validation_steps: Vec<Step> = validation
        .iter()
        .enumerate()
        .map(|(idx, file)| {
            file_step(
                3,
                idx,
                "Verify",
                format!("Verify behavior touched by `{}` still holds after the changes.", file.path),
                &file.path,
            )
        })
        .collect();
    validation_steps.push(Step {
        id: format!("step-3-{}", validation_steps.len() + 1),
        title: "Execute test & lint suite".to_string(),
        description: "Run the full test and lint suite and resolve any failures.".to_string(),
        references: context.manifest().map(String::from).into_iter().collect(),
        reasoning: Some(FALLBACK_REASONING.to_string()),
        estimated_effort: None,
    });

    vec![
        Phase {
            id: "phase-1".to_string(),
            title: "Analysis & Discovery".to_string(),
            summary: "Understand the relevant parts of the codebase.".to_string(),
            steps: analysis_steps,
        },
        Phase {
            id: "phase-2".to_string(),
            title: "Implementation".to_string(),
            summary: "Make the changes the task calls for.".to_string(),
            steps: implementation_steps,
        },
        Phase {
            id: "phase-3".to_string(),
            title: "Validation & Verification".to_string(),
            summary: "Confirm the changes are correct and complete.".to_string(),
            steps: validation_steps,
        },
    ]
}

/// Slice lengths for the multi-phase partition
///
/// Analysis takes `max(2, ceil(n/3))` files (bounded by what exists),
/// implementation takes the next equal-sized slice, validation gets the
/// remainder. The slices always cover all `n` files exactly once.
fn partition_lengths(n: usize) -> (usize, usize) {
    let slice = MIN_ANALYSIS_SLICE.max(n.div_ceil(3));
    let analysis = slice.min(n);
    let implementation = slice.min(n - analysis);
    (analysis, implementation)
}

fn file_step(phase_idx: usize, step_idx: usize, verb: &str, description: String, path: &str) -> Step {
    let name = path.rsplit('/').next().unwrap_or(path);
    Step {
        id: format!("step-{}-{}", phase_idx, step_idx + 1),
        title: format!("{} {}", verb, name),
        description,
        references: vec![path.to_string()],
        reasoning: Some(FALLBACK_REASONING.to_string()),
        estimated_effort: None,
    }
}
