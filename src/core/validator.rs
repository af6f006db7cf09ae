//! RC-005: Static recipe validation — the single pre-execution gate.
//!
//! Checks structural constraints, variable closure, and per-step policy
//! tags. All applicable checks run and accumulate; nothing short-circuits.
//! Errors block execution; warnings are informational (a template variable
//! that matches no earlier step may legitimately arrive with the
//! invocation, so it cannot be rejected statically).

use super::resolver::{extract_variables, has_unclosed_placeholder};
use super::types::{OnError, Recipe, Step, ValidationResult};
use std::collections::HashMap;

/// Step ids that collide with names reserved for engine use.
const RESERVED_STEP_IDS: &[&str] = &["recipe", "session", "step"];

/// Validate a parsed recipe. Pure function of its input.
pub fn validate(recipe: &Recipe) -> ValidationResult {
    let mut result = ValidationResult::default();

    check_recipe_header(recipe, &mut result);

    if recipe.steps.is_empty() {
        result
            .errors
            .push("recipe must have at least one step".to_string());
    }

    // First position of each id — forward/self references compare
    // against this
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (index, step) in recipe.steps.iter().enumerate() {
        if positions.contains_key(step.id.as_str()) {
            result
                .errors
                .push(format!("duplicate step id '{}'", step.id));
        } else {
            positions.insert(step.id.as_str(), index);
        }
    }

    for (index, step) in recipe.steps.iter().enumerate() {
        check_step_structure(step, index, &mut result);
        check_step_references(recipe, step, index, &positions, &mut result);
    }

    result
}

fn check_recipe_header(recipe: &Recipe, result: &mut ValidationResult) {
    if recipe.name.is_empty() {
        result.errors.push("recipe name must not be empty".to_string());
    } else if !recipe
        .name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        result.errors.push(format!(
            "recipe name '{}' must be alphanumeric with hyphens/underscores",
            recipe.name
        ));
    }

    if let Some(reason) = semver_violation(&recipe.version) {
        result.errors.push(format!(
            "recipe version '{}' {}",
            recipe.version, reason
        ));
    }
}

/// Strict MAJOR.MINOR.PATCH — numeric parts, no `v` prefix, no
/// pre-release or build tags.
fn semver_violation(version: &str) -> Option<&'static str> {
    if version.is_empty() {
        return Some("must not be empty");
    }
    if version.starts_with('v') {
        return Some("must not carry a 'v' prefix (use '1.0.0', not 'v1.0.0')");
    }
    if version.contains('-') || version.contains('+') {
        return Some("must be plain MAJOR.MINOR.PATCH (no pre-release or build tags)");
    }
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() != 3 {
        return Some("must follow MAJOR.MINOR.PATCH");
    }
    if !parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
    {
        return Some("must have numeric MAJOR.MINOR.PATCH parts");
    }
    None
}

fn check_step_structure(step: &Step, index: usize, result: &mut ValidationResult) {
    let label = step_label(step, index);

    if step.id.is_empty() {
        result.errors.push(format!("{}: missing id", label));
    } else if !step
        .id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        result.errors.push(format!(
            "{}: id must be alphanumeric with hyphens/underscores",
            label
        ));
    } else if RESERVED_STEP_IDS.contains(&step.id.as_str()) {
        result
            .errors
            .push(format!("{}: id '{}' is reserved", label, step.id));
    }

    if step.agent.is_empty() {
        result.errors.push(format!("{}: agent must not be empty", label));
    }

    if let Some(ref retry) = step.retry {
        if retry.max_attempts == 0 {
            result
                .errors
                .push(format!("{}: retry.max_attempts must be at least 1", label));
        }
        if retry.delay_seconds < 0.0 {
            result
                .errors
                .push(format!("{}: retry.delay_seconds must not be negative", label));
        }
    }

    if step.timeout_seconds == Some(0) {
        result
            .errors
            .push(format!("{}: timeout_seconds must be positive", label));
    }

    if step.on_error == OnError::Unknown {
        result.errors.push(format!(
            "{}: on_error must be 'abort', 'continue', or 'skip_remaining'",
            label
        ));
    }
}

fn check_step_references(
    recipe: &Recipe,
    step: &Step,
    index: usize,
    positions: &HashMap<&str, usize>,
    result: &mut ValidationResult,
) {
    let label = step_label(step, index);

    for name in extract_variables(&step.prompt) {
        if name == step.id {
            result
                .errors
                .push(format!("{}: prompt references the step itself", label));
        } else if let Some(&pos) = positions.get(name.as_str()) {
            if pos > index {
                result.errors.push(format!(
                    "{}: prompt references '{}', which only runs later",
                    label, name
                ));
            }
        } else if !recipe.context.contains_key(&name) {
            result.warnings.push(format!(
                "{}: '{}' matches no earlier step or recipe variable; it must be supplied at invocation",
                label, name
            ));
        }
    }

    if has_unclosed_placeholder(&step.prompt) {
        result
            .warnings
            .push(format!("{}: prompt has an unclosed '{{{{'", label));
    }

    for dep in &step.depends_on {
        if dep == &step.id {
            result
                .errors
                .push(format!("{}: cannot depend on itself", label));
        } else {
            match positions.get(dep.as_str()) {
                None => result
                    .errors
                    .push(format!("{}: depends on unknown step '{}'", label, dep)),
                Some(&pos) if pos > index => result.errors.push(format!(
                    "{}: depends on '{}', which only runs later",
                    label, dep
                )),
                Some(_) => {}
            }
        }
    }
}

fn step_label(step: &Step, index: usize) -> String {
    if step.id.is_empty() {
        format!("step {}", index + 1)
    } else {
        format!("step '{}'", step.id)
    }
}
