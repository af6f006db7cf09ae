//! RC-004: Recipe document parsing.
//!
//! Purely structural: YAML shape, required fields, and step-id collisions.
//! No variable resolution and no agent lookup happen here — those belong
//! to the validator and the executor.

use super::error::EngineError;
use super::types::Recipe;
use std::collections::HashSet;
use std::path::Path;

/// Parse a recipe from a YAML file on disk.
pub fn parse_recipe_file(path: &Path) -> Result<Recipe, EngineError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        EngineError::MalformedRecipe(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_recipe(&content)
}

/// Parse a recipe from a YAML string.
pub fn parse_recipe(yaml: &str) -> Result<Recipe, EngineError> {
    let recipe: Recipe = serde_yaml_ng::from_str(yaml)
        .map_err(|e| EngineError::MalformedRecipe(format!("recipe parse error: {}", e)))?;

    // Id collisions are a structural defect, caught before validation
    let mut seen: HashSet<&str> = HashSet::new();
    let mut duplicates: Vec<&str> = Vec::new();
    for step in &recipe.steps {
        if !seen.insert(step.id.as_str()) && !duplicates.contains(&step.id.as_str()) {
            duplicates.push(step.id.as_str());
        }
    }
    if !duplicates.is_empty() {
        return Err(EngineError::MalformedRecipe(format!(
            "duplicate step ids: {}",
            duplicates.join(", ")
        )));
    }

    Ok(recipe)
}
