//! Benchmarks for receta core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use indexmap::IndexMap;
use receta::core::{parser, resolver, validator};

fn bench_extract_variables(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_variables");
    for placeholders in [1usize, 8, 32] {
        let template: String = (0..placeholders)
            .map(|i| format!("section {{{{var_{i}}}}} with filler text between "))
            .collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(placeholders),
            &template,
            |b, template| {
                b.iter(|| {
                    let vars = resolver::extract_variables(black_box(template));
                    black_box(vars);
                });
            },
        );
    }
    group.finish();
}

fn bench_render_template(c: &mut Criterion) {
    let mut context: IndexMap<String, String> = IndexMap::new();
    for i in 0..32 {
        context.insert(format!("var_{i}"), "substituted value".to_string());
    }

    let mut group = c.benchmark_group("render_template");
    for placeholders in [1usize, 8, 32] {
        let template: String = (0..placeholders)
            .map(|i| format!("section {{{{var_{i}}}}} with filler text between "))
            .collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(placeholders),
            &template,
            |b, template| {
                b.iter(|| {
                    let rendered =
                        resolver::render_template(black_box(template), &context).unwrap();
                    black_box(rendered);
                });
            },
        );
    }
    group.finish();
}

const RECIPE_YAML: &str = r#"
name: bench-pipeline
version: "1.0.0"
description: "Research, outline, draft, review, polish"
context:
  audience: engineers
  tone: direct
steps:
  - id: gather
    agent: amplifier/researcher
    prompt: "Research {{topic}} for {{audience}}"
    retry:
      max_attempts: 3
      backoff: exponential
  - id: outline
    agent: amplifier/planner
    prompt: "Outline from notes: {{gather}}"
  - id: draft
    agent: amplifier/writer
    prompt: "Write a {{tone}} draft from {{outline}} and {{gather}}"
  - id: review
    agent: amplifier/reviewer
    prompt: "Review this draft: {{draft}}"
    on_error: continue
  - id: polish
    agent: amplifier/editor
    prompt: "Polish {{draft}} with feedback {{review}}"
"#;

fn bench_parse_recipe(c: &mut Criterion) {
    c.bench_function("parse_recipe", |b| {
        b.iter(|| {
            let recipe = parser::parse_recipe(black_box(RECIPE_YAML)).unwrap();
            black_box(recipe);
        });
    });
}

fn bench_validate(c: &mut Criterion) {
    let recipe = parser::parse_recipe(RECIPE_YAML).unwrap();
    c.bench_function("validate_recipe", |b| {
        b.iter(|| {
            let result = validator::validate(black_box(&recipe));
            black_box(result);
        });
    });
}

criterion_group!(
    benches,
    bench_extract_variables,
    bench_render_template,
    bench_parse_recipe,
    bench_validate
);
criterion_main!(benches);
