//! Whole-search advice: prompts that look at every application at once.

use anyhow::Result;

use crate::ai::{Assistant, PromptContext};
use crate::metrics;
use crate::prompts;
use crate::sections::{self, Section};
use crate::store::ContextStore;

/// Quotes the conversation so far, so the overview can pick up on it.
pub fn job_search_overview(assistant: &mut Assistant, store: &ContextStore) -> Result<String> {
    let mut context = search_context(store);
    context.insert("chat_history", assistant.history_text());
    assistant.generate_response(prompts::JOB_SEARCH_OVERVIEW, &context)
}

pub fn weekend_project(assistant: &mut Assistant, store: &ContextStore) -> Result<Vec<Section>> {
    let response = assistant.generate_response(prompts::WEEKEND_PROJECT, &search_context(store))?;
    Ok(sections::numbered_sections(&response, 6))
}

pub fn simulate_first_day(
    assistant: &mut Assistant,
    store: &ContextStore,
    job_id: &str,
) -> Result<Vec<Section>> {
    let job = store.require_application(job_id)?;
    let mut context = PromptContext::new();
    context.insert("job_description", job.description().to_string());
    context.insert("company_info", job.company_info().to_string());
    let response = assistant.generate_response(prompts::FIRST_DAY, &context)?;
    Ok(sections::numbered_sections(&response, 5))
}

pub fn weekly_goals(assistant: &mut Assistant, store: &ContextStore) -> Result<Vec<String>> {
    let response = assistant.generate_response(prompts::WEEKLY_GOALS, &search_context(store))?;
    Ok(sections::non_empty_lines(&response))
}

pub fn motivation(assistant: &mut Assistant, store: &ContextStore) -> Result<String> {
    let breakdown = metrics::status_breakdown(store.list_applications().values())
        .into_iter()
        .map(|(status, count)| format!("{}: {}", status, count))
        .collect::<Vec<_>>()
        .join(", ");

    let mut context = PromptContext::new();
    context.insert("application_count", store.application_count().to_string());
    context.insert("success_rate", format_rate(store.success_rate()));
    context.insert("status_breakdown", breakdown);
    assistant.generate_response(prompts::MOTIVATION, &context)
}

pub fn skill_improvement(assistant: &mut Assistant, store: &ContextStore) -> Result<Vec<Section>> {
    let response =
        assistant.generate_response(prompts::SKILL_IMPROVEMENT, &search_context(store))?;
    Ok(sections::numbered_sections(&response, 3))
}

pub fn career_plan(assistant: &mut Assistant, store: &ContextStore) -> Result<Vec<Section>> {
    let response = assistant.generate_response(prompts::CAREER_PLAN, &search_context(store))?;
    Ok(sections::numbered_sections(&response, 5))
}

/// `0.5` -> `"50.00%"`
pub fn format_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

fn search_context(store: &ContextStore) -> PromptContext {
    let mut context = PromptContext::new();
    context.insert("applications", store.applications_json());
    context.insert("resume", store.resume_content().to_string());
    context
}
