use anyhow::Result;

use crate::ai::{Assistant, PromptContext};
use crate::models::JobApplication;
use crate::prompts;
use crate::sections::{self, Section};
use crate::store::ContextStore;

pub fn analyze_resume(assistant: &mut Assistant, store: &ContextStore) -> Result<Vec<Section>> {
    let mut context = PromptContext::new();
    context.insert("resume_content", store.resume_content().to_string());
    let response = assistant.generate_response(prompts::RESUME_ANALYSIS, &context)?;
    Ok(sections::numbered_sections(&response, 5))
}

/// Asks for improvements and replaces the resume's pending suggestions with
/// them, one per bullet.
pub fn suggest_improvements(
    assistant: &mut Assistant,
    store: &mut ContextStore,
) -> Result<Vec<String>> {
    let mut context = PromptContext::new();
    context.insert("resume_content", store.resume_content().to_string());
    let response = assistant.generate_response(prompts::RESUME_IMPROVEMENT, &context)?;

    let suggestions: Vec<String> = sections::numbered_sections(&response, 5)
        .into_iter()
        .flat_map(|section| section.items)
        .map(|item| strip_bullet(&item).to_string())
        .filter(|item| !item.is_empty())
        .collect();

    store.clear_resume_suggestions();
    for suggestion in &suggestions {
        store.add_resume_suggestion(suggestion);
    }
    Ok(suggestions)
}

pub fn generate_cover_letter(
    assistant: &mut Assistant,
    store: &ContextStore,
    job_id: &str,
) -> Result<String> {
    let job = store.require_application(job_id)?;
    let mut context = PromptContext::new();
    context.insert("job_details", job_details(job));
    context.insert("resume_content", store.resume_content().to_string());
    assistant.generate_response(prompts::COVER_LETTER, &context)
}

pub fn resume_chat(assistant: &mut Assistant, store: &ContextStore, input: &str) -> Result<String> {
    let mut context = PromptContext::new();
    context.insert("resume_content", store.resume_content().to_string());
    context.insert("user_input", input.to_string());
    assistant.generate_response(prompts::RESUME_CHAT, &context)
}

fn job_details(job: &JobApplication) -> String {
    format!(
        "Company: {}\nPosition: {}\nDescription: {}",
        job.company(),
        job.position(),
        job.description()
    )
}

fn strip_bullet(item: &str) -> &str {
    item.trim_start_matches(['-', '*', '•']).trim()
}
