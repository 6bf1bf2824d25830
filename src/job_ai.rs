use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::ai::{Assistant, PromptContext};
use crate::models::{Fields, JobApplication};
use crate::prompts;
use crate::sections::{self, Section};
use crate::store::ContextStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub question: String,
    #[serde(alias = "answer", default)]
    pub suggested_answer: String,
}

pub type CultureAnalysis = BTreeMap<String, serde_json::Value>;

pub fn analyze_job_description(
    assistant: &mut Assistant,
    store: &ContextStore,
    job_id: &str,
) -> Result<Vec<Section>> {
    let job = store.require_application(job_id)?;
    let mut context = PromptContext::new();
    context.insert("job_description", job.description().to_string());
    context.insert("resume", store.resume_content().to_string());
    let response = assistant.generate_response(prompts::JOB_DESCRIPTION_ANALYSIS, &context)?;
    Ok(sections::numbered_sections(&response, 4))
}

/// The tailoring advice out of a full job-description analysis.
pub fn suggest_application_improvements(
    assistant: &mut Assistant,
    store: &ContextStore,
    job_id: &str,
) -> Result<Vec<String>> {
    let analysis = analyze_job_description(assistant, store, job_id)?;
    Ok(sections::find_section(&analysis, prompts::TAILORING_SECTION)
        .or_else(|| sections::find_section(&analysis, "tailoring"))
        .map(|section| section.items.clone())
        .unwrap_or_default())
}

/// Records the new status, then asks for a briefing on what it means.
pub fn update_application_status(
    assistant: &mut Assistant,
    store: &mut ContextStore,
    job_id: &str,
    new_status: &str,
) -> Result<String> {
    let old_status = store.require_application(job_id)?.status().to_string();

    let mut partial = Fields::new();
    partial.insert("status".to_string(), new_status.to_string());
    store.update_application(job_id, partial)?;
    info!(job_id, from = %old_status, to = new_status, "status changed");

    let job = store.require_application(job_id)?;
    let mut context = job_context(job);
    context.insert("old_status", old_status);
    context.insert("new_status", new_status.to_string());
    assistant.generate_response(prompts::STATUS_CHANGE, &context)
}

pub fn generate_application_strategy(
    assistant: &mut Assistant,
    store: &ContextStore,
    job_id: &str,
) -> Result<String> {
    let job = store.require_application(job_id)?;
    let mut context = job_context(job);
    context.insert("resume", store.resume_content().to_string());
    assistant.generate_response(prompts::APPLICATION_STRATEGY, &context)
}

/// Empty when the reply is not the JSON list the prompt asks for.
pub fn simulate_interview_questions(
    assistant: &mut Assistant,
    store: &ContextStore,
    job_id: &str,
) -> Result<Vec<InterviewQuestion>> {
    let job = store.require_application(job_id)?;
    let mut context = job_context(job);
    context.insert("resume", store.resume_content().to_string());
    let response = assistant.generate_response(prompts::INTERVIEW_QUESTIONS, &context)?;
    Ok(sections::json_or_default(&response))
}

/// Also stores a non-empty analysis on the application as `culture_notes`.
pub fn analyze_company_culture(
    assistant: &mut Assistant,
    store: &mut ContextStore,
    job_id: &str,
) -> Result<CultureAnalysis> {
    let job = store.require_application(job_id)?;
    let context = job_context(job);
    let response = assistant.generate_response(prompts::COMPANY_CULTURE, &context)?;
    let analysis: CultureAnalysis = sections::json_or_default(&response);

    if !analysis.is_empty() {
        let mut partial = Fields::new();
        partial.insert("culture_notes".to_string(), serde_json::to_string(&analysis)?);
        store.update_application(job_id, partial)?;
    }
    Ok(analysis)
}

pub fn suggest_networking_strategies(
    assistant: &mut Assistant,
    store: &ContextStore,
    job_id: &str,
) -> Result<Vec<String>> {
    let job = store.require_application(job_id)?;
    let context = job_context(job);
    let response = assistant.generate_response(prompts::NETWORKING, &context)?;
    Ok(sections::non_empty_lines(&response))
}

fn job_context(job: &JobApplication) -> PromptContext {
    let mut context = PromptContext::new();
    context.insert("position", job.position().to_string());
    context.insert("company", job.company().to_string());
    context.insert("job_description", job.description().to_string());
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::{prompt_of, scripted};
    use crate::models::{Action, STATUS_APPLIED, STATUS_INTERVIEW_SCHEDULED};

    fn store() -> ContextStore {
        let mut store = ContextStore::new();
        store.set_resume("Jane Doe. Rust, Postgres, Kubernetes.");
        let mut fields = Fields::new();
        fields.insert("company".into(), "Globex".into());
        fields.insert("position".into(), "Platform Engineer".into());
        fields.insert("description".into(), "Run our Kubernetes fleet.".into());
        fields.insert("status".into(), STATUS_APPLIED.into());
        store.add_application("globex", fields).unwrap();
        store
    }

    const ANALYSIS: &str = "1. Key requirements of the job\n- Kubernetes\n\
        2. Skills that match between the job and resume\n- Kubernetes\n\
        3. Skills or experiences missing from the resume\n- Terraform\n\
        4. Suggestions for tailoring the resume to this job\n- Lead with fleet work\n- Add Terraform side project";

    #[test]
    fn test_analyze_job_description() {
        let (mut assistant, calls) = scripted(&[ANALYSIS]);
        let analysis = analyze_job_description(&mut assistant, &store(), "globex").unwrap();
        assert_eq!(analysis.len(), 4);
        let prompt = prompt_of(&calls, 0);
        assert!(prompt.contains("Run our Kubernetes fleet."));
        assert!(prompt.contains("Jane Doe"));
    }

    #[test]
    fn test_suggest_application_improvements() {
        let (mut assistant, _calls) = scripted(&[ANALYSIS]);
        let suggestions =
            suggest_application_improvements(&mut assistant, &store(), "globex").unwrap();
        assert_eq!(suggestions, vec!["- Lead with fleet work", "- Add Terraform side project"]);
    }

    #[test]
    fn test_suggest_application_improvements_without_section() {
        let (mut assistant, _calls) = scripted(&["1. Key requirements of the job\n- Go"]);
        let suggestions =
            suggest_application_improvements(&mut assistant, &store(), "globex").unwrap();
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_update_application_status() {
        let (mut assistant, calls) = scripted(&["Congrats on the interview!"]);
        let mut store = store();

        let reply = update_application_status(
            &mut assistant,
            &mut store,
            "globex",
            STATUS_INTERVIEW_SCHEDULED,
        )
        .unwrap();

        assert_eq!(reply, "Congrats on the interview!");
        assert_eq!(
            store.get_application("globex").unwrap().status(),
            STATUS_INTERVIEW_SCHEDULED
        );
        assert_eq!(store.history().last().unwrap().action, Action::Update);
        assert!(prompt_of(&calls, 0).contains(
            "Platform Engineer position at Globex has been updated from Applied to Interview Scheduled"
        ));
    }

    #[test]
    fn test_update_status_unknown_job_touches_nothing() {
        let (mut assistant, calls) = scripted(&["unused"]);
        let mut store = store();
        let history_len = store.history().len();

        assert!(update_application_status(&mut assistant, &mut store, "initech", "Applied").is_err());
        assert_eq!(store.history().len(), history_len);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_application_strategy() {
        let (mut assistant, calls) = scripted(&["Apply early."]);
        let strategy = generate_application_strategy(&mut assistant, &store(), "globex").unwrap();
        assert_eq!(strategy, "Apply early.");
        assert!(prompt_of(&calls, 0).contains("Position: Platform Engineer\nCompany: Globex"));
    }

    #[test]
    fn test_interview_questions_from_json() {
        let reply = r#"```json
[
  {"question": "Describe an outage you handled.", "suggested_answer": "Use STAR."},
  {"question": "Why Globex?", "answer": "Scale."}
]
```"#;
        let (mut assistant, _calls) = scripted(&[reply]);
        let questions = simulate_interview_questions(&mut assistant, &store(), "globex").unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].suggested_answer, "Scale.");
    }

    #[test]
    fn test_interview_questions_malformed() {
        let (mut assistant, _calls) = scripted(&["1. Tell me about yourself"]);
        let questions = simulate_interview_questions(&mut assistant, &store(), "globex").unwrap();
        assert!(questions.is_empty());
    }

    #[test]
    fn test_company_culture_is_stored() {
        let reply = r#"{"Work environment": "Hybrid", "Company values": ["Candor", "Speed"]}"#;
        let (mut assistant, _calls) = scripted(&[reply]);
        let mut store = store();

        let culture = analyze_company_culture(&mut assistant, &mut store, "globex").unwrap();
        assert_eq!(culture["Work environment"], "Hybrid");

        let notes = store.get_application("globex").unwrap().get("culture_notes").unwrap();
        assert!(notes.contains("Candor"));
    }

    #[test]
    fn test_company_culture_garbage_not_stored() {
        let (mut assistant, _calls) = scripted(&["They seem nice."]);
        let mut store = store();
        let culture = analyze_company_culture(&mut assistant, &mut store, "globex").unwrap();
        assert!(culture.is_empty());
        assert!(store.get_application("globex").unwrap().get("culture_notes").is_none());
    }

    #[test]
    fn test_networking_strategies() {
        let (mut assistant, _calls) =
            scripted(&["- Find Globex engineers on LinkedIn\n\n- Attend KubeCon meetups\n"]);
        let strategies = suggest_networking_strategies(&mut assistant, &store(), "globex").unwrap();
        assert_eq!(strategies.len(), 2);
    }
}
