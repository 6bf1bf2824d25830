//! Prompt templates. Placeholders are `{name}` and are filled by [`render`].

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-z_]+)\}").unwrap_or_else(|e| panic!("placeholder pattern: {e}"))
});

/// Fills `{name}` placeholders from `context` in a single pass. Unknown
/// placeholders stay as written, and substituted text is never rescanned.
pub fn render(template: &str, context: &BTreeMap<&'static str, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match context.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

// --- Resume ---

pub const RESUME_ANALYSIS: &str = "\
Analyze the following resume and provide insights in these categories:
1. Overall Impression
2. Strengths
3. Areas for Improvement
4. Key Skills Highlighted
5. Formatting and Structure

Resume:
{resume_content}

Provide your analysis in a clear, concise manner for each category.";

pub const RESUME_IMPROVEMENT: &str = "\
Based on the following resume, suggest improvements in these areas:
1. Content Enhancements
2. Skills to Emphasize
3. Achievements to Highlight
4. Formatting Suggestions
5. Industry-Specific Recommendations

Resume:
{resume_content}

Provide specific, actionable suggestions for each area.";

pub const COVER_LETTER: &str = "\
Generate a cover letter for the following job opportunity using the provided resume:

Job Details:
{job_details}

Resume:
{resume_content}

Create a professional cover letter that highlights the candidate's relevant skills and experiences for this specific job opportunity.";

pub const RESUME_CHAT: &str = "\
You are an AI assistant specializing in resume and job application advice. You have access to the user's current resume:

{resume_content}

Provide helpful, professional advice based on the user's questions or requests. If you need more information, ask clarifying questions.

User: {user_input}
AI Assistant:";

// --- Job opportunities ---

pub const JOB_DESCRIPTION_ANALYSIS: &str = "\
Analyze the following job description and compare it to the given resume:

Job Description:
{job_description}

Resume:
{resume}

Please provide:
1. Key requirements of the job
2. Skills that match between the job and resume
3. Skills or experiences missing from the resume
4. Suggestions for tailoring the resume to this job

Your analysis:";

/// Section title `suggest_application_improvements` pulls from.
pub const TAILORING_SECTION: &str = "Suggestions for tailoring the resume to this job";

pub const STATUS_CHANGE: &str = "\
The application status for the {position} position at {company} has been updated from {old_status} to {new_status}.

Please provide:
1. A brief message about this status change
2. Suggested next steps
3. Any potential challenges to prepare for
4. Questions to consider asking in the next stage

Your response:";

pub const APPLICATION_STRATEGY: &str = "\
Generate an application strategy for the following job:

Position: {position}
Company: {company}
Job Description: {job_description}

Candidate's Resume:
{resume}

Please provide a comprehensive application strategy, including:
1. Key points to emphasize in the application
2. Suggested changes or additions to the resume
3. Cover letter writing tips
4. Preparation for potential interview questions
5. Research to conduct about the company
6. Any additional steps to stand out as a candidate

Your strategy:";

pub const INTERVIEW_QUESTIONS: &str = "\
Generate a set of potential interview questions and suggested answers for the following job:

Position: {position}
Company: {company}
Job Description: {job_description}

Candidate's Resume:
{resume}

Please provide 5 likely interview questions and suggested answers. Format your response as a JSON list of objects, each with 'question' and 'suggested_answer' keys.

Interview questions and answers:";

pub const COMPANY_CULTURE: &str = "\
Analyze the company culture for {company} based on the following job description:

{job_description}

Please provide insights on:
1. Work environment
2. Company values
3. Team dynamics
4. Growth opportunities
5. Work-life balance

Format your response as a JSON object with these categories as keys.

Company culture analysis:";

pub const NETWORKING: &str = "\
Suggest networking strategies for the following job application:

Position: {position}
Company: {company}

Please provide a list of networking strategies that could help with this job application. Consider both online and offline networking opportunities.

Networking strategies:";

// --- Captain's overview ---

pub const JOB_SEARCH_OVERVIEW: &str = "\
Generate a job search overview based on the following information:

Job Applications:
{applications}

Resume:
{resume}

Previous conversation context:
{chat_history}

Please provide:
1. Summary of active applications
2. Overall application success rate
3. Suggestions for improvement
4. Next steps in the job search

Your overview:";

pub const WEEKEND_PROJECT: &str = "\
Suggest a weekend project based on the user's job applications and resume:

Job Applications:
{applications}

Resume:
{resume}

Please provide a weekend project suggestion that will enhance the user's skills and job prospects. Include:
1. Project title
2. Skills developed
3. Relevance to job search
4. Brief project description
5. Expected outcome
6. How to showcase in applications/interviews

Your suggestion:";

pub const FIRST_DAY: &str = "\
Simulate the first day at a new job based on the following information:

Job Description:
{job_description}

Company Information:
{company_info}

Please provide a simulation of the first day, including:
1. Arrival and onboarding process
2. Key people to meet
3. Main tasks and responsibilities
4. Potential challenges and how to address them
5. Tips for making a great first impression

Your simulation:";

pub const WEEKLY_GOALS: &str = "\
Based on the current job search status, generate a list of weekly goals:

Job Applications:
{applications}

Resume:
{resume}

Please provide a list of 5 specific, actionable weekly goals to improve the job search process.

Weekly goals:";

pub const MOTIVATION: &str = "\
Provide a motivational message based on the following job search status:

Number of Applications: {application_count}
Application Success Rate: {success_rate}
Status Breakdown: {status_breakdown}

Please give an encouraging and motivational message to keep the job seeker inspired and focused on their goals.

Motivational message:";

pub const SKILL_IMPROVEMENT: &str = "\
Based on the current job applications and resume, suggest skills to improve:

Job Applications:
{applications}

Resume:
{resume}

Please provide suggestions for skill improvement in the following categories:
1. Technical Skills
2. Soft Skills
3. Industry Knowledge

For each category, list 3-5 specific skills or areas of knowledge to focus on.

Skill improvement suggestions:";

pub const CAREER_PLAN: &str = "\
Based on the current resume and job applications, generate a long-term career plan:

Resume:
{resume}

Job Applications:
{applications}

Please provide a 5-year career plan, including:
1. Career goals
2. Skill development roadmap
3. Potential job positions to target
4. Industry trends to watch
5. Networking and personal branding strategies

Long-term career plan:";

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_render_fills_known_placeholders() {
        let out = render(
            STATUS_CHANGE,
            &ctx(&[
                ("position", "SRE"),
                ("company", "Acme"),
                ("old_status", "Applied"),
                ("new_status", "Rejected"),
            ]),
        );
        assert!(out.starts_with(
            "The application status for the SRE position at Acme has been updated from Applied to Rejected."
        ));
        assert!(!out.contains('{'));
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("Hi {name}, {other}", &ctx(&[("name", "Jo")])), "Hi Jo, {other}");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let out = render("{a} {b}", &ctx(&[("a", "{b}"), ("b", "x")]));
        assert_eq!(out, "{b} x");
    }

    #[test]
    fn test_render_ignores_json_braces() {
        let out = render("{\"k\": 1} {resume}", &ctx(&[("resume", "r")]));
        assert_eq!(out, "{\"k\": 1} r");
    }

    #[test]
    fn test_every_template_has_placeholders() {
        let templates = [
            RESUME_ANALYSIS,
            RESUME_IMPROVEMENT,
            COVER_LETTER,
            RESUME_CHAT,
            JOB_DESCRIPTION_ANALYSIS,
            STATUS_CHANGE,
            APPLICATION_STRATEGY,
            INTERVIEW_QUESTIONS,
            COMPANY_CULTURE,
            NETWORKING,
            JOB_SEARCH_OVERVIEW,
            WEEKEND_PROJECT,
            FIRST_DAY,
            WEEKLY_GOALS,
            MOTIVATION,
            SKILL_IMPROVEMENT,
            CAREER_PLAN,
        ];
        for template in templates {
            assert!(PLACEHOLDER.is_match(template));
        }
    }
}
