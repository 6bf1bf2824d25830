use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use tracing::{debug, info};

use crate::prompts;

pub const SYSTEM_MESSAGE: &str = "You are an AI assistant for the CAPTAIN job application system.";
pub const TEMPERATURE: f32 = 0.7;
/// Messages kept in conversation memory (five exchanges).
pub const MEMORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

// --- Provider trait ---

pub trait AIProvider {
    fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub enum ProviderKind {
    Anthropic,
    OpenAI,
    ClaudeCode,
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub model_id: String,
    pub short_name: String,
}

pub fn resolve_model(name: &str) -> Result<ModelSpec> {
    let (provider, model_id, short_name) = match name {
        // OpenAI (requires OPENAI_API_KEY)
        "gpt-4o-mini" | "mini" => (ProviderKind::OpenAI, "gpt-4o-mini", "gpt-4o-mini"),
        "gpt-4o" => (ProviderKind::OpenAI, "gpt-4o", "gpt-4o"),
        "gpt-3.5-turbo" | "gpt35" => (ProviderKind::OpenAI, "gpt-3.5-turbo", "gpt-3.5-turbo"),
        // Direct Anthropic API (requires ANTHROPIC_API_KEY)
        "api-sonnet" => (ProviderKind::Anthropic, "claude-sonnet-4-5-20250929", "api-sonnet"),
        "api-haiku" => (ProviderKind::Anthropic, "claude-haiku-4-5-20251001", "api-haiku"),
        // Local `claude` CLI, no API key needed
        "claude-sonnet" | "sonnet" => (
            ProviderKind::ClaudeCode,
            "claude-sonnet-4-5-20250929",
            "claude-sonnet",
        ),
        "claude-haiku" | "haiku" => (
            ProviderKind::ClaudeCode,
            "claude-haiku-4-5-20251001",
            "claude-haiku",
        ),
        _ => {
            return Err(anyhow!(
                "Unknown model '{}'. Available: gpt-4o-mini (default), gpt-4o, gpt-3.5-turbo, \
                 api-sonnet, api-haiku, claude-sonnet, claude-haiku",
                name
            ));
        }
    };

    Ok(ModelSpec {
        provider,
        model_id: model_id.to_string(),
        short_name: short_name.to_string(),
    })
}

pub fn create_provider(spec: &ModelSpec) -> Result<Box<dyn AIProvider>> {
    match spec.provider {
        ProviderKind::ClaudeCode => {
            let provider = ClaudeCodeProvider::new(spec.model_id.clone())?;
            Ok(Box::new(provider))
        }
        ProviderKind::Anthropic => {
            let provider = AnthropicProvider::new(spec.model_id.clone())?;
            Ok(Box::new(provider))
        }
        ProviderKind::OpenAI => {
            let provider = OpenAIProvider::new(spec.model_id.clone())?;
            Ok(Box::new(provider))
        }
    }
}

// --- Anthropic provider ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<&'a ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn new(model_id: String) -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set. Set it with: export ANTHROPIC_API_KEY=your-key-here")?;
        let client = reqwest::blocking::Client::new();
        Ok(Self { api_key, model_id, client })
    }
}

impl AIProvider for AnthropicProvider {
    fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String> {
        // The messages API takes the system prompt out of band
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str());
        let request = AnthropicRequest {
            model: &self.model_id,
            max_tokens,
            temperature: TEMPERATURE,
            system,
            messages: messages.iter().filter(|m| m.role != Role::System).collect(),
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Anthropic API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: AnthropicResponse = response
            .json()
            .context("Failed to parse Anthropic API response")?;

        api_response
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| anyhow!("No content in Anthropic API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Claude Code provider (shells out to `claude` CLI) ---

#[derive(Debug)]
pub struct ClaudeCodeProvider {
    model_id: String,
}

impl ClaudeCodeProvider {
    pub fn new(model_id: String) -> Result<Self> {
        std::process::Command::new("claude")
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .context("'claude' CLI not found. Install it or pick an API-backed model instead.")?;
        Ok(Self { model_id })
    }
}

/// Flattens a conversation into one prompt for single-shot backends.
fn transcript(messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let label = match message.role {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        out.push_str(&format!("{}: {}\n\n", label, message.content));
    }
    out.push_str("Assistant:");
    out
}

impl AIProvider for ClaudeCodeProvider {
    fn complete(&self, messages: &[ChatMessage], _max_tokens: u32) -> Result<String> {
        let output = std::process::Command::new("claude")
            .arg("-p")
            .arg(transcript(messages))
            .arg("--model")
            .arg(&self.model_id)
            .output()
            .context("Failed to run 'claude' CLI")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("claude CLI failed: {}", stderr));
        }

        let response = String::from_utf8(output.stdout)
            .context("Invalid UTF-8 in claude CLI output")?;

        if response.trim().is_empty() {
            return Err(anyhow!("Empty response from claude CLI"));
        }

        Ok(response)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- OpenAI provider ---

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug)]
pub struct OpenAIProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl OpenAIProvider {
    pub fn new(model_id: String) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set. Set it with: export OPENAI_API_KEY=your-key-here")?;
        let client = reqwest::blocking::Client::new();
        Ok(Self { api_key, model_id, client })
    }
}

impl AIProvider for OpenAIProvider {
    fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String> {
        let request = OpenAIRequest {
            model: &self.model_id,
            max_tokens,
            temperature: TEMPERATURE,
            messages,
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "OpenAI API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: OpenAIResponse = response
            .json()
            .context("Failed to parse OpenAI API response")?;

        api_response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow!("No choices in OpenAI API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Assistant: system prompt + conversation memory over a provider ---

pub type PromptContext = BTreeMap<&'static str, String>;

/// Wraps a provider with the fixed system message and a running memory of
/// recent exchanges, so later prompts (and `chat`) can see earlier ones.
///
/// Memory holds at most [`MEMORY_LIMIT`] messages. Templated requests are
/// remembered by the first line of the rendered prompt, not the whole text.
pub struct Assistant {
    provider: Box<dyn AIProvider>,
    system: ChatMessage,
    memory: Vec<ChatMessage>,
    max_tokens: u32,
}

impl Assistant {
    pub fn new(provider: Box<dyn AIProvider>, max_tokens: u32) -> Self {
        Self {
            provider,
            system: ChatMessage::system(SYSTEM_MESSAGE),
            memory: Vec::new(),
            max_tokens,
        }
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Renders `template` with `context` and sends it as a one-off request.
    /// The exchange is still remembered, under the prompt's first line.
    pub fn generate_response(&mut self, template: &str, context: &PromptContext) -> Result<String> {
        let prompt = prompts::render(template, context);
        let messages = [self.system.clone(), ChatMessage::user(prompt.clone())];
        debug!(model = self.model_name(), chars = prompt.len(), "sending prompt");
        let response = self.provider.complete(&messages, self.max_tokens)?;
        let note = prompt.lines().next().unwrap_or_default().trim().to_string();
        self.remember(note, &response);
        Ok(response)
    }

    /// Continues the running conversation with `input`.
    pub fn chat(&mut self, input: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(self.memory.len() + 2);
        messages.push(self.system.clone());
        messages.extend(self.memory.iter().cloned());
        messages.push(ChatMessage::user(input));
        info!(model = self.model_name(), turns = self.memory.len() / 2, "chat");
        let response = self.provider.complete(&messages, self.max_tokens)?;
        self.remember(input.to_string(), &response);
        Ok(response)
    }

    pub fn memory(&self) -> &[ChatMessage] {
        &self.memory
    }

    /// Restores a conversation saved from an earlier session.
    pub fn load_memory(&mut self, memory: Vec<ChatMessage>) {
        self.memory = memory;
        self.trim_memory();
    }

    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }

    /// Memory as "Human:/AI:" lines, for prompts that quote the conversation.
    pub fn history_text(&self) -> String {
        self.memory
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                let who = if m.role == Role::User { "Human" } else { "AI" };
                format!("{}: {}", who, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn remember(&mut self, input: String, response: &str) {
        self.memory.push(ChatMessage::user(input));
        self.memory.push(ChatMessage::assistant(response));
        self.trim_memory();
    }

    fn trim_memory(&mut self) {
        let excess = self.memory.len().saturating_sub(MEMORY_LIMIT);
        self.memory.drain(..excess);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_resolve_model_openai() {
        let spec = resolve_model("gpt-4o-mini").unwrap();
        assert_eq!(spec.model_id, "gpt-4o-mini");
        assert!(matches!(spec.provider, ProviderKind::OpenAI));

        let spec = resolve_model("gpt35").unwrap();
        assert_eq!(spec.short_name, "gpt-3.5-turbo");
    }

    #[test]
    fn test_resolve_model_anthropic_and_cli() {
        let spec = resolve_model("api-haiku").unwrap();
        assert!(matches!(spec.provider, ProviderKind::Anthropic));

        let spec = resolve_model("sonnet").unwrap();
        assert_eq!(spec.short_name, "claude-sonnet");
        assert!(matches!(spec.provider, ProviderKind::ClaudeCode));
    }

    #[test]
    fn test_resolve_model_unknown() {
        let err = resolve_model("gpt-2").unwrap_err();
        assert!(err.to_string().contains("gpt-2"));
    }

    #[test]
    fn test_openai_provider_requires_api_key() {
        let original = env::var("OPENAI_API_KEY").ok();
        unsafe { env::remove_var("OPENAI_API_KEY"); }

        let result = OpenAIProvider::new("gpt-4o".to_string());

        if let Some(val) = original {
            unsafe { env::set_var("OPENAI_API_KEY", val); }
        }

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_anthropic_provider_with_api_key() {
        unsafe { env::set_var("ANTHROPIC_API_KEY", "test-key"); }

        let result = AnthropicProvider::new("claude-haiku-4-5-20251001".to_string());
        assert_eq!(result.unwrap().model_name(), "claude-haiku-4-5-20251001");
    }

    #[test]
    fn test_openai_request_shape() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let request = OpenAIRequest {
            model: "gpt-4o-mini",
            max_tokens: 10,
            temperature: TEMPERATURE,
            messages: &messages,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_anthropic_request_moves_system_out_of_messages() {
        let messages = [ChatMessage::system("sys"), ChatMessage::user("hi")];
        let request = AnthropicRequest {
            model: "m",
            max_tokens: 10,
            temperature: TEMPERATURE,
            system: Some("sys"),
            messages: messages.iter().filter(|m| m.role != Role::System).collect(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"], "sys");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_transcript_labels_roles() {
        let text = transcript(&[ChatMessage::system("be nice"), ChatMessage::user("hello")]);
        assert!(text.starts_with("System: be nice"));
        assert!(text.contains("User: hello"));
        assert!(text.ends_with("Assistant:"));
    }

    #[test]
    fn test_generate_response_renders_and_remembers() {
        let (mut assistant, calls) = scripted(&["looks good"]);
        let mut context = PromptContext::new();
        context.insert("resume_content", "Rust dev".to_string());

        let reply = assistant
            .generate_response("Review:\n{resume_content}", &context)
            .unwrap();

        assert_eq!(reply, "looks good");
        let sent = &calls.borrow()[0];
        assert_eq!(sent[0], ChatMessage::system(SYSTEM_MESSAGE));
        assert_eq!(sent[1].content, "Review:\nRust dev");
        assert_eq!(assistant.memory()[0], ChatMessage::user("Review:"));
        assert_eq!(assistant.memory()[1], ChatMessage::assistant("looks good"));
    }

    #[test]
    fn test_memory_keeps_latest_exchanges() {
        let replies: Vec<String> = (0..8).map(|i| format!("reply {}", i)).collect();
        let replies: Vec<&str> = replies.iter().map(String::as_str).collect();
        let (mut assistant, _calls) = scripted(&replies);
        for i in 0..8 {
            assistant.chat(&format!("message {}", i)).unwrap();
        }

        let memory = assistant.memory();
        assert_eq!(memory.len(), MEMORY_LIMIT);
        assert_eq!(memory[0], ChatMessage::user("message 3"));
        assert_eq!(memory[MEMORY_LIMIT - 1], ChatMessage::assistant("reply 7"));
    }

    #[test]
    fn test_load_memory_trims_old_conversation() {
        let (mut assistant, _calls) = scripted(&[]);
        let saved: Vec<ChatMessage> = (0..30).map(|i| ChatMessage::user(i.to_string())).collect();
        assistant.load_memory(saved);
        assert_eq!(assistant.memory().len(), MEMORY_LIMIT);
        assert_eq!(assistant.memory()[0].content, "20");
    }

    #[test]
    fn test_chat_carries_memory() {
        let (mut assistant, calls) = scripted(&["Hi Jane", "You said your name is Jane"]);
        assistant.chat("I'm Jane").unwrap();
        assistant.chat("What's my name?").unwrap();

        let second = &calls.borrow()[1];
        // system, user, assistant, user
        assert_eq!(second.len(), 4);
        assert_eq!(second[2], ChatMessage::assistant("Hi Jane"));
        assert_eq!(
            assistant.history_text(),
            "Human: I'm Jane\nAI: Hi Jane\nHuman: What's my name?\nAI: You said your name is Jane"
        );

        assistant.clear_memory();
        assert!(assistant.memory().is_empty());
    }

    #[test]
    fn test_provider_error_is_not_remembered() {
        let (mut assistant, _calls) = scripted(&[]);
        assert!(assistant.chat("anyone there?").is_err());
        assert!(assistant.memory().is_empty());
    }
}
