//! Content Generation Service
//!
//! This module defines the seam between the classroom engine and whatever
//! produces its script: teaching slides, the scripted conversation, replies
//! to the observer, and the final evaluation. It also provides the call-site
//! helpers that swap in deterministic fallbacks whenever generation fails,
//! so the engine always has something to present.

use crate::{
    evaluation::Evaluation,
    fallback,
    persona::Roster,
    subject,
    turn::{ScriptedTurn, Slide, TranscriptEntry, TurnKind, render_lines},
};
use anyhow::{Context, Result, anyhow};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the class is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRequest {
    pub topic: String,
    pub subject: String,
}

impl LessonRequest {
    pub fn new(topic: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            subject: subject.into(),
        }
    }
}

/// Defines the contract for any service that can script a class.
///
/// Implementations may fail freely; callers go through the `*_or_fallback`
/// helpers below, which never do.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Generates the ordered teaching slides for the lesson.
    async fn generate_slides(&self, lesson: &LessonRequest, roster: &Roster) -> Result<Vec<Slide>>;

    /// Generates the post-lesson conversation in one bulk call.
    async fn generate_conversation(
        &self,
        lesson: &LessonRequest,
        roster: &Roster,
        teaching_text: &str,
        history: &[Arc<TranscriptEntry>],
    ) -> Result<Vec<ScriptedTurn>>;

    /// Generates a short reaction sequence to something the observer said.
    async fn generate_observer_reply(
        &self,
        lesson: &LessonRequest,
        roster: &Roster,
        observer_name: &str,
        observer_text: &str,
        recent: &[Arc<TranscriptEntry>],
    ) -> Result<Vec<ScriptedTurn>>;

    /// Scores the teacher and every student from the full transcript.
    async fn generate_evaluation(
        &self,
        lesson: &LessonRequest,
        roster: &Roster,
        transcript: &[Arc<TranscriptEntry>],
    ) -> Result<Evaluation>;

    /// Classifies free-form input into one of the school subjects.
    async fn detect_subject(&self, input: &str) -> Result<String>;
}

// --- Call-site fallbacks ---

pub async fn slides_or_fallback(
    provider: &dyn ContentProvider,
    lesson: &LessonRequest,
    roster: &Roster,
) -> Vec<Slide> {
    match provider.generate_slides(lesson, roster).await {
        Ok(slides) => {
            let total = slides.len();
            let slides: Vec<Slide> = slides
                .into_iter()
                .filter(|s| !s.content.trim().is_empty())
                .collect();
            if slides.len() < total {
                debug!(dropped = total - slides.len(), "Dropped blank slides");
            }
            if slides.is_empty() {
                warn!(topic = %lesson.topic, "Slide generation returned no usable slides; using fallback");
                return fallback::slides();
            }
            slides
        }
        Err(e) => {
            warn!(topic = %lesson.topic, error = ?e, "Slide generation failed; using fallback");
            fallback::slides()
        }
    }
}

pub async fn conversation_or_fallback(
    provider: &dyn ContentProvider,
    lesson: &LessonRequest,
    roster: &Roster,
    teaching_text: &str,
    history: &[Arc<TranscriptEntry>],
) -> Vec<ScriptedTurn> {
    match provider
        .generate_conversation(lesson, roster, teaching_text, history)
        .await
    {
        Ok(turns) if !turns.is_empty() => turns,
        Ok(_) => {
            warn!(topic = %lesson.topic, "Conversation generation returned no turns; using fallback");
            fallback::conversation()
        }
        Err(e) => {
            warn!(topic = %lesson.topic, error = ?e, "Conversation generation failed; using fallback");
            fallback::conversation()
        }
    }
}

pub async fn observer_reply_or_fallback(
    provider: &dyn ContentProvider,
    lesson: &LessonRequest,
    roster: &Roster,
    observer_name: &str,
    observer_text: &str,
    recent: &[Arc<TranscriptEntry>],
) -> Vec<ScriptedTurn> {
    match provider
        .generate_observer_reply(lesson, roster, observer_name, observer_text, recent)
        .await
    {
        Ok(turns) if !turns.is_empty() => turns,
        Ok(_) => {
            warn!(observer = %observer_name, "Observer reply was empty; using fallback");
            fallback::observer_reply(observer_name)
        }
        Err(e) => {
            warn!(observer = %observer_name, error = ?e, "Observer reply failed; using fallback");
            fallback::observer_reply(observer_name)
        }
    }
}

pub async fn evaluation_or_fallback(
    provider: &dyn ContentProvider,
    lesson: &LessonRequest,
    roster: &Roster,
    transcript: &[Arc<TranscriptEntry>],
) -> Evaluation {
    match provider.generate_evaluation(lesson, roster, transcript).await {
        Ok(evaluation) => evaluation.normalized(),
        Err(e) => {
            warn!(topic = %lesson.topic, error = ?e, "Evaluation failed; using default scores");
            fallback::evaluation()
        }
    }
}

// --- Parsing helpers ---

/// Removes markdown code fences (```` ``` ```` and ```` ```json ````) from a reply.
pub fn strip_code_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(idx) = rest.find("```") {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 3..];
        if rest.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
            rest = &rest[4..];
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(&cleaned).with_context(|| format!("Malformed JSON reply: {cleaned}"))
}

/// Parses Turn-shaped records, dropping turns by speakers outside the roster.
pub fn parse_turns(raw: &str, roster: &Roster) -> Result<Vec<ScriptedTurn>> {
    let turns: Vec<ScriptedTurn> = parse_json(raw)?;
    Ok(turns
        .into_iter()
        .filter_map(|mut turn| {
            if !roster.contains(&turn.speaker_id) {
                warn!(speaker = %turn.speaker_id, "Dropping turn from unknown speaker");
                return None;
            }
            if turn.text.trim().is_empty() {
                return None;
            }
            if turn.speaker_name.trim().is_empty() {
                turn.speaker_name = roster.display_name(&turn.speaker_id);
            }
            Some(turn)
        })
        .collect())
}

fn schema_of<T: JsonSchema>() -> String {
    serde_json::to_string_pretty(&schemars::schema_for!(T)).unwrap_or_default()
}

// --- LLM-backed provider ---

/// Every template `LLMContentProvider` renders.
pub const PROMPT_KEYS: [&str; 5] = [
    "teaching_slides",
    "conversation",
    "observer_reply",
    "evaluation",
    "detect_subject",
];

/// An implementation of `ContentProvider` that uses an OpenAI-compatible API.
pub struct LLMContentProvider {
    client: Client<OpenAIConfig>,
    model: String,
    prompts: HashMap<String, String>,
}

impl LLMContentProvider {
    /// Creates a new LLM-based content provider.
    ///
    /// # Arguments
    ///
    /// * `config` - OpenAI API configuration (API key, base URL, etc.).
    /// * `model` - Model identifier to use for generation (e.g., "gpt-4o").
    /// * `prompts` - Template strings keyed by `"teaching_slides"`,
    ///   `"conversation"`, `"observer_reply"`, `"evaluation"` and
    ///   `"detect_subject"`.
    pub fn new(config: OpenAIConfig, model: String, prompts: HashMap<String, String>) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            prompts,
        }
    }

    fn render(&self, key: &str, vars: &[(&str, &str)]) -> Result<String> {
        let template = self
            .prompts
            .get(key)
            .with_context(|| format!("Missing prompt template: '{key}'"))?;
        Ok(vars.iter().fold(template.clone(), |acc, (name, value)| {
            acc.replace(&format!("{{{name}}}"), value)
        }))
    }

    async fn complete(&self, system: String, user: String) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;

        response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .as_ref()
            .map(|c| c.trim().to_string())
            .context("No content in LLM response")
    }
}

#[async_trait]
impl ContentProvider for LLMContentProvider {
    async fn generate_slides(&self, lesson: &LessonRequest, roster: &Roster) -> Result<Vec<Slide>> {
        let system = self.render(
            "teaching_slides",
            &[
                ("topic", &lesson.topic),
                ("subject", &lesson.subject),
                ("teacher", &roster.teacher_name()),
                ("schema", &schema_of::<Vec<Slide>>()),
            ],
        )?;
        let reply = self
            .complete(system, format!("Create teaching slides for the topic: {}", lesson.topic))
            .await?;
        let slides: Vec<Slide> = parse_json(&reply)?;
        info!(count = slides.len(), "Teaching slides generated");
        Ok(slides)
    }

    async fn generate_conversation(
        &self,
        lesson: &LessonRequest,
        roster: &Roster,
        teaching_text: &str,
        history: &[Arc<TranscriptEntry>],
    ) -> Result<Vec<ScriptedTurn>> {
        let system = self.render(
            "conversation",
            &[
                ("topic", &lesson.topic),
                ("subject", &lesson.subject),
                ("roster", &roster.prompt_summary()),
                ("schema", &schema_of::<Vec<ScriptedTurn>>()),
            ],
        )?;
        let history: Vec<&TranscriptEntry> = history.iter().map(|e| e.as_ref()).collect();
        let history_json = serde_json::to_string(&history)?;
        let reply = self
            .complete(
                system,
                format!(
                    "The lesson content was: {teaching_text}. Previous conversation: {history_json}. Now generate the classroom conversation."
                ),
            )
            .await?;
        let turns = parse_turns(&reply, roster)?;
        if turns.is_empty() {
            return Err(anyhow!("Empty conversation array"));
        }
        info!(count = turns.len(), "Conversation generated");
        Ok(turns)
    }

    async fn generate_observer_reply(
        &self,
        lesson: &LessonRequest,
        roster: &Roster,
        observer_name: &str,
        observer_text: &str,
        recent: &[Arc<TranscriptEntry>],
    ) -> Result<Vec<ScriptedTurn>> {
        let system = self.render(
            "observer_reply",
            &[
                ("topic", &lesson.topic),
                ("subject", &lesson.subject),
                ("roster", &roster.prompt_summary()),
                ("observer_name", observer_name),
                ("observer_message", observer_text),
                ("schema", &schema_of::<Vec<ScriptedTurn>>()),
            ],
        )?;
        let context = render_lines(recent.iter().map(|e| e.as_ref()));
        let reply = self
            .complete(
                system,
                format!(
                    "Previous conversation context:\n{context}\n\n{observer_name} says: {observer_text}"
                ),
            )
            .await?;
        parse_turns(&reply, roster)
    }

    async fn generate_evaluation(
        &self,
        lesson: &LessonRequest,
        roster: &Roster,
        transcript: &[Arc<TranscriptEntry>],
    ) -> Result<Evaluation> {
        let system = self.render(
            "evaluation",
            &[
                ("topic", &lesson.topic),
                ("subject", &lesson.subject),
                ("roster", &roster.prompt_summary()),
                ("schema", &schema_of::<Evaluation>()),
            ],
        )?;
        let lines = render_lines(transcript.iter().map(|e| e.as_ref()));
        let reply = self
            .complete(
                system,
                format!("Here is the full conversation transcript:\n{lines}"),
            )
            .await?;
        parse_json(&reply)
    }

    async fn detect_subject(&self, input: &str) -> Result<String> {
        let names = subject::SUBJECTS
            .iter()
            .map(|s| s.name)
            .collect::<Vec<_>>()
            .join(", ");
        let system = self.render("detect_subject", &[("subjects", &names)])?;
        let reply = self.complete(system, input.to_string()).await?;
        Ok(reply.trim().trim_end_matches('.').to_string())
    }
}

/// An offline `ContentProvider` for development and integration testing.
///
/// Produces a short, deterministic class for any topic without network
/// access.
pub struct ScriptedContentProvider;

#[async_trait]
impl ContentProvider for ScriptedContentProvider {
    async fn generate_slides(&self, lesson: &LessonRequest, _roster: &Roster) -> Result<Vec<Slide>> {
        Ok(vec![Slide {
            concept: title_case(&lesson.topic),
            content: format!(
                "Think of {} like a tiny kitchen: simple ingredients go in and something useful comes out.",
                lesson.topic
            ),
        }])
    }

    async fn generate_conversation(
        &self,
        lesson: &LessonRequest,
        _roster: &Roster,
        _teaching_text: &str,
        _history: &[Arc<TranscriptEntry>],
    ) -> Result<Vec<ScriptedTurn>> {
        let topic = &lesson.topic;
        Ok(vec![
            ScriptedTurn::new("ali", "Ali", format!("Obviously {topic} is just inputs and outputs!"), TurnKind::Answer),
            ScriptedTurn::new("teacher", "Mr. Nova", "Close, Ali. Kirtan, does that make sense?", TurnKind::Question),
            ScriptedTurn::new("kirtan", "Kirtan", "Sorry, what means 'output' here?", TurnKind::Question),
            ScriptedTurn::new("tayyab", "Tayyab", "Output is what I do after lunch, haha.", TurnKind::Joke),
            ScriptedTurn::new("rana", "Rana", format!("I worry we take {topic} for granted."), TurnKind::Comment),
            ScriptedTurn::new("teacher", "Mr. Nova", format!("Wonderful thoughts. That's {topic} for today, class dismissed!"), TurnKind::Closing),
        ])
    }

    async fn generate_observer_reply(
        &self,
        _lesson: &LessonRequest,
        _roster: &Roster,
        observer_name: &str,
        _observer_text: &str,
        _recent: &[Arc<TranscriptEntry>],
    ) -> Result<Vec<ScriptedTurn>> {
        Ok(vec![
            ScriptedTurn::new(
                "teacher",
                "Mr. Nova",
                format!("Thank you, {observer_name}, that's a thoughtful question."),
                TurnKind::Answer,
            ),
            ScriptedTurn::new("kirtan", "Kirtan", "I wanted to ask this also!", TurnKind::Comment),
        ])
    }

    async fn generate_evaluation(
        &self,
        _lesson: &LessonRequest,
        _roster: &Roster,
        _transcript: &[Arc<TranscriptEntry>],
    ) -> Result<Evaluation> {
        Ok(fallback::evaluation())
    }

    async fn detect_subject(&self, input: &str) -> Result<String> {
        Ok(subject::detect_by_keywords(input)
            .map(|s| s.name.to_string())
            .unwrap_or_else(|| subject::GENERAL.to_string()))
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson() -> LessonRequest {
        LessonRequest::new("photosynthesis", "Biology")
    }

    #[test]
    fn test_strip_code_fences_handles_tagged_and_bare_fences() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```JSON [2] ```"), "[2]");
        assert_eq!(strip_code_fences("  [3]  "), "[3]");
        assert_eq!(strip_code_fences("```é"), "é");
    }

    #[test]
    fn test_parse_turns_drops_unknown_speakers_and_fills_names() {
        let raw = r#"```json
        [
          {"speakerId": "teacher", "speakerName": "", "text": "Hello", "type": "teaching"},
          {"speakerId": "principal", "speakerName": "Boss", "text": "Hi", "type": "comment"},
          {"speakerId": "rana", "speakerName": "Rana", "text": "  ", "type": "comment"}
        ]
        ```"#;
        let turns = parse_turns(raw, &Roster::default()).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].speaker_name, "Mr. Nova");
    }

    #[test]
    fn test_parse_turns_rejects_non_json() {
        assert!(parse_turns("Sure! Here is a conversation.", &Roster::default()).is_err());
    }

    #[tokio::test]
    async fn test_conversation_falls_back_to_fixed_script_on_error() {
        let mut provider = MockContentProvider::new();
        provider
            .expect_generate_conversation()
            .returning(|_, _, _, _| Err(anyhow!("503 Service Unavailable")));
        let turns =
            conversation_or_fallback(&provider, &lesson(), &Roster::default(), "", &[]).await;
        assert_eq!(turns, fallback::conversation());
    }

    #[tokio::test]
    async fn test_empty_slide_list_is_treated_as_failure() {
        let mut provider = MockContentProvider::new();
        provider.expect_generate_slides().returning(|_, _| Ok(vec![]));
        let slides = slides_or_fallback(&provider, &lesson(), &Roster::default()).await;
        assert_eq!(slides, fallback::slides());
    }

    #[tokio::test]
    async fn test_blank_slides_are_dropped() {
        let mut provider = MockContentProvider::new();
        provider.expect_generate_slides().returning(|_, _| {
            Ok(vec![
                Slide { concept: "Empty".into(), content: "  ".into() },
                Slide { concept: "Light".into(), content: "Leaves catch light.".into() },
            ])
        });
        let slides = slides_or_fallback(&provider, &lesson(), &Roster::default()).await;
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].concept, "Light");

        let mut blank = MockContentProvider::new();
        blank
            .expect_generate_slides()
            .returning(|_, _| Ok(vec![Slide { concept: "Empty".into(), content: String::new() }]));
        let slides = slides_or_fallback(&blank, &lesson(), &Roster::default()).await;
        assert_eq!(slides, fallback::slides());
    }

    #[tokio::test]
    async fn test_observer_fallback_names_the_observer() {
        let mut provider = MockContentProvider::new();
        provider
            .expect_generate_observer_reply()
            .returning(|_, _, _, _, _| Err(anyhow!("timeout")));
        let turns = observer_reply_or_fallback(
            &provider,
            &lesson(),
            &Roster::default(),
            "Sam",
            "what is chlorophyll?",
            &[],
        )
        .await;
        assert_eq!(turns.len(), 2);
        assert!(turns[0].text.contains("Sam"));
    }

    #[tokio::test]
    async fn test_evaluation_falls_back_to_default_scores() {
        let mut provider = MockContentProvider::new();
        provider
            .expect_generate_evaluation()
            .returning(|_, _, _| Err(anyhow!("bad json")));
        let eval = evaluation_or_fallback(&provider, &lesson(), &Roster::default(), &[]).await;
        assert_eq!(eval, fallback::evaluation());
    }

    #[tokio::test]
    async fn test_offline_provider_scripts_a_full_class() {
        let provider = ScriptedContentProvider;
        let slides = provider
            .generate_slides(&lesson(), &Roster::default())
            .await
            .unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].concept, "Photosynthesis");

        let turns = provider
            .generate_conversation(&lesson(), &Roster::default(), "", &[])
            .await
            .unwrap();
        assert_eq!(turns.last().unwrap().kind, TurnKind::Closing);
        assert!(turns.iter().any(|t| t.kind == TurnKind::Joke));
    }
}
