use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a participant in the classroom (teacher, a student, or the human observer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SpeakerId(String);

impl SpeakerId {
    pub const TEACHER: &'static str = "teacher";
    pub const OBSERVER: &'static str = "observer";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn teacher() -> Self {
        Self::new(Self::TEACHER)
    }

    pub fn observer() -> Self {
        Self::new(Self::OBSERVER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_teacher(&self) -> bool {
        self.0 == Self::TEACHER
    }
}

impl fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpeakerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
    Observer,
}

/// Static reference data describing one member of the cast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub id: SpeakerId,
    pub name: String,
    pub role: Role,
    pub personality: Option<String>,
    pub traits: Vec<String>,
    pub speaking_style: String,
    pub avatar_color: String,
}

impl Persona {
    fn new(
        id: &str,
        name: &str,
        role: Role,
        personality: Option<&str>,
        traits: &[&str],
        speaking_style: &str,
        avatar_color: &str,
    ) -> Self {
        Self {
            id: SpeakerId::new(id),
            name: name.to_string(),
            role,
            personality: personality.map(str::to_string),
            traits: traits.iter().map(|t| t.to_string()).collect(),
            speaking_style: speaking_style.to_string(),
            avatar_color: avatar_color.to_string(),
        }
    }
}

/// Lookup table resolving a `SpeakerId` to its persona.
///
/// The engine never inspects persona details beyond names and roles; the
/// roster is supplied once at startup and treated as read-only.
#[derive(Debug, Clone)]
pub struct Roster {
    personas: Vec<Persona>,
}

impl Roster {
    pub fn new(personas: Vec<Persona>) -> Self {
        Self { personas }
    }

    pub fn get(&self, id: &SpeakerId) -> Option<&Persona> {
        self.personas.iter().find(|p| &p.id == id)
    }

    pub fn contains(&self, id: &SpeakerId) -> bool {
        self.get(id).is_some()
    }

    /// Display name for a speaker, falling back to the raw id.
    pub fn display_name(&self, id: &SpeakerId) -> String {
        self.get(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn teacher(&self) -> Option<&Persona> {
        self.personas.iter().find(|p| p.role == Role::Teacher)
    }

    pub fn teacher_name(&self) -> String {
        self.teacher()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Teacher".to_string())
    }

    pub fn students(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter().filter(|p| p.role == Role::Student)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }

    /// Renders the cast as a bullet list for prompt templates.
    pub fn prompt_summary(&self) -> String {
        self.personas
            .iter()
            .map(|p| {
                let label = match (&p.role, &p.personality) {
                    (Role::Student, Some(personality)) => format!("{} ({})", p.id, personality),
                    _ => p.id.to_string(),
                };
                format!("- {} [{}]: {}", p.name, label, p.speaking_style)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new(vec![
            Persona::new(
                "ali",
                "Ali",
                Role::Student,
                Some("fast_learner"),
                &["eager", "answers quickly", "sometimes overconfident"],
                "Speaks fast and confidently. Often jumps to conclusions or answers before others.",
                "#EF4444",
            ),
            Persona::new(
                "kirtan",
                "Kirtan",
                Role::Student,
                Some("esl_student"),
                &[
                    "speaks in slightly broken English",
                    "asks for word clarifications",
                    "polite",
                ],
                "Speaks slowly and politely. Frequently asks what a word means.",
                "#F59E0B",
            ),
            Persona::new(
                "tayyab",
                "Tayyab",
                Role::Student,
                Some("distracted"),
                &["makes jokes", "goes off topic", "funny but sometimes relevant"],
                "Answers with humor or slightly off-topic references. Easily side-tracked.",
                "#10B981",
            ),
            Persona::new(
                "rana",
                "Rana",
                Role::Student,
                Some("emotional"),
                &[
                    "sensitive",
                    "takes things personally",
                    "very empathetic",
                    "sometimes overthinks",
                ],
                "Expresses a lot of feelings. Speaks softly and sometimes hesitates.",
                "#8B5CF6",
            ),
            Persona::new(
                "teacher",
                "Mr. Nova",
                Role::Teacher,
                None,
                &["patient", "engaging", "adapts to students", "uses analogies"],
                "Professional but warm. Uses simple analogies. Responds differently to each student type.",
                "#4F46E5",
            ),
        ])
    }
}
