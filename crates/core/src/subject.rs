//! The school subject catalogue and topic-to-subject detection.

use crate::content::ContentProvider;
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use serde::Serialize;
use tracing::{info, warn};

/// Subject used when nothing in the catalogue fits.
pub const GENERAL: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub id: &'static str,
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

pub const SUBJECTS: [Subject; 8] = [
    Subject {
        id: "biology",
        name: "Biology",
        keywords: &["biology", "cell", "dna", "evolution", "plant", "animal"],
    },
    Subject {
        id: "physics",
        name: "Physics",
        keywords: &["physics", "force", "motion", "gravity", "energy", "quantum"],
    },
    Subject {
        id: "chemistry",
        name: "Chemistry",
        keywords: &["chemistry", "atom", "molecule", "reaction", "acid", "element"],
    },
    Subject {
        id: "english",
        name: "English",
        keywords: &["english", "literature", "grammar", "poetry", "essay", "writing"],
    },
    Subject {
        id: "geography",
        name: "Geography",
        keywords: &["geography", "map", "climate", "mountain", "river", "country"],
    },
    Subject {
        id: "history",
        name: "History",
        keywords: &["history", "war", "century", "empire", "revolution", "ancient"],
    },
    Subject {
        id: "mathematics",
        name: "Mathematics",
        keywords: &[
            "mathematics",
            "math",
            "algebra",
            "geometry",
            "calculus",
            "equation",
            "number",
        ],
    },
    Subject {
        id: "computer_science",
        name: "Computer Science",
        keywords: &["computer", "code", "programming", "software", "network", "algorithm"],
    },
];

/// First subject (in catalogue order) with a keyword contained in `input`.
pub fn detect_by_keywords(input: &str) -> Option<&'static Subject> {
    let lower = input.to_lowercase();
    SUBJECTS
        .iter()
        .find(|s| s.keywords.iter().any(|k| lower.contains(k)))
}

/// Maps a free-form subject name (e.g. a model reply) onto the catalogue.
///
/// Exact and containment matches are tried first, ignoring case and
/// whitespace; otherwise the best fuzzy match over subject names wins.
pub fn match_subject_name(name: &str) -> Option<&'static Subject> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    let squashed: String = wanted.split_whitespace().collect();

    let direct = SUBJECTS.iter().find(|s| {
        let candidate = s.name.to_lowercase();
        candidate == wanted
            || candidate.replace(' ', "") == squashed
            || candidate.contains(&wanted)
            || wanted.contains(&candidate)
    });
    if direct.is_some() {
        return direct;
    }

    let matcher = SkimMatcherV2::default();
    SUBJECTS
        .iter()
        .filter_map(|s| matcher.fuzzy_match(s.name, &squashed).map(|score| (score, s)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, s)| s)
}

/// Keywords first, then the provider's classifier, then [`GENERAL`].
pub async fn resolve_subject(provider: &dyn ContentProvider, topic: &str) -> String {
    if let Some(subject) = detect_by_keywords(topic) {
        info!(topic, subject = subject.name, "Subject detected by keyword");
        return subject.name.to_string();
    }
    match provider.detect_subject(topic).await {
        Ok(reply) => match match_subject_name(&reply) {
            Some(subject) => {
                info!(topic, subject = subject.name, "Subject detected by classifier");
                subject.name.to_string()
            }
            None => {
                warn!(topic, reply = %reply, "Classifier reply matched no subject");
                GENERAL.to_string()
            }
        },
        Err(e) => {
            warn!(topic, error = ?e, "Subject detection failed");
            GENERAL.to_string()
        }
    }
}
