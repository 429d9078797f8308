//! Deterministic content used whenever a content provider call fails.

use crate::{
    evaluation::{Evaluation, StudentScore, TeacherScore},
    turn::{ScriptedTurn, Slide, TurnKind},
};

pub fn slides() -> Vec<Slide> {
    vec![Slide {
        concept: "Introduction".to_string(),
        content: "Let's explore this topic together with a quick overview.".to_string(),
    }]
}

pub fn conversation() -> Vec<ScriptedTurn> {
    vec![
        ScriptedTurn::new(
            "teacher",
            "Mr. Nova",
            "Welcome everyone. Let us begin our lesson.",
            TurnKind::Teaching,
        ),
        ScriptedTurn::new(
            "ali",
            "Ali",
            "I have a question about this topic!",
            TurnKind::Question,
        ),
        ScriptedTurn::new(
            "teacher",
            "Mr. Nova",
            "Great question. Class dismissed.",
            TurnKind::Closing,
        ),
    ]
}

pub fn observer_reply(observer_name: &str) -> Vec<ScriptedTurn> {
    vec![
        ScriptedTurn::new(
            "teacher",
            "Mr. Nova",
            format!("Great point, {observer_name}! That's exactly what we were discussing."),
            TurnKind::Answer,
        ),
        ScriptedTurn::new("ali", "Ali", "I was thinking the same thing!", TurnKind::Comment),
    ]
}

fn student(id: &str, name: &str, highlight: &str, summary: &str) -> StudentScore {
    StudentScore {
        id: id.to_string(),
        name: name.to_string(),
        participation: 75,
        relevance: 75,
        understanding: 75,
        overall_score: 75,
        highlight: highlight.to_string(),
        summary: summary.to_string(),
    }
}

pub fn evaluation() -> Evaluation {
    Evaluation {
        teacher: TeacherScore {
            name: "Mr. Nova".to_string(),
            teaching_clarity: 75,
            student_engagement: 75,
            adaptability: 75,
            patience: 75,
            overall_score: 75,
            strengths: vec![
                "Clear explanations".to_string(),
                "Patient demeanor".to_string(),
            ],
            improvements: vec![
                "Could use more visual aids".to_string(),
                "Engage more with quieter students".to_string(),
            ],
            summary: "Solid teaching performance overall.".to_string(),
        },
        students: vec![
            student("ali", "Ali", "Asked a great question.", "Good job overall."),
            student("kirtan", "Kirtan", "Tried hard to participate.", "Good effort."),
            student(
                "tayyab",
                "Tayyab",
                "Made a funny but relevant joke.",
                "Needs a bit more focus.",
            ),
            student("rana", "Rana", "Showed great empathy.", "Very thoughtful."),
        ],
    }
}
