use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Scores for the teacher, each on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherScore {
    pub name: String,
    pub teaching_clarity: u8,
    pub student_engagement: u8,
    pub adaptability: u8,
    pub patience: u8,
    pub overall_score: u8,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentScore {
    pub id: String,
    pub name: String,
    pub participation: u8,
    pub relevance: u8,
    pub understanding: u8,
    pub overall_score: u8,
    pub highlight: String,
    pub summary: String,
}

/// AI-generated scoring of a finished class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Evaluation {
    pub teacher: TeacherScore,
    pub students: Vec<StudentScore>,
}

impl Evaluation {
    /// Clamps every score into 0-100 and recomputes missing overall scores.
    pub fn normalized(mut self) -> Self {
        let t = &mut self.teacher;
        for score in [
            &mut t.teaching_clarity,
            &mut t.student_engagement,
            &mut t.adaptability,
            &mut t.patience,
            &mut t.overall_score,
        ] {
            *score = (*score).min(100);
        }
        if t.overall_score == 0 {
            t.overall_score = average(&[
                t.teaching_clarity,
                t.student_engagement,
                t.adaptability,
                t.patience,
            ]);
        }
        for s in &mut self.students {
            s.participation = s.participation.min(100);
            s.relevance = s.relevance.min(100);
            s.understanding = s.understanding.min(100);
            s.overall_score = s.overall_score.min(100);
            if s.overall_score == 0 {
                s.overall_score = average(&[s.participation, s.relevance, s.understanding]);
            }
        }
        self
    }
}

fn average(scores: &[u8]) -> u8 {
    if scores.is_empty() {
        return 0;
    }
    let sum: u32 = scores.iter().map(|&s| s as u32).sum();
    (sum as f64 / scores.len() as f64).round() as u8
}
