//! Post-class conversation insights: per-speaker sentiment and key phrases.
//!
//! The actual text analysis is delegated to a [`TextAnalytics`] service; this
//! module only selects the documents worth analysing and aggregates the
//! per-document results. Analysis failures never surface to callers, they
//! produce empty insights instead.

use crate::{persona::SpeakerId, turn::TranscriptEntry};
use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

/// Entries shorter than this (after trimming) are not sent for analysis.
pub const MIN_DOCUMENT_CHARS: usize = 3;
/// How many key phrases the insights keep.
pub const TOP_PHRASES: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsDocument {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Mixed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSentiment {
    pub id: String,
    pub sentiment: Sentiment,
    pub confidence_scores: ConfidenceScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentKeyPhrases {
    pub id: String,
    pub key_phrases: Vec<String>,
}

/// A sentiment and key-phrase analysis service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TextAnalytics: Send + Sync {
    async fn sentiment(&self, documents: &[AnalyticsDocument]) -> Result<Vec<DocumentSentiment>>;
    async fn key_phrases(&self, documents: &[AnalyticsDocument]) -> Result<Vec<DocumentKeyPhrases>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerSentiment {
    pub dominant_sentiment: Sentiment,
    pub average_positive: f64,
    pub average_negative: f64,
    pub average_neutral: f64,
    pub message_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhraseCount {
    pub phrase: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationInsights {
    pub sentiment: BTreeMap<SpeakerId, SpeakerSentiment>,
    pub key_phrases: Vec<PhraseCount>,
}

fn documents(entries: &[Arc<TranscriptEntry>]) -> Vec<AnalyticsDocument> {
    entries
        .iter()
        .filter(|e| e.turn.text.trim().chars().count() >= MIN_DOCUMENT_CHARS)
        .map(|e| AnalyticsDocument {
            id: e.id.to_string(),
            text: e.turn.text.clone(),
        })
        .collect()
}

#[derive(Default)]
struct Tally {
    positive: f64,
    negative: f64,
    neutral: f64,
    messages: usize,
    // positive, neutral, negative
    labels: [usize; 3],
}

/// Averages each speaker's confidence scores and picks their most frequent label.
pub async fn speaker_sentiment(
    analytics: &dyn TextAnalytics,
    entries: &[Arc<TranscriptEntry>],
) -> BTreeMap<SpeakerId, SpeakerSentiment> {
    let docs = documents(entries);
    if docs.is_empty() {
        return BTreeMap::new();
    }
    let results = match analytics.sentiment(&docs).await {
        Ok(results) => results,
        Err(e) => {
            warn!(error = ?e, "Sentiment analysis failed");
            return BTreeMap::new();
        }
    };

    let speakers: HashMap<String, &SpeakerId> = entries
        .iter()
        .map(|e| (e.id.to_string(), &e.turn.speaker_id))
        .collect();

    let mut tallies: BTreeMap<SpeakerId, Tally> = BTreeMap::new();
    for result in results {
        let Some(speaker) = speakers.get(&result.id) else {
            continue;
        };
        let tally = tallies.entry((*speaker).clone()).or_default();
        tally.messages += 1;
        tally.positive += result.confidence_scores.positive;
        tally.negative += result.confidence_scores.negative;
        tally.neutral += result.confidence_scores.neutral;
        match result.sentiment {
            Sentiment::Positive => tally.labels[0] += 1,
            Sentiment::Neutral => tally.labels[1] += 1,
            Sentiment::Negative => tally.labels[2] += 1,
            Sentiment::Mixed => {}
        }
    }

    tallies
        .into_iter()
        .map(|(speaker, t)| {
            let n = t.messages as f64;
            // Ties go to the earliest label in positive, neutral, negative order.
            let mut dominant = Sentiment::Positive;
            let mut best = t.labels[0];
            for (label, count) in [(Sentiment::Neutral, t.labels[1]), (Sentiment::Negative, t.labels[2])] {
                if count > best {
                    best = count;
                    dominant = label;
                }
            }
            (
                speaker,
                SpeakerSentiment {
                    dominant_sentiment: dominant,
                    average_positive: t.positive / n,
                    average_negative: t.negative / n,
                    average_neutral: t.neutral / n,
                    message_count: t.messages,
                },
            )
        })
        .collect()
}

/// The most frequent key phrases across the conversation, lower-cased.
pub async fn top_key_phrases(
    analytics: &dyn TextAnalytics,
    entries: &[Arc<TranscriptEntry>],
) -> Vec<PhraseCount> {
    let docs = documents(entries);
    if docs.is_empty() {
        return Vec::new();
    }
    let results = match analytics.key_phrases(&docs).await {
        Ok(results) => results,
        Err(e) => {
            warn!(error = ?e, "Key phrase extraction failed");
            return Vec::new();
        }
    };

    let mut counts: Vec<PhraseCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for phrase in results.into_iter().flat_map(|r| r.key_phrases) {
        let phrase = phrase.to_lowercase();
        match index.get(&phrase) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(phrase.clone(), counts.len());
                counts.push(PhraseCount { phrase, count: 1 });
            }
        }
    }
    // Stable: equal counts keep first-seen order.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(TOP_PHRASES);
    counts
}

pub async fn insights(
    analytics: &dyn TextAnalytics,
    entries: &[Arc<TranscriptEntry>],
) -> ConversationInsights {
    let (sentiment, key_phrases) = tokio::join!(
        speaker_sentiment(analytics, entries),
        top_key_phrases(analytics, entries)
    );
    ConversationInsights {
        sentiment,
        key_phrases,
    }
}
