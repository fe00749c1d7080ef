//! The match provider boundary.
//!
//! A match provider ranks the slides of one deck against a keyword. The
//! assembler treats it as an opaque ranking function; how it ranks (a
//! language model, a lexical score) is its own business.

use crate::error::Result;
use async_trait::async_trait;
use deck_core::normalize::{calculate_similarity, normalize_for_comparison};
use serde::{Deserialize, Serialize};

/// One slide offered to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateInput {
    /// Slide position within its deck.
    pub index: usize,
    pub extracted_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::base64_bytes")]
    pub rendered_image: Option<Vec<u8>>,
}

/// Whether the provider should return one best match or a ranked list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Single,
    Multi,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub query_keyword: String,
    pub candidates: Vec<CandidateInput>,
    pub mode: MatchMode,
    /// Most matches wanted in multi mode.
    pub max_matches: usize,
}

impl MatchRequest {
    pub fn single(keyword: impl Into<String>, candidates: Vec<CandidateInput>) -> Self {
        Self {
            query_keyword: keyword.into(),
            candidates,
            mode: MatchMode::Single,
            max_matches: 1,
        }
    }

    pub fn multi(keyword: impl Into<String>, candidates: Vec<CandidateInput>, max_matches: usize) -> Self {
        Self {
            query_keyword: keyword.into(),
            candidates,
            mode: MatchMode::Multi,
            max_matches,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedMatch {
    pub index: i64,
    #[serde(default)]
    pub justification: String,
}

/// A provider answer. `best_index` is -1 when nothing matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchResponse {
    Multi {
        matches: Vec<RankedMatch>,
    },
    Single {
        best_index: i64,
        #[serde(default)]
        justification: String,
    },
}

impl MatchResponse {
    pub fn none(justification: impl Into<String>) -> Self {
        MatchResponse::Single {
            best_index: -1,
            justification: justification.into(),
        }
    }

    /// Matches best first. A negative single answer yields nothing.
    pub fn ranked(&self) -> Vec<RankedMatch> {
        match self {
            MatchResponse::Single { best_index, .. } if *best_index < 0 => Vec::new(),
            MatchResponse::Single {
                best_index,
                justification,
            } => vec![RankedMatch {
                index: *best_index,
                justification: justification.clone(),
            }],
            MatchResponse::Multi { matches } => matches.clone(),
        }
    }
}

/// Ranks candidate slides against a keyword.
#[async_trait]
pub trait MatchProvider: Send + Sync {
    async fn rank(&self, request: &MatchRequest) -> Result<MatchResponse>;
}

/// Offline provider scoring word overlap between the keyword and each
/// candidate's text.
#[derive(Debug, Clone)]
pub struct LexicalMatchProvider {
    min_score: f64,
}

impl Default for LexicalMatchProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalMatchProvider {
    pub fn new() -> Self {
        Self { min_score: 0.3 }
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score.clamp(0.0, 1.0);
        self
    }

    /// Best of the keyword against the whole text and against its first
    /// line.
    fn score(&self, keyword: &str, text: &str) -> f64 {
        let keyword = normalize_for_comparison(keyword);
        let whole = calculate_similarity(&keyword, &normalize_for_comparison(text));
        let heading = text
            .lines()
            .find(|l| !l.trim().is_empty())
            .map(|l| calculate_similarity(&keyword, &normalize_for_comparison(l)))
            .unwrap_or(0.0);
        whole.max(heading)
    }
}

#[async_trait]
impl MatchProvider for LexicalMatchProvider {
    async fn rank(&self, request: &MatchRequest) -> Result<MatchResponse> {
        let mut scored: Vec<(f64, usize)> = request
            .candidates
            .iter()
            .map(|c| (self.score(&request.query_keyword, &c.extracted_text), c.index))
            .filter(|(score, _)| *score >= self.min_score)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        let justify = |score: f64| format!("word overlap {:.2}", score);
        Ok(match request.mode {
            MatchMode::Single => match scored.first() {
                Some(&(score, index)) => MatchResponse::Single {
                    best_index: index as i64,
                    justification: justify(score),
                },
                None => MatchResponse::none("no candidate shares words with the keyword"),
            },
            MatchMode::Multi => MatchResponse::Multi {
                matches: scored
                    .into_iter()
                    .take(request.max_matches)
                    .map(|(score, index)| RankedMatch {
                        index: index as i64,
                        justification: justify(score),
                    })
                    .collect(),
            },
        })
    }
}
