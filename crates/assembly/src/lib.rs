//! Planning and executing deck assembly.
//!
//! An assembly takes a structure (an ordered list of keywords, each with
//! an action), one or more template decks and a content deck. The
//! [`Assembler`] asks a [`MatchProvider`] which slides fit each keyword,
//! producing a [`BuildPlan`] the caller can review and adjust. Executing
//! the plan copies and fills slides into a new deck built on the first
//! template.

pub mod assembler;
pub mod config;
pub mod conversion;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod plan;
pub mod provider;
pub mod report;
pub mod source;

pub use assembler::Assembler;
pub use config::AssemblyConfig;
pub use conversion::{ConversionService, ConvertedPage};
pub use error::{AssemblyError, Result};
#[cfg(feature = "http")]
pub use http::{HttpConversionService, HttpMatchProvider};
pub use plan::{
    BuildPlan, BuildStep, MatchCandidate, PlanState, Selection, SourceRef, StepAction, StructureStep,
};
pub use provider::{CandidateInput, LexicalMatchProvider, MatchMode, MatchProvider, MatchRequest, MatchResponse, RankedMatch};
pub use report::{Assembly, AssemblyLog, LogFormatter, StepLog, StepOutcome};
pub use source::{SlideUnit, SourceDeck};

/// Optional byte payloads carried as base64 strings in JSON.
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(data) if !data.is_empty() => STANDARD
                .decode(data)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}
