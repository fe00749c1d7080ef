//! Build plans: what the assembler intends to do, step by step.

use crate::error::{AssemblyError, Result};
use crate::source::SourceDeck;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How a step produces its slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Copy the matched content slide unchanged.
    CopyAsIs,
    /// Copy a matched template slide and fill it with the matched content
    /// slide's title and body.
    MergeLayoutWithContent,
}

/// One entry of the user's structure file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureStep {
    pub keyword: String,
    pub action: StepAction,
}

impl StructureStep {
    pub fn new(keyword: impl Into<String>, action: StepAction) -> Self {
        Self {
            keyword: keyword.into(),
            action,
        }
    }

    /// Parse a JSON array of steps.
    pub fn parse_list(json: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Which deck a candidate slide lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "deck", content = "position", rename_all = "snake_case")]
pub enum SourceRef {
    Template(usize),
    Content,
}

/// A slide the match provider put forward for a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub source: SourceRef,
    pub slide_index: usize,
    /// Position in the provider's ranking, 0 being best.
    pub rank: usize,
    pub justification: String,
}

/// One planned step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStep {
    pub keyword: String,
    /// Action from the structure file.
    pub requested_action: StepAction,
    /// Action that will run. Differs when copying was not possible.
    pub action: StepAction,
    pub layout_candidates: Vec<MatchCandidate>,
    pub content_candidates: Vec<MatchCandidate>,
    pub selected_layout: Option<usize>,
    pub selected_content: Option<usize>,
    pub warnings: Vec<String>,
}

impl BuildStep {
    pub(crate) fn new(keyword: &str, action: StepAction) -> Self {
        Self {
            keyword: keyword.to_string(),
            requested_action: action,
            action,
            layout_candidates: Vec::new(),
            content_candidates: Vec::new(),
            selected_layout: None,
            selected_content: None,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn warn(&mut self, msg: String) {
        log::warn!("{}: {}", self.keyword, msg);
        self.warnings.push(msg);
    }

    pub fn layout(&self) -> Option<&MatchCandidate> {
        self.selected_layout.and_then(|i| self.layout_candidates.get(i))
    }

    pub fn content(&self) -> Option<&MatchCandidate> {
        self.selected_content.and_then(|i| self.content_candidates.get(i))
    }

    /// Whether the step has every candidate its action needs.
    pub fn is_resolved(&self) -> bool {
        match self.action {
            StepAction::CopyAsIs => self.content().is_some(),
            StepAction::MergeLayoutWithContent => self.layout().is_some() && self.content().is_some(),
        }
    }
}

/// Lifecycle of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    Empty,
    Planned,
    Reviewed,
    Assembled,
}

/// Ordered steps plus the decks they draw from.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    steps: Vec<BuildStep>,
    state: PlanState,
    #[serde(skip)]
    templates: Vec<Arc<SourceDeck>>,
    #[serde(skip)]
    content: Arc<SourceDeck>,
}

impl BuildPlan {
    pub(crate) fn new(templates: Vec<Arc<SourceDeck>>, content: Arc<SourceDeck>) -> Self {
        Self {
            steps: Vec::new(),
            state: PlanState::Empty,
            templates,
            content,
        }
    }

    pub(crate) fn set_steps(&mut self, steps: Vec<BuildStep>) {
        self.steps = steps;
        self.state = PlanState::Planned;
    }

    pub(crate) fn mark_assembled(&mut self) {
        self.state = PlanState::Assembled;
    }

    pub fn steps(&self) -> &[BuildStep] {
        &self.steps
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    pub fn templates(&self) -> &[Arc<SourceDeck>] {
        &self.templates
    }

    pub fn content(&self) -> &SourceDeck {
        &self.content
    }

    pub fn resolved_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_resolved()).count()
    }

    /// Choose a different layout candidate for a step.
    pub fn select_layout(&mut self, step: usize, candidate: usize) -> Result<()> {
        let step = self.editable_step(step)?;
        if candidate >= step.layout_candidates.len() {
            return Err(AssemblyError::InvalidSelection(format!(
                "step '{}' has {} layout candidates, {} requested",
                step.keyword,
                step.layout_candidates.len(),
                candidate
            )));
        }
        step.selected_layout = Some(candidate);
        Ok(())
    }

    /// Choose a different content candidate for a step.
    pub fn select_content(&mut self, step: usize, candidate: usize) -> Result<()> {
        let step = self.editable_step(step)?;
        if candidate >= step.content_candidates.len() {
            return Err(AssemblyError::InvalidSelection(format!(
                "step '{}' has {} content candidates, {} requested",
                step.keyword,
                step.content_candidates.len(),
                candidate
            )));
        }
        step.selected_content = Some(candidate);
        Ok(())
    }

    /// Apply a parsed selection.
    pub fn apply(&mut self, selection: &Selection) -> Result<()> {
        let step = match &selection.step {
            StepRef::Index(i) => *i,
            StepRef::Keyword(k) => self
                .steps
                .iter()
                .position(|s| s.keyword.eq_ignore_ascii_case(k))
                .ok_or_else(|| AssemblyError::InvalidSelection(format!("no step named '{}'", k)))?,
        };
        match selection.target {
            SelectTarget::Layout => self.select_layout(step, selection.candidate),
            SelectTarget::Content => self.select_content(step, selection.candidate),
        }
    }

    /// Accept the current selections. Further selections stay allowed
    /// until the plan is executed.
    pub fn review(&mut self) -> Result<()> {
        match self.state {
            PlanState::Planned | PlanState::Reviewed => {
                self.state = PlanState::Reviewed;
                log::info!(
                    "Plan reviewed: {} of {} steps resolved",
                    self.resolved_count(),
                    self.steps.len()
                );
                Ok(())
            }
            state => Err(AssemblyError::InvalidState(format!("cannot review a plan in state {:?}", state))),
        }
    }

    fn editable_step(&mut self, index: usize) -> Result<&mut BuildStep> {
        if !matches!(self.state, PlanState::Planned | PlanState::Reviewed) {
            return Err(AssemblyError::InvalidState(format!(
                "cannot change selections of a plan in state {:?}",
                self.state
            )));
        }
        let count = self.steps.len();
        self.steps
            .get_mut(index)
            .ok_or_else(|| AssemblyError::InvalidSelection(format!("plan has {} steps, step {} requested", count, index)))
    }
}

/// Step named by position or keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepRef {
    Index(usize),
    Keyword(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectTarget {
    Layout,
    Content,
}

/// A candidate override, written `STEP:layout=INDEX` or
/// `STEP:content=INDEX`. `STEP` is a step position or keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub step: StepRef,
    pub target: SelectTarget,
    pub candidate: usize,
}

impl FromStr for Selection {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AssemblyError::InvalidSelection(format!("expected STEP:layout=INDEX or STEP:content=INDEX, got '{}'", s));

        let (step, rest) = s.rsplit_once(':').ok_or_else(invalid)?;
        let (target, candidate) = rest.split_once('=').ok_or_else(invalid)?;
        let target = match target.trim() {
            "layout" => SelectTarget::Layout,
            "content" => SelectTarget::Content,
            _ => return Err(invalid()),
        };
        let candidate = candidate.trim().parse().map_err(|_| invalid())?;
        let step = step.trim();
        if step.is_empty() {
            return Err(invalid());
        }
        let step = match step.parse() {
            Ok(i) => StepRef::Index(i),
            Err(_) => StepRef::Keyword(step.to_string()),
        };

        Ok(Self { step, target, candidate })
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.step {
            StepRef::Index(i) => write!(f, "{}", i)?,
            StepRef::Keyword(k) => write!(f, "{}", k)?,
        }
        let target = match self.target {
            SelectTarget::Layout => "layout",
            SelectTarget::Content => "content",
        };
        write!(f, ":{}={}", target, self.candidate)
    }
}
