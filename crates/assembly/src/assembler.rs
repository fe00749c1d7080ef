//! Plan generation and execution.

use crate::config::AssemblyConfig;
use crate::error::{AssemblyError, Result};
use crate::plan::{BuildPlan, BuildStep, MatchCandidate, PlanState, SourceRef, StepAction, StructureStep};
use crate::provider::{MatchProvider, MatchRequest};
use crate::report::{Assembly, AssemblyLog, StepLog, StepOutcome};
use crate::source::SourceDeck;
use deck_core::classify_roles;
use deck_pptx::{clone_slide, populate, CloneOptions, PackUri, Package, ShapeOutcome, SlideDocument};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const CONVERTED_COPY_WARNING: &str = "copy-as-is unavailable for converted content; planned as merge";

/// Runs plans against a match provider.
pub struct Assembler {
    provider: Arc<dyn MatchProvider>,
    config: AssemblyConfig,
    clone_options: CloneOptions,
}

/// One provider call made while planning.
#[derive(Debug, Clone, Copy)]
struct Query {
    step: usize,
    source: SourceRef,
}

/// Candidates from one query, validated against the deck.
#[derive(Debug, Default)]
struct QueryResult {
    candidates: Vec<MatchCandidate>,
    warnings: Vec<String>,
}

impl Assembler {
    pub fn new(provider: Arc<dyn MatchProvider>) -> Self {
        Self {
            provider,
            config: AssemblyConfig::default(),
            clone_options: CloneOptions::default(),
        }
    }

    pub fn with_config(mut self, config: AssemblyConfig) -> Self {
        self.config = config;
        self
    }

    /// Options for every slide clone, such as a fetcher for linked images.
    pub fn with_clone_options(mut self, options: CloneOptions) -> Self {
        self.clone_options = options;
        self
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Query the provider for every step and return the resulting plan.
    ///
    /// Provider failures, timeouts and unusable answers leave the affected
    /// step unresolved with a warning; they never fail the plan.
    pub async fn generate_plan(
        &self,
        structure: &[StructureStep],
        templates: Vec<Arc<SourceDeck>>,
        content: Arc<SourceDeck>,
    ) -> Result<BuildPlan> {
        if let Some(deck) = templates.iter().find(|t| !t.is_native()) {
            return Err(AssemblyError::InvalidInput(format!(
                "template {} is not a native deck",
                deck.name()
            )));
        }

        let mut plan = BuildPlan::new(templates, content);
        let mut steps: Vec<BuildStep> = structure
            .iter()
            .map(|s| BuildStep::new(&s.keyword, s.action))
            .collect();

        let mut queries = Vec::new();
        for (i, step) in steps.iter_mut().enumerate() {
            if step.action == StepAction::CopyAsIs && !plan.content().is_native() {
                step.action = StepAction::MergeLayoutWithContent;
                step.warn(CONVERTED_COPY_WARNING.to_string());
            }
            if step.action == StepAction::MergeLayoutWithContent {
                if plan.templates().is_empty() {
                    step.warn("no template to take a layout from".to_string());
                }
                queries.extend((0..plan.templates().len()).map(|t| Query {
                    step: i,
                    source: SourceRef::Template(t),
                }));
            }
            queries.push(Query {
                step: i,
                source: SourceRef::Content,
            });
        }

        log::info!(
            "Planning {} steps with {} provider queries",
            steps.len(),
            queries.len()
        );
        let plan_ref = &plan;
        let steps_ref = &steps;
        let mut results: Vec<(usize, Query, QueryResult)> = stream::iter(queries.into_iter().enumerate())
            .map(|(order, query)| async move {
                let keyword = &steps_ref[query.step].keyword;
                let result = self.run_query(plan_ref, keyword, query).await;
                (order, query, result)
            })
            .buffer_unordered(self.config.max_concurrent_queries.max(1))
            .collect()
            .await;
        // Template order is query order
        results.sort_by_key(|(order, _, _)| *order);

        for (_, query, result) in results {
            let step = &mut steps[query.step];
            for warning in result.warnings {
                step.warn(warning);
            }
            match query.source {
                SourceRef::Template(_) => step.layout_candidates.extend(result.candidates),
                SourceRef::Content => step.content_candidates.extend(result.candidates),
            }
        }

        for step in &mut steps {
            step.selected_layout = (!step.layout_candidates.is_empty()).then_some(0);
            step.selected_content = (!step.content_candidates.is_empty()).then_some(0);
            if step.action == StepAction::MergeLayoutWithContent && step.layout_candidates.is_empty() {
                step.warn("no layout candidate".to_string());
            }
            if step.content_candidates.is_empty() {
                step.warn("no content candidate".to_string());
            }
            log::info!(
                "Planned '{}' as {:?}: {}",
                step.keyword,
                step.action,
                if step.is_resolved() { "resolved" } else { "unresolved" }
            );
        }

        plan.set_steps(steps);
        Ok(plan)
    }

    async fn run_query(&self, plan: &BuildPlan, keyword: &str, query: Query) -> QueryResult {
        let deck = match query.source {
            SourceRef::Template(t) => plan.templates()[t].as_ref(),
            SourceRef::Content => plan.content(),
        };
        let mut result = QueryResult::default();
        if deck.is_empty() {
            result.warnings.push(format!("{} has no slides", deck.name()));
            return result;
        }

        let request = match query.source {
            SourceRef::Template(_) => MatchRequest::multi(keyword, deck.candidates(), self.config.multi_match_limit),
            SourceRef::Content => MatchRequest::single(keyword, deck.candidates()),
        };
        log::debug!("Querying {} candidates of {} for '{}'", deck.len(), deck.name(), keyword);

        let response = match tokio::time::timeout(self.config.match_timeout, self.provider.rank(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                result.warnings.push(format!("match provider failed for {}: {}", deck.name(), e));
                return result;
            }
            Err(_) => {
                result.warnings.push(format!(
                    "match provider timed out after {:?} for {}",
                    self.config.match_timeout,
                    deck.name()
                ));
                return result;
            }
        };

        let limit = match query.source {
            SourceRef::Template(_) => self.config.multi_match_limit,
            SourceRef::Content => 1,
        };
        let mut seen = HashSet::new();
        for ranked in response.ranked() {
            let index = usize::try_from(ranked.index).ok().filter(|&i| i < deck.len());
            let Some(index) = index else {
                result.warnings.push(format!(
                    "match provider returned out-of-range index {} for {}",
                    ranked.index,
                    deck.name()
                ));
                continue;
            };
            if !seen.insert(index) || result.candidates.len() >= limit {
                continue;
            }
            result.candidates.push(MatchCandidate {
                source: query.source,
                slide_index: index,
                rank: result.candidates.len(),
                justification: ranked.justification,
            });
        }
        result
    }

    /// Build the destination deck from a reviewed plan.
    ///
    /// Steps run in order. A step that cannot run is logged and the rest
    /// continue. Cancellation is checked between steps; the steps left
    /// over are logged as cancelled and the destination is still written.
    pub fn execute(&self, plan: &mut BuildPlan, cancel: Option<&CancellationToken>) -> Result<Assembly> {
        if plan.state() != PlanState::Reviewed {
            return Err(AssemblyError::InvalidState(format!(
                "cannot execute a plan in state {:?}",
                plan.state()
            )));
        }

        let base = plan
            .templates()
            .first()
            .map(|t| t.as_ref())
            .unwrap_or(plan.content());
        let base_package = base.package().ok_or_else(|| {
            AssemblyError::InvalidInput("no native deck to build the destination from".to_string())
        })?;
        let mut dest = Package::without_slides(base_package)?;
        log::info!("Assembling {} steps onto {}", plan.steps().len(), base.name());

        let mut record = AssemblyLog::default();
        for (index, step) in plan.steps().iter().enumerate() {
            let mut entry = StepLog {
                step: index,
                keyword: step.keyword.clone(),
                action: step.action,
                layout: step.layout().cloned(),
                content: step.content().cloned(),
                outcome: StepOutcome::Skipped,
                shapes: Vec::new(),
                warnings: step.warnings.clone(),
            };

            if cancel.is_some_and(|c| c.is_cancelled()) {
                log::info!("Step {} '{}' cancelled", index + 1, step.keyword);
                entry.outcome = StepOutcome::Cancelled;
            } else if !step.is_resolved() {
                log::warn!("Step {} '{}' is unresolved, skipping", index + 1, step.keyword);
                entry.warnings.push("unresolved; no slide added".to_string());
            } else {
                log::info!("Step {} '{}' ({:?})", index + 1, step.keyword, step.action);
                match self.run_step(plan, step, &mut dest, &mut entry) {
                    Ok(slide) => entry.outcome = StepOutcome::Executed { slide },
                    Err(e) => {
                        log::warn!("Step {} '{}' failed: {}", index + 1, step.keyword, e);
                        entry.outcome = StepOutcome::Failed { error: e.to_string() };
                    }
                }
            }
            record.steps.push(entry);
        }

        let bytes = dest.to_bytes()?;
        plan.mark_assembled();
        log::info!(
            "Assembled {} of {} steps into {} bytes",
            record.executed_count(),
            record.steps.len(),
            bytes.len()
        );
        Ok(Assembly { bytes, log: record })
    }

    /// Add the step's slide to `dest`, returning its part name.
    fn run_step(&self, plan: &BuildPlan, step: &BuildStep, dest: &mut Package, entry: &mut StepLog) -> Result<String> {
        let content = step
            .content()
            .and_then(|c| plan.content().unit(c.slide_index))
            .ok_or_else(|| AssemblyError::InvalidSelection(format!("'{}' has no content slide", step.keyword)))?;

        let (src_deck, src_index) = match step.action {
            StepAction::CopyAsIs => (plan.content(), content.index),
            StepAction::MergeLayoutWithContent => {
                let layout = step
                    .layout()
                    .ok_or_else(|| AssemblyError::InvalidSelection(format!("'{}' has no layout slide", step.keyword)))?;
                let SourceRef::Template(t) = layout.source else {
                    return Err(AssemblyError::InvalidSelection(format!(
                        "'{}' layout candidate is not a template slide",
                        step.keyword
                    )));
                };
                let deck = plan.templates().get(t).ok_or_else(|| {
                    AssemblyError::InvalidSelection(format!("'{}' names missing template {}", step.keyword, t))
                })?;
                (deck.as_ref(), layout.slide_index)
            }
        };

        let src = src_deck
            .package()
            .ok_or_else(|| AssemblyError::InvalidInput(format!("{} is not a native deck", src_deck.name())))?;
        let src_uri = src_deck
            .unit(src_index)
            .and_then(|u| u.slide_uri.as_ref())
            .ok_or_else(|| AssemblyError::InvalidSelection(format!("{} has no slide {}", src_deck.name(), src_index)))?;

        let cloned = match clone_slide(src, src_uri, dest, &self.clone_options) {
            Ok(cloned) => cloned,
            Err(e) => {
                // Dependencies copied before the failure
                dest.prune_unreachable();
                return Err(e.into());
            }
        };
        entry.warnings.extend(cloned.warnings.iter().cloned());
        entry.shapes = cloned
            .outcomes
            .iter()
            .filter(|r| r.outcome != ShapeOutcome::Copied)
            .cloned()
            .collect();

        if step.action == StepAction::MergeLayoutWithContent {
            let roles = classify_roles(&content.content, &self.config.classifier);
            let text = roles.extract_text(&content.content);
            if text.title.is_none() && text.body.is_none() {
                entry.warnings.push(format!(
                    "content slide {} has no title or body text",
                    content.index
                ));
            }

            fill_or_remove(dest, &cloned.uri, |dest| {
                let mut doc = SlideDocument::open(dest, &cloned.uri)?;
                let report = populate(&mut doc, &text, &self.config.classifier);
                entry.warnings.extend(report.warnings);
                doc.save(dest)?;
                Ok(())
            })?;
        }

        Ok(cloned.uri.to_string())
    }
}

/// Run `fill` on a slide just appended to `dest`. If it fails the slide is
/// taken back out, so only executed steps leave slides behind.
fn fill_or_remove<F>(dest: &mut Package, slide: &PackUri, fill: F) -> Result<()>
where
    F: FnOnce(&mut Package) -> Result<()>,
{
    let Err(e) = fill(dest) else {
        return Ok(());
    };
    if let Err(cleanup) = dest.remove_slide(slide) {
        log::warn!("Could not remove {} after a failed step: {}", slide, cleanup);
    }
    Err(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{LexicalMatchProvider, MatchMode, MatchResponse, RankedMatch};
    use crate::conversion::ConvertedPage;
    use async_trait::async_trait;
    use deck_core::SourceFormat;
    use deck_pptx::fixture::{FixtureDeck, FixtureShape};
    use deck_pptx::PptxParser;
    use std::time::Duration;

    /// Answers by keyword and mode, like a provider that knows the decks.
    struct StubProvider {
        answer: fn(&MatchRequest) -> MatchResponse,
    }

    #[async_trait]
    impl MatchProvider for StubProvider {
        async fn rank(&self, request: &MatchRequest) -> Result<MatchResponse> {
            Ok((self.answer)(request))
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl MatchProvider for SlowProvider {
        async fn rank(&self, _request: &MatchRequest) -> Result<MatchResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(MatchResponse::Single {
                best_index: 0,
                justification: "too late".to_string(),
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl MatchProvider for FailingProvider {
        async fn rank(&self, _request: &MatchRequest) -> Result<MatchResponse> {
            Err(AssemblyError::MatchProvider("connection refused".to_string()))
        }
    }

    fn scenario_answer(request: &MatchRequest) -> MatchResponse {
        match (request.query_keyword.as_str(), request.mode) {
            ("Objectives", MatchMode::Single) => MatchResponse::Single {
                best_index: 1,
                justification: "lists the goals".to_string(),
            },
            ("Timeline", MatchMode::Single) => MatchResponse::Single {
                best_index: 0,
                justification: "sequential phases".to_string(),
            },
            ("Timeline", MatchMode::Multi) => MatchResponse::Multi {
                matches: vec![
                    RankedMatch {
                        index: 2,
                        justification: "two-column layout".to_string(),
                    },
                    RankedMatch {
                        index: 0,
                        justification: "plain".to_string(),
                    },
                ],
            },
            _ => MatchResponse::none("nothing relevant"),
        }
    }

    fn stub(answer: fn(&MatchRequest) -> MatchResponse) -> Assembler {
        Assembler::new(Arc::new(StubProvider { answer }))
    }

    fn template() -> Arc<SourceDeck> {
        let bytes = FixtureDeck::new()
            .slide(vec![FixtureShape::title("Cover"), FixtureShape::body("Subtitle")])
            .slide(vec![FixtureShape::title("Section")])
            .slide_with_layout(1, vec![FixtureShape::title("Click to add title"), FixtureShape::body("Click to add text")])
            .build();
        Arc::new(SourceDeck::from_bytes("template.pptx", &bytes).unwrap())
    }

    fn content() -> Arc<SourceDeck> {
        let bytes = FixtureDeck::new()
            .slide(vec![
                FixtureShape::title("Project Timeline"),
                FixtureShape::body("Phase one\nPhase two"),
            ])
            .slide(vec![FixtureShape::title("Objectives"), FixtureShape::body("Ship on time")])
            .build();
        Arc::new(SourceDeck::from_bytes("content.pptx", &bytes).unwrap())
    }

    fn converted_content() -> Arc<SourceDeck> {
        let pages = vec![
            ConvertedPage {
                page_index: 0,
                extracted_text: "Project Timeline\nPhase one".to_string(),
                rendered_image: None,
            },
            ConvertedPage {
                page_index: 1,
                extracted_text: "Objectives\nShip on time".to_string(),
                rendered_image: None,
            },
        ];
        Arc::new(SourceDeck::from_pages("content.pdf", SourceFormat::Pdf, pages))
    }

    fn scenario_structure() -> Vec<StructureStep> {
        vec![
            StructureStep::new("Objectives", StepAction::CopyAsIs),
            StructureStep::new("Timeline", StepAction::MergeLayoutWithContent),
        ]
    }

    fn slides_of(bytes: &[u8]) -> (Package, Vec<deck_core::SlideContent>) {
        let package = Package::from_bytes(bytes).unwrap();
        let slides = PptxParser::new().parse(&package).unwrap();
        (package, slides)
    }

    #[tokio::test]
    async fn test_scenario_copy_and_merge() {
        let assembler = stub(scenario_answer);
        let mut plan = assembler
            .generate_plan(&scenario_structure(), vec![template()], content())
            .await
            .unwrap();
        assert_eq!(plan.state(), PlanState::Planned);
        assert_eq!(plan.resolved_count(), 2);

        let timeline = &plan.steps()[1];
        assert_eq!(timeline.layout().unwrap().slide_index, 2);
        assert_eq!(timeline.layout().unwrap().justification, "two-column layout");
        assert_eq!(timeline.layout_candidates.len(), 2);
        assert_eq!(timeline.content().unwrap().slide_index, 0);
        assert_eq!(timeline.content().unwrap().justification, "sequential phases");

        plan.review().unwrap();
        let assembly = assembler.execute(&mut plan, None).unwrap();
        assert_eq!(plan.state(), PlanState::Assembled);
        assert_eq!(assembly.log.executed_count(), 2);

        let (package, slides) = slides_of(&assembly.bytes);
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].plain_text(), "Objectives\nShip on time");
        assert_eq!(slides[1].plain_text(), "Project Timeline\nPhase one\nPhase two");

        let uris = package.slide_uris().unwrap();
        assert_eq!(package.layout_name_of(&uris[1]).as_deref(), Some("Two Content"));
        assert_eq!(package.layout_name_of(&uris[0]).as_deref(), Some("Title and Content"));
    }

    #[tokio::test]
    async fn test_scenario_unresolved_step_is_skipped() {
        let assembler = stub(scenario_answer);
        let structure = vec![
            StructureStep::new("Budget", StepAction::CopyAsIs),
            StructureStep::new("Objectives", StepAction::CopyAsIs),
        ];
        let mut plan = assembler
            .generate_plan(&structure, vec![template()], content())
            .await
            .unwrap();

        let budget = &plan.steps()[0];
        assert!(!budget.is_resolved());
        assert!(budget.warnings.iter().any(|w| w == "no content candidate"));

        plan.review().unwrap();
        let assembly = assembler.execute(&mut plan, None).unwrap();
        assert_eq!(assembly.log.steps[0].outcome, StepOutcome::Skipped);
        assert!(!assembly.log.steps[0].warnings.is_empty());

        let (_, slides) = slides_of(&assembly.bytes);
        assert_eq!(slides.len(), plan.resolved_count());
        assert_eq!(slides.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_leaves_step_unresolved() {
        let assembler = Assembler::new(Arc::new(SlowProvider))
            .with_config(AssemblyConfig::default().with_match_timeout(Duration::from_millis(50)));
        let plan = assembler
            .generate_plan(&scenario_structure(), vec![template()], content())
            .await
            .unwrap();
        assert_eq!(plan.resolved_count(), 0);
        assert!(plan.steps()[0].warnings.iter().any(|w| w.contains("timed out")));
    }

    #[tokio::test]
    async fn test_provider_error_leaves_step_unresolved() {
        let assembler = Assembler::new(Arc::new(FailingProvider));
        let plan = assembler
            .generate_plan(&scenario_structure(), vec![template()], content())
            .await
            .unwrap();
        assert_eq!(plan.resolved_count(), 0);
        assert!(plan.steps()[1].warnings.iter().any(|w| w.contains("connection refused")));
    }

    #[tokio::test]
    async fn test_out_of_range_index_is_unacceptable() {
        let assembler = stub(|_| MatchResponse::Single {
            best_index: 7,
            justification: String::new(),
        });
        let structure = vec![StructureStep::new("Objectives", StepAction::CopyAsIs)];
        let plan = assembler.generate_plan(&structure, vec![template()], content()).await.unwrap();
        assert!(!plan.steps()[0].is_resolved());
        assert!(plan.steps()[0].warnings[0].contains("out-of-range index 7"));
    }

    #[tokio::test]
    async fn test_override_changes_executed_slide() {
        let assembler = stub(scenario_answer);
        let structure = vec![StructureStep::new("Timeline", StepAction::MergeLayoutWithContent)];
        let mut plan = assembler.generate_plan(&structure, vec![template()], content()).await.unwrap();

        plan.select_layout(0, 1).unwrap();
        plan.review().unwrap();
        let assembly = assembler.execute(&mut plan, None).unwrap();

        let (package, _) = slides_of(&assembly.bytes);
        let uris = package.slide_uris().unwrap();
        assert_eq!(package.layout_name_of(&uris[0]).as_deref(), Some("Title and Content"));
        assert_eq!(assembly.log.steps[0].layout.as_ref().unwrap().slide_index, 0);
    }

    #[tokio::test]
    async fn test_cancellation_between_steps() {
        let assembler = stub(scenario_answer);
        let mut plan = assembler
            .generate_plan(&scenario_structure(), vec![template()], content())
            .await
            .unwrap();
        plan.review().unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let assembly = assembler.execute(&mut plan, Some(&token)).unwrap();
        assert!(assembly
            .log
            .steps
            .iter()
            .all(|s| s.outcome == StepOutcome::Cancelled));

        // The destination is still a valid, empty deck
        let (_, slides) = slides_of(&assembly.bytes);
        assert!(slides.is_empty());
    }

    #[tokio::test]
    async fn test_converted_content_is_merged() {
        let assembler = stub(|request| match request.mode {
            MatchMode::Single => MatchResponse::Single {
                best_index: 1,
                justification: "goals page".to_string(),
            },
            MatchMode::Multi => MatchResponse::Multi {
                matches: vec![RankedMatch {
                    index: 0,
                    justification: "title and body".to_string(),
                }],
            },
        });
        let structure = vec![StructureStep::new("Objectives", StepAction::CopyAsIs)];
        let mut plan = assembler
            .generate_plan(&structure, vec![template()], converted_content())
            .await
            .unwrap();

        let step = &plan.steps()[0];
        assert_eq!(step.requested_action, StepAction::CopyAsIs);
        assert_eq!(step.action, StepAction::MergeLayoutWithContent);
        assert_eq!(step.warnings[0], CONVERTED_COPY_WARNING);

        plan.review().unwrap();
        let assembly = assembler.execute(&mut plan, None).unwrap();
        let (_, slides) = slides_of(&assembly.bytes);
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].plain_text(), "Objectives\nShip on time");
    }

    #[tokio::test]
    async fn test_execute_requires_review() {
        let assembler = stub(scenario_answer);
        let mut plan = assembler
            .generate_plan(&scenario_structure(), vec![template()], content())
            .await
            .unwrap();
        assert!(matches!(
            assembler.execute(&mut plan, None),
            Err(AssemblyError::InvalidState(_))
        ));

        plan.review().unwrap();
        assembler.execute(&mut plan, None).unwrap();
        // A plan runs once
        assert!(matches!(
            assembler.execute(&mut plan, None),
            Err(AssemblyError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_converted_template_is_rejected() {
        let assembler = stub(scenario_answer);
        let result = assembler
            .generate_plan(&scenario_structure(), vec![converted_content()], content())
            .await;
        assert!(matches!(result, Err(AssemblyError::InvalidInput(_))));
    }

    #[test]
    fn test_failed_fill_removes_slide() {
        let template = template();
        let src = template.package().unwrap();
        let mut dest = Package::without_slides(src).unwrap();
        let src_uri = template.units()[2].slide_uri.clone().unwrap();
        let cloned = clone_slide(src, &src_uri, &mut dest, &CloneOptions::default()).unwrap();
        assert_eq!(dest.slide_uris().unwrap().len(), 1);

        let result = fill_or_remove(&mut dest, &cloned.uri, |_| {
            Err(AssemblyError::InvalidInput("populate failed".to_string()))
        });
        assert!(matches!(result, Err(AssemblyError::InvalidInput(_))));
        assert!(dest.slide_uris().unwrap().is_empty());
        assert!(!dest.contains(&cloned.uri));
        dest.validate().unwrap();

        // A successful fill keeps the slide
        let cloned = clone_slide(src, &src_uri, &mut dest, &CloneOptions::default()).unwrap();
        fill_or_remove(&mut dest, &cloned.uri, |_| Ok(())).unwrap();
        assert_eq!(dest.slide_uris().unwrap(), vec![cloned.uri]);
    }

    #[tokio::test]
    async fn test_lexical_provider_end_to_end() {
        let assembler = Assembler::new(Arc::new(LexicalMatchProvider::new()))
            .with_config(AssemblyConfig::default().with_max_concurrent_queries(1));
        let mut plan = assembler
            .generate_plan(&scenario_structure(), Vec::new(), content())
            .await
            .unwrap();
        // Without templates only the copy can resolve
        assert!(plan.steps()[0].is_resolved());
        assert!(!plan.steps()[1].is_resolved());

        plan.review().unwrap();
        let assembly = assembler.execute(&mut plan, None).unwrap();
        let (_, slides) = slides_of(&assembly.bytes);
        assert_eq!(slides.len(), 1);
        assert_eq!(assembly.log.steps[1].outcome, StepOutcome::Skipped);
    }
}
