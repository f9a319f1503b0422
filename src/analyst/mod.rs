//! The analysis orchestrator.
//!
//! [`JournalAnalyst`] is the only type the presentation layer talks to. Each
//! operation renders its template (truncating inputs to the prompt budget),
//! sends the prompt through the resilient provider chain with a locally
//! computed fallback, and parses structured output. Callers always get an
//! [`Analysis`] back unless something unrecoverable happened (a missing or
//! malformed template).

mod builder;
mod fallback;
mod parse;
mod prompts;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::cache::CachingProvider;
use crate::providers::{CompletionProvider, Outcome, ResilientProvider};
use crate::telemetry;
use crate::template::{PromptTemplate, TemplateRegistry, TruncationStrategy, names, truncate};
use crate::types::{
    Analysis, CompletionRequest, CompletionResult, Dated, Deadline, EntryMetadata, Expense,
    ExpenseReport, GenerationParams, JournalEntry, PlaceRecommendation, ProviderHealth, Structured,
};
use crate::Result;

pub use builder::AnalystBuilder;

/// Appended to a prompt whose structured output failed to parse, when the
/// template has no instruction of its own.
pub const DEFAULT_CORRECTIVE_INSTRUCTION: &str = "Your previous answer could not be parsed. \
Respond again with valid JSON only, exactly in the requested shape, without code fences or commentary.";

/// Orchestrator tunables.
#[derive(Debug, Clone)]
pub struct AnalystConfig {
    /// Base generation parameters; templates override some of them.
    pub params: GenerationParams,
    /// Estimated prompt tokens allowed before inputs are truncated.
    pub prompt_budget: usize,
    pub truncation: TruncationStrategy,
    /// Used by [`JournalAnalyst::default_deadline`].
    pub request_timeout: Duration,
    pub corrective_instruction: String,
    /// How many reflective questions to ask for.
    pub question_count: usize,
    /// How many places to ask for.
    pub recommendation_count: usize,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            params: GenerationParams::default(),
            prompt_budget: 3000,
            truncation: TruncationStrategy::default(),
            request_timeout: Duration::from_secs(30),
            corrective_instruction: DEFAULT_CORRECTIVE_INSTRUCTION.to_string(),
            question_count: 5,
            recommendation_count: 5,
        }
    }
}

/// LLM-backed analysis of journal entries and expenses.
///
/// Cheap to clone; clones share the provider chain, cache and circuit
/// breaker, so work can be spawned onto other tasks.
#[derive(Clone)]
pub struct JournalAnalyst {
    inner: Arc<Inner>,
}

struct Inner {
    templates: TemplateRegistry,
    chain: ResilientProvider,
    cache: Option<Arc<CachingProvider>>,
    config: AnalystConfig,
}

/// A rendered prompt and how many inputs it covers.
struct Prepared<'t> {
    template: &'t PromptTemplate,
    request: CompletionRequest,
    considered: usize,
    total: usize,
}

impl JournalAnalyst {
    pub fn builder() -> AnalystBuilder {
        AnalystBuilder::new()
    }

    /// Circuit state of the configured provider.
    pub fn provider_health(&self) -> ProviderHealth {
        self.inner.chain.health()
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.inner.templates
    }

    pub fn config(&self) -> &AnalystConfig {
        &self.inner.config
    }

    /// Deadline for one operation using the configured request timeout.
    pub fn default_deadline(&self) -> Deadline {
        Deadline::after(self.inner.config.request_timeout)
    }

    /// Evict expired cache entries now. No-op without a cache.
    pub async fn sweep_cache(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.sweep().await;
        }
    }

    /// One-paragraph narrative summary of `entries`.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub async fn summarize(
        &self,
        entries: &[JournalEntry],
        deadline: &Deadline,
    ) -> Result<Analysis<String>> {
        if entries.is_empty() {
            return Ok(Analysis::empty(fallback::EMPTY_SUMMARY.to_string()));
        }
        let prepared = self.prepare(names::SUMMARIZE, entries, prompts::summary)?;
        let outcome = self
            .inner
            .chain
            .complete_or_fallback(&prepared.request, deadline, |_| Some(fallback::summary(entries)))
            .await?;
        Ok(match outcome {
            Outcome::Native(result) => Analysis::native(
                result.text.trim().to_string(),
                &result,
                prepared.considered,
                prepared.total,
            ),
            Outcome::Degraded { value, .. } => {
                Analysis::degraded(value, None, prepared.total, prepared.total)
            }
        })
    }

    /// Open-ended questions to prompt the next entry.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub async fn reflective_prompts(
        &self,
        entries: &[JournalEntry],
        deadline: &Deadline,
    ) -> Result<Analysis<Structured<Vec<String>>>> {
        if entries.is_empty() {
            return Ok(Analysis::empty(Structured::Parsed(fallback::starter_questions())));
        }
        let count = self.inner.config.question_count;
        let prepared = self.prepare(names::REFLECTIVE_PROMPTS, entries, |subset| {
            prompts::reflective(subset, count)
        })?;
        self.structured(prepared, deadline, || fallback::reflective_questions(entries, count))
            .await
    }

    /// Mood, themes, people, places and activities mentioned in `entries`.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub async fn extract_metadata(
        &self,
        entries: &[JournalEntry],
        deadline: &Deadline,
    ) -> Result<Analysis<Structured<EntryMetadata>>> {
        if entries.is_empty() {
            return Ok(Analysis::empty(Structured::Parsed(EntryMetadata::default())));
        }
        let prepared = self.prepare(names::EXTRACT_METADATA, entries, prompts::metadata)?;
        self.structured(prepared, deadline, || fallback::metadata(entries))
            .await
    }

    /// Places worth visiting next, based on where the traveller has been.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub async fn recommend_places(
        &self,
        entries: &[JournalEntry],
        deadline: &Deadline,
    ) -> Result<Analysis<Structured<Vec<PlaceRecommendation>>>> {
        if entries.is_empty() {
            return Ok(Analysis::empty(Structured::Parsed(Vec::new())));
        }
        let count = self.inner.config.recommendation_count;
        let prepared = self.prepare(names::RECOMMEND_PLACES, entries, |subset| {
            prompts::places(subset, count)
        })?;
        self.structured(prepared, deadline, || fallback::places(entries))
            .await
    }

    /// Spending summary with highlights and saving suggestions.
    #[instrument(skip_all, fields(expenses = expenses.len()))]
    pub async fn analyze_expenses(
        &self,
        expenses: &[Expense],
        deadline: &Deadline,
    ) -> Result<Analysis<Structured<ExpenseReport>>> {
        if expenses.is_empty() {
            return Ok(Analysis::empty(Structured::Parsed(ExpenseReport {
                summary: fallback::EMPTY_EXPENSES.to_string(),
                ..ExpenseReport::default()
            })));
        }
        let prepared = self.prepare(names::ANALYZE_EXPENSES, expenses, prompts::expenses)?;
        self.structured(prepared, deadline, || fallback::expenses(expenses))
            .await
    }

    /// Render `name` over the largest chronological subset of `items` that
    /// fits the prompt budget.
    fn prepare<'s, T, F>(&'s self, name: &str, items: &[T], data: F) -> Result<Prepared<'s>>
    where
        T: Dated,
        F: Fn(&[&T]) -> Value,
    {
        let template = self.inner.templates.get(name)?;
        let config = &self.inner.config;
        let ordered = truncate::chronological(items);
        let (prompt, considered) = truncate::fit_to_budget(
            &ordered,
            config.prompt_budget,
            config.truncation,
            |subset| template.render(&data(subset)),
        )?;
        if considered < items.len() {
            warn!(
                template = %template.name,
                considered,
                total = items.len(),
                "input truncated to fit prompt budget"
            );
        }
        let request = CompletionRequest::new(prompt, template.params(&config.params))
            .with_template(template.tag());
        Ok(Prepared {
            template,
            request,
            considered,
            total: items.len(),
        })
    }

    /// Send a structured request, parse the reply, and re-prompt once with a
    /// corrective instruction if it does not parse.
    async fn structured<T, F>(
        &self,
        prepared: Prepared<'_>,
        deadline: &Deadline,
        fallback: F,
    ) -> Result<Analysis<Structured<T>>>
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        let Prepared {
            template,
            request,
            considered,
            total,
        } = prepared;

        let first = match self
            .inner
            .chain
            .complete_or_fallback(&request, deadline, |_| Some(fallback()))
            .await?
        {
            Outcome::Native(result) => result,
            Outcome::Degraded { value, .. } => {
                return Ok(Analysis::degraded(Structured::Parsed(value), None, total, total));
            }
        };

        let err = match parse::extract_json::<T>(&first.text) {
            Ok(value) => return Ok(Analysis::native(Structured::Parsed(value), &first, considered, total)),
            Err(e) => e,
        };

        warn!(template = %template.name, error = %err, "structured output did not parse, re-prompting");
        metrics::counter!(telemetry::CORRECTIVE_REPROMPTS_TOTAL,
            "operation" => template.name.clone(),
        )
        .increment(1);

        let instruction = template
            .corrective_instruction
            .as_deref()
            .unwrap_or(&self.inner.config.corrective_instruction);
        let corrective = CompletionRequest::new(
            format!("{}\n\n{instruction}", request.prompt),
            request.params.clone(),
        )
        .with_template(template.tag());

        match self.inner.chain.complete(&corrective, deadline).await {
            Ok(second) => match parse::extract_json::<T>(&second.text) {
                Ok(value) => Ok(Analysis::native(Structured::Parsed(value), &second, considered, total)),
                Err(e) => {
                    warn!(template = %template.name, error = %e, "corrective re-prompt did not parse either");
                    Ok(unparsed(second, considered, total))
                }
            },
            Err(e) => {
                warn!(template = %template.name, error = %e, "corrective re-prompt failed");
                Ok(unparsed(first, considered, total))
            }
        }
    }
}

fn unparsed<T>(result: CompletionResult, considered: usize, total: usize) -> Analysis<Structured<T>> {
    Analysis::degraded(
        Structured::Unparsed(result.text),
        Some(result.provider),
        considered,
        total,
    )
}
