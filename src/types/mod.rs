//! Public types for the journal LLM layer.

mod analysis;
mod deadline;
mod health;
mod journal;
mod request;
mod response;

pub use analysis::{
    Analysis, EntryMetadata, ExpenseReport, OutputStatus, PlaceRecommendation, Structured,
};
pub use deadline::Deadline;
pub use health::{CircuitState, ProviderHealth};
pub use journal::{Dated, Expense, JournalEntry};
pub use request::{CompletionRequest, GenerationParams, TemplateTag};
pub use response::{CompletionResult, Usage};
