//! Page navigation for multi-step forms.
//!
//! [`PageOrchestrator`] owns the current page index, derives the first/last flags
//! from it, and announces every real move as a `page-change` on the form's
//! [`form_events::EventBus`].

mod error;
mod orchestrator;

#[cfg(test)]
mod test_orchestrator;

pub use error::{NavigationError, NavigationResult};
pub use orchestrator::{PageOrchestrator, PageOrchestratorState};
