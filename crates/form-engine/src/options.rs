use form_condition::CustomFunctions;
use form_events::EventBus;
use serde_json::Value;

use crate::FieldRegistry;

/// When pages outside the navigation window get their bindings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageMounting {
    /// The current page and its neighbours mount immediately; the rest wait for
    /// [`crate::FormEngine::run_idle`].
    #[default]
    Window,
    /// Every page mounts at build time and stays mounted.
    All,
}

/// Rust-side construction options for [`crate::FormEngine`].
#[derive(Debug, Clone, Default)]
pub struct FormOptions {
    /// Host functions for `custom` conditions and validators.
    pub custom_functions: CustomFunctions,
    /// Initial form value, overlaid on the configured defaults.
    pub initial_value: Option<Value>,
    /// Bus to share with the host; a fresh isolated bus when `None`.
    pub bus: Option<EventBus>,
    /// Page mounting policy.
    pub page_mounting: PageMounting,
    /// Cap on effect runs while one change settles.
    pub max_settle_runs: Option<usize>,
    /// Refuse configurations with authoring mistakes instead of warning.
    pub strict: bool,
    /// Component identifiers per field kind.
    pub registry: FieldRegistry,
}

impl FormOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `functions` for `custom` conditions and validators.
    pub fn with_custom_functions(mut self, functions: CustomFunctions) -> Self {
        self.custom_functions = functions;
        self
    }

    /// Start from `value` instead of the bare defaults.
    pub fn with_initial_value(mut self, value: Value) -> Self {
        self.initial_value = Some(value);
        self
    }

    /// Share `bus` with the host.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Choose the page mounting policy.
    pub fn with_page_mounting(mut self, mounting: PageMounting) -> Self {
        self.page_mounting = mounting;
        self
    }

    /// Fail construction on configuration mistakes.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}
