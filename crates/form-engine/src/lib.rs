//! Form Engine
//!
//! Turns a [`form_config::FormConfig`] into a live, reactive form:
//! - one root value signal is the single source of truth; every field reads and
//!   writes through a [`FieldValue`] cell over it
//! - hidden/required/readonly/disabled rules become reactive [`Binding`]s
//! - derivations recompute dependent fields in dependency order
//! - arrays keep stable [`ItemId`]s and contiguous positions through every edit
//! - paged forms navigate through [`form_pages::PageOrchestrator`] and mount only
//!   the pages around the current one
//! - buttons press into [`form_events::EventBus`] commands
//!
//! [`FormEngine`] is the type you construct and drive. Everything settles
//! synchronously on the calling thread.

mod array;
mod binding;
mod context;
mod derivation;
mod engine;
mod error;
mod mapper;
mod mount;
mod options;
mod path;
mod registry;
mod validation;
mod value;

pub use array::{ArrayFieldController, ItemHandle, ItemId};
pub use binding::{Binding, ButtonBinding, FieldBindings};
pub use context::{ArrayScope, FieldSignalContext};
pub use engine::FormEngine;
pub use error::{Error, Result};
pub use mount::MountState;
pub use options::{FormOptions, PageMounting};
pub use path::FieldPath;
pub use registry::{FieldRegistry, Mapper, RegistryEntry};
pub use validation::{FieldError, ValidationError};
pub use value::{FieldHandle, FieldValue};
