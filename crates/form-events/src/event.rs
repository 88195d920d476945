use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire names of the built-in event types.
pub mod types {
    /// Advance one page.
    pub const NEXT_PAGE: &str = "next-page";
    /// Go back one page.
    pub const PREVIOUS_PAGE: &str = "previous-page";
    /// The current page changed.
    pub const PAGE_CHANGE: &str = "page-change";
    /// Submit the form.
    pub const SUBMIT: &str = "submit";
    /// Append (or insert at an explicit index) an array item.
    pub const ADD_ARRAY_ITEM: &str = "add-array-item";
    /// Insert an array item at the front.
    pub const PREPEND_ARRAY_ITEM: &str = "prepend-array-item";
    /// Insert an array item at an index.
    pub const INSERT_ARRAY_ITEM: &str = "insert-array-item";
    /// Remove an array item (last when no index).
    pub const REMOVE_ARRAY_ITEM: &str = "remove-array-item";
    /// Remove the last array item.
    pub const POP_ARRAY_ITEM: &str = "pop-array-item";
    /// Remove the first array item.
    pub const SHIFT_ARRAY_ITEM: &str = "shift-array-item";
    /// Move an array item to a new position.
    pub const MOVE_ARRAY_ITEM: &str = "move-array-item";
    /// A renderer component finished mounting.
    pub const COMPONENT_INITIALIZED: &str = "component-initialized";

    /// Event types that mutate an array.
    pub const ARRAY_COMMANDS: &[&str] = &[
        ADD_ARRAY_ITEM,
        PREPEND_ARRAY_ITEM,
        INSERT_ARRAY_ITEM,
        REMOVE_ARRAY_ITEM,
        POP_ARRAY_ITEM,
        SHIFT_ARRAY_ITEM,
        MOVE_ARRAY_ITEM,
    ];
}

/// A discrete user or system action carried by the [`EventBus`](crate::EventBus).
///
/// Each variant carries only what its consumer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum FormEvent {
    /// Request navigation to the next page.
    NextPage,
    /// Request navigation to the previous page.
    PreviousPage,
    /// The current page changed.
    PageChange {
        /// New page index.
        current_page_index: usize,
        /// Number of pages.
        total_pages: usize,
        /// Page index before the change.
        previous_page_index: usize,
    },
    /// Request form submission.
    Submit,
    /// Add an item; appended unless `index` is given.
    AddArrayItem {
        /// Path of the target array.
        array_key: String,
        /// Insertion position.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// Add an item at the front.
    PrependArrayItem {
        /// Path of the target array.
        array_key: String,
    },
    /// Add an item at `index`.
    InsertArrayItem {
        /// Path of the target array.
        array_key: String,
        /// Insertion position.
        index: usize,
    },
    /// Remove the item at `index`, or the last item.
    RemoveArrayItem {
        /// Path of the target array.
        array_key: String,
        /// Position to remove.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// Remove the last item.
    PopArrayItem {
        /// Path of the target array.
        array_key: String,
    },
    /// Remove the first item.
    ShiftArrayItem {
        /// Path of the target array.
        array_key: String,
    },
    /// Move the item at `from` so it ends up at `to`.
    MoveArrayItem {
        /// Path of the target array.
        array_key: String,
        /// Current position.
        from: usize,
        /// Final position.
        to: usize,
    },
    /// A renderer component mounted.
    ComponentInitialized {
        /// Component kind, e.g. `array` or `page`.
        component_type: String,
        /// Component identity, usually the field path.
        component_id: String,
    },
    /// An application-defined event from a `button` field.
    Custom {
        /// Application event type; subscriptions match on this name.
        event_type: String,
        /// Resolved arguments.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<Value>,
    },
}

impl FormEvent {
    /// The name subscriptions filter on.
    pub fn event_type(&self) -> &str {
        match self {
            Self::NextPage => types::NEXT_PAGE,
            Self::PreviousPage => types::PREVIOUS_PAGE,
            Self::PageChange { .. } => types::PAGE_CHANGE,
            Self::Submit => types::SUBMIT,
            Self::AddArrayItem { .. } => types::ADD_ARRAY_ITEM,
            Self::PrependArrayItem { .. } => types::PREPEND_ARRAY_ITEM,
            Self::InsertArrayItem { .. } => types::INSERT_ARRAY_ITEM,
            Self::RemoveArrayItem { .. } => types::REMOVE_ARRAY_ITEM,
            Self::PopArrayItem { .. } => types::POP_ARRAY_ITEM,
            Self::ShiftArrayItem { .. } => types::SHIFT_ARRAY_ITEM,
            Self::MoveArrayItem { .. } => types::MOVE_ARRAY_ITEM,
            Self::ComponentInitialized { .. } => types::COMPONENT_INITIALIZED,
            Self::Custom { event_type, .. } => event_type.as_str(),
        }
    }

    /// Target array of an array command.
    pub fn array_key(&self) -> Option<&str> {
        match self {
            Self::AddArrayItem { array_key, .. }
            | Self::PrependArrayItem { array_key }
            | Self::InsertArrayItem { array_key, .. }
            | Self::RemoveArrayItem { array_key, .. }
            | Self::PopArrayItem { array_key }
            | Self::ShiftArrayItem { array_key }
            | Self::MoveArrayItem { array_key, .. } => Some(array_key.as_str()),
            _ => None,
        }
    }

    /// `add-array-item` appending to `array_key`.
    pub fn add_array_item(array_key: impl Into<String>) -> Self {
        Self::AddArrayItem {
            array_key: array_key.into(),
            index: None,
        }
    }

    /// `remove-array-item` at `index` of `array_key`.
    pub fn remove_array_item(array_key: impl Into<String>, index: usize) -> Self {
        Self::RemoveArrayItem {
            array_key: array_key.into(),
            index: Some(index),
        }
    }

    /// Application event with arguments.
    pub fn custom(event_type: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Custom {
            event_type: event_type.into(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wire_format_uses_type_tags_and_camel_case() {
        let e = FormEvent::PageChange {
            current_page_index: 1,
            total_pages: 3,
            previous_page_index: 0,
        };
        assert_eq!(
            serde_json::to_value(&e).unwrap(),
            json!({ "type": "page-change", "currentPageIndex": 1, "totalPages": 3, "previousPageIndex": 0 })
        );
        let back: FormEvent =
            serde_json::from_value(json!({ "type": "add-array-item", "arrayKey": "contacts" }))
                .unwrap();
        assert_eq!(back, FormEvent::add_array_item("contacts"));
        assert_eq!(back.event_type(), types::ADD_ARRAY_ITEM);
        assert_eq!(back.array_key(), Some("contacts"));
    }

    #[test]
    fn custom_events_are_typed_by_their_own_name() {
        let e = FormEvent::custom("save-draft", vec![json!(1)]);
        assert_eq!(e.event_type(), "save-draft");
        assert_eq!(e.array_key(), None);
    }
}
