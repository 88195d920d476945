use std::collections::BTreeMap;

use form_config::FieldKind;

/// How a field kind is turned into bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mapper {
    /// Value-bearing leaf: owns a two-way value cell.
    Value,
    /// Row, group or page: passes the form value through to its children.
    Container,
    /// Repeating items managed by an array controller.
    Array,
    /// Dispatches an event when pressed.
    Button,
    /// Display only.
    Text,
}

impl Mapper {
    /// Mapper every field kind uses.
    pub fn for_kind(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Array => Self::Array,
            FieldKind::Text => Self::Text,
            k if k.is_value() => Self::Value,
            k if k.is_container() => Self::Container,
            _ => Self::Button,
        }
    }
}

/// Registry entry for one field kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Renderer component identifier.
    pub component: String,
    /// Binding strategy.
    pub mapper: Mapper,
}

/// Maps each field type tag to a renderer component and a mapper.
///
/// Every kind starts with its wire name as component identifier; renderers override
/// components, never mappers.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    /// One entry per kind.
    entries: BTreeMap<FieldKind, RegistryEntry>,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self {
            entries: FieldKind::ALL
                .into_iter()
                .map(|k| {
                    (
                        k,
                        RegistryEntry {
                            component: k.as_str().to_string(),
                            mapper: Mapper::for_kind(k),
                        },
                    )
                })
                .collect(),
        }
    }
}

impl FieldRegistry {
    /// Registry with default components.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the component rendered for `kind`.
    pub fn set_component(&mut self, kind: FieldKind, component: impl Into<String>) -> &mut Self {
        if let Some(e) = self.entries.get_mut(&kind) {
            e.component = component.into();
        }
        self
    }

    /// Builder form of [`set_component`](Self::set_component).
    pub fn with_component(mut self, kind: FieldKind, component: impl Into<String>) -> Self {
        self.set_component(kind, component);
        self
    }

    /// Component identifier for `kind`.
    pub fn component(&self, kind: FieldKind) -> &str {
        self.entries
            .get(&kind)
            .map_or_else(|| kind.as_str(), |e| e.component.as_str())
    }

    /// Mapper for `kind`.
    pub fn mapper(&self, kind: FieldKind) -> Mapper {
        self.entries
            .get(&kind)
            .map_or_else(|| Mapper::for_kind(kind), |e| e.mapper)
    }

    /// Entry for a wire type name.
    pub fn lookup(&self, type_name: &str) -> Option<&RegistryEntry> {
        FieldKind::from_name(type_name).and_then(|k| self.entries.get(&k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_mapper_and_overrides_keep_it() {
        let reg = FieldRegistry::new().with_component(FieldKind::Datepicker, "MaterialDate");
        assert_eq!(reg.component(FieldKind::Datepicker), "MaterialDate");
        assert_eq!(reg.mapper(FieldKind::Datepicker), Mapper::Value);
        assert_eq!(reg.component(FieldKind::Input), "input");
        assert_eq!(reg.mapper(FieldKind::Group), Mapper::Container);
        assert_eq!(reg.mapper(FieldKind::Array), Mapper::Array);
        assert_eq!(reg.mapper(FieldKind::RemoveArrayItem), Mapper::Button);
        assert_eq!(reg.mapper(FieldKind::Text), Mapper::Text);
        assert_eq!(
            reg.lookup("multi-checkbox").map(|e| e.mapper),
            Some(Mapper::Value)
        );
        assert!(reg.lookup("carousel").is_none());
    }
}
