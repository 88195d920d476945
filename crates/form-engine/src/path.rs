//! Field addresses whose array positions can move.

use std::{fmt, rc::Rc};

use form_signals::Signal;

/// One step of a [`FieldPath`].
#[derive(Clone)]
enum PathPart {
    /// Object member.
    Key(Rc<str>),
    /// Position of an array item; changes when items are renumbered.
    Position(Signal<usize>),
}

/// Address of a field inside the root form value.
///
/// Paths below an array item embed that item's position signal, so a binding built
/// once keeps pointing at its own item after inserts and removals renumber it.
/// Resolving a path inside a memo or effect tracks those positions.
#[derive(Clone, Default)]
pub struct FieldPath {
    /// Steps from the root.
    parts: Vec<PathPart>,
}

impl FieldPath {
    /// The root of the form value.
    pub fn root() -> Self {
        Self::default()
    }

    /// A path made only of keys, parsed from dotted form.
    pub fn parse(path: &str) -> Self {
        Self {
            parts: path
                .split('.')
                .filter(|p| !p.is_empty())
                .map(|p| PathPart::Key(p.into()))
                .collect(),
        }
    }

    /// This path extended by an object key.
    pub fn child(&self, key: &str) -> Self {
        let mut parts = self.parts.clone();
        parts.push(PathPart::Key(key.into()));
        Self { parts }
    }

    /// This path extended by a moving item position.
    pub fn item(&self, position: Signal<usize>) -> Self {
        let mut parts = self.parts.clone();
        parts.push(PathPart::Position(position));
        Self { parts }
    }

    /// True when no step depends on an item position.
    pub fn is_static(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, PathPart::Key(_)))
    }

    /// True for the root path.
    pub fn is_root(&self) -> bool {
        self.parts.is_empty()
    }

    /// Dotted path, tracking any item positions it crosses.
    pub fn resolve(&self) -> String {
        self.render(true)
    }

    /// Dotted path without tracking.
    pub fn resolve_untracked(&self) -> String {
        self.render(false)
    }

    /// Join the parts.
    fn render(&self, track: bool) -> String {
        let mut out = String::new();
        for part in &self.parts {
            if !out.is_empty() {
                out.push('.');
            }
            match part {
                PathPart::Key(k) => out.push_str(k),
                PathPart::Position(p) => {
                    let i = if track { p.get() } else { p.get_untracked() };
                    out.push_str(&i.to_string());
                }
            }
        }
        out
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resolve_untracked())
    }
}

impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldPath({:?})", self.resolve_untracked())
    }
}
