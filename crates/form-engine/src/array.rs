//! Repeating items under an array key.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use form_condition::{set_at, value_at};
use form_config::{ArrayField, array_item_default};
use form_events::FormEvent;
use form_signals::{Effect, Memo, Signal};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    Error, FieldBindings, FieldPath, FieldSignalContext, Result, context::ArrayScope, mapper,
};

/// Stable identity of an array item; survives renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Public view of one item.
#[derive(Clone, Debug)]
pub struct ItemHandle {
    /// Stable identity.
    pub id: ItemId,
    /// Current position; always `0..len`.
    pub position: Signal<usize>,
}

/// One live item.
struct ArrayItem {
    /// Stable identity.
    id: ItemId,
    /// Current position.
    position: Signal<usize>,
    /// Bindings built from the template.
    bindings: Vec<FieldBindings>,
}

impl ArrayItem {
    /// Release the item's memos and position.
    fn dispose(&self) {
        for b in &self.bindings {
            b.dispose();
        }
        self.position.dispose();
    }
}

/// Keeps the items of one array contiguous and in step with the form value.
///
/// The form value at the array path is the ordered list of item values; this
/// controller owns the matching item handles. Every mutation edits both in one
/// batch, then renumbers positions so they stay `0..len` with no gaps.
pub struct ArrayFieldController {
    /// Array field key.
    key: String,
    /// Full path of the array in the form value.
    path: String,
    /// Definition, for the item template.
    field: Rc<ArrayField>,
    /// Context the array was bound in.
    ctx: FieldSignalContext,
    /// Items in position order.
    items: RefCell<Vec<ArrayItem>>,
    /// Item ids in position order, for reactive consumers.
    ids: Signal<Vec<ItemId>>,
    /// Next id to hand out.
    next_id: Cell<u64>,
    /// Length of the array in the form value, and the effect resyncing on change.
    follower: RefCell<Option<(Memo<usize>, Effect)>>,
}

impl fmt::Debug for ArrayFieldController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayFieldController")
            .field("path", &self.path)
            .field("items", &self.ids.get_untracked())
            .finish()
    }
}

impl ArrayFieldController {
    /// Controller for the array at `path`, with one item per entry already in the
    /// form value.
    pub(crate) fn new(field: Rc<ArrayField>, path: String, ctx: FieldSignalContext) -> Self {
        let ids = ctx.runtime().signal(Vec::new());
        let this = Self {
            key: field.base.key.clone(),
            path,
            field,
            ctx,
            items: RefCell::new(Vec::new()),
            ids,
            next_id: Cell::new(0),
            follower: RefCell::new(None),
        };
        this.sync();
        this
    }

    /// Resync whenever the array's length in the form value changes, whoever
    /// wrote it.
    pub(crate) fn follow(self: &Rc<Self>) {
        let (root, path) = (self.ctx.root().clone(), self.path.clone());
        let rt = self.ctx.runtime();
        let len = rt.memo(move || root.with(|v| array_len(v, &path)));
        let me = Rc::downgrade(self);
        let watched = len.clone();
        let fx = rt.effect(move || {
            let target = watched.get();
            let Some(me) = me.upgrade() else {
                return;
            };
            if target != me.len() {
                me.ctx.runtime().untrack(|| me.sync());
            }
        });
        if let Some((memo, old)) = self.follower.replace(Some((len, fx))) {
            old.dispose();
            memo.dispose();
        }
    }

    /// Stop following the form value and release every item.
    pub(crate) fn dispose(&self) {
        if let Some((memo, fx)) = self.follower.take() {
            fx.dispose();
            memo.dispose();
        }
        for item in self.items.borrow_mut().drain(..) {
            item.dispose();
        }
    }

    /// Array field key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Full array path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// True when there are no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item ids in order, tracked.
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.ids.get()
    }

    /// Item handles in order.
    pub fn items(&self) -> Vec<ItemHandle> {
        self.items
            .borrow()
            .iter()
            .map(|i| ItemHandle {
                id: i.id,
                position: i.position.clone(),
            })
            .collect()
    }

    /// Bindings of the item with `id`.
    pub fn item_bindings(&self, id: ItemId) -> Option<Vec<FieldBindings>> {
        self.items
            .borrow()
            .iter()
            .find(|i| i.id == id)
            .map(|i| i.bindings.clone())
    }

    /// Bindings of every item, in order.
    pub fn all_item_bindings(&self) -> Vec<Vec<FieldBindings>> {
        self.items
            .borrow()
            .iter()
            .map(|i| i.bindings.clone())
            .collect()
    }

    /// Current item values.
    pub fn values(&self) -> Vec<Value> {
        self.ctx.root().with_untracked(|v| {
            value_at(v, &self.path)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        })
    }

    /// Add an item built from the template at `index` (default: the end).
    pub fn append(&self, index: Option<usize>) -> Result<ItemId> {
        self.insert(index.unwrap_or_else(|| self.len()))
    }

    /// Add an item at the front.
    pub fn prepend(&self) -> Result<ItemId> {
        self.insert(0)
    }

    /// Add an item at `index`; `index == len` appends.
    pub fn insert(&self, index: usize) -> Result<ItemId> {
        let len = self.settled_len();
        if index > len {
            return Err(self.out_of_range(index, len));
        }
        let default = array_item_default(&self.field);
        let id = self.ctx.runtime().batch(|| {
            self.edit(index, |a| a.insert(index, default))?;
            let item = self.new_item(index);
            let id = item.id;
            self.items.borrow_mut().insert(index, item);
            self.renumber();
            Ok::<_, Error>(id)
        })?;
        debug!(array = %self.path, index, item = %id, "array item added");
        Ok(id)
    }

    /// Remove the item at `index` (default: the last).
    pub fn remove(&self, index: Option<usize>) -> Result<ItemId> {
        let len = self.settled_len();
        let index = match index {
            Some(i) => i,
            None => len.checked_sub(1).ok_or_else(|| self.out_of_range(0, len))?,
        };
        if index >= len {
            return Err(self.out_of_range(index, len));
        }
        let item = self.ctx.runtime().batch(|| {
            self.edit(index + 1, |a| {
                a.remove(index);
            })?;
            let item = self.items.borrow_mut().remove(index);
            self.renumber();
            Ok::<_, Error>(item)
        })?;
        item.dispose();
        debug!(array = %self.path, index, item = %item.id, "array item removed");
        Ok(item.id)
    }

    /// Remove the last item.
    pub fn pop(&self) -> Result<ItemId> {
        self.remove(None)
    }

    /// Remove the first item.
    pub fn shift(&self) -> Result<ItemId> {
        self.remove(Some(0))
    }

    /// Move the item at `from` so it ends up at `to`.
    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        let len = self.settled_len();
        for i in [from, to] {
            if i >= len {
                return Err(self.out_of_range(i, len));
            }
        }
        if from == to {
            return Ok(());
        }
        self.ctx.runtime().batch(|| {
            self.edit(from.max(to) + 1, |a| {
                let v = a.remove(from);
                a.insert(to, v);
            })?;
            {
                let mut items = self.items.borrow_mut();
                let item = items.remove(from);
                items.insert(to, item);
            }
            self.renumber();
            Ok::<_, Error>(())
        })?;
        debug!(array = %self.path, from, to, "array item moved");
        Ok(())
    }

    /// Apply an array command addressed to this array.
    pub fn apply(&self, event: &FormEvent) -> Result<()> {
        match event {
            FormEvent::AddArrayItem { index, .. } => self.append(*index).map(drop),
            FormEvent::PrependArrayItem { .. } => self.prepend().map(drop),
            FormEvent::InsertArrayItem { index, .. } => self.insert(*index).map(drop),
            FormEvent::RemoveArrayItem { index, .. } => self.remove(*index).map(drop),
            FormEvent::PopArrayItem { .. } => self.pop().map(drop),
            FormEvent::ShiftArrayItem { .. } => self.shift().map(drop),
            FormEvent::MoveArrayItem { from, to, .. } => self.move_item(*from, *to),
            other => {
                debug!(array = %self.path, event = other.event_type(), "not an array command");
                Ok(())
            }
        }
    }

    /// Grow or shrink the item list at the end to match the form value.
    pub(crate) fn sync(&self) {
        let target = self.ctx.root().with_untracked(|v| array_len(v, &self.path));
        let len = self.len();
        if target == len {
            return;
        }
        let removed = self.ctx.runtime().batch(|| {
            for index in len..target {
                let item = self.new_item(index);
                self.items.borrow_mut().push(item);
            }
            let removed: Vec<ArrayItem> = if target < len {
                self.items.borrow_mut().drain(target..).collect()
            } else {
                Vec::new()
            };
            self.renumber();
            removed
        });
        for item in &removed {
            item.dispose();
        }
        debug!(array = %self.path, from = len, to = target, "array items synced with form value");
    }

    /// Build a fresh item at `index`.
    fn new_item(&self, index: usize) -> ArrayItem {
        let id = ItemId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        let position = self.ctx.runtime().signal(index);
        let scope = ArrayScope {
            array_path: self.path.clone(),
            item: id,
            position: position.clone(),
        };
        let item_path = FieldPath::parse(&self.path).item(position.clone());
        let bindings = mapper::build_item(&self.field.template, &item_path, &self.ctx.in_item(scope));
        ArrayItem {
            id,
            position,
            bindings,
        }
    }

    /// Give every item its index and publish the id order.
    fn renumber(&self) {
        let (positions, ids): (Vec<Signal<usize>>, Vec<ItemId>) = self
            .items
            .borrow()
            .iter()
            .map(|i| (i.position.clone(), i.id))
            .unzip();
        for (i, p) in positions.iter().enumerate() {
            p.set(i);
        }
        self.ids.set(ids);
    }

    /// Item count after catching up with writes made around this controller.
    fn settled_len(&self) -> usize {
        self.sync();
        self.len()
    }

    /// Edit the array in the form value, which must hold at least `need` items.
    fn edit(&self, need: usize, f: impl FnOnce(&mut Vec<Value>)) -> Result<()> {
        let have = self.values().len();
        if have < need {
            return Err(self.out_of_range(need.saturating_sub(1), have));
        }
        let path = &self.path;
        self.ctx.root().update(|root| {
            let mut items = value_at(root, path)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            f(&mut items);
            if !set_at(root, path, Value::Array(items)) {
                warn!(array = %path, "array path could not be written");
            }
        });
        Ok(())
    }

    /// Range error for this array.
    fn out_of_range(&self, index: usize, len: usize) -> Error {
        Error::IndexOutOfRange {
            key: self.path.clone(),
            index,
            len,
        }
    }
}

/// Length of the array at `path`, 0 when there is none.
fn array_len(root: &Value, path: &str) -> usize {
    value_at(root, path).and_then(Value::as_array).map_or(0, Vec::len)
}
