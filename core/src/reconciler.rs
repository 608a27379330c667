//! The in-memory todo collection and the rules for changing it.
//!
//! # Design
//! `TodoList` owns the ordered collection, the current filter, the store,
//! and a clock. Every mutation goes through `&mut self`, and the view layer
//! reaches all of them through `dispatch`, so there is exactly one update
//! entry point and no shared mutable state.
//!
//! Local state changes only after the store confirms, with one exception:
//! `clear_completed` removes every completed entry locally whatever the
//! individual deletes returned. Nothing is rolled back because nothing is
//! applied before confirmation.
//!
//! Reordering is local only. There is no reorder endpoint, so `load`
//! restores the server's order.

use std::thread;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::ApiError;
use crate::store::TodoStore;
use crate::types::{FilterType, Todo};

/// Upper bound on concurrent deletes issued by `clear_completed`.
pub const MAX_DELETE_WORKERS: usize = 8;

/// A user action raised by the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Load,
    Add(String),
    Toggle(Uuid),
    Rename { id: Uuid, title: String },
    Remove(Uuid),
    ClearCompleted,
    /// `to: None` means the item was dropped outside the list.
    Reorder { from: usize, to: Option<usize> },
    SetFilter(FilterType),
}

/// What a dispatched intent changed.
#[derive(Debug)]
pub enum Outcome {
    Loaded(usize),
    Added(Uuid),
    Updated(Uuid),
    Removed(Uuid),
    Cleared(ClearReport),
    Reordered,
    FilterChanged(FilterType),
    Unchanged,
}

/// Result of `clear_completed`. Every id in either list is gone locally.
#[derive(Debug, Default)]
pub struct ClearReport {
    pub removed: Vec<Uuid>,
    pub failed: Vec<(Uuid, ApiError)>,
}

impl ClearReport {
    pub fn total(&self) -> usize {
        self.removed.len() + self.failed.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub active: usize,
    pub completed: usize,
}

/// Lazy view over the collection in its current order. Clone it to iterate
/// again from the start.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    inner: std::slice::Iter<'a, Todo>,
    filter: FilterType,
}

impl<'a> Iterator for FilteredView<'a> {
    type Item = &'a Todo;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.inner.find(|todo| filter.matches(todo))
    }
}

pub struct TodoList<S, C = SystemClock> {
    todos: Vec<Todo>,
    filter: FilterType,
    store: S,
    clock: C,
}

impl<S: TodoStore> TodoList<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: TodoStore, C: Clock> TodoList<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            todos: Vec::new(),
            filter: FilterType::default(),
            store,
            clock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.todos.iter().position(|t| t.id == id)
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }

    pub fn set_filter(&mut self, filter: FilterType) {
        self.filter = filter;
    }

    pub fn filtered_view(&self, filter: FilterType) -> FilteredView<'_> {
        FilteredView {
            inner: self.todos.iter(),
            filter,
        }
    }

    /// The collection under the current filter.
    pub fn visible(&self) -> FilteredView<'_> {
        self.filtered_view(self.filter)
    }

    pub fn counts(&self) -> Counts {
        let completed = self.todos.iter().filter(|t| t.completed).count();
        Counts {
            active: self.todos.len() - completed,
            completed,
        }
    }

    pub fn has_completed(&self) -> bool {
        self.todos.iter().any(|t| t.completed)
    }

    /// Replace the collection with the store's contents.
    pub fn load(&mut self) -> Result<usize, ApiError> {
        let todos = self.store.list().inspect_err(|e| warn!(error = %e, "loading todos failed"))?;
        debug!(count = todos.len(), "loaded todos");
        self.todos = todos;
        Ok(self.todos.len())
    }

    /// Create a todo and append it. Blank titles are ignored without a request.
    pub fn add(&mut self, title: &str) -> Result<Option<&Todo>, ApiError> {
        if title.trim().is_empty() {
            debug!("ignoring blank title");
            return Ok(None);
        }
        let todo = self
            .store
            .create(title)
            .inspect_err(|e| warn!(error = %e, "creating todo failed"))?;
        debug!(id = %todo.id, "added todo");
        self.todos.push(todo);
        Ok(self.todos.last())
    }

    /// Flip completion. Becoming completed stamps `completed_at` with the
    /// clock; becoming active clears it.
    pub fn toggle(&mut self, id: Uuid) -> Result<Option<&Todo>, ApiError> {
        let Some(index) = self.position(id) else {
            debug!(%id, "toggle of unknown todo ignored");
            return Ok(None);
        };
        let completed = !self.todos[index].completed;
        let completed_at = if completed { self.clock.now() } else { String::new() };
        let updated = self
            .store
            .set_completed(id, completed, &completed_at)
            .inspect_err(|e| warn!(%id, error = %e, "toggling todo failed"))?;
        debug!(%id, completed, "toggled todo");
        Ok(Some(self.put(index, updated)))
    }

    /// Change a title in place. Blank titles and unknown ids are ignored.
    pub fn rename(&mut self, id: Uuid, title: &str) -> Result<Option<&Todo>, ApiError> {
        if title.trim().is_empty() {
            return Ok(None);
        }
        let Some(index) = self.position(id) else {
            return Ok(None);
        };
        let updated = self
            .store
            .set_title(id, title)
            .inspect_err(|e| warn!(%id, error = %e, "renaming todo failed"))?;
        debug!(%id, "renamed todo");
        Ok(Some(self.put(index, updated)))
    }

    /// Delete remotely, then locally. A store that no longer has the todo
    /// counts as success, so repeating a remove is harmless. Returns whether
    /// a local entry was dropped.
    pub fn remove(&mut self, id: Uuid) -> Result<bool, ApiError> {
        match self.store.delete(id) {
            Ok(()) | Err(ApiError::NotFound) => {}
            Err(e) => {
                warn!(%id, error = %e, "deleting todo failed");
                return Err(e);
            }
        }
        let before = self.todos.len();
        self.todos.retain(|t| t.id != id);
        let removed = self.todos.len() != before;
        debug!(%id, removed, "removed todo");
        Ok(removed)
    }

    /// Delete every completed todo concurrently, wait for all of them, then
    /// drop all completed entries locally regardless of the outcomes.
    ///
    /// At most `MAX_DELETE_WORKERS` deletes are in flight; each worker takes
    /// an even share of the ids and deletes them in order.
    pub fn clear_completed(&mut self) -> ClearReport {
        let ids: Vec<Uuid> = self.todos.iter().filter(|t| t.completed).map(|t| t.id).collect();
        let store = &self.store;
        let batch = ids.len().div_ceil(MAX_DELETE_WORKERS).max(1);

        let results: Vec<(Uuid, Result<(), ApiError>)> = thread::scope(|scope| {
            let workers: Vec<_> = ids
                .chunks(batch)
                .map(|chunk| {
                    let handle = scope.spawn(move || {
                        chunk.iter().map(|&id| (id, store.delete(id))).collect::<Vec<_>>()
                    });
                    (chunk, handle)
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|(chunk, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        chunk
                            .iter()
                            .map(|&id| (id, Err(ApiError::Network("delete worker panicked".to_string()))))
                            .collect()
                    })
                })
                .collect()
        });

        let mut report = ClearReport::default();
        for (id, result) in results {
            match result {
                Ok(()) | Err(ApiError::NotFound) => report.removed.push(id),
                Err(e) => {
                    warn!(%id, error = %e, "deleting completed todo failed; dropping it locally anyway");
                    report.failed.push((id, e));
                }
            }
        }
        self.todos.retain(|t| !t.completed);
        debug!(removed = report.removed.len(), failed = report.failed.len(), "cleared completed");
        report
    }

    /// Move the entry at `from` to `to`. Local only.
    pub fn reorder(&mut self, from: usize, to: Option<usize>) -> bool {
        let Some(to) = to else {
            return false;
        };
        if from >= self.todos.len() {
            return false;
        }
        let item = self.todos.remove(from);
        let to = to.min(self.todos.len());
        self.todos.insert(to, item);
        debug!(from, to, "reordered todos");
        true
    }

    /// Overwrite the local copy of a todo changed elsewhere (e.g. the detail
    /// view). Unknown ids are ignored.
    pub fn replace(&mut self, todo: Todo) -> bool {
        match self.position(todo.id) {
            Some(index) => {
                self.todos[index] = todo;
                true
            }
            None => false,
        }
    }

    /// Forget a todo deleted elsewhere.
    pub fn forget(&mut self, id: Uuid) -> bool {
        let before = self.todos.len();
        self.todos.retain(|t| t.id != id);
        self.todos.len() != before
    }

    /// Single entry point for view intents.
    pub fn dispatch(&mut self, intent: Intent) -> Result<Outcome, ApiError> {
        debug!(?intent, "dispatch");
        let outcome = match intent {
            Intent::Load => Outcome::Loaded(self.load()?),
            Intent::Add(title) => match self.add(&title)? {
                Some(todo) => Outcome::Added(todo.id),
                None => Outcome::Unchanged,
            },
            Intent::Toggle(id) => match self.toggle(id)? {
                Some(todo) => Outcome::Updated(todo.id),
                None => Outcome::Unchanged,
            },
            Intent::Rename { id, title } => match self.rename(id, &title)? {
                Some(todo) => Outcome::Updated(todo.id),
                None => Outcome::Unchanged,
            },
            Intent::Remove(id) => {
                if self.remove(id)? {
                    Outcome::Removed(id)
                } else {
                    Outcome::Unchanged
                }
            }
            Intent::ClearCompleted => Outcome::Cleared(self.clear_completed()),
            Intent::Reorder { from, to } => {
                if self.reorder(from, to) {
                    Outcome::Reordered
                } else {
                    Outcome::Unchanged
                }
            }
            Intent::SetFilter(filter) => {
                self.set_filter(filter);
                Outcome::FilterChanged(filter)
            }
        };
        Ok(outcome)
    }

    fn put(&mut self, index: usize, todo: Todo) -> &Todo {
        self.todos[index] = todo;
        &self.todos[index]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::InMemoryStore;

    const NOW: &str = "2024-05-01T10:00:00.000Z";

    fn list() -> TodoList<InMemoryStore, FixedClock> {
        TodoList::with_clock(InMemoryStore::new(), FixedClock(NOW.to_string()))
    }

    /// A list loaded with `titles`, where titles ending in `*` start completed.
    fn seeded(titles: &[&str]) -> TodoList<InMemoryStore, FixedClock> {
        let mut list = list();
        for title in titles {
            let (name, done) = match title.strip_suffix('*') {
                Some(name) => (name, true),
                None => (*title, false),
            };
            let id = list.add(name).unwrap().unwrap().id;
            if done {
                list.toggle(id).unwrap();
            }
        }
        list
    }

    fn titles(list: &TodoList<InMemoryStore, FixedClock>) -> Vec<&str> {
        list.todos().iter().map(|t| t.title.as_str()).collect()
    }

    fn id_of(list: &TodoList<InMemoryStore, FixedClock>, title: &str) -> Uuid {
        list.todos().iter().find(|t| t.title == title).unwrap().id
    }

    #[test]
    fn blank_titles_are_ignored_without_a_request() {
        let mut list = list();
        assert!(list.add("").unwrap().is_none());
        assert!(list.add("   ").unwrap().is_none());
        assert!(list.is_empty());
        assert_eq!(list.store().calls(), 0);
    }

    #[test]
    fn add_appends_one_incomplete_entry() {
        let mut list = seeded(&["Existing"]);
        let todo = list.add("Buy milk").unwrap().unwrap().clone();
        assert_eq!(todo.title, "Buy milk");
        assert!(!todo.completed);
        assert_eq!(todo.completed_at, "");
        assert_eq!(titles(&list), ["Existing", "Buy milk"]);
    }

    #[test]
    fn failed_add_leaves_collection_unchanged() {
        let mut list = seeded(&["A"]);
        list.store().set_offline(true);
        assert!(matches!(list.add("B"), Err(ApiError::Network(_))));
        assert_eq!(titles(&list), ["A"]);
    }

    #[test]
    fn toggle_stamps_and_clears_completed_at() {
        let mut list = seeded(&["A", "B", "C"]);
        let id = id_of(&list, "B");

        let todo = list.toggle(id).unwrap().unwrap();
        assert!(todo.completed);
        assert_eq!(todo.completed_at, NOW);
        assert_eq!(list.position(id), Some(1));

        let todo = list.toggle(id).unwrap().unwrap();
        assert!(!todo.completed);
        assert_eq!(todo.completed_at, "");
        assert!(list.todos().iter().all(Todo::timestamps_consistent));
        assert_eq!(list.store().get(id).unwrap().completed_at, "");
    }

    #[test]
    fn toggle_of_unknown_id_is_a_no_op() {
        let mut list = seeded(&["A"]);
        let calls = list.store().calls();
        assert!(list.toggle(Uuid::new_v4()).unwrap().is_none());
        assert_eq!(list.store().calls(), calls);
    }

    #[test]
    fn failed_toggle_keeps_local_entry() {
        let mut list = seeded(&["A"]);
        let id = id_of(&list, "A");
        list.store().set_offline(true);
        assert!(list.toggle(id).is_err());
        assert!(!list.get(id).unwrap().completed);
    }

    #[test]
    fn rename_replaces_in_place() {
        let mut list = seeded(&["A", "B"]);
        let id = id_of(&list, "A");
        list.rename(id, "Alpha").unwrap();
        assert_eq!(titles(&list), ["Alpha", "B"]);
        assert!(list.rename(id, "  ").unwrap().is_none());
        assert_eq!(titles(&list), ["Alpha", "B"]);
    }

    #[test]
    fn remove_twice_is_a_no_op_the_second_time() {
        let mut list = seeded(&["A", "B"]);
        let id = id_of(&list, "A");
        assert!(list.remove(id).unwrap());
        assert!(!list.remove(id).unwrap());
        assert_eq!(titles(&list), ["B"]);
    }

    #[test]
    fn failed_remove_keeps_entry() {
        let mut list = seeded(&["A"]);
        let id = id_of(&list, "A");
        list.store().fail_deletes_of(id);
        assert!(list.remove(id).is_err());
        assert_eq!(titles(&list), ["A"]);
    }

    #[test]
    fn reorder_moves_element() {
        let mut list = seeded(&["A", "B", "C", "D"]);
        assert!(list.reorder(0, Some(2)));
        assert_eq!(titles(&list), ["B", "C", "A", "D"]);
    }

    #[test]
    fn reorder_without_destination_or_source_is_a_no_op() {
        let mut list = seeded(&["A", "B", "C"]);
        assert!(!list.reorder(0, None));
        assert!(!list.reorder(7, Some(0)));
        assert_eq!(titles(&list), ["A", "B", "C"]);
    }

    #[test]
    fn reorder_past_the_end_appends() {
        let mut list = seeded(&["A", "B", "C"]);
        assert!(list.reorder(0, Some(10)));
        assert_eq!(titles(&list), ["B", "C", "A"]);
    }

    #[test]
    fn reorder_is_local_only() {
        let mut list = seeded(&["A", "B"]);
        let calls = list.store().calls();
        list.reorder(1, Some(0));
        assert_eq!(list.store().calls(), calls);
        list.load().unwrap();
        assert_eq!(titles(&list), ["A", "B"]);
    }

    #[test]
    fn clear_completed_keeps_only_active() {
        let mut list = seeded(&["A*", "B", "C*"]);
        let report = list.clear_completed();
        assert_eq!(titles(&list), ["B"]);
        assert_eq!(report.removed.len(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(list.store().todos().len(), 1);
    }

    #[test]
    fn clear_completed_drops_locally_even_when_deletes_fail() {
        let mut list = seeded(&["A*", "B", "C*"]);
        let a = id_of(&list, "A");
        list.store().fail_deletes_of(a);

        let report = list.clear_completed();
        assert_eq!(titles(&list), ["B"]);
        assert_eq!(report.total(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, a);
        // The server still has A; a reload brings it back.
        list.load().unwrap();
        assert_eq!(titles(&list), ["A", "B"]);
    }

    /// Counts deletes in flight on top of an `InMemoryStore`.
    #[derive(Default)]
    struct Gauged {
        inner: InMemoryStore,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl TodoStore for Gauged {
        fn list(&self) -> Result<Vec<Todo>, ApiError> {
            self.inner.list()
        }

        fn get(&self, id: Uuid) -> Result<Todo, ApiError> {
            self.inner.get(id)
        }

        fn create(&self, title: &str) -> Result<Todo, ApiError> {
            self.inner.create(title)
        }

        fn set_completed(&self, id: Uuid, completed: bool, completed_at: &str) -> Result<Todo, ApiError> {
            self.inner.set_completed(id, completed, completed_at)
        }

        fn set_title(&self, id: Uuid, title: &str) -> Result<Todo, ApiError> {
            self.inner.set_title(id, title)
        }

        fn delete(&self, id: Uuid) -> Result<(), ApiError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            let result = self.inner.delete(id);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    #[test]
    fn clear_completed_caps_concurrent_deletes() {
        let mut list = TodoList::with_clock(Gauged::default(), FixedClock(NOW.to_string()));
        for i in 0..MAX_DELETE_WORKERS * 3 + 1 {
            let id = list.add(&format!("todo {i}")).unwrap().unwrap().id;
            list.toggle(id).unwrap();
        }
        list.add("keep").unwrap();

        let report = list.clear_completed();
        assert_eq!(report.removed.len(), MAX_DELETE_WORKERS * 3 + 1);
        assert!(report.failed.is_empty());
        assert_eq!(list.len(), 1);
        assert_eq!(list.store().inner.todos().len(), 1);
        let peak = list.store().peak.load(Ordering::SeqCst);
        assert!((1..=MAX_DELETE_WORKERS).contains(&peak), "peak of {peak} deletes in flight");
    }

    #[test]
    fn clear_completed_with_nothing_completed_sends_nothing() {
        let mut list = seeded(&["A", "B"]);
        let calls = list.store().calls();
        let report = list.clear_completed();
        assert_eq!(report.total(), 0);
        assert_eq!(list.store().calls(), calls);
    }

    #[test]
    fn active_and_completed_partition_all() {
        for titles in [
            &[][..],
            &["A"][..],
            &["A*"][..],
            &["A*", "B", "C*"][..],
            &["A", "B", "C", "D*", "E"][..],
        ] {
            let list = seeded(titles);
            let all: HashSet<Uuid> = list.filtered_view(FilterType::All).map(|t| t.id).collect();
            let active: HashSet<Uuid> = list.filtered_view(FilterType::Active).map(|t| t.id).collect();
            let completed: HashSet<Uuid> =
                list.filtered_view(FilterType::Completed).map(|t| t.id).collect();

            assert!(active.is_disjoint(&completed), "{titles:?}");
            assert_eq!(&active | &completed, all, "{titles:?}");
            assert_eq!(all.len(), list.len());
        }
    }

    #[test]
    fn filtered_view_keeps_order_and_restarts() {
        let mut list = seeded(&["A", "B*", "C", "D*"]);
        list.reorder(3, Some(0));
        let view = list.filtered_view(FilterType::Completed);
        let first: Vec<&str> = view.clone().map(|t| t.title.as_str()).collect();
        let second: Vec<&str> = view.map(|t| t.title.as_str()).collect();
        assert_eq!(first, ["D", "B"]);
        assert_eq!(first, second);
    }

    #[test]
    fn counts_and_has_completed() {
        let list = seeded(&["A", "B*", "C"]);
        assert_eq!(list.counts(), Counts { active: 2, completed: 1 });
        assert!(list.has_completed());
        assert!(!seeded(&["A"]).has_completed());
    }

    #[test]
    fn dispatch_routes_intents() {
        let mut list = list();
        let id = match list.dispatch(Intent::Add("Walk dog".into())).unwrap() {
            Outcome::Added(id) => id,
            other => panic!("unexpected {other:?}"),
        };
        assert!(matches!(list.dispatch(Intent::Add(" ".into())).unwrap(), Outcome::Unchanged));
        assert!(matches!(list.dispatch(Intent::Toggle(id)).unwrap(), Outcome::Updated(_)));
        assert!(matches!(
            list.dispatch(Intent::SetFilter(FilterType::Active)).unwrap(),
            Outcome::FilterChanged(FilterType::Active)
        ));
        assert_eq!(list.visible().count(), 0);
        assert!(matches!(
            list.dispatch(Intent::Reorder { from: 0, to: None }).unwrap(),
            Outcome::Unchanged
        ));
        match list.dispatch(Intent::ClearCompleted).unwrap() {
            Outcome::Cleared(report) => assert_eq!(report.removed, vec![id]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(list.dispatch(Intent::Remove(id)).unwrap(), Outcome::Unchanged));
        assert!(matches!(list.dispatch(Intent::Load).unwrap(), Outcome::Loaded(0)));
    }

    #[test]
    fn load_failure_keeps_collection() {
        let mut list = seeded(&["A"]);
        list.store().set_offline(true);
        assert!(list.dispatch(Intent::Load).is_err());
        assert_eq!(titles(&list), ["A"]);
    }

    #[test]
    fn replace_and_forget_sync_external_changes() {
        let mut list = seeded(&["A", "B"]);
        let mut a = list.get(id_of(&list, "A")).unwrap().clone();
        a.title = "Alpha".to_string();
        assert!(list.replace(a.clone()));
        assert_eq!(titles(&list), ["Alpha", "B"]);
        assert!(list.forget(a.id));
        assert!(!list.forget(a.id));
        assert_eq!(titles(&list), ["B"]);
    }
}
