//! Single-todo edit screen.
//!
//! A `DetailView` only exists once its todo has loaded; `open` is the
//! loading state. Persist failures leave the view as it was before the call.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::ApiError;
use crate::store::TodoStore;
use crate::types::Todo;

/// Where the screen should go after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Stay,
    Back,
}

pub struct DetailView<'s, S, C = SystemClock> {
    store: &'s S,
    clock: C,
    todo: Todo,
    draft: String,
}

impl<'s, S: TodoStore> DetailView<'s, S> {
    pub fn open(store: &'s S, id: Uuid) -> Result<Self, ApiError> {
        Self::open_with_clock(store, id, SystemClock)
    }
}

impl<'s, S: TodoStore, C: Clock> DetailView<'s, S, C> {
    pub fn open_with_clock(store: &'s S, id: Uuid, clock: C) -> Result<Self, ApiError> {
        let todo = store.get(id)?;
        debug!(%id, "opened detail view");
        Ok(Self {
            store,
            clock,
            draft: todo.title.clone(),
            todo,
        })
    }

    pub fn todo(&self) -> &Todo {
        &self.todo
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, title: impl Into<String>) {
        self.draft = title.into();
    }

    /// Persist the draft title. Goes back only once the store accepts it.
    pub fn update_title(&mut self) -> Result<Navigation, ApiError> {
        if self.draft.trim().is_empty() {
            return Ok(Navigation::Stay);
        }
        let updated = self.store.set_title(self.todo.id, &self.draft)?;
        self.draft = updated.title.clone();
        self.todo = updated;
        Ok(Navigation::Back)
    }

    /// Flip completion, persist, then reload from the store.
    pub fn toggle_complete(&mut self) -> Result<(), ApiError> {
        let id = self.todo.id;
        let completed = !self.todo.completed;
        let completed_at = if completed { self.clock.now() } else { String::new() };
        self.store.set_completed(id, completed, &completed_at)?;
        self.reload()
    }

    pub fn reload(&mut self) -> Result<(), ApiError> {
        let todo = self.store.get(self.todo.id)?;
        self.draft = todo.title.clone();
        self.todo = todo;
        Ok(())
    }

    /// Delete and go back, whether or not the store agreed. The store's
    /// answer comes back alongside so the caller keeps its copy of a todo
    /// the store refused to delete. A todo already gone counts as deleted.
    pub fn delete(self) -> (Navigation, Result<(), ApiError>) {
        let id = self.todo.id;
        let result = match self.store.delete(id) {
            Ok(()) | Err(ApiError::NotFound) => {
                debug!(%id, "deleted todo from detail view");
                Ok(())
            }
            Err(e) => {
                warn!(%id, error = %e, "deleting todo from detail view failed");
                Err(e)
            }
        };
        (Navigation::Back, result)
    }
}
