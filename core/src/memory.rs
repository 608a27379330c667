//! In-process `TodoStore` with failure injection.
//!
//! Behaves like the mock server: insertion-ordered, ids and `created_at`
//! assigned on create, 404 for unknown ids. `set_offline` turns every call
//! into a network error; `fail_deletes_of` makes deleting one id answer 500.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::ApiError;
use crate::store::TodoStore;
use crate::types::Todo;

#[derive(Default)]
struct Inner {
    todos: Vec<Todo>,
    offline: bool,
    failing_deletes: HashSet<Uuid>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_todos(todos: Vec<Todo>) -> Self {
        let store = Self::default();
        store.lock().todos = todos;
        store
    }

    /// Snapshot of what the store holds, in insertion order.
    pub fn todos(&self) -> Vec<Todo> {
        self.lock().todos.clone()
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn fail_deletes_of(&self, id: Uuid) {
        self.lock().failing_deletes.insert(id);
    }

    /// Number of operations attempted so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call and hand back the table unless the store is offline.
    fn begin(&self) -> Result<MutexGuard<'_, Inner>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let inner = self.lock();
        if inner.offline {
            return Err(ApiError::Network("store is offline".to_string()));
        }
        Ok(inner)
    }
}

fn find(inner: &mut Inner, id: Uuid) -> Result<&mut Todo, ApiError> {
    inner.todos.iter_mut().find(|t| t.id == id).ok_or(ApiError::NotFound)
}

impl TodoStore for InMemoryStore {
    fn list(&self) -> Result<Vec<Todo>, ApiError> {
        Ok(self.begin()?.todos.clone())
    }

    fn get(&self, id: Uuid) -> Result<Todo, ApiError> {
        let mut inner = self.begin()?;
        find(&mut inner, id).map(|t| t.clone())
    }

    fn create(&self, title: &str) -> Result<Todo, ApiError> {
        let mut inner = self.begin()?;
        let todo = Todo {
            id: Uuid::new_v4(),
            title: title.to_string(),
            completed: false,
            completed_at: String::new(),
            created_at: SystemClock.now(),
        };
        inner.todos.push(todo.clone());
        Ok(todo)
    }

    fn set_completed(&self, id: Uuid, completed: bool, completed_at: &str) -> Result<Todo, ApiError> {
        let mut inner = self.begin()?;
        let todo = find(&mut inner, id)?;
        todo.completed = completed;
        todo.completed_at = completed_at.to_string();
        Ok(todo.clone())
    }

    fn set_title(&self, id: Uuid, title: &str) -> Result<Todo, ApiError> {
        let mut inner = self.begin()?;
        let todo = find(&mut inner, id)?;
        todo.title = title.to_string();
        Ok(todo.clone())
    }

    fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let mut inner = self.begin()?;
        if inner.failing_deletes.contains(&id) {
            return Err(ApiError::Server {
                status: 500,
                body: "delete failed".to_string(),
            });
        }
        let before = inner.todos.len();
        inner.todos.retain(|t| t.id != id);
        if inner.todos.len() == before {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}
