//! The remote store seam: CRUD operations against the service of record.
//!
//! # Design
//! `TodoStore` is what the reconciler and the detail view talk to. It owns
//! no state about the collection. `RemoteStore` composes `TodoClient`
//! (build/parse) with a `Transport` (I/O); `InMemoryStore` in `memory`
//! answers the same calls in-process.
//!
//! The trait requires `Sync` because `clear_completed` fans deletes out over
//! scoped threads.

use tracing::debug;
use uuid::Uuid;

use crate::client::TodoClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::types::{CreateTodo, Todo, UpdateTodo};

pub trait TodoStore: Sync {
    fn list(&self) -> Result<Vec<Todo>, ApiError>;
    fn get(&self, id: Uuid) -> Result<Todo, ApiError>;
    /// Creates an incomplete todo; the store assigns `id` and `created_at`.
    fn create(&self, title: &str) -> Result<Todo, ApiError>;
    fn set_completed(&self, id: Uuid, completed: bool, completed_at: &str) -> Result<Todo, ApiError>;
    fn set_title(&self, id: Uuid, title: &str) -> Result<Todo, ApiError>;
    fn delete(&self, id: Uuid) -> Result<(), ApiError>;
}

impl<S: TodoStore + ?Sized> TodoStore for &S {
    fn list(&self) -> Result<Vec<Todo>, ApiError> {
        (**self).list()
    }

    fn get(&self, id: Uuid) -> Result<Todo, ApiError> {
        (**self).get(id)
    }

    fn create(&self, title: &str) -> Result<Todo, ApiError> {
        (**self).create(title)
    }

    fn set_completed(&self, id: Uuid, completed: bool, completed_at: &str) -> Result<Todo, ApiError> {
        (**self).set_completed(id, completed, completed_at)
    }

    fn set_title(&self, id: Uuid, title: &str) -> Result<Todo, ApiError> {
        (**self).set_title(id, title)
    }

    fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        (**self).delete(id)
    }
}

/// `TodoStore` over HTTP.
#[derive(Clone)]
pub struct RemoteStore<T> {
    client: TodoClient,
    transport: T,
}

impl<T: Transport> RemoteStore<T> {
    pub fn new(client: TodoClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &TodoClient {
        &self.client
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, path = %request.path, "remote store call");
        self.transport.execute(request)
    }
}

impl<T: Transport + Sync> TodoStore for RemoteStore<T> {
    fn list(&self) -> Result<Vec<Todo>, ApiError> {
        let response = self.send(self.client.build_list_todos())?;
        self.client.parse_list_todos(response)
    }

    fn get(&self, id: Uuid) -> Result<Todo, ApiError> {
        let response = self.send(self.client.build_get_todo(id))?;
        self.client.parse_get_todo(response)
    }

    fn create(&self, title: &str) -> Result<Todo, ApiError> {
        let request = self.client.build_create_todo(&CreateTodo::new(title))?;
        let response = self.send(request)?;
        self.client.parse_create_todo(response)
    }

    fn set_completed(&self, id: Uuid, completed: bool, completed_at: &str) -> Result<Todo, ApiError> {
        let request = self
            .client
            .build_update_todo(id, &UpdateTodo::completion(completed, completed_at))?;
        let response = self.send(request)?;
        self.client.parse_update_todo(response)
    }

    fn set_title(&self, id: Uuid, title: &str) -> Result<Todo, ApiError> {
        let request = self.client.build_update_todo(id, &UpdateTodo::title(title))?;
        let response = self.send(request)?;
        self.client.parse_update_todo(response)
    }

    fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let response = self.send(self.client.build_delete_todo(id))?;
        self.client.parse_delete_todo(response)
    }
}
