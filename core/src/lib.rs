//! Client core for the todo service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern); a `Transport` executes the
//! round-trip. On top of that sit the remote store, the list reconciler that
//! owns the in-memory collection, the detail view controller, and a
//! plain-text view layer.
//!
//! # Design
//! - `TodoClient` is stateless; it holds only `base_url`.
//! - Each CRUD operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - `TodoStore` is the seam the reconciler and detail view depend on;
//!   `RemoteStore` implements it over any `Transport`, `InMemoryStore`
//!   in-process.
//! - `TodoList::dispatch` is the single entry point for user intents.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod clock;
pub mod detail;
pub mod error;
pub mod http;
pub mod memory;
pub mod reconciler;
pub mod store;
pub mod transport;
pub mod types;
pub mod view;

pub use client::{TodoClient, DEFAULT_BASE_URL};
pub use clock::{Clock, FixedClock, SystemClock};
pub use detail::{DetailView, Navigation};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use memory::InMemoryStore;
pub use reconciler::{ClearReport, Counts, FilteredView, Intent, Outcome, TodoList};
pub use store::{RemoteStore, TodoStore};
pub use transport::UreqTransport;
pub use types::{CreateTodo, FilterType, Todo, UpdateTodo};
