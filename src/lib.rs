//! Client core for the posta messaging service: session handling, inbox
//! synchronization and single-item mutations against its REST API.

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod logging;
pub mod models;
pub mod mutation;
pub mod session;
pub mod sync;
pub mod view;

pub use api::{ApiClient, Endpoint};
pub use backend::{Backend, Poller};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use models::{Draft, FromBackend, Message, ToBackend, User};
pub use session::{Session, SessionState};
pub use view::{Route, ViewModel};
