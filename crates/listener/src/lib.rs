//! Gitee webhook event source.
//!
//! Binds an HTTP server that receives Gitee webhook deliveries, checks the
//! `X-Gitee-Token` header against the shared secret, decodes issue and merge
//! request hooks into [`welcome::WelcomeEvent`]s and hands each one to an
//! [`EventSink`] on its own task. On shutdown, [`serve`] stops accepting
//! connections and then waits, up to a drain timeout, for those tasks.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details, header names and payload shapes all
//! live here. The [`welcome`] crate sees only [`welcome::WelcomeEvent`].
//!
//! ## Routes
//!
//! | Route | Result |
//! |-------|--------|
//! | `POST /webhook` | `202` accepted, `200` ignored, `400` malformed, `401` bad token |
//! | `GET /health` | `200` |

mod payload;
mod server;
mod signature;

pub use payload::{decode_event, HookKind, PayloadError};
pub use server::{router, serve, serve_on, AppState, EventSink, ListenerError};
pub use signature::verify_token;
