//! Project kanban board back-end.
//!
//! ## Overview
//!
//! Projects own tasks laid out in four columns. The HTTP API offers CRUD on
//! both, a board view grouped by column, and drag-and-drop moves. Every
//! change is pushed to connected browsers over a WebSocket.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)      │
//! │  (ui/)   │ <─────── │    ├─ api.rs  (route handlers, AppState)     │
//! └──────────┘ WebSocket│    └─ ws.rs   (BoardEvent fan-out)           │
//!                       │         │                                    │
//!                       │         │ DbHandle::call()                   │
//!                       │         v                                    │
//!                       │  db.rs  (BoardDb, SQLite)                    │
//!                       │         │                                    │
//!                       │         │ apply_drag / validate_layout       │
//!                       │         v                                    │
//!                       │  reorder.rs                                  │
//!                       └──────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module     | Responsibility                                        |
//! |------------|-------------------------------------------------------|
//! | `models`   | Shared types: `Project`, `Task`, `TaskColumn`         |
//! | `embedded` | Statically embeds the board UI (`rust-embed`)         |

pub mod api;
pub mod db;
pub mod embedded;
pub mod models;
pub mod reorder;
pub mod server;
pub mod ws;
