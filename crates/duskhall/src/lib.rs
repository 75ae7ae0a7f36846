//! # Duskhall
//!
//! Server-side reconstruction of the lobby/room synchronization protocol
//! of a PS2-era multiplayer title, recovered from packet captures and a
//! decompiled client. An unmodified client connecting to this server can
//! assemble a four-player room: pick a map, confirm characters, toggle
//! ready, leave, be kicked.
//!
//! The meta-crate ties the layers together:
//!
//! - [`duskhall_protocol`] — byte-exact packet codec
//! - [`duskhall_room`] — room state machine, actor, manager
//! - [`duskhall_transport`] — TCP framing
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use duskhall::DuskhallServer;
//!
//! # async fn run() -> Result<(), duskhall::DuskhallError> {
//! let server = DuskhallServer::builder()
//!     .bind("0.0.0.0:4000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::DuskhallError;
pub use server::{DuskhallServer, DuskhallServerBuilder};

pub use duskhall_protocol;
pub use duskhall_room;
pub use duskhall_transport;
