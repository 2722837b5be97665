//! `cmdmenu` Core Library
//!
//! Execution core shared by the `cmdmenu` front ends:
//! - Process sessions with live stdout/stderr capture and stdin forwarding
//! - Output relay between capture tasks and a polling consumer
//! - Shell invocation and launch pre-flight checks
//! - Menu and session configuration resolution
//! - Common error types

pub mod config;
pub mod error;
pub mod relay;
pub mod session;
pub mod shell;
pub mod tracing_init;

pub use config::{Config, MenuItem};
pub use error::{Error, Result};
pub use relay::{Chunk, OutputRelay};
pub use session::{
    ChannelObserver, ProcessSession, SessionError, SessionEvent, SessionObserver, SessionOptions,
};
