//! UI Module - session controller and terminal front-end
//!
//! `controller` owns all session state; `console` only parses commands and
//! renders that state.

pub mod console;
pub mod controller;
pub mod log_sink;
pub mod notifications;

pub use controller::{AppController, SessionView};
pub use log_sink::LogSink;
pub use notifications::{Notification, NotificationReporter};
