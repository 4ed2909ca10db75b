//! Chat widget controller: renders the conversation log, sends user turns to
//! the chat API and keeps the character and model controls populated.

pub mod api;
pub mod config;
pub mod controller;
pub mod markup;
pub mod terminal;
pub mod types;
pub mod view;

pub use api::{ApiError, ChatApi, HttpChatApi};
pub use config::WidgetConfig;
pub use controller::{ChatWidget, PendingTurn, StartupReport, TurnOutcome, WidgetError};
pub use terminal::TerminalView;
pub use view::{ChatView, HtmlView};
