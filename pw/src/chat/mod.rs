//! Interactive chat: intent routing, session state, REPL

mod intent;
mod repl;
mod session;

pub use intent::{Intent, classify_intent};
pub use repl::{Repl, print_plan};
pub use session::{ChatReply, ChatSession, SessionConfig};
