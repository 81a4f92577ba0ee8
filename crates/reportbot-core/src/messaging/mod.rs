//! Cross-messenger abstractions (Telegram today; other networks later).

pub mod port;
pub mod throttled;
pub mod types;
