pub mod flag;
pub use flag::{Flag, Flags};
