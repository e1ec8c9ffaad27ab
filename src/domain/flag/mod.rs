pub mod flag;
pub mod flags;

pub use self::flag::*;
pub use self::flags::*;
