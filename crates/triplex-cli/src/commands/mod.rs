//! Command implementations.

pub mod run;
pub mod themes;

pub use self::run::execute_run;
pub use self::themes::execute_themes;
