pub mod action;
pub mod command;

pub use action::{Action, NavigateTarget, NotifyLevel};
pub use command::{parse_command, Command};
