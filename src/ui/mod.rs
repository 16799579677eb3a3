//! Terminal User Interface components for transfermarkt-tui.

mod help;
pub mod preview;
pub mod theme;
pub mod widgets;

pub use help::HelpOverlay;
pub use theme::{Severity, Theme};
