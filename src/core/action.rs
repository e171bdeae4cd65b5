//! Actions that commands return to communicate with the app

/// Actions returned by commands to communicate state changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action needed
    None,

    /// Switch to a tab
    Navigate(NavigateTarget),

    /// Show notification in status bar
    Notify(String, NotifyLevel),

    /// Request quit
    Quit,
}

/// Navigation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigateTarget {
    Join,
    Memberships,
    Admin,
}

impl NavigateTarget {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "join" | "parties" | "1" => Some(NavigateTarget::Join),
            "memberships" | "my" | "mine" | "2" => Some(NavigateTarget::Memberships),
            "admin" | "3" => Some(NavigateTarget::Admin),
            _ => None,
        }
    }
}

/// Notification levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Warn,
    Error,
}
