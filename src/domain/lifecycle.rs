/// Application lifecycle phase. Drives the poll period, not the chat state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppPhase {
    #[default]
    Foreground,
    Background,
}

impl AppPhase {
    /// Maps platform lifecycle names (`active`, `inactive`, `background`).
    pub fn from_lifecycle_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "active" | "foreground" => Some(Self::Foreground),
            "inactive" | "background" => Some(Self::Background),
            _ => None,
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::Background => "background",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_lifecycle_names() {
        assert_eq!(
            AppPhase::from_lifecycle_name("active"),
            Some(AppPhase::Foreground)
        );
        assert_eq!(
            AppPhase::from_lifecycle_name("inactive"),
            Some(AppPhase::Background)
        );
        assert_eq!(
            AppPhase::from_lifecycle_name(" Background "),
            Some(AppPhase::Background)
        );
        assert_eq!(AppPhase::from_lifecycle_name("suspended"), None);
    }
}
