//! Persisted application flags.
//!
//! Flags live beside the catalogue tables but are not part of the catalogue:
//! a full data reset keeps them.

/// One persisted boolean application flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppFlag {
    /// Set after the first-launch bootstrap (mock data seed) ran.
    HasLaunchedBefore,
    /// Set after the onboarding flow was displayed once.
    OnboardingShown,
}

impl AppFlag {
    /// Storage key used in `app_flags.key`.
    pub fn key(self) -> &'static str {
        match self {
            Self::HasLaunchedBefore => "has_launched_before",
            Self::OnboardingShown => "onboarding_shown",
        }
    }
}
