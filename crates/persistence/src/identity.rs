use std::fmt;

/// Who the closet belongs to; selects the persistence backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Anonymous device-local session
    #[default]
    Guest,
    /// Authenticated account, persisted remotely
    SignedIn { user_id: String },
}

impl Identity {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Identity::SignedIn {
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Identity::Guest => None,
            Identity::SignedIn { user_id } => Some(user_id),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Guest => write!(f, "guest"),
            Identity::SignedIn { user_id } => write!(f, "user:{user_id}"),
        }
    }
}
