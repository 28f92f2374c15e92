use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// Display name used when a member has neither a first name nor a username.
pub const FALLBACK_DISPLAY_NAME: &str = "someone";

/// Identity of a chat participant as observed on an inbound event.
///
/// Built at the transport boundary from the platform's user type; empty
/// names are normalized to `None` there.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

/// Stored identity snapshot for a chat member.
///
/// Written as a whole on every observed message or join; never merged
/// field-by-field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub member_id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

impl MemberRecord {
    /// Placeholder record for a member id with no stored info.
    pub fn unknown(member_id: i64) -> Self {
        Self {
            member_id,
            first_name: None,
            username: None,
        }
    }

    /// Name preference: first name, then username, then a placeholder.
    pub fn display_name(&self) -> &str {
        self.first_name.as_deref().or(self.username.as_deref()).unwrap_or(FALLBACK_DISPLAY_NAME)
    }
}

impl From<&UserProfile> for MemberRecord {
    fn from(profile: &UserProfile) -> Self {
        Self {
            member_id: profile.id,
            first_name: profile.first_name.clone(),
            username: profile.username.clone(),
        }
    }
}
