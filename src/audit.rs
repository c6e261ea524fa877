use chrono::{DateTime, Utc};
use serde::Serialize;

/// Who is acting, passed explicitly into every write and scoring call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditContext {
    pub actor: String,
    pub started_at: DateTime<Utc>,
}

impl AuditContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            started_at: Utc::now(),
        }
    }

    /// Context for the user running the process.
    pub fn from_os_user() -> Self {
        Self::new(whoami::username())
    }

    /// Context for an explicit actor, or the OS user when none is given.
    pub fn resolve(actor: Option<&str>) -> Self {
        match actor {
            Some(actor) if !actor.trim().is_empty() => Self::new(actor.trim()),
            _ => Self::from_os_user(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_actor_is_trimmed() {
        assert_eq!(AuditContext::resolve(Some("  sdlt-admin ")).actor, "sdlt-admin");
    }

    #[test]
    fn test_blank_actor_falls_back_to_os_user() {
        let ctx = AuditContext::resolve(Some("   "));
        assert_eq!(ctx.actor, whoami::username());
    }
}
