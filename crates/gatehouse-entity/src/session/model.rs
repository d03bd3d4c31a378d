//! Session entity model.

use chrono::{DateTime, Utc};
use gatehouse_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A live login session.
///
/// Sessions are created on login and destroyed on logout, expiry,
/// or a bulk invalidation of the owning account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Unique session identifier.
    pub id: Uuid,
    /// The account this session belongs to.
    pub user_id: Uuid,
    /// The signed token bound to this session.
    pub token: String,
    /// When the session was created (login or rotation time).
    pub created_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a new session, checking the structural invariants.
    ///
    /// The token must be non-empty and the expiry must lie strictly
    /// after the creation time.
    pub fn new(
        user_id: Uuid,
        token: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        if token.is_empty() {
            return Err(AppError::validation("Session token must not be empty"));
        }
        if expires_at <= created_at {
            return Err(AppError::validation(
                "Session expiry must be after its creation time",
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            token,
            created_at,
            expires_at,
        })
    }

    /// Check whether the session is still live as of `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Check whether the session has passed the halfway point of its
    /// lifetime and should be rotated.
    ///
    /// Strictly after the midpoint; a read landing exactly on it does
    /// not rotate.
    pub fn rotation_due(&self, now: DateTime<Utc>) -> bool {
        let halfway = self.created_at + (self.expires_at - self.created_at) / 2;
        now > halfway
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn new_rejects_empty_token() {
        let err = Session::new(Uuid::new_v4(), String::new(), at(0), at(100)).unwrap_err();
        assert_eq!(err.kind, gatehouse_core::ErrorKind::Validation);
    }

    #[test]
    fn new_rejects_expiry_not_after_creation() {
        assert!(Session::new(Uuid::new_v4(), "t".to_string(), at(100), at(100)).is_err());
        assert!(Session::new(Uuid::new_v4(), "t".to_string(), at(100), at(50)).is_err());
    }

    #[test]
    fn liveness_is_exclusive_of_expiry() {
        let s = Session::new(Uuid::new_v4(), "t".to_string(), at(0), at(100)).unwrap();
        assert!(s.is_live(at(99)));
        assert!(!s.is_live(at(100)));
        assert!(!s.is_live(at(101)));
    }

    #[test]
    fn rotation_due_strictly_after_midpoint() {
        let s = Session::new(Uuid::new_v4(), "t".to_string(), at(0), at(100)).unwrap();
        assert!(!s.rotation_due(at(49)));
        assert!(!s.rotation_due(at(50)));
        assert!(s.rotation_due(at(51)));
    }

    #[test]
    fn rotation_midpoint_with_subsecond_precision() {
        let created = at(0);
        let expires = created + Duration::milliseconds(1000);
        let s = Session::new(Uuid::new_v4(), "t".to_string(), created, expires).unwrap();
        assert!(!s.rotation_due(created + Duration::milliseconds(500)));
        assert!(s.rotation_due(created + Duration::milliseconds(501)));
    }
}
