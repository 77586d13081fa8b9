use super::{Database, SESSIONS_FILE, Session, SessionsFile, now_timestamp};
use crate::error::Result;

impl Database {
    /// Create a session, dropping any that already expired.
    pub fn create_session(&self, session: &Session) -> Result<()> {
        let now = now_timestamp();
        self.update::<SessionsFile, _, _>(SESSIONS_FILE, |doc| {
            doc.sessions.retain(|s| s.expires_at >= now);
            doc.sessions.push(session.clone());
            Ok(())
        })
    }

    /// Get session by token.
    pub fn get_session(&self, token: &str) -> Result<Option<Session>> {
        Ok(self
            .read::<SessionsFile>(SESSIONS_FILE)?
            .sessions
            .into_iter()
            .find(|s| s.token == token))
    }

    /// Delete session.
    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.update::<SessionsFile, _, _>(SESSIONS_FILE, |doc| {
            doc.sessions.retain(|s| s.token != token);
            Ok(())
        })
    }

    /// Delete every session of a user. Returns how many were removed.
    pub fn delete_user_sessions(&self, user_id: &str) -> Result<usize> {
        self.update::<SessionsFile, _, _>(SESSIONS_FILE, |doc| {
            let before = doc.sessions.len();
            doc.sessions.retain(|s| s.user_id != user_id);
            Ok(before - doc.sessions.len())
        })
    }
}
