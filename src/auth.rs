//! Authentication module.

use crate::db::{Database, Session, User, now_timestamp};
use crate::error::{AppError, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Text the user must type to delete their account.
pub const DELETE_CONFIRMATION: &str = "DELETE";

/// Hash a password using Argon2.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate a secure random token.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// 3-24 ASCII letters, digits or underscores.
pub fn validate_username(username: &str) -> Result<()> {
    let ok = (3..=24).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if ok {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Username must be 3-24 chars (letters, numbers, underscore).".to_string(),
        ))
    }
}

/// At least [`MIN_PASSWORD_LEN`] characters.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Authentication service.
pub struct AuthService {
    db: Database,
    session_duration_days: u32,
    registration_enabled: bool,
}

impl AuthService {
    /// Create a new auth service.
    pub fn new(db: Database, session_duration_days: u32, registration_enabled: bool) -> Self {
        Self {
            db,
            session_duration_days,
            registration_enabled,
        }
    }

    /// Session lifetime in seconds.
    pub fn session_seconds(&self) -> i64 {
        self.session_duration_days as i64 * 24 * 60 * 60
    }

    /// Register a new user and open a session for them.
    pub fn register(&self, username: &str, password: &str) -> Result<(User, String)> {
        if !self.registration_enabled {
            return Err(AppError::Forbidden("Registration is disabled.".to_string()));
        }

        let user = self.create_user(username, password)?;
        let token = self.open_session(&user)?;
        tracing::info!(user = %user.username, "Registered user");
        Ok((user, token))
    }

    /// Create a new user (admin function).
    pub fn create_user(&self, username: &str, password: &str) -> Result<User> {
        let username = username.trim();
        validate_username(username)?;
        validate_password(password)?;

        let user = User::new(
            uuid::Uuid::new_v4().to_string(),
            username.to_string(),
            hash_password(password)?,
        );

        self.db.create_user(&user)?;
        Ok(user)
    }

    /// Login and create a session.
    pub fn login(&self, username: &str, password: &str) -> Result<(User, String)> {
        let invalid = || AppError::Unauthorized("Invalid username or password.".to_string());

        let user = self
            .db
            .get_user_by_username(username.trim())?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user = %user.username, "Rejected login");
            return Err(invalid());
        }

        let token = self.open_session(&user)?;
        Ok((user, token))
    }

    fn open_session(&self, user: &User) -> Result<String> {
        let token = generate_token();
        let session = Session {
            token: token.clone(),
            user_id: user.id.clone(),
            expires_at: now_timestamp() + self.session_seconds(),
        };

        self.db.create_session(&session)?;
        Ok(token)
    }

    /// Validate a session token and return the user.
    pub fn validate_token(&self, token: &str) -> Result<Option<User>> {
        let session = match self.db.get_session(token)? {
            Some(s) => s,
            None => return Ok(None),
        };

        // Check expiration
        if session.expires_at < now_timestamp() {
            self.db.delete_session(token)?;
            return Ok(None);
        }

        self.db.get_user_by_id(&session.user_id)
    }

    /// Logout (delete session).
    pub fn logout(&self, token: &str) -> Result<()> {
        self.db.delete_session(token)
    }

    /// Delete the account of a logged-in user after re-checking the password.
    pub fn delete_account(&self, user_id: &str, password: &str, confirm_text: &str) -> Result<()> {
        if confirm_text.trim() != DELETE_CONFIRMATION {
            return Err(AppError::BadRequest("Type DELETE to confirm.".to_string()));
        }

        let user = self
            .db
            .get_user_by_id(user_id)?
            .ok_or_else(AppError::not_logged_in)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized("Invalid password.".to_string()));
        }

        self.db.delete_user(&user.id)?;
        let sessions = self.db.delete_user_sessions(&user.id)?;
        tracing::info!(user = %user.username, sessions, "Deleted account");
        Ok(())
    }

    /// Change user password.
    pub fn change_password(&self, username: &str, new_password: &str) -> Result<bool> {
        validate_password(new_password)?;

        let password_hash = hash_password(new_password)?;
        self.db.update_user_password(username, &password_hash)
    }

    /// Delete a user by username, with their sessions.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        let Some(user) = self.db.get_user_by_username(username)? else {
            return Ok(false);
        };

        self.db.delete_user_sessions(&user.id)?;
        self.db.delete_user(&user.id)
    }

    /// List all users.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.db.list_users()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let password = "test_password_123";
        let hash = hash_password(password).unwrap();

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same_password").unwrap();
        let b = hash_password("same_password").unwrap();

        assert_ne!(a, b);
        assert!(verify_password("same_password", &a).unwrap());
        assert!(verify_password("same_password", &b).unwrap());
    }

    #[test]
    fn test_generate_token() {
        let token1 = generate_token();
        let token2 = generate_token();

        assert_eq!(token1.len(), 43); // Base64 of 32 bytes
        assert_ne!(token1, token2);
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("reader_01").is_ok());
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(25)).is_err());
        assert!(validate_username("no-dash").is_err());
        assert!(validate_username("héllo").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
    }
}
