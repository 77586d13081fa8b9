use super::{Database, USERS_FILE, User, UsersFile};
use crate::error::{AppError, Result};

impl Database {
    /// List all users.
    pub fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.read::<UsersFile>(USERS_FILE)?.users)
    }

    /// Get user by ID.
    pub fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.list_users()?.into_iter().find(|u| u.id == id))
    }

    /// Get user by username, ignoring case.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .list_users()?
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(username)))
    }

    /// Get several users by ID, in the order asked. Unknown IDs are skipped.
    pub fn get_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>> {
        let users = self.list_users()?;
        Ok(ids
            .iter()
            .filter_map(|id| users.iter().find(|u| &u.id == id).cloned())
            .collect())
    }

    /// Create a new user. Fails if the username is taken, ignoring case.
    pub fn create_user(&self, user: &User) -> Result<()> {
        self.update::<UsersFile, _, _>(USERS_FILE, |doc| {
            if doc
                .users
                .iter()
                .any(|u| u.id == user.id || u.username.eq_ignore_ascii_case(&user.username))
            {
                return Err(AppError::Conflict("Username already exists.".to_string()));
            }
            doc.users.push(user.clone());
            Ok(())
        })
    }

    /// Apply `f` to a user and save. Returns `None` if the user does not exist.
    pub fn update_user<R, F>(&self, id: &str, f: F) -> Result<Option<R>>
    where
        F: FnOnce(&mut User) -> Result<R>,
    {
        self.update::<UsersFile, _, _>(USERS_FILE, |doc| {
            match doc.users.iter_mut().find(|u| u.id == id) {
                Some(user) => f(user).map(Some),
                None => Ok(None),
            }
        })
    }

    /// Change username and bio.
    ///
    /// `username` of `None` keeps the current one. A new username must not be
    /// used by another account, ignoring case.
    pub fn update_profile(
        &self,
        id: &str,
        username: Option<&str>,
        bio: &str,
    ) -> Result<Option<User>> {
        self.update::<UsersFile, _, _>(USERS_FILE, |doc| {
            if let Some(name) = username
                && doc
                    .users
                    .iter()
                    .any(|u| u.id != id && u.username.eq_ignore_ascii_case(name))
            {
                return Err(AppError::Conflict("Username already exists.".to_string()));
            }

            let Some(user) = doc.users.iter_mut().find(|u| u.id == id) else {
                return Ok(None);
            };
            if let Some(name) = username {
                user.username = name.to_string();
            }
            user.bio = bio.to_string();
            Ok(Some(user.clone()))
        })
    }

    /// Update user password by username.
    pub fn update_user_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        self.update::<UsersFile, _, _>(USERS_FILE, |doc| {
            match doc
                .users
                .iter_mut()
                .find(|u| u.username.eq_ignore_ascii_case(username))
            {
                Some(user) => {
                    user.password_hash = password_hash.to_string();
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    /// Delete a user by ID.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.update::<UsersFile, _, _>(USERS_FILE, |doc| {
            let before = doc.users.len();
            doc.users.retain(|u| u.id != id);
            Ok(doc.users.len() != before)
        })
    }
}
