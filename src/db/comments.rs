use super::{COMMENTS_FILE, Comment, CommentsFile, Database};
use crate::error::{AppError, Result};

impl Database {
    /// Comments on a chapter, oldest first, keeping only the newest `limit`.
    pub fn list_comments(
        &self,
        series_id: &str,
        chapter_id: &str,
        limit: usize,
    ) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .read::<CommentsFile>(COMMENTS_FILE)?
            .comments
            .into_iter()
            .filter(|c| c.series_id == series_id && c.chapter_id == chapter_id)
            .collect();

        comments.sort_by_key(|c| c.created_at);
        let skip = comments.len().saturating_sub(limit);
        comments.drain(..skip);
        Ok(comments)
    }

    /// Save a new comment.
    pub fn add_comment(&self, comment: &Comment) -> Result<()> {
        self.update::<CommentsFile, _, _>(COMMENTS_FILE, |doc| {
            doc.comments.push(comment.clone());
            Ok(())
        })
    }

    /// Delete a comment written by `user_id`.
    pub fn delete_comment(&self, id: &str, user_id: &str) -> Result<()> {
        self.update::<CommentsFile, _, _>(COMMENTS_FILE, |doc| {
            let idx = doc
                .comments
                .iter()
                .position(|c| c.id == id)
                .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

            if doc.comments[idx].user_id != user_id {
                return Err(AppError::Forbidden("Not allowed".to_string()));
            }

            doc.comments.remove(idx);
            Ok(())
        })
    }
}
