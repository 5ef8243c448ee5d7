//! Favor (reputation) store commands.
//!
//! The store itself is external — an opaque key-value service addressed by
//! user id. This module only shapes the admin commands that act on it;
//! concurrent writes are the store's responsibility.

use crate::error::Result;

/// An opaque favor store keyed by user id.
pub trait FavorStore {
    fn get(&self, user_id: &str) -> impl Future<Output = Result<i64>> + Send;
    fn set(&self, user_id: &str, value: i64) -> impl Future<Output = Result<()>> + Send;
    /// Users whose favor value is currently negative.
    fn negative_users(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Admin command handling on top of a [`FavorStore`].
pub struct FavorCommands<S> {
    store: S,
    admin_user_id: Option<String>,
}

impl<S: FavorStore> FavorCommands<S> {
    pub fn new(store: S, admin_user_id: Option<String>) -> Self {
        Self {
            store,
            admin_user_id,
        }
    }

    /// Report a user's current favor value. Open to everyone; unknown
    /// users read as zero.
    pub async fn query(&self, user_id: &str) -> Result<String> {
        let value = self.store.get(user_id).await?;
        Ok(format!("Current favor for {user_id}: {value}."))
    }

    /// Reset every negative favor value to zero. Admin-only; returns the
    /// reply text to send back.
    pub async fn reset_negative(&self, sender_id: &str) -> Result<String> {
        let is_admin = self
            .admin_user_id
            .as_deref()
            .is_some_and(|admin| admin == sender_id);
        if !is_admin {
            tracing::warn!(sender_id, "non-admin attempted favor reset");
            return Ok("Only the configured admin can run this command.".into());
        }

        let users = self.store.negative_users().await?;
        for user_id in &users {
            self.store.set(user_id, 0).await?;
        }

        tracing::info!(sender_id, reset_count = users.len(), "reset negative favor values");

        if users.is_empty() {
            Ok("No users with negative favor; nothing to reset.".into())
        } else {
            Ok(format!(
                "Reset negative favor for {} user(s) back to zero.",
                users.len()
            ))
        }
    }
}
