use chrono::Utc;
use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, PaginatorTrait, QueryFilter, QuerySelect,
    TransactionTrait, prelude::*,
    sea_query::{Expr, Func},
};
use tracing::info;

use crate::{
    EngineError, NewUser, ProfileChanges, ResultEngine, User, UserProfile, ads, proposals,
    users::{self, DUMMY_PASSWORD_HASH, hash_password, validate_email, verify_password},
    util::normalize_optional_text,
};

use super::{Engine, with_tx};

impl Engine {
    /// Fail with `ExistingKey` when another account already uses `email`
    /// (compared case-insensitively).
    async fn require_email_free(
        &self,
        db: &DatabaseTransaction,
        email: &str,
        except: Option<&str>,
    ) -> ResultEngine<()> {
        let mut query = users::Entity::find()
            .filter(Expr::expr(Func::lower(Expr::col(users::Column::Email))).eq(email.to_lowercase()));
        if let Some(username) = except {
            query = query.filter(users::Column::Username.ne(username.to_string()));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::ExistingKey(email.to_string()));
        }
        Ok(())
    }

    /// Create a new account.
    pub async fn register(&self, new_user: NewUser) -> ResultEngine<User> {
        let user = User::from_new(&new_user, Utc::now())?;
        let password_hash = hash_password(&new_user.password);
        with_tx!(self, |db_tx| {
            let exists = users::Entity::find_by_id(user.username.clone())
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(user.username.clone()));
            }
            self.require_email_free(&db_tx, &user.email, None).await?;

            users::ActiveModel::from_user(&user, password_hash)
                .insert(&db_tx)
                .await?;

            info!(user = %user.username, "user registered");
            Ok(user)
        })
    }

    /// Check the credentials and return the matching user.
    ///
    /// An unknown username still runs one digest against a dummy hash.
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let model = users::Entity::find_by_id(username.to_string())
                .one(&db_tx)
                .await?;
            let stored = model
                .as_ref()
                .map_or(DUMMY_PASSWORD_HASH, |model| model.password.as_str());
            let valid = verify_password(stored, password);
            match model {
                Some(model) if valid => Ok(User::from(model)),
                _ => Err(EngineError::Unauthorized(
                    "invalid username or password".to_string(),
                )),
            }
        })
    }

    /// Return a user with the number of ads they own.
    pub async fn user_profile(&self, username: &str) -> ResultEngine<UserProfile> {
        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, username).await?;
            let ads_count = ads::Entity::find()
                .filter(ads::Column::UserId.eq(username.to_string()))
                .count(&db_tx)
                .await?;
            Ok(UserProfile {
                user: User::from(model),
                ads_count,
            })
        })
    }

    /// Update email and names. Blank names are stored empty.
    pub async fn update_profile(
        &self,
        username: &str,
        changes: ProfileChanges,
    ) -> ResultEngine<User> {
        let email = changes.email.as_deref().map(validate_email).transpose()?;
        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, username).await?;
            let mut active: users::ActiveModel = model.into();

            if let Some(email) = email {
                self.require_email_free(&db_tx, &email, Some(username))
                    .await?;
                active.email = ActiveValue::Set(email);
            }
            if let Some(first_name) = changes.first_name.as_deref() {
                active.first_name =
                    ActiveValue::Set(normalize_optional_text(Some(first_name)).unwrap_or_default());
            }
            if let Some(last_name) = changes.last_name.as_deref() {
                active.last_name =
                    ActiveValue::Set(normalize_optional_text(Some(last_name)).unwrap_or_default());
            }

            if !active.is_changed() {
                return Ok(User::from(self.require_user(&db_tx, username).await?));
            }
            let model = active.update(&db_tx).await?;
            info!(user = username, "profile updated");
            Ok(User::from(model))
        })
    }

    /// Remove the account, its ads and every proposal touching those ads.
    pub async fn delete_account(&self, username: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, username).await?;

            let ad_ids: Vec<String> = ads::Entity::find()
                .select_only()
                .column(ads::Column::Id)
                .filter(ads::Column::UserId.eq(username.to_string()))
                .into_tuple()
                .all(&db_tx)
                .await?;

            if !ad_ids.is_empty() {
                proposals::Entity::delete_many()
                    .filter(
                        Condition::any()
                            .add(proposals::Column::AdSenderId.is_in(ad_ids.clone()))
                            .add(proposals::Column::AdReceiverId.is_in(ad_ids.clone())),
                    )
                    .exec(&db_tx)
                    .await?;
                ads::Entity::delete_many()
                    .filter(ads::Column::UserId.eq(username.to_string()))
                    .exec(&db_tx)
                    .await?;
            }
            users::Entity::delete_by_id(username.to_string())
                .exec(&db_tx)
                .await?;

            info!(user = username, ads = ad_ids.len(), "account deleted");
            Ok(())
        })
    }
}
