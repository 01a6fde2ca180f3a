//! Shared map links and their access state machine.
//!
//! A link starts as an unsaved `Draft`, becomes `Shared` when persisted with
//! a fresh token, may toggle between `Shared` and `Unpublished`, and ends in
//! `Deleted`. Only `Shared` links resolve publicly; each successful public
//! fetch bumps the view counter once.

use chrono::Utc;
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::database::entities::shared_map_links;
use crate::errors::{CoreError, CoreResult};
use crate::services::authorization::Actor;
use crate::services::validation::ValidationService;

const TOKEN_LEN: usize = 32;
const TOKEN_ATTEMPTS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareState {
    Draft,
    Shared,
    Unpublished,
    Deleted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareAction {
    Share,
    Publish,
    Unpublish,
    Delete,
    View,
}

impl ShareState {
    pub fn of(link: &shared_map_links::Model) -> Self {
        if link.is_public {
            ShareState::Shared
        } else {
            ShareState::Unpublished
        }
    }

    /// Next state, or the error the caller should see for an illegal move.
    pub fn apply(self, action: ShareAction) -> CoreResult<ShareState> {
        use ShareAction::*;
        use ShareState::*;

        match (self, action) {
            (Draft, Share) => Ok(Shared),
            (Shared | Unpublished, Publish) => Ok(Shared),
            (Shared | Unpublished, Unpublish) => Ok(Unpublished),
            (Shared | Unpublished, Delete) => Ok(Deleted),
            (Shared, View) => Ok(Shared),
            (Shared | Unpublished, Share) => {
                Err(CoreError::conflict("Map is already shared"))
            }
            (Unpublished | Draft | Deleted, View) | (Draft | Deleted, _) => {
                Err(CoreError::not_found("SharedMapLink", "unavailable"))
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareMapRequest {
    pub title: String,
    pub description: Option<String>,
    pub geojson: Value,
    pub layer_config: Option<Value>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

/// What an anonymous visitor receives for a public token.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSharedMap {
    pub title: String,
    pub description: Option<String>,
    pub map_data: Value,
    pub view_count: i64,
    pub created_at: chrono::DateTime<Utc>,
}

pub fn generate_share_token() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                            abcdefghijklmnopqrstuvwxyz\
                            0123456789";

    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[derive(Clone)]
pub struct ShareService {
    db: DatabaseConnection,
}

impl ShareService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persist a snapshot under a freshly minted token.
    pub async fn share(
        &self,
        actor: &Actor,
        request: ShareMapRequest,
    ) -> CoreResult<shared_map_links::Model> {
        let title = ValidationService::validate_title("Title", &request.title)?;
        let description = ValidationService::validate_description(request.description.as_deref())?;
        let mut state = ShareState::Draft.apply(ShareAction::Share)?;
        if !request.is_public {
            state = state.apply(ShareAction::Unpublish)?;
        }

        let map_data = json!({
            "geojson": request.geojson,
            "layerConfig": request.layer_config.unwrap_or(Value::Null),
        })
        .to_string();

        for attempt in 1..=TOKEN_ATTEMPTS {
            let now = Utc::now();
            let link = shared_map_links::ActiveModel {
                title: Set(title.clone()),
                description: Set(description.clone()),
                map_data: Set(map_data.clone()),
                share_token: Set(generate_share_token()),
                is_public: Set(state == ShareState::Shared),
                view_count: Set(0),
                owner_id: Set(actor.user_id),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };

            match link.insert(&self.db).await {
                Ok(link) => {
                    info!(link_id = link.id, owner_id = actor.user_id, "Shared map");
                    return Ok(link);
                }
                Err(err) if is_unique_violation(&err) => {
                    warn!(attempt, "Share token collision, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(CoreError::internal("Could not mint a unique share token"))
    }

    /// Links owned by the caller; admins see every link.
    pub async fn list(&self, actor: &Actor) -> CoreResult<Vec<shared_map_links::Model>> {
        let mut query = shared_map_links::Entity::find();
        if !actor.is_admin() {
            query = query.filter(shared_map_links::Column::OwnerId.eq(actor.user_id));
        }
        Ok(query
            .order_by_desc(shared_map_links::Column::CreatedAt)
            .order_by_desc(shared_map_links::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Anonymous fetch by token. Missing, unpublished and deleted links all
    /// report not found; a hit increments the view counter atomically.
    pub async fn resolve_public(&self, token: &str) -> CoreResult<PublicSharedMap> {
        let not_found = || CoreError::not_found("SharedMapLink", "token");

        let result = shared_map_links::Entity::update_many()
            .col_expr(
                shared_map_links::Column::ViewCount,
                Expr::col(shared_map_links::Column::ViewCount).add(1),
            )
            .filter(shared_map_links::Column::ShareToken.eq(token))
            .filter(shared_map_links::Column::IsPublic.eq(true))
            .exec(&self.db)
            .await?;

        if result.rows_affected != 1 {
            debug!("Public fetch of unavailable share token");
            return Err(not_found());
        }

        let link = shared_map_links::Entity::find()
            .filter(shared_map_links::Column::ShareToken.eq(token))
            .one(&self.db)
            .await?
            .ok_or_else(not_found)?;
        ShareState::of(&link).apply(ShareAction::View)?;

        let map_data = serde_json::from_str(&link.map_data).unwrap_or_else(|err| {
            warn!(link_id = link.id, error = %err, "Stored map snapshot is not valid JSON");
            Value::Null
        });

        Ok(PublicSharedMap {
            title: link.title,
            description: link.description,
            map_data,
            view_count: link.view_count,
            created_at: link.created_at,
        })
    }

    pub async fn set_visibility(
        &self,
        actor: &Actor,
        id: i32,
        is_public: bool,
    ) -> CoreResult<shared_map_links::Model> {
        let link = self.find_managed(actor, id).await?;
        let action = if is_public {
            ShareAction::Publish
        } else {
            ShareAction::Unpublish
        };
        let next = ShareState::of(&link).apply(action)?;

        let mut link: shared_map_links::ActiveModel = link.into();
        link.is_public = Set(next == ShareState::Shared);
        link.updated_at = Set(Utc::now());
        Ok(link.update(&self.db).await?)
    }

    pub async fn delete(&self, actor: &Actor, id: i32) -> CoreResult<()> {
        let link = self.find_managed(actor, id).await?;
        ShareState::of(&link).apply(ShareAction::Delete)?;

        shared_map_links::Entity::delete_by_id(link.id)
            .exec(&self.db)
            .await?;
        info!(link_id = id, "Deleted shared map");
        Ok(())
    }

    async fn find_managed(&self, actor: &Actor, id: i32) -> CoreResult<shared_map_links::Model> {
        let link = shared_map_links::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("SharedMapLink", id.to_string()))?;

        if !actor.can_manage(link.owner_id) {
            return Err(CoreError::forbidden("Only the owner can manage this link"));
        }
        Ok(link)
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
