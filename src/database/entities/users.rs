use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
    pub last_login_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_sessions::Entity")]
    UserSessions,
    #[sea_orm(has_many = "super::generated_maps::Entity")]
    GeneratedMaps,
    #[sea_orm(has_many = "super::shared_map_links::Entity")]
    SharedMapLinks,
}

impl Related<super::user_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserSessions.def()
    }
}

impl Related<super::generated_maps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GeneratedMaps.def()
    }
}

impl Related<super::shared_map_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SharedMapLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new() -> Self {
        Self {
            id: ActiveValue::NotSet,
            email: ActiveValue::NotSet,
            display_name: ActiveValue::NotSet,
            password_hash: ActiveValue::NotSet,
            role: Set("user".to_string()),
            is_active: Set(true),
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(chrono::Utc::now()),
            last_login_at: ActiveValue::NotSet,
        }
    }

    pub fn set_last_login(mut self) -> Self {
        self.last_login_at = Set(Some(chrono::Utc::now()));
        self
    }
}

impl Model {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}
