//! The authenticated principal: a tagged union over the three staff/member
//! tables, resolved from a `Login`'s polymorphic reference.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use crate::DbPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Receptionist,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Receptionist => "receptionist",
            Role::User => "user",
        }
    }

    /// Role tags are matched case-insensitively wherever they come from
    /// storage or route configuration.
    pub fn parse(tag: &str) -> Option<Role> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "receptionist" => Some(Role::Receptionist),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Admin {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub gym_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Receptionist {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub gym_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// The resolved principal for a request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Actor {
    Admin(Admin),
    Receptionist(Receptionist),
    User(super::User),
}

impl Actor {
    /// Resolve the polymorphic reference carried by a `Login`. Returns
    /// `None` when the tag is unknown or the referenced row is gone.
    pub async fn resolve(
        pool: &DbPool,
        actor_type: &str,
        actor_id: &str,
    ) -> sqlx::Result<Option<Actor>> {
        match Role::parse(actor_type) {
            Some(Role::Admin) => Ok(
                sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = ?")
                    .bind(actor_id)
                    .fetch_optional(pool)
                    .await?
                    .map(Actor::Admin),
            ),
            Some(Role::Receptionist) => Ok(sqlx::query_as::<_, Receptionist>(
                "SELECT * FROM receptionists WHERE id = ?",
            )
            .bind(actor_id)
            .fetch_optional(pool)
            .await?
            .map(Actor::Receptionist)),
            Some(Role::User) => Ok(
                sqlx::query_as::<_, super::User>("SELECT * FROM users WHERE id = ?")
                    .bind(actor_id)
                    .fetch_optional(pool)
                    .await?
                    .map(Actor::User),
            ),
            None => Ok(None),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Actor::Admin(_) => Role::Admin,
            Actor::Receptionist(_) => Role::Receptionist,
            Actor::User(_) => Role::User,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Actor::Admin(a) => &a.id,
            Actor::Receptionist(r) => &r.id,
            Actor::User(u) => &u.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Actor::Admin(a) => &a.name,
            Actor::Receptionist(r) => &r.name,
            Actor::User(u) => &u.name,
        }
    }

    pub fn gym_id(&self) -> &str {
        match self {
            Actor::Admin(a) => &a.gym_id,
            Actor::Receptionist(r) => &r.gym_id,
            Actor::User(u) => &u.gym_id,
        }
    }

    /// Index path of a resource for this actor's section of the panel.
    pub fn index_path(&self, resource: &str) -> String {
        match self.role() {
            Role::Admin => format!("/admin/{}", resource),
            Role::Receptionist => format!("/receptionist/{}", resource),
            Role::User => "/dashboard".to_string(),
        }
    }
}
