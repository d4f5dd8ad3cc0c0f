use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::repository::Repository;

/// RoleId
///
/// Reference identifiers for the portal's roles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RoleId {
    Admin,
    Citizen,
}

impl RoleId {
    pub const ALL: [RoleId; 2] = [RoleId::Admin, RoleId::Citizen];

    pub fn as_str(self) -> &'static str {
        match self {
            RoleId::Admin => "admin",
            RoleId::Citizen => "citizen",
        }
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleId {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == raw)
            .ok_or_else(|| format!("unknown role: {raw}"))
    }
}

/// Role
///
/// A role and the two capability flags copied into every token issued for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Role {
    pub id: RoleId,
    pub app_access: bool,
    pub admin_access: bool,
}

/// The reference roles every deployment starts with.
pub fn default_roles() -> Vec<Role> {
    vec![
        Role {
            id: RoleId::Admin,
            app_access: true,
            admin_access: true,
        },
        Role {
            id: RoleId::Citizen,
            app_access: true,
            admin_access: false,
        },
    ]
}

/// seed_roles
///
/// Creates any missing reference role. Safe to run on every boot and from several
/// instances at once: an existing role (including one created by a concurrent
/// instance between the check and the insert) is left untouched.
///
/// Returns the number of roles this call created.
pub async fn seed_roles(repo: &dyn Repository) -> usize {
    let mut created = 0;

    for role in default_roles() {
        if repo.get_role(role.id).await.is_some() {
            tracing::debug!(role = %role.id, "role already present");
            continue;
        }

        if repo.insert_role(role.clone()).await {
            tracing::info!(role = %role.id, "seeded role");
            created += 1;
        } else {
            tracing::warn!(role = %role.id, "role already exists, skipping seed");
        }
    }

    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::UpdateRoleRequest, repository::memory::InMemoryRepository};

    #[tokio::test]
    async fn seeding_twice_creates_each_role_once() {
        let repo = InMemoryRepository::new();

        assert_eq!(seed_roles(&repo).await, 2);
        assert_eq!(seed_roles(&repo).await, 0);

        let roles = repo.get_roles().await;
        assert_eq!(roles.len(), 2);
        assert_eq!(roles.iter().filter(|r| r.id == RoleId::Admin).count(), 1);
        assert_eq!(roles.iter().filter(|r| r.id == RoleId::Citizen).count(), 1);
    }

    #[tokio::test]
    async fn seeding_keeps_administrative_changes() {
        let repo = InMemoryRepository::new();
        seed_roles(&repo).await;

        let update = UpdateRoleRequest {
            app_access: Some(false),
            admin_access: None,
        };
        repo.update_role(RoleId::Citizen, update).await.unwrap();
        seed_roles(&repo).await;

        let citizen = repo.get_role(RoleId::Citizen).await.unwrap();
        assert!(!citizen.app_access);
    }

    #[tokio::test]
    async fn concurrent_insert_is_a_no_op() {
        let repo = InMemoryRepository::new();
        let admin = default_roles().remove(0);

        assert!(repo.insert_role(admin.clone()).await);
        assert!(!repo.insert_role(admin).await);
        assert_eq!(repo.get_roles().await.len(), 1);
    }

    #[test]
    fn role_ids_parse_from_their_wire_names() {
        assert_eq!("citizen".parse::<RoleId>(), Ok(RoleId::Citizen));
        assert!("Admin".parse::<RoleId>().is_err());
    }
}
