//! Grid entity repository.
//!
//! Loads the whole grid into a [`Snapshot`] and applies single-entity
//! writes. Estate region lists are not stored; they are derived from each
//! region's `estate_id`.

use super::DbError;
use crate::state::Snapshot;
use chrono::{DateTime, Utc};
use grid_proto::{
    Estate, EstateId, Group, Host, HostId, Job, JobId, PendingUser, Region, User, UserId,
};
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

/// Repository for grid entities.
pub struct GridRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GridRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Read every entity.
    pub async fn load_snapshot(&self) -> Result<Snapshot, DbError> {
        let users = sqlx::query_as::<_, (Uuid, String, String, i32, bool)>(
            "SELECT user_id, name, email, access_level, suspended FROM users ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|(user_id, name, email, access_level, suspended)| User {
            user_id,
            name,
            email,
            access_level,
            suspended,
        })
        .collect();

        let pending_users = sqlx::query_as::<_, (String, String, String)>(
            "SELECT name, email, summary FROM pending_users ORDER BY email",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|(name, email, summary)| PendingUser {
            name,
            email,
            summary,
        })
        .collect();

        let mut members: HashMap<Uuid, Vec<UserId>> = HashMap::new();
        for (group, user) in sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT group_id, user_id FROM group_members ORDER BY rowid",
        )
        .fetch_all(self.pool)
        .await?
        {
            members.entry(group).or_default().push(user);
        }
        let groups = sqlx::query_as::<_, (Uuid, String, Uuid)>(
            "SELECT id, name, founder FROM groups ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|(id, name, founder)| Group {
            id,
            name,
            founder,
            members: members.remove(&id).unwrap_or_default(),
        })
        .collect();

        let hosts = sqlx::query_as::<_, (HostId, String, String)>(
            "SELECT id, address, name FROM hosts ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|(id, address, name)| Host {
            id,
            address,
            name,
            online: false,
        })
        .collect();

        let regions: Vec<Region> =
            sqlx::query_as::<_, (Uuid, String, i32, i32, HostId, Option<EstateId>)>(
                "SELECT uuid, name, loc_x, loc_y, host, estate_id FROM regions ORDER BY name",
            )
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(|(uuid, name, loc_x, loc_y, host, estate)| Region {
                uuid,
                name,
                loc_x,
                loc_y,
                host,
                estate,
            })
            .collect();

        let mut managers: HashMap<EstateId, Vec<UserId>> = HashMap::new();
        for (estate, user) in sqlx::query_as::<_, (EstateId, Uuid)>(
            "SELECT estate_id, user_id FROM estate_managers ORDER BY estate_id, position",
        )
        .fetch_all(self.pool)
        .await?
        {
            managers.entry(estate).or_default().push(user);
        }
        let estates = sqlx::query_as::<_, (EstateId, String, Uuid)>(
            "SELECT id, name, owner FROM estates ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|(id, name, owner)| Estate {
            id,
            name,
            owner,
            managers: managers.remove(&id).unwrap_or_default(),
            regions: regions
                .iter()
                .filter(|r| r.estate == Some(id))
                .map(|r| r.uuid)
                .collect(),
        })
        .collect();

        let jobs = sqlx::query_as::<_, (JobId, DateTime<Utc>, String, Uuid, String)>(
            "SELECT id, timestamp, kind, user_id, data FROM jobs ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|(id, timestamp, kind, user, data)| Job {
            id,
            timestamp,
            kind,
            user,
            data,
        })
        .collect();

        Ok(Snapshot {
            users,
            pending_users,
            groups,
            hosts,
            regions,
            estates,
            jobs,
        })
    }

    /// Insert a user unless one with the same id exists. Returns whether it was inserted.
    pub async fn ensure_user(&self, user: &User) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO users (user_id, name, email, access_level, suspended)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.access_level)
        .bind(user.suspended)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn upsert_host(&self, host: &Host) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO hosts (id, address, name) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET address = excluded.address, name = excluded.name
            "#,
        )
        .bind(host.id)
        .bind(&host.address)
        .bind(&host.name)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_host(&self, id: HostId) -> Result<(), DbError> {
        sqlx::query("DELETE FROM hosts WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn upsert_region(&self, region: &Region) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO regions (uuid, name, loc_x, loc_y, host, estate_id)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(uuid) DO UPDATE SET
                name = excluded.name,
                loc_x = excluded.loc_x,
                loc_y = excluded.loc_y,
                host = excluded.host,
                estate_id = excluded.estate_id
            "#,
        )
        .bind(region.uuid)
        .bind(&region.name)
        .bind(region.loc_x)
        .bind(region.loc_y)
        .bind(region.host)
        .bind(region.estate)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Store an estate and its ordered manager list.
    pub async fn upsert_estate(&self, estate: &Estate) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO estates (id, name, owner) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, owner = excluded.owner
            "#,
        )
        .bind(estate.id)
        .bind(&estate.name)
        .bind(estate.owner)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM estate_managers WHERE estate_id = ?")
            .bind(estate.id)
            .execute(&mut *tx)
            .await?;
        for (position, manager) in estate.managers.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO estate_managers (estate_id, user_id, position) VALUES (?, ?, ?)",
            )
            .bind(estate.id)
            .bind(*manager)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn insert_job(&self, job: &Job) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO jobs (id, timestamp, kind, user_id, data) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(job.id)
        .bind(job.timestamp)
        .bind(&job.kind)
        .bind(job.user)
        .bind(&job.data)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_job(&self, id: JobId) -> Result<(), DbError> {
        sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_password(&self, user: UserId, hash: &str) -> Result<(), DbError> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE user_id = ?")
            .bind(hash)
            .bind(user)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn password_hash(&self, user: UserId) -> Result<Option<String>, DbError> {
        let hash: Option<Option<String>> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE user_id = ?")
                .bind(user)
                .fetch_optional(self.pool)
                .await?;
        Ok(hash.flatten())
    }
}
