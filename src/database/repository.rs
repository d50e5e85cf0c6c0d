use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::database::changeset::Changeset;
use crate::database::manager::DatabaseError;

/// A table whose rows belong to exactly one tenant key.
pub trait Record: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    const TABLE: &'static str;
    /// Used in "<entity> not found" messages
    const ENTITY: &'static str;
    const TIMESTAMPED: bool = true;
}

/// Tenant key every statement issued by a [`Repository`] is filtered by.
/// Always derived from the authenticated principal, never from request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Workspace(Uuid),
    User(Uuid),
}

impl Scope {
    pub fn column(&self) -> &'static str {
        match self {
            Scope::Workspace(_) => "workspace_id",
            Scope::User(_) => "user_id",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Scope::Workspace(id) | Scope::User(id) => *id,
        }
    }
}

pub struct Repository<T> {
    pool: PgPool,
    scope: Scope,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: Record> Repository<T> {
    pub fn new(pool: PgPool, scope: Scope) -> Self {
        Self {
            pool,
            scope,
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    fn scoped(&self, head: &str) -> QueryBuilder<'static, Postgres> {
        let mut q = QueryBuilder::new(format!("{} FROM {} WHERE {} = ", head, T::TABLE, self.scope.column()));
        q.push_bind(self.scope.id());
        q
    }

    pub async fn select_optional(&self, id: Uuid) -> Result<Option<T>, DatabaseError> {
        let mut q = self.scoped("SELECT *");
        q.push(" AND id = ").push_bind(id);
        Ok(q.build_query_as::<T>().fetch_optional(&self.pool).await?)
    }

    pub async fn select_404(&self, id: Uuid) -> Result<T, DatabaseError> {
        self.select_optional(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(T::ENTITY))
    }

    pub async fn select_all(&self, order_by: &str) -> Result<Vec<T>, DatabaseError> {
        let mut q = self.scoped("SELECT *");
        q.push(" ORDER BY ").push(order_by);
        Ok(q.build_query_as::<T>().fetch_all(&self.pool).await?)
    }

    /// One page of rows plus the total matching `conditions`. The closure runs
    /// once for the count and once for the page and must push ` AND ...` fragments.
    pub async fn select_page<F>(
        &self,
        conditions: F,
        order_by: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<T>, i64), DatabaseError>
    where
        F: Fn(&mut QueryBuilder<'static, Postgres>),
    {
        let total = self.count_where(&conditions).await?;

        let mut q = self.scoped("SELECT *");
        conditions(&mut q);
        q.push(" ORDER BY ").push(order_by);
        q.push(" LIMIT ").push_bind(limit);
        q.push(" OFFSET ").push_bind(offset);
        let rows = q.build_query_as::<T>().fetch_all(&self.pool).await?;

        Ok((rows, total))
    }

    pub async fn count_where<F>(&self, conditions: F) -> Result<i64, DatabaseError>
    where
        F: Fn(&mut QueryBuilder<'static, Postgres>),
    {
        let mut q = self.scoped("SELECT COUNT(*)");
        conditions(&mut q);
        let row = q.build().fetch_one(&self.pool).await?;
        Ok(row.try_get(0)?)
    }

    /// How many of `ids` exist inside this scope
    pub async fn count_ids(&self, ids: &[Uuid]) -> Result<i64, DatabaseError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids = ids.to_vec();
        self.count_where(move |q| {
            q.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
        })
        .await
    }

    pub fn changeset(&self) -> Changeset {
        let changeset = Changeset::new(T::TABLE);
        if T::TIMESTAMPED {
            changeset.touch()
        } else {
            changeset
        }
    }

    /// Apply `changeset` to the row only if it lives in this scope.
    /// Zero affected rows is reported as not found.
    pub async fn update_404(&self, id: Uuid, changeset: Changeset) -> Result<T, DatabaseError> {
        if changeset.is_empty() {
            return self.select_404(id).await;
        }

        let mut q = changeset.where_id(id);
        q.push(" AND ").push(self.scope.column()).push(" = ").push_bind(self.scope.id());
        q.push(" RETURNING *");

        q.build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found(T::ENTITY))
    }

    pub async fn delete_404(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut q = QueryBuilder::<Postgres>::new(format!("DELETE FROM {} WHERE id = ", T::TABLE));
        q.push_bind(id);
        q.push(" AND ").push(self.scope.column()).push(" = ").push_bind(self.scope.id());

        let result = q.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(T::ENTITY));
        }
        Ok(())
    }
}
