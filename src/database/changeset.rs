use sqlx::{Encode, Postgres, QueryBuilder, Type};
use uuid::Uuid;

/// Partial `UPDATE ... SET` list with bound parameters.
///
/// Only the assignments that were actually requested end up in the statement,
/// so PATCH bodies map to `set_opt` calls one field at a time.
pub struct Changeset {
    builder: QueryBuilder<'static, Postgres>,
    assignments: usize,
}

impl Changeset {
    pub fn new(table: &str) -> Self {
        Self {
            builder: QueryBuilder::new(format!("UPDATE {} SET ", table)),
            assignments: 0,
        }
    }

    fn next(&mut self) -> &mut QueryBuilder<'static, Postgres> {
        if self.assignments > 0 {
            self.builder.push(", ");
        }
        self.assignments += 1;
        &mut self.builder
    }

    pub fn set<V>(mut self, column: &str, value: V) -> Self
    where
        V: 'static + Encode<'static, Postgres> + Type<Postgres> + Send,
    {
        self.next().push(column).push(" = ").push_bind(value);
        self
    }

    pub fn set_opt<V>(self, column: &str, value: Option<V>) -> Self
    where
        V: 'static + Encode<'static, Postgres> + Type<Postgres> + Send,
    {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    pub fn touch(mut self) -> Self {
        self.next().push("updated_at = now()");
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments == 0
    }

    pub fn sql(&self) -> &str {
        self.builder.sql()
    }

    /// Close the SET list with `WHERE id = $n`. Callers append the tenant
    /// predicate and `RETURNING` clause.
    pub fn where_id(mut self, id: Uuid) -> QueryBuilder<'static, Postgres> {
        self.builder.push(" WHERE id = ").push_bind(id);
        self.builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_requested_columns_are_set() {
        let cs = Changeset::new("bills")
            .touch()
            .set_opt("name", Some("Rent".to_string()))
            .set_opt::<bool>("is_paid", None)
            .set("category_id", None::<Uuid>);

        assert_eq!(cs.sql(), "UPDATE bills SET updated_at = now(), name = $1, category_id = $2");
    }

    #[test]
    fn empty_changeset() {
        let cs = Changeset::new("notifications");
        assert!(cs.is_empty());
        assert!(!Changeset::new("assets").touch().is_empty());
    }

    #[test]
    fn where_id_binds_next_parameter() {
        let q = Changeset::new("assets").set("name", "Laptop".to_string()).where_id(Uuid::nil());
        assert_eq!(q.sql(), "UPDATE assets SET name = $1 WHERE id = $2");
    }
}
