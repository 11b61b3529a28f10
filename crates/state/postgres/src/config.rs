/// Configuration for the Postgres-backed [`crate::PostgresStore`].
///
/// `schema` and `table_prefix` let multiple logical deployments share a
/// cluster without colliding on table names, mirroring the convention used
/// by the reference corpus's own Postgres backends.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub pool_size: u32,
    pub schema: String,
    pub table_prefix: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/nightwatch".to_string(),
            pool_size: 10,
            schema: "public".to_string(),
            table_prefix: "nightwatch_".to_string(),
        }
    }
}

impl PostgresConfig {
    fn qualified(&self, name: &str) -> String {
        format!("{}.{}{}", self.schema, self.table_prefix, name)
    }

    pub fn users_table(&self) -> String {
        self.qualified("users")
    }
    pub fn schedules_table(&self) -> String {
        self.qualified("schedules")
    }
    pub fn bookings_table(&self) -> String {
        self.qualified("bookings")
    }
    pub fn recurring_assignments_table(&self) -> String {
        self.qualified("recurring_assignments")
    }
    pub fn outbox_table(&self) -> String {
        self.qualified("outbox_items")
    }
    pub fn reports_table(&self) -> String {
        self.qualified("reports")
    }
    pub fn points_ledger_table(&self) -> String {
        self.qualified("points_ledger")
    }
    pub fn points_cache_table(&self) -> String {
        self.qualified("user_points_cache")
    }
    pub fn audit_table(&self) -> String {
        self.qualified("audit_events")
    }
    pub fn broadcasts_table(&self) -> String {
        self.qualified("broadcasts")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_schema_and_prefix_qualified() {
        let config = PostgresConfig {
            url: "postgres://x".into(),
            pool_size: 5,
            schema: "app".into(),
            table_prefix: "nw_".into(),
        };
        assert_eq!(config.bookings_table(), "app.nw_bookings");
        assert_eq!(config.users_table(), "app.nw_users");
    }
}
