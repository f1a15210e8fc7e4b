#[cfg(feature = "database")]
pub use sqlite::SqliteReportStore;

use std::sync::Arc;

use crate::config::ReportingConfig;
use crate::domain::LocationTree;
use crate::store::ReportStore;

/// A configured persistent store together with its location reference tree.
pub struct DatabaseHandle {
    pub store: Arc<dyn ReportStore>,
    pub locations: LocationTree,
}

#[cfg(feature = "database")]
/// Open the SQLite store named in the configuration, if any.
pub async fn open_database(config: &ReportingConfig) -> anyhow::Result<Option<DatabaseHandle>> {
    use anyhow::Context;

    let Some(db_config) = &config.database else {
        tracing::info!("Database not configured, skipping initialization");
        return Ok(None);
    };

    tracing::info!("Initializing database at {}", db_config.url);
    let store = SqliteReportStore::connect(
        &db_config.url,
        db_config.max_connections,
        db_config.auto_migrate,
    )
    .await
    .with_context(|| format!("Failed to open database at {}", db_config.url))?;
    let locations = store.location_tree().await?;

    Ok(Some(DatabaseHandle {
        store: Arc::new(store),
        locations,
    }))
}

// Stub implementation for when database feature is not enabled
#[cfg(not(feature = "database"))]
pub async fn open_database(_config: &ReportingConfig) -> anyhow::Result<Option<DatabaseHandle>> {
    tracing::info!("Database feature not enabled, skipping database initialization");
    Ok(None)
}

#[cfg(feature = "database")]
mod sqlite {
    use async_trait::async_trait;
    use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow};
    use sqlx::{Row, SqlitePool};
    use std::str::FromStr;
    use tracing::info;

    use crate::domain::{
        ActivityPlan, ActivityPlanId, ActivityPlanReport, ActivityPlanReportId,
        DisaggregationLocationReport, DisaggregationTarget, Location, LocationTree,
        MonthlyReport, PlanReportTree, Project, ProjectId, ReportId, ReportState,
        TargetLocation, TargetLocationReport, TargetLocationReportId,
    };
    use crate::errors::{ReportError, Result};
    use crate::store::ReportStore;

    fn db_id(id: u64) -> i64 {
        id as i64
    }

    fn row_id(row: &SqliteRow, column: &str) -> Result<u64> {
        Ok(row.try_get::<i64, _>(column)? as u64)
    }

    /// Owner lookups for [`claim_rows`], each a subquery over `?1`.
    const REPORT_ID: &str = "?1";
    const PLAN_REPORT_OWNER: &str = "SELECT monthly_report_id FROM activity_plan_reports WHERE id = ?1";
    const LOCATION_REPORT_OWNER: &str = "SELECT apr.monthly_report_id FROM target_location_reports tlr \
        JOIN activity_plan_reports apr ON apr.id = tlr.activity_plan_report_id WHERE tlr.id = ?1";

    /// Bumps the version of the report owning a row about to change.
    ///
    /// The `UPDATE` takes SQLite's write lock before the state is checked, so
    /// the check holds until the surrounding transaction ends. On refusal the
    /// caller drops the transaction and the bump rolls back.
    async fn claim_rows(
        conn: &mut SqliteConnection,
        owner: &str,
        id: u64,
        entity: &'static str,
        editable: impl Fn(ReportState) -> bool,
    ) -> Result<()> {
        let row = sqlx::query(&format!(
            "UPDATE monthly_reports SET version = version + 1 WHERE id = ({owner}) RETURNING id, state"
        ))
        .bind(db_id(id))
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ReportError::not_found(entity, id))?;

        let state: String = row.try_get("state")?;
        let state: ReportState = state.parse().map_err(ReportError::Storage)?;
        if !editable(state) {
            return Err(ReportError::ReportLocked {
                report_id: row_id(&row, "id")?,
                state,
            });
        }
        Ok(())
    }

    /// Report store backed by SQLite.
    ///
    /// State commits run as a conditional `UPDATE` on the report version
    /// inside a transaction, so a second writer racing on the same report sees
    /// zero affected rows.
    pub struct SqliteReportStore {
        pool: SqlitePool,
    }

    impl SqliteReportStore {
        /// Connect and optionally run the bundled migrations.
        pub async fn connect(database_url: &str, max_connections: u32, auto_migrate: bool) -> Result<Self> {
            let options = SqliteConnectOptions::from_str(database_url)?
                .create_if_missing(true)
                .foreign_keys(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect_with(options)
                .await?;

            if auto_migrate {
                info!("Running database migrations...");
                sqlx::migrate!("./migrations").run(&pool).await?;
                info!("Database migrations completed");
            }

            Ok(Self { pool })
        }

        pub fn pool(&self) -> &SqlitePool {
            &self.pool
        }

        pub async fn put_location(&self, location: &Location) -> Result<()> {
            sqlx::query(
                r#"
                INSERT INTO locations (code, name, level, parent)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(code) DO UPDATE SET name = ?2, level = ?3, parent = ?4
                "#,
            )
            .bind(&location.code)
            .bind(&location.name)
            .bind(location.level.as_str())
            .bind(location.parent.as_deref())
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        pub async fn location_tree(&self) -> Result<LocationTree> {
            let rows = sqlx::query("SELECT code, name, level, parent FROM locations")
                .fetch_all(&self.pool)
                .await?;

            let mut locations = Vec::with_capacity(rows.len());
            for row in rows {
                let level: String = row.try_get("level")?;
                locations.push(Location {
                    code: row.try_get("code")?,
                    name: row.try_get("name")?,
                    level: level.parse().map_err(ReportError::Storage)?,
                    parent: row.try_get("parent")?,
                });
            }
            Ok(LocationTree::new(locations))
        }

        /// Close database connections gracefully
        pub async fn shutdown(&self) {
            info!("Shutting down database connections...");
            self.pool.close().await;
            info!("Database connections closed");
        }
    }

    fn project_from_row(row: &SqliteRow) -> Result<Project> {
        let frequency: String = row.try_get("reporting_frequency")?;
        let grace_days: i64 = row.try_get("grace_days")?;
        Ok(Project {
            id: row_id(row, "id")?,
            title: row.try_get("title")?,
            code: row.try_get("code")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            reporting_frequency: frequency.parse().map_err(ReportError::Storage)?,
            grace_days: u32::try_from(grace_days).map_err(|_| {
                ReportError::Storage(format!("grace_days {grace_days} is out of range"))
            })?,
        })
    }

    fn report_from_row(row: &SqliteRow) -> Result<MonthlyReport> {
        let state: String = row.try_get("state")?;
        Ok(MonthlyReport {
            id: row_id(row, "id")?,
            project_id: row_id(row, "project_id")?,
            from_date: row.try_get("from_date")?,
            to_date: row.try_get("to_date")?,
            report_due_date: row.try_get("report_due_date")?,
            state: state.parse().map_err(ReportError::Storage)?,
            report_date: row.try_get("report_date")?,
            approved_on: row.try_get("approved_on")?,
            rejected_on: row.try_get("rejected_on")?,
            rejection_comment: row.try_get("rejection_comment")?,
            version: row_id(row, "version")?,
        })
    }

    fn plan_report_from_row(row: &SqliteRow) -> Result<ActivityPlanReport> {
        Ok(ActivityPlanReport {
            id: row_id(row, "id")?,
            monthly_report_id: row_id(row, "monthly_report_id")?,
            activity_plan_id: row_id(row, "activity_plan_id")?,
            response_type: row.try_get("response_type")?,
            units: row.try_get("units")?,
            no_of_transfers: row.try_get("no_of_transfers")?,
        })
    }

    fn location_report_from_row(row: &SqliteRow) -> Result<TargetLocationReport> {
        Ok(TargetLocationReport {
            id: row_id(row, "id")?,
            activity_plan_report_id: row_id(row, "activity_plan_report_id")?,
            target_location_id: row_id(row, "target_location_id")?,
            location_code: row.try_get("location_code")?,
        })
    }

    fn disaggregation_from_row(row: &SqliteRow) -> Result<DisaggregationLocationReport> {
        Ok(DisaggregationLocationReport {
            id: row_id(row, "id")?,
            target_location_report_id: row_id(row, "target_location_report_id")?,
            category: row.try_get("category")?,
            reached: row.try_get("reached")?,
        })
    }

    const REPORT_COLUMNS: &str = "id, project_id, from_date, to_date, report_due_date, state, \
        report_date, approved_on, rejected_on, rejection_comment, version";

    #[async_trait]
    impl ReportStore for SqliteReportStore {
        async fn project(&self, id: ProjectId) -> Result<Project> {
            let row = sqlx::query(
                "SELECT id, title, code, start_date, end_date, reporting_frequency, grace_days \
                 FROM projects WHERE id = ?1",
            )
            .bind(db_id(id))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ReportError::not_found("project", id))?;
            project_from_row(&row)
        }

        async fn put_project(&self, project: Project) -> Result<()> {
            sqlx::query(
                r#"
                INSERT INTO projects (id, title, code, start_date, end_date, reporting_frequency, grace_days)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    title = ?2, code = ?3, start_date = ?4, end_date = ?5,
                    reporting_frequency = ?6, grace_days = ?7
                "#,
            )
            .bind(db_id(project.id))
            .bind(&project.title)
            .bind(&project.code)
            .bind(project.start_date)
            .bind(project.end_date)
            .bind(project.reporting_frequency.to_string())
            .bind(i64::from(project.grace_days))
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn activity_plan(&self, id: ActivityPlanId) -> Result<ActivityPlan> {
            let row = sqlx::query("SELECT id, project_id, indicator FROM activity_plans WHERE id = ?1")
                .bind(db_id(id))
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| ReportError::not_found("activity plan", id))?;

            let location_rows = sqlx::query(
                "SELECT id, location_code FROM target_locations WHERE activity_plan_id = ?1 ORDER BY id",
            )
            .bind(db_id(id))
            .fetch_all(&self.pool)
            .await?;

            let mut target_locations = Vec::with_capacity(location_rows.len());
            for location_row in location_rows {
                let location_id = row_id(&location_row, "id")?;
                let targets = sqlx::query(
                    "SELECT category, target FROM disaggregation_targets \
                     WHERE target_location_id = ?1 ORDER BY category",
                )
                .bind(db_id(location_id))
                .fetch_all(&self.pool)
                .await?
                .iter()
                .map(|t| -> Result<DisaggregationTarget> {
                    Ok(DisaggregationTarget {
                        category: t.try_get("category")?,
                        target: t.try_get("target")?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

                target_locations.push(TargetLocation {
                    id: location_id,
                    location_code: location_row.try_get("location_code")?,
                    disaggregations: targets,
                });
            }

            Ok(ActivityPlan {
                id,
                project_id: row_id(&row, "project_id")?,
                indicator: row.try_get("indicator")?,
                target_locations,
            })
        }

        async fn put_activity_plan(&self, plan: ActivityPlan) -> Result<()> {
            self.project(plan.project_id).await?;

            let mut tx = self.pool.begin().await?;
            sqlx::query(
                r#"
                INSERT INTO activity_plans (id, project_id, indicator) VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET project_id = ?2, indicator = ?3
                "#,
            )
            .bind(db_id(plan.id))
            .bind(db_id(plan.project_id))
            .bind(&plan.indicator)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM target_locations WHERE activity_plan_id = ?1")
                .bind(db_id(plan.id))
                .execute(&mut *tx)
                .await?;

            for location in &plan.target_locations {
                sqlx::query(
                    "INSERT INTO target_locations (id, activity_plan_id, location_code) VALUES (?1, ?2, ?3)",
                )
                .bind(db_id(location.id))
                .bind(db_id(plan.id))
                .bind(&location.location_code)
                .execute(&mut *tx)
                .await?;

                for target in &location.disaggregations {
                    sqlx::query(
                        "INSERT INTO disaggregation_targets (target_location_id, category, target) \
                         VALUES (?1, ?2, ?3)",
                    )
                    .bind(db_id(location.id))
                    .bind(&target.category)
                    .bind(target.target)
                    .execute(&mut *tx)
                    .await?;
                }
            }

            tx.commit().await?;
            Ok(())
        }

        async fn report(&self, id: ReportId) -> Result<MonthlyReport> {
            let row = sqlx::query(&format!("SELECT {REPORT_COLUMNS} FROM monthly_reports WHERE id = ?1"))
                .bind(db_id(id))
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| ReportError::not_found("monthly report", id))?;
            report_from_row(&row)
        }

        async fn reports_for_project(&self, project_id: ProjectId) -> Result<Vec<MonthlyReport>> {
            sqlx::query(&format!(
                "SELECT {REPORT_COLUMNS} FROM monthly_reports WHERE project_id = ?1 ORDER BY from_date, id"
            ))
            .bind(db_id(project_id))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(report_from_row)
            .collect()
        }

        async fn insert_report(&self, mut report: MonthlyReport) -> Result<MonthlyReport> {
            self.project(report.project_id).await?;

            let result = sqlx::query(
                r#"
                INSERT INTO monthly_reports
                    (project_id, from_date, to_date, report_due_date, state,
                     report_date, approved_on, rejected_on, rejection_comment, version)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(db_id(report.project_id))
            .bind(report.from_date)
            .bind(report.to_date)
            .bind(report.report_due_date)
            .bind(report.state.as_str())
            .bind(report.report_date)
            .bind(report.approved_on)
            .bind(report.rejected_on)
            .bind(report.rejection_comment.as_deref())
            .bind(db_id(report.version))
            .execute(&self.pool)
            .await?;

            report.id = result.last_insert_rowid() as u64;
            Ok(report)
        }

        async fn commit_transition(&self, updated: &MonthlyReport) -> Result<bool> {
            let mut tx = self.pool.begin().await?;
            let result = sqlx::query(
                r#"
                UPDATE monthly_reports
                SET state = ?1, report_date = ?2, approved_on = ?3, rejected_on = ?4,
                    rejection_comment = ?5, version = version + 1
                WHERE id = ?6 AND version = ?7
                "#,
            )
            .bind(updated.state.as_str())
            .bind(updated.report_date)
            .bind(updated.approved_on)
            .bind(updated.rejected_on)
            .bind(updated.rejection_comment.as_deref())
            .bind(db_id(updated.id))
            .bind(db_id(updated.version))
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            Ok(result.rows_affected() == 1)
        }

        async fn plan_report(&self, id: ActivityPlanReportId) -> Result<ActivityPlanReport> {
            let row = sqlx::query("SELECT * FROM activity_plan_reports WHERE id = ?1")
                .bind(db_id(id))
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| ReportError::not_found("activity plan report", id))?;
            plan_report_from_row(&row)
        }

        async fn plan_reports(&self, report_id: ReportId) -> Result<Vec<ActivityPlanReport>> {
            sqlx::query("SELECT * FROM activity_plan_reports WHERE monthly_report_id = ?1 ORDER BY id")
                .bind(db_id(report_id))
                .fetch_all(&self.pool)
                .await?
                .iter()
                .map(plan_report_from_row)
                .collect()
        }

        async fn location_reports(
            &self,
            plan_report_id: ActivityPlanReportId,
        ) -> Result<Vec<TargetLocationReport>> {
            sqlx::query(
                "SELECT * FROM target_location_reports WHERE activity_plan_report_id = ?1 ORDER BY id",
            )
            .bind(db_id(plan_report_id))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(location_report_from_row)
            .collect()
        }

        async fn disaggregation_reports(
            &self,
            location_report_id: TargetLocationReportId,
        ) -> Result<Vec<DisaggregationLocationReport>> {
            sqlx::query(
                "SELECT * FROM disaggregation_location_reports \
                 WHERE target_location_report_id = ?1 ORDER BY id",
            )
            .bind(db_id(location_report_id))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(disaggregation_from_row)
            .collect()
        }

        async fn insert_plan_report(&self, mut row: ActivityPlanReport) -> Result<ActivityPlanReport> {
            self.activity_plan(row.activity_plan_id).await?;

            let mut tx = self.pool.begin().await?;
            claim_rows(
                &mut *tx,
                REPORT_ID,
                row.monthly_report_id,
                "monthly report",
                |s| s.accepts_row_edits(),
            )
            .await?;
            let result = sqlx::query(
                r#"
                INSERT INTO activity_plan_reports
                    (monthly_report_id, activity_plan_id, response_type, units, no_of_transfers)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(db_id(row.monthly_report_id))
            .bind(db_id(row.activity_plan_id))
            .bind(row.response_type.as_deref())
            .bind(row.units)
            .bind(row.no_of_transfers)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            row.id = result.last_insert_rowid() as u64;
            Ok(row)
        }

        async fn insert_location_report(&self, mut row: TargetLocationReport) -> Result<TargetLocationReport> {
            let mut tx = self.pool.begin().await?;
            claim_rows(
                &mut *tx,
                PLAN_REPORT_OWNER,
                row.activity_plan_report_id,
                "activity plan report",
                |s| s.accepts_row_edits(),
            )
            .await?;
            let result = sqlx::query(
                r#"
                INSERT INTO target_location_reports
                    (activity_plan_report_id, target_location_id, location_code)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(db_id(row.activity_plan_report_id))
            .bind(db_id(row.target_location_id))
            .bind(&row.location_code)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            row.id = result.last_insert_rowid() as u64;
            Ok(row)
        }

        async fn insert_disaggregation_report(
            &self,
            mut row: DisaggregationLocationReport,
        ) -> Result<DisaggregationLocationReport> {
            let mut tx = self.pool.begin().await?;
            claim_rows(
                &mut *tx,
                LOCATION_REPORT_OWNER,
                row.target_location_report_id,
                "target location report",
                |s| s.accepts_row_edits(),
            )
            .await?;
            let result = sqlx::query(
                r#"
                INSERT INTO disaggregation_location_reports
                    (target_location_report_id, category, reached)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(db_id(row.target_location_report_id))
            .bind(&row.category)
            .bind(row.reached)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            row.id = result.last_insert_rowid() as u64;
            Ok(row)
        }

        async fn delete_plan_report(&self, id: ActivityPlanReportId) -> Result<()> {
            let mut tx = self.pool.begin().await?;
            claim_rows(
                &mut *tx,
                PLAN_REPORT_OWNER,
                id,
                "activity plan report",
                |s| s.accepts_row_edits(),
            )
            .await?;
            sqlx::query("DELETE FROM activity_plan_reports WHERE id = ?1")
                .bind(db_id(id))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(())
        }

        async fn replace_report_rows(
            &self,
            report_id: ReportId,
            expected: ReportState,
            trees: &[PlanReportTree],
        ) -> Result<()> {
            let mut tx = self.pool.begin().await?;
            claim_rows(&mut *tx, REPORT_ID, report_id, "monthly report", |state| {
                state == expected
            })
            .await?;
            sqlx::query("DELETE FROM activity_plan_reports WHERE monthly_report_id = ?1")
                .bind(db_id(report_id))
                .execute(&mut *tx)
                .await?;

            for tree in trees {
                let plan_report_id = sqlx::query(
                    r#"
                    INSERT INTO activity_plan_reports
                        (monthly_report_id, activity_plan_id, response_type, units, no_of_transfers)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(db_id(report_id))
                .bind(db_id(tree.report.activity_plan_id))
                .bind(tree.report.response_type.as_deref())
                .bind(tree.report.units)
                .bind(tree.report.no_of_transfers)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

                for location in &tree.locations {
                    let location_report_id = sqlx::query(
                        r#"
                        INSERT INTO target_location_reports
                            (activity_plan_report_id, target_location_id, location_code)
                        VALUES (?1, ?2, ?3)
                        "#,
                    )
                    .bind(plan_report_id)
                    .bind(db_id(location.location.target_location_id))
                    .bind(&location.location.location_code)
                    .execute(&mut *tx)
                    .await?
                    .last_insert_rowid();

                    for row in &location.disaggregations {
                        sqlx::query(
                            r#"
                            INSERT INTO disaggregation_location_reports
                                (target_location_report_id, category, reached)
                            VALUES (?1, ?2, ?3)
                            "#,
                        )
                        .bind(location_report_id)
                        .bind(&row.category)
                        .bind(row.reached)
                        .execute(&mut *tx)
                        .await?;
                    }
                }
            }

            tx.commit().await?;
            Ok(())
        }
    }

}
