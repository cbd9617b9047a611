use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lms_core::domain::repositories::users::UserRepository;
use tracing::{error, info};

use crate::config::config_model::Maintenance;

/// Periodically switches off accounts that have not logged in for
/// `inactive_user_days`. Runs until the process exits.
pub async fn run<U>(user_repo: Arc<U>, maintenance: Maintenance) -> Result<()>
where
    U: UserRepository + Send + Sync + 'static,
{
    let interval = Duration::from_secs(maintenance.sweep_interval_secs.max(1));
    info!(
        inactive_user_days = maintenance.inactive_user_days,
        interval_secs = interval.as_secs(),
        "user_deactivation: loop started"
    );

    loop {
        match sweep_once(user_repo.as_ref(), maintenance.inactive_user_days, Utc::now()).await {
            Ok(0) => info!("user_deactivation: no inactive users"),
            Ok(count) => info!(count, "user_deactivation: users deactivated"),
            Err(err) => error!(error = ?err, "user_deactivation: sweep failed"),
        }

        tokio::time::sleep(interval).await;
    }
}

/// Users that never logged in are left alone.
pub async fn sweep_once<U>(user_repo: &U, inactive_days: i64, now: DateTime<Utc>) -> Result<usize>
where
    U: UserRepository + Send + Sync,
{
    let cutoff = now - chrono::Duration::days(inactive_days);

    user_repo
        .deactivate_inactive_since(cutoff)
        .await
        .context("failed to deactivate inactive users")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lms_core::domain::repositories::users::MockUserRepository;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn cutoff_is_thirty_days_before_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_deactivate_inactive_since()
            .with(eq(expected))
            .times(1)
            .returning(|_| Ok(3));

        assert_eq!(sweep_once(&user_repo, 30, now).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn repository_errors_are_reported() {
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_deactivate_inactive_since()
            .returning(|_| Err(anyhow::anyhow!("pool timed out")));

        let err = sweep_once(&user_repo, 30, Utc::now()).await.unwrap_err();
        assert!(err.to_string().contains("inactive users"));
    }
}
