//! tests/storage_tests.rs
//! Pruebas de ConfigService y LogService sobre SQLite.

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::models::config_model::{BotConfig, UpdateBotConfig};
    use crate::models::relay_model::{DispatchFailure, RelayStatus};
    use crate::services::capabilities::{ConfigError, ConfigGateway, LogStore};
    use crate::services::config_service::ConfigService;
    use crate::services::log_service::LogService;
    use crate::tests::{attempt_with, memory_pool};

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::Validation { field, .. } => field,
            other => panic!("Se esperaba error de validación, se obtuvo {:?}", other),
        }
    }

    #[actix_rt::test]
    async fn test_get_creates_defaults_once() {
        let pool = memory_pool().await;
        let service = ConfigService::new(pool.clone());

        let first = service.get().await.unwrap();
        let second = service.get().await.unwrap();

        assert_eq!(first.source_channel, "live-alerts");
        assert_eq!(first.target_channels, vec!["himothy-alerts", "himothy-trades"]);
        assert!(first.is_enabled);
        assert!(first.source_channel_id.is_none());
        assert!(first.updated_at.is_some());
        assert_eq!(first, second);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bot_config")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[actix_rt::test]
    async fn test_update_requires_existing_row() {
        let service = ConfigService::new(memory_pool().await);

        let err = service
            .update(UpdateBotConfig {
                is_enabled: Some(false),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigError::NotInitialized));
    }

    #[actix_rt::test]
    async fn test_partial_update_only_touches_given_fields() {
        let service = ConfigService::new(memory_pool().await);
        service.get().await.unwrap();

        let updated = service
            .update(UpdateBotConfig {
                is_enabled: Some(false),
                target_channels: Some(vec!["  vip-alerts ".to_string(), String::new()]),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!updated.is_enabled);
        assert_eq!(updated.target_channels, vec!["vip-alerts", ""]);
        assert_eq!(updated.source_channel, BotConfig::default().source_channel);
    }

    #[actix_rt::test]
    async fn test_lock_in_is_idempotent() {
        let service = ConfigService::new(memory_pool().await);
        service.get().await.unwrap();

        service.update(UpdateBotConfig::lock_source("1234")).await.unwrap();
        let again = service.update(UpdateBotConfig::lock_source("1234")).await.unwrap();

        assert_eq!(again.source_channel_id.as_deref(), Some("1234"));
        assert_eq!(service.get().await.unwrap(), again);
    }

    #[actix_rt::test]
    async fn test_renaming_source_clears_locked_id() {
        let service = ConfigService::new(memory_pool().await);
        service.get().await.unwrap();
        service.update(UpdateBotConfig::lock_source("1234")).await.unwrap();

        // Mismo nombre: el id se conserva.
        let same = service
            .update(UpdateBotConfig {
                source_channel: Some("live-alerts".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(same.source_channel_id.as_deref(), Some("1234"));

        let renamed = service
            .update(UpdateBotConfig {
                source_channel: Some("vip-signals".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(renamed.source_channel, "vip-signals");
        assert!(renamed.source_channel_id.is_none());
    }

    #[actix_rt::test]
    async fn test_unlock_clears_id_and_keeps_name() {
        let service = ConfigService::new(memory_pool().await);
        service.get().await.unwrap();
        service.update(UpdateBotConfig::lock_source("1234")).await.unwrap();

        let unlocked = service.update(UpdateBotConfig::unlock_source()).await.unwrap();
        assert!(unlocked.source_channel_id.is_none());
        assert_eq!(unlocked.source_channel, "live-alerts");

        // Nombre nuevo con id nuevo: gana el id.
        let relocked = service
            .update(UpdateBotConfig {
                source_channel: Some("vip-signals".to_string()),
                source_channel_id: Some(Some("987".to_string())),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(relocked.source_channel_id.as_deref(), Some("987"));
    }

    #[actix_rt::test]
    async fn test_invalid_updates_name_the_field() {
        let service = ConfigService::new(memory_pool().await);
        let before = service.get().await.unwrap();

        let blank = service
            .update(UpdateBotConfig {
                source_channel: Some("   ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(field_of(blank), "sourceChannel");

        let bad_id = service
            .update(UpdateBotConfig::lock_source("general"))
            .await
            .unwrap_err();
        assert_eq!(field_of(bad_id), "sourceChannelId");

        let too_many = service
            .update(UpdateBotConfig {
                target_channels: Some(vec!["x".to_string(); 11]),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(field_of(too_many), "targetChannels");

        let mut targets = vec!["a".to_string(); 3];
        targets.push("y".repeat(101));
        let too_long = service
            .update(UpdateBotConfig {
                target_channels: Some(targets),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(field_of(too_long), "targetChannels.3");

        // Nada de lo anterior se guardó
        let after = service.get().await.unwrap();
        assert_eq!(after.source_channel, before.source_channel);
        assert_eq!(after.target_channels, before.target_channels);
        assert_eq!(after.source_channel_id, before.source_channel_id);
    }

    #[actix_rt::test]
    async fn test_logs_round_trip_newest_first() {
        let service = LogService::new(memory_pool().await);

        let mut oldest = attempt_with(RelayStatus::Success);
        oldest.created_at = Utc::now() - Duration::seconds(120);
        let mut middle = attempt_with(RelayStatus::Partial);
        middle.created_at = Utc::now() - Duration::seconds(60);
        middle.destinations_failed = vec![DispatchFailure {
            destination: "G3#himothy-trades".to_string(),
            reason: "Missing Access".to_string(),
        }];
        middle.attachment_count = 2;
        let newest = attempt_with(RelayStatus::Failed);

        for attempt in [&middle, &newest, &oldest] {
            service.append(attempt.clone()).await.unwrap();
        }

        let listed = service.list(50).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![newest.id.as_str(), middle.id.as_str(), oldest.id.as_str()]
        );

        let stored_middle = &listed[1];
        assert_eq!(stored_middle.status, RelayStatus::Partial);
        assert_eq!(stored_middle.destinations_reached, middle.destinations_reached);
        assert_eq!(stored_middle.destinations_failed, middle.destinations_failed);
        assert_eq!(stored_middle.attachment_count, 2);
        assert_eq!(stored_middle.content, "hola");

        let limited = service.list(2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].id, newest.id);
    }

    #[actix_rt::test]
    async fn test_stats_summarize_recent_attempts() {
        let service = LogService::new(memory_pool().await);
        for status in [
            RelayStatus::Success,
            RelayStatus::Success,
            RelayStatus::Partial,
        ] {
            service.append(attempt_with(status)).await.unwrap();
        }

        let stats = service.stats(50).await.unwrap();

        assert_eq!(stats.total, 3);
        assert_eq!(stats.success, 2);
        assert_eq!(stats.partial, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.success_rate, 67);

        let empty = LogService::new(memory_pool().await).stats(50).await.unwrap();
        assert_eq!(empty.success_rate, 0);
    }

    #[actix_rt::test]
    async fn test_setup_database_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("relay.db");
        let url = format!("sqlite:{}", db_path.display());

        let pool = crate::setup_database(&url).await.unwrap();
        let service = ConfigService::new(pool);
        service.run_migrations().await.unwrap();
        service.get().await.unwrap();

        assert!(db_path.exists());
    }
}
