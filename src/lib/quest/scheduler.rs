//! Deferred announcement scheduler (spec §4.3): once a minute, scans every
//! tenant for quests whose `announce_at` has fired and publishes them.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;

use crate::domain::character::AnnouncementCoordinates;
use crate::domain::Quest;
use crate::quest::service::QuestService;
use crate::repository::QuestsRepo;
use crate::utils::prelude::*;

/// The chat-gateway side effect of publishing a quest's announcement
/// message. Implemented against the real gateway client; a fake is used in
/// tests. Returning `Ok` means the message was sent and carries its
/// coordinates.
#[async_trait]
pub trait AnnouncementPublisher: Send + Sync {
    async fn publish(&self, guild_id: u64, quest: &Quest) -> AnyResult<AnnouncementCoordinates>;
}

/// One minute, per spec §4.3 ("iterates over all tenants once per minute").
pub async fn run(
    guild_ids: Arc<dyn Fn() -> Vec<u64> + Send + Sync>,
    quests: Arc<dyn QuestsRepo>,
    service: Arc<QuestService>,
    publisher: Arc<dyn AnnouncementPublisher>,
    tick_seconds: u64,
) {
    let mut ticker = tokio::time::interval(StdDuration::from_secs(tick_seconds));
    loop {
        ticker.tick().await;
        for guild_id in guild_ids() {
            if let Err(e) = scan_guild(guild_id, &quests, &service, &publisher).await {
                error!(guild_id, "announcement scan failed: {}", e.oneliner());
            }
        }
    }
}

async fn scan_guild(
    guild_id: u64,
    quests: &Arc<dyn QuestsRepo>,
    service: &Arc<QuestService>,
    publisher: &Arc<dyn AnnouncementPublisher>,
) -> AnyResult<()> {
    let pending = quests
        .list_pending_announcements(guild_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .context("listing pending announcements")?;

    for quest in pending {
        // Any exception during a single quest's publication is logged and
        // does not halt iteration (spec §4.3).
        if let Err(e) = publish_one(guild_id, &quest, service, publisher).await {
            error!(
                guild_id,
                quest_id = %quest.quest_id,
                "failed to publish scheduled quest: {}",
                e.oneliner()
            );
        }
    }
    Ok(())
}

async fn publish_one(
    guild_id: u64,
    quest: &Quest,
    service: &Arc<QuestService>,
    publisher: &Arc<dyn AnnouncementPublisher>,
) -> AnyResult<()> {
    let coordinates = publisher.publish(guild_id, quest).await?;
    service
        .publish_scheduled(guild_id, &quest.quest_id, coordinates)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    info!(guild_id, quest_id = %quest.quest_id, "scheduled quest announced");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::GuildCacheEngine;
    use crate::domain::UserId;
    use crate::repository::memory::InMemoryRepository;
    use chrono::{Duration, Utc};
    use std::sync::Mutex;

    struct FakePublisher {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl AnnouncementPublisher for FakePublisher {
        async fn publish(&self, _guild_id: u64, _quest: &Quest) -> AnyResult<AnnouncementCoordinates> {
            *self.calls.lock().unwrap() += 1;
            Ok(AnnouncementCoordinates {
                channel_id: Some(100),
                message_id: Some(200),
                thread_id: None,
            })
        }
    }

    #[tokio::test]
    async fn due_quest_is_published_s4() {
        let repo = Arc::new(InMemoryRepository::new());
        let (engine, _rx) = GuildCacheEngine::new();
        let cache = Arc::new(engine);
        let service = Arc::new(QuestService::new(
            cache,
            repo.clone(),
            repo.clone(),
            repo.clone(),
        ));

        let mut quest = Quest::new_draft(
            1,
            UserId::generate(),
            "Scheduled".to_string(),
            Utc::now() + Duration::days(1),
            Duration::hours(1),
        );
        quest.announce_at = Some(Utc::now() - Duration::seconds(1));
        repo.upsert(&quest).await.unwrap();

        let publisher = Arc::new(FakePublisher {
            calls: Mutex::new(0),
        });
        let quests_repo: Arc<dyn QuestsRepo> = repo.clone();
        scan_guild(1, &quests_repo, &service, &(publisher.clone() as Arc<dyn AnnouncementPublisher>))
            .await
            .unwrap();

        assert_eq!(*publisher.calls.lock().unwrap(), 1);
        let updated = repo.get(1, &quest.quest_id).await.unwrap();
        assert_eq!(updated.status, crate::domain::quest::QuestStatus::Announced);
        assert_eq!(updated.announcement.channel_id, Some(100));
        assert!(updated.announce_at.is_none());
    }
}
