//! Schedule generation - turns a client's questions and locations into items

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use time::macros::time;
use time::{Date, PrimitiveDateTime, Time, UtcOffset, Weekday};

use crate::model::{ClientProfile, ContentItem, ItemFilter, topic_key};
use crate::ports::{Clock, ContentStore, StoreError};

/// When new items are placed on the calendar
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Publishing days
    pub weekdays: Vec<Weekday>,
    /// Local time of day items go out
    pub publish_time: Time,
    /// Offset `publish_time` is expressed in
    pub utc_offset: UtcOffset,
    /// Items placed on each publishing day
    pub items_per_day: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            weekdays: vec![Weekday::Tuesday, Weekday::Thursday],
            publish_time: time!(9:00),
            utc_offset: UtcOffset::UTC,
            items_per_day: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduleReport {
    pub created: Vec<ContentItem>,
    /// Combinations that already had an item
    pub skipped_existing: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Client '{0}' has no PAA questions")]
    NoQuestions(String),
    #[error("Client '{0}' has no service locations")]
    NoLocations(String),
    #[error("No publishing weekdays configured")]
    NoWeekdays,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ScheduleGenerator<St, Cl>
where
    St: ContentStore + ?Sized,
    Cl: Clock + ?Sized,
{
    store: Arc<St>,
    clock: Arc<Cl>,
    config: ScheduleConfig,
}

impl<St, Cl> ScheduleGenerator<St, Cl>
where
    St: ContentStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(store: Arc<St>, clock: Arc<Cl>, config: ScheduleConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Schedule every question × location combination the client does not
    /// have yet, filling publishing days from `start_date` onwards.
    pub async fn generate(
        &self,
        client: &ClientProfile,
        start_date: Date,
    ) -> Result<ScheduleReport, ScheduleError> {
        if client.paa_questions.is_empty() {
            return Err(ScheduleError::NoQuestions(client.id.clone()));
        }
        if client.locations.is_empty() {
            return Err(ScheduleError::NoLocations(client.id.clone()));
        }
        if self.config.weekdays.is_empty() {
            return Err(ScheduleError::NoWeekdays);
        }

        let existing = self
            .store
            .list_items(&ItemFilter {
                client_id: Some(client.id.clone()),
                ..Default::default()
            })
            .await?;
        let existing_keys: HashSet<_> = existing.iter().map(ContentItem::topic_key).collect();
        let mut per_day: HashMap<Date, usize> = HashMap::new();
        for item in &existing {
            *per_day
                .entry(item.scheduled_at.to_offset(self.config.utc_offset).date())
                .or_default() += 1;
        }

        let mut report = ScheduleReport::default();
        let mut pending = Vec::new();
        for question in &client.paa_questions {
            for location in &client.locations {
                if existing_keys.contains(&topic_key(&client.id, question, location)) {
                    report.skipped_existing += 1;
                } else {
                    pending.push((question, location));
                }
            }
        }

        let capacity = self.config.items_per_day.max(1);
        let now = self.clock.now();
        let mut date = start_date;
        let mut pending = pending.into_iter().peekable();

        while pending.peek().is_some() {
            if self.config.weekdays.contains(&date.weekday()) {
                let used = per_day.entry(date).or_default();
                while *used < capacity {
                    let Some((question, location)) = pending.next() else {
                        break;
                    };
                    let scheduled_at = PrimitiveDateTime::new(date, self.config.publish_time)
                        .assume_offset(self.config.utc_offset);
                    let item = ContentItem::scheduled(
                        client.id.clone(),
                        question.clone(),
                        location.clone(),
                        scheduled_at,
                        now,
                    );
                    match self.store.insert_item(&item).await {
                        Ok(()) => {
                            *used += 1;
                            report.created.push(item);
                        }
                        Err(StoreError::Conflict(_)) => report.skipped_existing += 1,
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            let Some(next) = date.next_day() else {
                break;
            };
            date = next;
        }

        tracing::info!(
            client = %client.id,
            created = report.created.len(),
            skipped = report.skipped_existing,
            "Generated content schedule"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServiceLocation;
    use crate::test_support::{FakeClock, FakeStore, client_profile};
    use time::macros::{date, datetime};

    fn client() -> ClientProfile {
        let mut client = client_profile();
        client.paa_questions = vec![
            "How long does windshield replacement take?".to_string(),
            "Can a chipped windshield be repaired?".to_string(),
        ];
        client.locations = vec![
            ServiceLocation::new("Seattle", "WA"),
            ServiceLocation::new("Tacoma", "WA"),
        ];
        client
    }

    fn generator(store: Arc<FakeStore>) -> ScheduleGenerator<FakeStore, FakeClock> {
        ScheduleGenerator::new(
            store,
            Arc::new(FakeClock::new(datetime!(2026-03-01 12:00 UTC))),
            ScheduleConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_places_items_on_tuesdays_and_thursdays() {
        let store = Arc::new(FakeStore::default());
        let report = generator(Arc::clone(&store))
            .generate(&client(), date!(2026 - 03 - 02))
            .await
            .unwrap();

        let dates: Vec<_> = report.created.iter().map(|i| i.scheduled_at).collect();
        assert_eq!(
            dates,
            vec![
                datetime!(2026-03-03 09:00 UTC),
                datetime!(2026-03-05 09:00 UTC),
                datetime!(2026-03-10 09:00 UTC),
                datetime!(2026-03-12 09:00 UTC),
            ]
        );
        assert_eq!(report.skipped_existing, 0);
        assert!(
            report
                .created
                .iter()
                .all(|i| i.status == crate::model::ContentStatus::Scheduled)
        );
    }

    #[tokio::test]
    async fn test_skips_existing_combinations() {
        let store = Arc::new(FakeStore::default());
        let generator = generator(Arc::clone(&store));
        let client = client();

        let first = generator
            .generate(&client, date!(2026 - 03 - 02))
            .await
            .unwrap();
        assert_eq!(first.created.len(), 4);

        let second = generator
            .generate(&client, date!(2026 - 03 - 02))
            .await
            .unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.skipped_existing, 4);
    }

    #[tokio::test]
    async fn test_respects_items_per_day_and_existing_load() {
        let store = Arc::new(FakeStore::default());
        let mut client = client();
        let existing = ContentItem::scheduled(
            client.id.clone(),
            "Does insurance cover windshield replacement?",
            ServiceLocation::new("Seattle", "WA"),
            datetime!(2026-03-03 09:00 UTC),
            datetime!(2026-03-01 12:00 UTC),
        );
        store.insert_item(&existing).await.unwrap();
        client.paa_questions.push(existing.paa_question.clone());

        let generator = ScheduleGenerator::new(
            Arc::clone(&store),
            Arc::new(FakeClock::new(datetime!(2026-03-01 12:00 UTC))),
            ScheduleConfig {
                items_per_day: 2,
                publish_time: time!(14:30),
                ..Default::default()
            },
        );
        let report = generator
            .generate(&client, date!(2026 - 03 - 02))
            .await
            .unwrap();

        // 3 questions x 2 locations, one already scheduled
        assert_eq!(report.created.len(), 5);
        assert_eq!(report.skipped_existing, 1);
        let dates: Vec<_> = report.created.iter().map(|i| i.scheduled_at).collect();
        assert_eq!(
            dates,
            vec![
                datetime!(2026-03-03 14:30 UTC),
                datetime!(2026-03-05 14:30 UTC),
                datetime!(2026-03-05 14:30 UTC),
                datetime!(2026-03-10 14:30 UTC),
                datetime!(2026-03-10 14:30 UTC),
            ]
        );
    }

    #[tokio::test]
    async fn test_rejects_client_without_questions() {
        let store = Arc::new(FakeStore::default());
        let mut client = client();
        client.paa_questions.clear();

        let err = generator(store)
            .generate(&client, date!(2026 - 03 - 02))
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::NoQuestions(_)));
    }
}
