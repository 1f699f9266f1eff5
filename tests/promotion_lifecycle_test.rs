mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use cinema_promotions::{
    errors::{ConflictField, ErrorCategory, ServiceError},
    events::{self, Event},
    models::{ListQuery, PromotionPatch, PromotionStatus},
    notifications::Notification,
    queries::PromotionFilter,
    services::{PromotionService, StatusFilter, StatusReason},
};
use common::{draft, stored, CountingStore, Harness};

#[tokio::test]
async fn create_derives_slug_and_active_status() {
    let mut h = Harness::new(CountingStore::default());

    let created = h
        .service
        .create(draft("Weekend 20% Off", "WEEKEND20"))
        .await
        .unwrap();

    assert_eq!(created.slug, "weekend-20-off");
    assert_eq!(created.status, PromotionStatus::Active);
    assert_eq!(created.current_usage, 0);
    assert_eq!(
        h.drain_events(),
        vec![Event::PromotionCreated {
            slug: "weekend-20-off".into(),
            status: PromotionStatus::Active,
        }]
    );
}

#[tokio::test]
async fn create_near_expiry_is_inactive() {
    let h = Harness::new(CountingStore::default());
    let mut near = draft("Last Call Matinee", "LASTCALL");
    near.end_date = Utc::now() + Duration::hours(1);

    let created = h.service.create(near).await.unwrap();
    assert_eq!(created.status, PromotionStatus::Inactive);
}

#[tokio::test]
async fn duplicate_code_is_rejected_before_any_request() {
    let h = Harness::new(CountingStore::with_promotions(vec![stored(
        "weekend-20-off",
        "WEEKEND20",
        "active",
    )]));
    h.service.load(&ListQuery::default()).await.unwrap();

    let err = h
        .service
        .create(draft("Another Weekend", "  weekend20 "))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::Conflict {
            field: ConflictField::Code,
            ..
        }
    );
    assert_eq!(h.store.creates.load(Ordering::SeqCst), 0);
    assert_eq!(Notification::from_error(&err).fields[0].field, "code");
}

#[tokio::test]
async fn backend_slug_conflict_is_reported_as_slug() {
    let h = Harness::new(CountingStore::default());
    h.service
        .create(draft("Student Tuesday", "STUDENT"))
        .await
        .unwrap();

    // same title, new code: only the backend can spot the slug clash
    let err = h
        .service
        .create(draft("Student Tuesday", "STUDENT2"))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::Conflict {
            field: ConflictField::Slug,
            ..
        }
    );
}

#[tokio::test]
async fn full_edit_discards_manual_toggle() {
    let mut h = Harness::new(CountingStore::default());
    h.service
        .create(draft("Weekend 20% Off", "WEEKEND20"))
        .await
        .unwrap();

    let toggled = h.service.toggle_status("weekend-20-off").await.unwrap();
    assert_eq!(toggled.status, PromotionStatus::Expired);

    let edited = h
        .service
        .edit(
            "weekend-20-off",
            PromotionPatch {
                description: Some("Now with free popcorn".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.status, PromotionStatus::Active);
    assert_eq!(edited.description.as_deref(), Some("Now with free popcorn"));

    let events = h.drain_events();
    assert_matches!(
        &events[1],
        Event::PromotionStatusToggled { from: PromotionStatus::Active, to: PromotionStatus::Expired, .. }
    );
    assert_matches!(&events[2], Event::PromotionUpdated { previous_slug: None, .. });
}

#[tokio::test]
async fn toggle_never_produces_inactive() {
    let h = Harness::new(CountingStore::with_promotions(vec![
        stored("future-fest", "FEST", "inactive"),
        stored("legacy-deal", "LEGACY", "paused"),
    ]));
    h.service.load(&ListQuery::default()).await.unwrap();

    let from_inactive = h.service.toggle_status("future-fest").await.unwrap();
    assert_eq!(from_inactive.status, PromotionStatus::Active);
    let from_unknown = h.service.toggle_status("legacy-deal").await.unwrap();
    assert_eq!(from_unknown.status, PromotionStatus::Active);

    let back = h.service.toggle_status("future-fest").await.unwrap();
    assert_eq!(back.status, PromotionStatus::Expired);
}

#[tokio::test]
async fn redemption_leaves_status_until_resync() {
    let mut almost = stored("popcorn-combo", "POPCORN", "active");
    almost.current_usage = 99;
    let mut h = Harness::new(CountingStore::with_promotions(vec![almost]));
    h.service.load(&ListQuery::default()).await.unwrap();

    let redeemed = h.service.record_redemption("popcorn-combo").await.unwrap();
    assert_eq!(redeemed.current_usage, 100);
    assert_eq!(redeemed.status, PromotionStatus::Active);

    let drifted = h.service.drifted(Utc::now()).await;
    assert_eq!(drifted.len(), 1);
    assert_eq!(drifted[0].1.derived.reason, StatusReason::UsageExhausted);

    let exhausted = h.service.record_redemption("popcorn-combo").await;
    assert_matches!(exhausted, Err(ServiceError::InvalidFields(_)));

    let resynced = h.service.resync_status("popcorn-combo").await.unwrap();
    assert_eq!(resynced.unwrap().status, PromotionStatus::Expired);
    assert!(h.service.resync_status("popcorn-combo").await.unwrap().is_none());

    let events = h.drain_events();
    assert_matches!(
        events.last(),
        Some(Event::PromotionStatusResynced { to: PromotionStatus::Expired, .. })
    );
}

#[tokio::test]
async fn edit_validation_happens_before_the_request() {
    let mut used = stored("student-tuesday", "STUDENT", "active");
    used.current_usage = 40;
    let h = Harness::new(CountingStore::with_promotions(vec![used.clone()]));
    h.service.load(&ListQuery::default()).await.unwrap();

    let err = h
        .service
        .edit(
            "student-tuesday",
            PromotionPatch {
                max_usage: Some(10),
                end_date: Some(used.start_date - Duration::hours(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Validation);
    let fields: Vec<String> = err.field_messages().into_iter().map(|(f, _)| f).collect();
    assert!(fields.contains(&"max_usage".to_string()));
    assert!(fields.contains(&"end_date".to_string()));
    assert_eq!(h.store.updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn delete_requires_confirmation() {
    let h = Harness::new(CountingStore::with_promotions(vec![stored(
        "weekend-20-off",
        "WEEKEND20",
        "active",
    )]));
    h.service.load(&ListQuery::default()).await.unwrap();

    assert_matches!(
        h.service.delete("weekend-20-off", false).await,
        Err(ServiceError::InvalidOperation(_))
    );
    assert_eq!(h.store.deletes.load(Ordering::SeqCst), 0);

    h.service.delete("weekend-20-off", true).await.unwrap();
    assert!(h.service.promotions().await.is_empty());
    assert_matches!(
        h.service.get("weekend-20-off").await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn buckets_partition_the_listing() {
    let h = Harness::new(CountingStore::with_promotions(vec![
        stored("a", "A", "active"),
        stored("b", "B", "inactive"),
        stored("c", "C", "expired"),
        stored("d", "D", "paused"),
        stored("e", "E", "active"),
    ]));
    h.service.load(&ListQuery::page(1, 50)).await.unwrap();

    let stats = h.service.stats().await;
    assert_eq!((stats.active, stats.expired), (2, 3));
    assert_eq!(stats.total(), h.service.promotions().await.len());

    let expired = h
        .service
        .filtered(&PromotionFilter {
            status: StatusFilter::Expired,
            search: None,
        })
        .await;
    let mut slugs: Vec<_> = expired.iter().map(|p| p.slug.as_str()).collect();
    slugs.sort_unstable();
    assert_eq!(slugs, vec!["b", "c", "d"]);
}

#[tokio::test]
async fn second_submission_is_rejected_while_first_is_in_flight() {
    let store = CountingStore::gated(vec![stored("weekend-20-off", "WEEKEND20", "active")]);
    let h = Harness::new(store);
    h.service.load(&ListQuery::default()).await.unwrap();

    let service = h.service.clone();
    let first = tokio::spawn(async move { service.toggle_status("weekend-20-off").await });
    h.store.wait_until_entered().await;

    assert_matches!(
        h.service.toggle_status("weekend-20-off").await,
        Err(ServiceError::RequestInFlight(_))
    );
    // a different action on the same promotion is independent
    assert!(h.service.in_flight().is_in_flight("toggle:weekend-20-off"));
    assert!(!h.service.in_flight().is_in_flight("redeem:weekend-20-off"));

    h.store.release();
    let toggled = first.await.unwrap().unwrap();
    assert_eq!(toggled.status, PromotionStatus::Expired);
    assert_eq!(h.store.updates.load(Ordering::SeqCst), 1);

    h.store.release();
    let again = h.service.toggle_status("weekend-20-off").await.unwrap();
    assert_eq!(again.status, PromotionStatus::Active);
}

#[tokio::test]
async fn failed_request_releases_the_guard() {
    let h = Harness::new(CountingStore::default());
    assert_matches!(
        h.service.toggle_status("missing").await,
        Err(ServiceError::NotFound(_))
    );
    assert_eq!(h.service.in_flight().in_flight_count(), 0);
    assert_matches!(
        h.service.toggle_status("missing").await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn share_updates_listed_count() {
    let mut h = Harness::new(CountingStore::with_promotions(vec![stored(
        "weekend-20-off",
        "WEEKEND20",
        "active",
    )]));
    h.service.load(&ListQuery::default()).await.unwrap();

    assert_eq!(h.service.share("weekend-20-off").await.unwrap(), 1);
    assert_eq!(h.service.share("weekend-20-off").await.unwrap(), 2);
    assert_eq!(h.service.promotions().await[0].share_count, 2);
    assert_eq!(h.drain_events().len(), 2);
}

#[tokio::test]
async fn undrained_event_channel_never_blocks_mutations() {
    let store = Arc::new(CountingStore::with_promotions(vec![stored(
        "weekend-20-off",
        "WEEKEND20",
        "active",
    )]));
    let (sender, _held_receiver) = events::channel(1);
    let service = PromotionService::new(store.clone(), Arc::new(sender));

    assert_eq!(service.share("weekend-20-off").await.unwrap(), 1);
    let second = tokio::time::timeout(StdDuration::from_secs(2), service.share("weekend-20-off"))
        .await
        .expect("second share blocked on a full event channel");
    assert_eq!(second.unwrap(), 2);

    let toggled = tokio::time::timeout(
        StdDuration::from_secs(2),
        service.toggle_status("weekend-20-off"),
    )
    .await
    .expect("toggle blocked on a full event channel")
    .unwrap();
    assert_eq!(toggled.status, PromotionStatus::Expired);
}
