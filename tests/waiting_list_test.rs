mod common;

use std::sync::Arc;

use roster::{
    domain::{HistoryAction, RegistrationOutcome, UpdateEventRequest},
    error::AppError,
    integrations::IntegrationManager,
    repository::{PaymentRepository, RegistrationRepository, WaitingListRepository},
    service::ServiceContext,
};

use common::{attendee, create_event, setup, setup_pool, event_request, FailingIntegration};

#[tokio::test]
async fn raising_capacity_promotes_oldest_first() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 1, true, 0).await?;

    for n in 0..4 {
        ctx.services.registration_service.register(event.id, attendee(n), false).await?;
    }
    assert_eq!(ctx.services.waiting_list_repo.count(event.id).await?, 3);

    ctx.services.event_service
        .update(event.id, UpdateEventRequest { capacity: Some(3), ..Default::default() })
        .await?;

    assert_eq!(ctx.services.registration_repo.count_active(event.id).await?, 3);

    let remaining = ctx.services.waiting_list_service.list(event.id).await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].email, "player3@example.com");

    assert_eq!(
        ctx.recorder.promoted_emails(),
        vec!["player1@example.com".to_string(), "player2@example.com".to_string()]
    );

    Ok(())
}

#[tokio::test]
async fn manual_promotion_never_exceeds_free_spots() -> anyhow::Result<()> {
    let ctx = setup().await?;
    // auto-promote off, so the queue only moves when asked
    let event = create_event(&ctx, 2, false, 0).await?;

    for n in 0..5 {
        ctx.services.registration_service.register(event.id, attendee(n), false).await?;
    }

    let promoted = ctx.services.waiting_list_service.promote_available(event.id).await?;
    assert!(promoted.is_empty());

    ctx.services.event_service
        .update(event.id, UpdateEventRequest { capacity: Some(4), ..Default::default() })
        .await?;
    assert_eq!(ctx.services.registration_repo.count_active(event.id).await?, 2);

    let promoted = ctx.services.waiting_list_service.promote_available(event.id).await?;
    let emails: Vec<_> = promoted.iter().map(|p| p.registration.email.as_str()).collect();
    assert_eq!(emails, vec!["player2@example.com", "player3@example.com"]);
    assert_eq!(ctx.services.registration_repo.count_active(event.id).await?, 4);
    assert_eq!(ctx.services.waiting_list_repo.count(event.id).await?, 1);

    let details: Vec<_> = ctx.services.history_service
        .list(Some(event.id), 100)
        .await?
        .into_iter()
        .filter(|e| e.action == HistoryAction::MovedFromWaitlist)
        .filter_map(|e| e.detail)
        .collect();
    assert_eq!(details, vec!["manual promotion".to_string(), "manual promotion".to_string()]);

    Ok(())
}

#[tokio::test]
async fn concurrent_promotions_move_each_entry_once() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 1, false, 0).await?;

    for n in 0..4 {
        ctx.services.registration_service.register(event.id, attendee(n), false).await?;
    }
    ctx.services.event_service
        .update(event.id, UpdateEventRequest { capacity: Some(3), ..Default::default() })
        .await?;

    let service = ctx.services.waiting_list_service.clone();
    let (a, b) = tokio::join!(
        service.promote_available(event.id),
        service.promote_available(event.id),
    );

    assert_eq!(a?.len() + b?.len(), 2);
    assert_eq!(ctx.services.registration_repo.count_active(event.id).await?, 3);
    assert_eq!(ctx.services.waiting_list_repo.count(event.id).await?, 1);

    let moved = ctx.services.history_service
        .list(Some(event.id), 100)
        .await?
        .into_iter()
        .filter(|e| e.action == HistoryAction::MovedFromWaitlist)
        .count();
    assert_eq!(moved, 2);

    Ok(())
}

#[tokio::test]
async fn promoting_a_specific_entry_respects_capacity_unless_forced() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 1, false, 0).await?;
    let registrations = &ctx.services.registration_service;

    registrations.register(event.id, attendee(0), false).await?;
    let RegistrationOutcome::Waitlisted { entry, .. } =
        registrations.register(event.id, attendee(1), false).await?
    else {
        panic!("expected to be waitlisted");
    };

    let err = ctx.services.waiting_list_service
        .promote_entry(entry.id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(ctx.services.waiting_list_repo.count(event.id).await?, 1);

    let promotion = ctx.services.waiting_list_service.promote_entry(entry.id, true).await?;
    assert_eq!(promotion.waiting_list_id, entry.id);
    assert_eq!(promotion.registration.email, "player1@example.com");
    assert_eq!(ctx.services.registration_repo.count_active(event.id).await?, 2);

    // The entry is gone, a second attempt cannot register it again
    let err = ctx.services.waiting_list_service
        .promote_entry(entry.id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let summary = ctx.services.event_service.summary(event.id).await?;
    assert_eq!(summary.free_spots, 0);

    Ok(())
}

#[tokio::test]
async fn promoted_entries_on_paid_events_get_a_payment() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 1, true, 300).await?;
    let registrations = &ctx.services.registration_service;

    let RegistrationOutcome::Registered { registration, .. } =
        registrations.register(event.id, attendee(0), false).await?
    else {
        panic!("expected a registration");
    };
    registrations.register(event.id, attendee(1), false).await?;

    registrations.delete(registration.id).await?;

    let active = ctx.services.registration_repo.list_by_event(event.id).await?;
    assert_eq!(active.len(), 1);

    let payment = ctx.services.payment_repo
        .find_by_registration(active[0].id)
        .await?
        .expect("promoted registration has a payment");
    assert_eq!(payment.amount, 300);
    assert!(!payment.paid);

    Ok(())
}

#[tokio::test]
async fn removing_an_entry_shifts_positions() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 0, false, 0).await?;
    let registrations = &ctx.services.registration_service;

    let mut entries = Vec::new();
    for n in 0..3 {
        if let RegistrationOutcome::Waitlisted { entry, position } =
            registrations.register(event.id, attendee(n), false).await?
        {
            assert_eq!(position, n as i64 + 1);
            entries.push(entry);
        }
    }
    assert_eq!(entries.len(), 3);

    ctx.services.waiting_list_service.remove(entries[0].id).await?;
    assert_eq!(ctx.services.waiting_list_service.position(&entries[2]).await?, 2);

    let latest = ctx.services.history_service.list(Some(event.id), 1).await?;
    assert_eq!(latest[0].action, HistoryAction::RemovedFromWaitlist);
    assert_eq!(latest[0].waiting_list_id, Some(entries[0].id));
    assert_eq!(latest[0].email.as_deref(), Some("player0@example.com"));

    let err = ctx.services.waiting_list_service.remove(entries[0].id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn failing_notifications_do_not_block_promotion() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let manager = Arc::new(IntegrationManager::new());
    manager.register(Arc::new(FailingIntegration)).await;
    let services = ServiceContext::from_pool(pool, manager);

    let event = services.event_service.create(event_request(1, true, 0)).await?;

    let RegistrationOutcome::Registered { registration, .. } =
        services.registration_service.register(event.id, attendee(0), false).await?
    else {
        panic!("expected a registration");
    };
    services.registration_service.register(event.id, attendee(1), false).await?;

    services.registration_service
        .cancel(registration.id, "player0@example.com")
        .await?;

    let active = services.registration_repo.list_by_event(event.id).await?;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].email, "player1@example.com");
    assert_eq!(services.waiting_list_repo.count(event.id).await?, 0);

    Ok(())
}
