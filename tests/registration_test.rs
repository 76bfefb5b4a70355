mod common;

use chrono::{Duration, Utc};
use roster::{
    domain::{HistoryAction, RegistrationOutcome, UpdateEventRequest},
    error::AppError,
    repository::{PaymentRepository, RegistrationRepository},
};

use common::{attendee, create_event, event_request, setup};

#[tokio::test]
async fn registers_until_full_then_waitlists() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 2, false, 0).await?;
    let service = &ctx.services.registration_service;

    for n in 0..2 {
        let outcome = service.register(event.id, attendee(n), false).await?;
        assert!(matches!(outcome, RegistrationOutcome::Registered { payment: None, .. }));
    }

    let third = service.register(event.id, attendee(2), false).await?;
    let fourth = service.register(event.id, attendee(3), false).await?;

    match (third, fourth) {
        (
            RegistrationOutcome::Waitlisted { position: p3, .. },
            RegistrationOutcome::Waitlisted { position: p4, .. },
        ) => {
            assert_eq!(p3, 1);
            assert_eq!(p4, 2);
        }
        other => panic!("expected both to be waitlisted, got {:?}", other),
    }

    let summary = ctx.services.event_service.summary(event.id).await?;
    assert_eq!(summary.registered, 2);
    assert_eq!(summary.waiting, 2);
    assert_eq!(summary.free_spots, 0);

    assert_eq!(
        ctx.recorder.kinds(),
        vec!["registered", "registered", "waitlisted", "waitlisted"]
    );

    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 1, false, 0).await?;
    let service = &ctx.services.registration_service;

    service.register(event.id, attendee(1), false).await?;

    let mut shouting = attendee(1);
    shouting.email = "  PLAYER1@Example.com ".to_string();
    let err = service.register(event.id, shouting, false).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Already queued is a duplicate too
    service.register(event.id, attendee(2), false).await?;
    let err = service.register(event.id, attendee(2), false).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn invalid_attendee_fails_validation() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 5, false, 0).await?;

    let mut bad = attendee(1);
    bad.email = "no-at-sign".to_string();

    let err = ctx.services.registration_service
        .register(event.id, bad, false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn hidden_events_only_accept_admin_signups() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let mut request = event_request(5, false, 0);
    request.visible = false;
    let event = ctx.services.event_service.create(request).await?;
    let service = &ctx.services.registration_service;

    let err = service.register(event.id, attendee(1), false).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let outcome = service.register(event.id, attendee(1), true).await?;
    assert!(matches!(outcome, RegistrationOutcome::Registered { .. }));

    Ok(())
}

#[tokio::test]
async fn finished_events_reject_signups() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let mut request = event_request(5, false, 0);
    request.from_time = Utc::now() - Duration::days(2);
    request.to_time = Utc::now() - Duration::days(2) + Duration::hours(2);
    let event = ctx.services.event_service.create(request).await?;

    let err = ctx.services.registration_service
        .register(event.id, attendee(1), false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn paid_events_create_payment_with_variable_symbol() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 5, false, 200).await?;
    let service = &ctx.services.registration_service;

    let RegistrationOutcome::Registered { registration, payment } =
        service.register(event.id, attendee(1), false).await?
    else {
        panic!("expected a registration");
    };

    let payment = payment.expect("paid event creates a payment");
    assert_eq!(payment.amount, 200);
    assert!(!payment.paid);
    assert_eq!(payment.variable_symbol.len(), 10);

    let confirmed = service.mark_paid(registration.id, true).await?;
    assert!(confirmed.paid);
    assert!(confirmed.paid_at.is_some());

    let detail = service.get(registration.id).await?;
    assert!(detail.payment.map(|p| p.paid).unwrap_or(false));

    Ok(())
}

#[tokio::test]
async fn cancellation_requires_matching_email() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 5, false, 0).await?;
    let service = &ctx.services.registration_service;

    let RegistrationOutcome::Registered { registration, .. } =
        service.register(event.id, attendee(1), false).await?
    else {
        panic!("expected a registration");
    };

    let err = service.cancel(registration.id, "someone@else.com").await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let cancelled = service.cancel(registration.id, "Player1@example.com").await?;
    assert!(cancelled.deleted);

    let err = service.cancel(registration.id, "player1@example.com").await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    assert_eq!(ctx.services.registration_repo.count_active(event.id).await?, 0);

    // The email is free to sign up again
    let again = service.register(event.id, attendee(1), false).await?;
    assert!(matches!(again, RegistrationOutcome::Registered { .. }));

    Ok(())
}

#[tokio::test]
async fn cancellation_promotes_when_auto_promote_is_on() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 1, true, 0).await?;
    let service = &ctx.services.registration_service;

    let RegistrationOutcome::Registered { registration, .. } =
        service.register(event.id, attendee(1), false).await?
    else {
        panic!("expected a registration");
    };
    service.register(event.id, attendee(2), false).await?;

    service.cancel(registration.id, "player1@example.com").await?;

    let active = ctx.services.registration_repo.list_by_event(event.id).await?;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].email, "player2@example.com");
    assert!(ctx.services.waiting_list_repo.list_by_event(event.id).await?.is_empty());
    assert_eq!(ctx.recorder.promoted_emails(), vec!["player2@example.com".to_string()]);

    Ok(())
}

#[tokio::test]
async fn deleting_without_auto_promote_creates_no_registration() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 1, false, 100).await?;
    let service = &ctx.services.registration_service;

    let RegistrationOutcome::Registered { registration, .. } =
        service.register(event.id, attendee(1), false).await?
    else {
        panic!("expected a registration");
    };
    service.register(event.id, attendee(2), false).await?;

    service.delete(registration.id).await?;

    assert_eq!(ctx.services.registration_repo.count_active(event.id).await?, 0);
    assert!(ctx.services.registration_repo.find_by_id(registration.id).await?.is_none());
    assert!(ctx.services.payment_repo.find_by_registration(registration.id).await?.is_none());
    assert_eq!(ctx.services.waiting_list_repo.list_by_event(event.id).await?.len(), 1);
    assert!(ctx.recorder.promoted_emails().is_empty());

    Ok(())
}

#[tokio::test]
async fn deleting_with_empty_waiting_list_creates_no_registration() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 2, true, 0).await?;
    let service = &ctx.services.registration_service;

    let RegistrationOutcome::Registered { registration, .. } =
        service.register(event.id, attendee(1), false).await?
    else {
        panic!("expected a registration");
    };

    service.delete(registration.id).await?;

    assert_eq!(ctx.services.registration_repo.count_active(event.id).await?, 0);

    let err = service.delete(registration.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn no_shows_are_recorded_once_for_finished_events() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 5, false, 0).await?;
    let service = &ctx.services.registration_service;

    let mut ids = Vec::new();
    for n in 0..3 {
        if let RegistrationOutcome::Registered { registration, .. } =
            service.register(event.id, attendee(n), false).await?
        {
            ids.push(registration.id);
        }
    }
    service.set_attended(ids[0], true).await?;

    let err = service.record_no_shows(event.id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Move the event into the past
    ctx.services.event_service
        .update(event.id, UpdateEventRequest {
            from_time: Some(Utc::now() - Duration::hours(3)),
            to_time: Some(Utc::now() - Duration::hours(1)),
            ..Default::default()
        })
        .await?;

    assert_eq!(service.record_no_shows(event.id).await?, 2);
    assert_eq!(service.record_no_shows(event.id).await?, 0);

    let for_player1 = service.list_no_shows(Some("PLAYER1@example.com")).await?;
    assert_eq!(for_player1.len(), 1);
    assert_eq!(for_player1[0].registration_id, ids[1]);
    assert_eq!(service.list_no_shows(None).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn my_registrations_lists_by_email() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let first = create_event(&ctx, 5, false, 0).await?;
    let second = create_event(&ctx, 5, false, 50).await?;
    let service = &ctx.services.registration_service;

    service.register(first.id, attendee(7), false).await?;
    service.register(second.id, attendee(7), false).await?;
    service.register(second.id, attendee(8), false).await?;

    let mine = service.list_for_email("Player7@Example.com").await?;
    assert_eq!(mine.len(), 2);
    assert_eq!(mine.iter().filter(|d| d.payment.is_some()).count(), 1);

    Ok(())
}

#[tokio::test]
async fn padded_email_is_stored_normalized() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 5, false, 0).await?;

    let mut padded = attendee(4);
    padded.email = "  Player4@EXAMPLE.com ".to_string();
    padded.first_name = " Anna ".to_string();

    let RegistrationOutcome::Registered { registration, .. } =
        ctx.services.registration_service.register(event.id, padded, false).await?
    else {
        panic!("expected a registration");
    };
    assert_eq!(registration.email, "player4@example.com");
    assert_eq!(registration.first_name, "Anna");

    Ok(())
}

#[tokio::test]
async fn blank_names_are_rejected() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 5, false, 0).await?;
    let service = &ctx.services.registration_service;

    let mut blank_first = attendee(1);
    blank_first.first_name = "   ".to_string();
    let err = service.register(event.id, blank_first, false).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let mut blank_last = attendee(2);
    blank_last.last_name = " ".to_string();
    let err = service.register(event.id, blank_last, false).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(ctx.services.registration_repo.count_active(event.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn attendance_changes_are_recorded() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 5, false, 0).await?;

    let RegistrationOutcome::Registered { registration, .. } =
        ctx.services.registration_service.register(event.id, attendee(1), false).await?
    else {
        panic!("expected a registration");
    };

    let updated = ctx.services.registration_service.set_attended(registration.id, true).await?;
    assert!(updated.attended);

    let latest = ctx.services.history_service.list(Some(event.id), 1).await?;
    assert_eq!(latest[0].action, HistoryAction::AttendanceChanged);
    assert_eq!(latest[0].registration_id, Some(registration.id));
    assert_eq!(latest[0].detail.as_deref(), Some("attended"));

    let err = ctx.services.registration_service
        .set_attended(uuid::Uuid::new_v4(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn failed_promotion_does_not_undo_cancellation() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let event = create_event(&ctx, 2, true, 0).await?;
    let service = &ctx.services.registration_service;

    let mut ids = Vec::new();
    for n in 0..2 {
        if let RegistrationOutcome::Registered { registration, .. } =
            service.register(event.id, attendee(n), false).await?
        {
            ids.push(registration.id);
        }
    }

    // Promotion reads the waiting list, so every attempt now errors
    sqlx::query("DROP TABLE waiting_list")
        .execute(&ctx.pool)
        .await?;

    let cancelled = service.cancel(ids[0], "player0@example.com").await?;
    assert!(cancelled.deleted);

    let deleted = service.delete(ids[1]).await?;
    assert_eq!(deleted.id, ids[1]);

    assert_eq!(ctx.services.registration_repo.count_active(event.id).await?, 0);

    Ok(())
}
