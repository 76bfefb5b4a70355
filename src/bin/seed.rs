use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Parser;
use fake::{
    faker::{internet::en::SafeEmail, name::en::{FirstName, LastName}, phone_number::en::PhoneNumber},
    Fake,
};
use sqlx::sqlite::SqlitePoolOptions;

use roster::{
    domain::{Attendee, CreateEventRequest, PaymentType, RegistrationOutcome},
    integrations::IntegrationManager,
    service::ServiceContext,
};

/// Populate a database with demo events, registrations and waiting lists.
#[derive(Parser)]
#[command(name = "seed")]
struct Args {
    /// SQLite connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://roster.db?mode=rwc")]
    database_url: String,

    /// Number of events to create
    #[arg(long, default_value_t = 4)]
    events: usize,

    /// Sign-ups attempted per event; anything above capacity is waitlisted
    #[arg(long, default_value_t = 16)]
    signups: usize,
}

const SPORTS: &[(&str, &str)] = &[
    ("Volleyball", "Sports hall A"),
    ("Badminton", "Sports hall B"),
    ("Five-a-side football", "Riverside pitch"),
    ("Floorball", "School gym"),
    ("Beach volleyball", "Lakeside courts"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("Seeding {}", args.database_url);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    // No integrations: seeding must not send email.
    let context = ServiceContext::from_pool(db_pool, Arc::new(IntegrationManager::new()));

    for i in 0..args.events {
        let (sport, place) = SPORTS[i % SPORTS.len()];
        let start = Utc::now() + Duration::days(2 + i as i64 * 7);

        let event = context.event_service
            .create(CreateEventRequest {
                title: format!("{} evening #{}", sport, i + 1),
                description: format!("Casual {} for all levels.", sport.to_lowercase()),
                price: if i % 2 == 0 { 150 } else { 0 },
                place: place.to_string(),
                capacity: 12,
                from_time: start,
                to_time: start + Duration::hours(2),
                visible: true,
                auto_promote: i % 2 == 0,
                bank_account: Some("2900000000/2010".to_string()),
            })
            .await?;

        let mut registered = 0;
        let mut waitlisted = 0;

        for _ in 0..args.signups {
            let attendee = Attendee {
                first_name: FirstName().fake(),
                last_name: LastName().fake(),
                email: SafeEmail().fake(),
                phone: Some(PhoneNumber().fake()),
                payment_type: if i % 2 == 0 { PaymentType::BankTransfer } else { PaymentType::Cash },
            };

            match context.registration_service.register(event.id, attendee, true).await {
                Ok(RegistrationOutcome::Registered { .. }) => registered += 1,
                Ok(RegistrationOutcome::Waitlisted { .. }) => waitlisted += 1,
                // Fake emails occasionally collide
                Err(e) => println!("  skipped sign-up: {}", e),
            }
        }

        println!(
            "  {}: {} registered, {} waiting",
            event.title, registered, waitlisted
        );
    }

    println!("Done.");
    Ok(())
}
