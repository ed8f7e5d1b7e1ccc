use anyhow::{Result, anyhow};
use chrono::Utc;

use crate::bookings::{Booking, open_stores, partition_bookings};
use crate::core::DatabaseConfig;

fn format_booking(booking: &Booking) -> String {
    format!(
        "{} ({} min) {} with {} [{}]",
        booking.start_time.format("%Y-%m-%d %H:%M UTC"),
        booking.duration_minutes(),
        booking.title.as_deref().unwrap_or("Untitled session"),
        booking
            .attendee_name
            .as_deref()
            .or(booking.attendee_email.as_deref())
            .unwrap_or("unknown attendee"),
        booking.status,
    )
}

pub async fn run(email: &str) -> Result<()> {
    let config = DatabaseConfig::from_env()?;
    let stores = open_stores(&config).await?;

    let account = stores
        .accounts
        .find_by_email(email)
        .await?
        .ok_or_else(|| anyhow!("No account found for {}", email))?;
    let bookings = stores.bookings.list_for_user(&account.id).await?;
    let agenda = partition_bookings(bookings, Utc::now());

    println!("Upcoming ({})", agenda.upcoming.len());
    for booking in &agenda.upcoming {
        println!("  {}", format_booking(booking));
    }
    println!("Past ({})", agenda.past.len());
    for booking in &agenda.past {
        println!("  {}", format_booking(booking));
    }

    Ok(())
}
