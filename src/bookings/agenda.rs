//! Splitting a user's bookings into what's coming up and what's done

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::models::{Booking, BookingStatus};

#[derive(Debug, Default, Serialize)]
pub struct Agenda {
    pub upcoming: Vec<Booking>,
    pub past: Vec<Booking>,
}

/// A booking is upcoming if it starts after `now` and hasn't been
/// cancelled. Cancelled bookings always land in `past`, even if their
/// slot is in the future. Input order is preserved in both lists.
pub fn partition_bookings(bookings: Vec<Booking>, now: DateTime<Utc>) -> Agenda {
    let (upcoming, past) = bookings
        .into_iter()
        .partition(|b| b.start_time > now && b.status != BookingStatus::Cancelled);
    Agenda { upcoming, past }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    fn booking(ext_id: &str, start: DateTime<Utc>, status: BookingStatus) -> Booking {
        Booking {
            id: format!("id-{}", ext_id),
            user_id: "u1".to_string(),
            external_booking_id: ext_id.to_string(),
            event_type_id: None,
            title: Some("Yoga".to_string()),
            description: None,
            start_time: start,
            end_time: start + Duration::minutes(45),
            attendee_name: None,
            attendee_email: None,
            attendee_timezone: None,
            status,
            metadata: json!({}),
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn it_partitions_upcoming_and_past() {
        let now = Utc::now();
        let agenda = partition_bookings(
            vec![
                booking("past", now - Duration::hours(1), BookingStatus::Accepted),
                booking("soon", now + Duration::hours(1), BookingStatus::Accepted),
                booking("cancelled", now + Duration::hours(2), BookingStatus::Cancelled),
                booking("pending", now + Duration::hours(3), BookingStatus::Pending),
                booking("exactly-now", now, BookingStatus::Accepted),
            ],
            now,
        );

        let ids = |v: &[Booking]| {
            v.iter()
                .map(|b| b.external_booking_id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&agenda.upcoming), vec!["soon", "pending"]);
        assert_eq!(ids(&agenda.past), vec!["past", "cancelled", "exactly-now"]);
    }

    #[test]
    fn it_reports_duration_in_minutes() {
        let b = booking("x", Utc::now(), BookingStatus::Accepted);
        assert_eq!(b.duration_minutes(), 45);
    }
}
