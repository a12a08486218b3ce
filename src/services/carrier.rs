//! Simulated J&T Express feed.
//!
//! The carrier exposes no sandbox, so the feed is synthesised from the order
//! status: the further along the order, the more milestones appear.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{CarrierTracking, TrackingEvent};
use crate::domain::aggregates::OrderStatus;
use crate::Result;

/// Milestones oldest first: (status label, location, description).
const MILESTONES: [(&str, &str, &str); 5] = [
    ("Picked Up", "Laoag City Drop-off", "Parcel has been picked up by courier"),
    ("In Transit", "Laoag Sorting Center", "Parcel has departed from sorting center"),
    ("Arrived", "San Fernando Hub", "Parcel has arrived at the destination hub"),
    ("Out for Delivery", "Destination Branch", "Courier is on the way to deliver your parcel"),
    ("Delivered", "Recipient Address", "Parcel has been delivered"),
];

#[derive(Debug, Clone)]
pub struct SimulatedCarrier {
    /// Timestamp of the most recent milestone; defaults to "now" when `None`.
    anchor: Option<DateTime<Utc>>,
}

impl SimulatedCarrier {
    pub fn new() -> Self { Self { anchor: None } }
    pub fn anchored_at(anchor: DateTime<Utc>) -> Self { Self { anchor: Some(anchor) } }
}

impl Default for SimulatedCarrier { fn default() -> Self { Self::new() } }

#[async_trait]
impl CarrierTracking for SimulatedCarrier {
    async fn get_events(&self, tracking_number: &str, current_status: OrderStatus) -> Result<Vec<TrackingEvent>> {
        let reached = match current_status {
            OrderStatus::Processing | OrderStatus::Cancelled => 0,
            OrderStatus::Shipped => 2,
            OrderStatus::Delivered => MILESTONES.len(),
        };
        let anchor = self.anchor.unwrap_or_else(Utc::now);
        tracing::debug!(tracking_number, status = %current_status, milestones = reached, "Synthesised carrier feed");
        Ok(MILESTONES.iter().take(reached).rev().enumerate().map(|(age, (status, location, description))| TrackingEvent {
            timestamp: (anchor - Duration::hours(6 * age as i64)).format("%Y-%m-%d %H:%M").to_string(),
            status: status.to_string(),
            location: location.to_string(),
            description: description.to_string(),
        }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_most_recent_first() {
        let carrier = SimulatedCarrier::anchored_at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        let events = carrier.get_events("JT0123456789", OrderStatus::Delivered).await.unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0].status, "Delivered");
        assert_eq!(events[0].timestamp, "2026-03-01 12:00");
        assert_eq!(events[4].status, "Picked Up");
        assert!(events[0].timestamp > events[1].timestamp);
    }

    #[tokio::test]
    async fn test_shipped_shows_partial_feed() {
        let events = SimulatedCarrier::new().get_events("JT0123456789", OrderStatus::Shipped).await.unwrap();
        assert_eq!(events.iter().map(|e| e.status.as_str()).collect::<Vec<_>>(), vec!["In Transit", "Picked Up"]);
    }
}
