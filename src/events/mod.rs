use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a closed channel is logged and otherwise ignored
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

/// Domain events emitted after state changes are committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    ReservationConfirmed {
        reservation_id: i32,
        table_id: i32,
        date: NaiveDate,
        time: NaiveTime,
        party_size: i32,
    },
    ReservationStatusChanged {
        reservation_id: i32,
        old_status: String,
        new_status: String,
    },
    ReservationCancelled(i32),
    ReservationModified(i32),

    CartSynced {
        order_id: i32,
        created: usize,
        updated: usize,
        removed: usize,
    },
    OrderStatusChanged {
        order_id: i32,
        old_status: String,
        new_status: String,
    },
    CheckoutCompleted {
        order_id: i32,
        transaction_id: i32,
        amount: Decimal,
    },

    ReviewSubmitted(i32),
    ReviewVerified(i32),
    UserRegistered(Uuid),
}

/// Drains the event channel, logging each event until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::ReservationConfirmed {
                reservation_id,
                table_id,
                date,
                time,
                party_size,
            } => {
                info!(
                    reservation_id,
                    table_id,
                    %date,
                    %time,
                    party_size,
                    "Reservation confirmed"
                );
            }
            Event::ReservationStatusChanged {
                reservation_id,
                old_status,
                new_status,
            } => {
                info!(reservation_id, %old_status, %new_status, "Reservation status changed");
            }
            Event::ReservationCancelled(id) => info!(reservation_id = id, "Reservation cancelled"),
            Event::ReservationModified(id) => info!(reservation_id = id, "Reservation modified"),
            Event::CartSynced {
                order_id,
                created,
                updated,
                removed,
            } => {
                info!(order_id, created, updated, removed, "Cart synchronized");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(order_id, %old_status, %new_status, "Order status changed");
            }
            Event::CheckoutCompleted {
                order_id,
                transaction_id,
                amount,
            } => {
                info!(order_id, transaction_id, %amount, "Checkout completed");
            }
            Event::ReviewSubmitted(id) => info!(review_id = id, "Review submitted"),
            Event::ReviewVerified(id) => info!(review_id = id, "Review verified"),
            Event::UserRegistered(id) => info!(user_id = %id, "User registered"),
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender.send(Event::ReservationCancelled(9)).await.unwrap();
        assert_eq!(rx.recv().await, Some(Event::ReservationCancelled(9)));
    }

    #[tokio::test]
    async fn send_or_log_tolerates_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender.send(Event::ReviewSubmitted(1)).await.is_err());
        sender.send_or_log(Event::ReviewSubmitted(1)).await;
    }

    #[tokio::test]
    async fn processing_loop_ends_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(process_events(rx));
        let sender = EventSender::new(tx);
        sender
            .send(Event::CartSynced {
                order_id: 1,
                created: 2,
                updated: 0,
                removed: 1,
            })
            .await
            .unwrap();
        drop(sender);
        handle.await.unwrap();
    }
}
