//! Change-feed tests: fan-out to subscribers, the refetch-after-event
//! convergence the dashboards rely on, lag behavior and teardown.

mod support;

use api_lib::web::feed::{ChangeFeed, FeedSignal};
use foodbridge_core::domain::AppRole;
use foodbridge_core::ports::{ChangeEvent, ChangeOp, DatabaseService, StoreTable};
use futures::StreamExt;
use support::MemoryStore;

#[tokio::test]
async fn each_committed_write_reaches_every_subscriber_in_order() {
    let feed = ChangeFeed::new();
    let mut first = feed.subscribe();
    let mut second = feed.subscribe();

    feed.publish(StoreTable::Donations, ChangeOp::Insert);
    feed.publish(StoreTable::Donations, ChangeOp::Update);
    feed.publish(StoreTable::Profiles, ChangeOp::Update);

    for subscriber in [&mut first, &mut second] {
        assert_eq!(
            subscriber.next_signal().await,
            Some(FeedSignal::Event(ChangeEvent {
                table: StoreTable::Donations,
                op: ChangeOp::Insert
            }))
        );
        assert_eq!(
            subscriber.next_signal().await,
            Some(FeedSignal::Event(ChangeEvent {
                table: StoreTable::Donations,
                op: ChangeOp::Update
            }))
        );
        assert_eq!(
            subscriber.next_signal().await,
            Some(FeedSignal::Event(ChangeEvent {
                table: StoreTable::Profiles,
                op: ChangeOp::Update
            }))
        );
    }
}

#[tokio::test]
async fn events_published_before_subscribing_are_not_replayed() {
    let feed = ChangeFeed::new();
    feed.publish(StoreTable::Donations, ChangeOp::Insert);

    let mut late = feed.subscribe();
    feed.publish(StoreTable::ContactMessages, ChangeOp::Insert);

    assert_eq!(
        late.next_signal().await,
        Some(FeedSignal::Event(ChangeEvent {
            table: StoreTable::ContactMessages,
            op: ChangeOp::Insert
        }))
    );
}

// The synchronizer contract end to end, minus the socket: an NGO accepting a
// donation publishes an event, and the refetch it triggers no longer shows
// the donation as available.
#[tokio::test]
async fn refetch_after_event_converges_on_store_state() {
    let store = MemoryStore::new();
    let feed = ChangeFeed::new();
    let donor = store.register("rajesh", AppRole::Donor).await;
    let ngo = store.register("hope-foundation", AppRole::Ngo).await;

    let donation = store
        .create_donation(foodbridge_core::domain::NewDonation {
            donor_id: donor,
            food_item: "Dal, Rice, Roti".to_string(),
            quantity: "100 servings".to_string(),
            description: "Wedding surplus".to_string(),
            city: "Pune".to_string(),
            pickup_address: "45 Church Street".to_string(),
            food_source: "hotel".to_string(),
            expiry_time: chrono::Utc::now() + chrono::Duration::hours(3),
        })
        .await
        .expect("create donation");
    feed.publish(StoreTable::Donations, ChangeOp::Insert);

    let mut subscriber = feed.subscribe();

    // Another dashboard's accept lands, then its event.
    store.accept_donation(donation.id, ngo).await.expect("accept");
    feed.publish(StoreTable::Donations, ChangeOp::Update);

    let signal = subscriber.next_signal().await.expect("event");
    assert!(matches!(signal, FeedSignal::Event(_)));

    // The blunt policy: any donations event, re-run the whole query set.
    let available = store.pending_donations().await.expect("refetch");
    assert!(available.is_empty());
    let accepted = store.donations_accepted_by(ngo).await.expect("refetch");
    assert_eq!(accepted.len(), 1);
}

// A subscriber that falls far behind sees a lag marker instead of an error,
// and then keeps receiving newer events.
#[tokio::test]
async fn lagged_subscriber_resumes_with_a_wildcard_signal() {
    let feed = ChangeFeed::new();
    let mut slow = feed.subscribe();

    // Overflow the buffer while the subscriber sleeps.
    for _ in 0..2000 {
        feed.publish(StoreTable::Donations, ChangeOp::Update);
    }

    assert_eq!(slow.next_signal().await, Some(FeedSignal::Lagged));

    // After the lag marker the subscriber is live again.
    feed.publish(StoreTable::Donations, ChangeOp::Delete);
    let mut saw_delete = false;
    while let Some(signal) = slow.next_signal().await {
        if signal
            == FeedSignal::Event(ChangeEvent {
                table: StoreTable::Donations,
                op: ChangeOp::Delete,
            })
        {
            saw_delete = true;
            break;
        }
    }
    assert!(saw_delete);
}

// Dropping the publish side closes every subscription: the stream simply
// ends, which is how connection tasks learn the application is shutting down.
#[tokio::test]
async fn subscriptions_end_when_the_feed_is_dropped() {
    let feed = ChangeFeed::new();
    let mut events = Box::pin(feed.subscribe().into_stream());

    feed.publish(StoreTable::Donations, ChangeOp::Insert);
    assert!(events.next().await.is_some());

    drop(feed);
    assert!(events.next().await.is_none());
}
