//! services/api/src/web/ws_handler.rs
//!
//! This is the entry point and control loop for a dashboard WebSocket
//! connection: the realtime view synchronizer. After the init handshake the
//! connection owns one change-feed subscription; on every relevant table
//! event it re-runs the session role's full query set and pushes a fresh
//! snapshot, so concurrently-acting dashboards converge without reloads.

use crate::web::{
    feed::FeedSignal,
    middleware::CurrentUser,
    protocol::{
        donation_views, ClientMessage, ContactMessageView, CountsView, ServerMessage,
        UserAccountView,
    },
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use foodbridge_core::domain::AppRole;
use foodbridge_core::ports::{PortError, PortResult, StoreTable};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: CurrentUser) {
    info!("New dashboard connection for user: {}", user.user_id);

    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // A session without a role has no dashboard to synchronize.
    let Some(role) = user.role else {
        let err_msg = ServerMessage::Error {
            message: "No dashboard role is assigned to this account.".to_string(),
        };
        let err_json = serde_json::to_string(&err_msg).unwrap();
        let _ = ws_sender.lock().await.send(Message::Text(err_json.into())).await;
        return;
    };

    // --- 1. Initialization Phase ---
    if let Some(Ok(Message::Text(init_json))) = receiver.next().await {
        match serde_json::from_str::<ClientMessage>(&init_json) {
            Ok(ClientMessage::Init) => {
                let init_msg = ServerMessage::FeedInitialized {
                    role: role.as_str().to_string(),
                };
                let init_json = serde_json::to_string(&init_msg).unwrap();
                if ws_sender.lock().await.send(Message::Text(init_json.into())).await.is_err() {
                    error!("Failed to send feed initialized message.");
                    return;
                }
            }
            Err(_) => {
                error!("First message was not a valid Init message.");
                return;
            }
        }
    } else {
        error!("Client disconnected before sending Init message.");
        return;
    }

    // --- 2. Synchronizer Task ---
    // The task owns the feed subscription; the token tears both down when the
    // connection (the "view") goes away.
    let token = CancellationToken::new();
    let sync_task = {
        let state = state.clone();
        let ws_sender = ws_sender.clone();
        let token = token.clone();
        let user_id = user.user_id;
        tokio::spawn(async move {
            if let Err(e) = sync_process(state, user_id, role, ws_sender, token).await {
                error!("Dashboard sync process failed: {:?}", e);
            }
        })
    };

    // --- 3. Main Message Loop ---
    // The client has nothing to say after the handshake; this loop just waits
    // for the socket to close.
    loop {
        match receiver.next().await {
            Some(Ok(Message::Close(_))) | None => {
                info!("Client disconnected.");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("WebSocket receive error: {:?}", e);
                break;
            }
        }
    }

    // --- 4. Cleanup ---
    token.cancel();
    sync_task.abort();
    info!("Dashboard connection closed for user: {}", user.user_id);
}

/// Pushes snapshots for one connection until the feed closes or the token
/// cancels. Subscribes *before* the initial snapshot so a write that lands in
/// between still triggers a refetch rather than being missed.
async fn sync_process(
    state: Arc<AppState>,
    user_id: Uuid,
    role: AppRole,
    ws_sender: WsSender,
    token: CancellationToken,
) -> Result<(), axum::Error> {
    let mut events = Box::pin(state.feed.subscribe().into_stream());

    send_snapshot(&state, user_id, role, &ws_sender).await?;

    loop {
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            signal = events.next() => match signal {
                // Feed closed: the application is shutting down.
                None => return Ok(()),
                // Missed events could have touched anything; refetch.
                Some(FeedSignal::Lagged) => {
                    send_snapshot(&state, user_id, role, &ws_sender).await?;
                }
                Some(FeedSignal::Event(event)) if role_watches(role, event.table) => {
                    send_snapshot(&state, user_id, role, &ws_sender).await?;
                }
                Some(FeedSignal::Event(_)) => {}
            },
        }
    }
}

/// Which tables force a refetch for a given role. Donor, NGO and volunteer
/// views are donation-shaped; the admin view also shows users and messages.
fn role_watches(role: AppRole, table: StoreTable) -> bool {
    match role {
        AppRole::Admin => true,
        _ => table == StoreTable::Donations,
    }
}

async fn send_snapshot(
    state: &Arc<AppState>,
    user_id: Uuid,
    role: AppRole,
    ws_sender: &WsSender,
) -> Result<(), axum::Error> {
    let message = match build_snapshot(state, user_id, role).await {
        Ok(message) => message,
        Err(e) => {
            // A failed refetch leaves the client on its previous snapshot;
            // the next event triggers another attempt.
            error!("Failed to build {} snapshot: {:?}", role, e);
            ServerMessage::Error {
                message: "Failed to refresh dashboard data.".to_string(),
            }
        }
    };

    let json = serde_json::to_string(&message).unwrap();
    ws_sender.lock().await.send(Message::Text(json.into())).await
}

/// Re-runs the full query set for the role and packages it as one snapshot.
async fn build_snapshot(
    state: &Arc<AppState>,
    user_id: Uuid,
    role: AppRole,
) -> PortResult<ServerMessage> {
    let db = &state.db;
    let message = match role {
        AppRole::Donor => ServerMessage::DonorSnapshot {
            mine: donation_views(db.donations_by_donor(user_id).await?),
        },
        AppRole::Ngo => ServerMessage::NgoSnapshot {
            available: donation_views(db.pending_donations().await?),
            accepted: donation_views(db.donations_accepted_by(user_id).await?),
        },
        AppRole::Volunteer => {
            let is_active = match db.get_profile(user_id).await {
                Ok(profile) => profile.is_active,
                Err(PortError::NotFound(_)) => false,
                Err(e) => return Err(e),
            };
            // Inactive volunteers keep their claimed deliveries but see no
            // new pickup work.
            let available = if is_active {
                donation_views(db.claimable_donations().await?)
            } else {
                Vec::new()
            };
            ServerMessage::VolunteerSnapshot {
                is_active,
                available,
                deliveries: donation_views(db.deliveries_for(user_id).await?),
            }
        }
        AppRole::Admin => ServerMessage::AdminSnapshot {
            donations: donation_views(db.all_donations().await?),
            counts: CountsView::from(db.donation_counts().await?),
            users: db
                .list_user_accounts()
                .await?
                .into_iter()
                .map(UserAccountView::from)
                .collect(),
            messages: db
                .list_contact_messages()
                .await?
                .into_iter()
                .map(ContactMessageView::from)
                .collect(),
        },
    };
    Ok(message)
}
