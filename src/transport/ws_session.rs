use crate::game::room::{Room, SessionEvent};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

/// Pumps one WebSocket connection: inbound binary frames go to the room,
/// outbound frames drain from the session channel. A close event from the
/// room ends the connection with a normal close frame.
pub async fn handle_socket(socket: WebSocket, room: Arc<Room>) {
    let (mut sender, mut receiver) = socket.split();
    let session = room.add_session().await;
    let session_id = session.session_id;
    let mut events = session.events;

    let send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Frame(payload) => {
                    if sender.send(Message::Binary(payload)).await.is_err() {
                        break;
                    }
                }
                SessionEvent::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    while let Some(result) = receiver.next().await {
        let Ok(message) = result else { break };
        match message {
            Message::Binary(data) => {
                if !room.handle_binary_message(&session_id, &data).await {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    room.remove_session(&session_id).await;
    send_task.abort();
}
