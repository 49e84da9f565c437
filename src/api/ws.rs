use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use crate::{broadcast::FeedFrame, controller::AppState};

/// GET /ws - live snapshot feed
pub async fn feed(ws: WebSocketUpgrade, State(st): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, st))
}

async fn serve_socket(socket: WebSocket, st: AppState) {
    let observer = st.broadcaster.connect();
    let (sender, mut receiver) = socket.split();
    let sink = sender.with(|frame: FeedFrame| async move {
        Ok::<_, axum::Error>(Message::Text(frame.into_text()))
    });

    // Inbound messages are ignored; the stream ending means the client left
    let closed = async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };

    observer.run(Box::pin(sink), closed).await;
}
