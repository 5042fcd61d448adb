use futures::StreamExt;
use log::{ info, warn };
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{ connect_async, tungstenite::protocol::Message };
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// `{base}/ws/{session_id}`, with http(s) bases rewritten to ws(s).
pub fn socket_url(base: &str, session_id: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "http" => Some("ws"),
        "https" => Some("wss"),
        _ => None,
    };
    if let Some(scheme) = scheme {
        // Switching between special schemes of the same family cannot fail.
        let _ = url.set_scheme(scheme);
    }
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
        segments.pop_if_empty().push("ws").push(session_id);
    }
    Ok(url)
}

/// Watches the session socket; the AI exchange itself goes over HTTP.
pub struct SessionSocket {
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<bool>,
}

impl SessionSocket {
    pub fn spawn(url: Url) -> Self {
        let (tx, rx) = watch::channel(ConnectionState::Connecting);
        let task = tokio::spawn(monitor(url, tx));
        Self { state: rx, task }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Waits for the socket to close; true when it had been open.
    pub async fn finished(self) -> bool {
        self.task.await.unwrap_or(false)
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

async fn monitor(url: Url, tx: watch::Sender<ConnectionState>) -> bool {
    let mut opened = false;
    match connect_async(url.as_str()).await {
        Ok((mut ws, _)) => {
            opened = true;
            tx.send_replace(ConnectionState::Open);
            info!("🟢 WebSocket connected: {}", url);
            while let Some(msg) = ws.next().await {
                match msg {
                    Ok(Message::Close(frame)) => {
                        match frame {
                            Some(f) => info!("🔴 Closed: Code {}, Reason: {}", f.code, f.reason),
                            None => info!("🔴 Closed"),
                        }
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("⚠️ WebSocket error: {}", e);
                        break;
                    }
                }
            }
        }
        Err(e) => warn!("⚠️ WebSocket error connecting to {}: {}", url, e),
    }
    tx.send_replace(ConnectionState::Closed);
    opened
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn http_base_becomes_ws_path() {
        let url = socket_url("http://localhost:5000", "abc").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:5000/ws/abc");
        let url = socket_url("https://api.clinic.test/", "abc").unwrap();
        assert_eq!(url.as_str(), "wss://api.clinic.test/ws/abc");
    }

    #[tokio::test]
    async fn tracks_open_then_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.close(None).await.unwrap();
            while ws.next().await.is_some() {}
        });

        let socket = SessionSocket::spawn(socket_url(&format!("http://{}", addr), "s1").unwrap());
        let mut rx = socket.subscribe();
        assert!(socket.finished().await);
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn unreachable_socket_ends_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let socket = SessionSocket::spawn(socket_url(&format!("http://{}", addr), "s1").unwrap());
        let rx = socket.subscribe();
        assert!(!socket.finished().await);
        assert_eq!(*rx.borrow(), ConnectionState::Closed);
    }
}
