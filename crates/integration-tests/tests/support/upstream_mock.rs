#![allow(dead_code)]

pub struct MockUpstreamServer {
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl MockUpstreamServer {
    pub async fn start(app: axum::Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("mock upstream listener should bind");
        let bind_addr = listener
            .local_addr()
            .expect("mock upstream listener local address should exist");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("mock upstream server should run");
        });

        Self {
            base_url: format!("http://{bind_addr}"),
            handle,
        }
    }
}

impl Drop for MockUpstreamServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
