//! Static preview server implementation.

use std::io;
use std::path::PathBuf;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

/// Configuration for the preview server.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Built output directory to serve
    pub root: PathBuf,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Open browser on start
    pub open: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dist"),
            host: "127.0.0.1".to_string(),
            port: 4000,
            open: false,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] io::Error),
}

/// Serves a built site directory. Directory URLs resolve to their `index.html`.
pub struct PreviewServer {
    config: PreviewConfig,
}

impl PreviewServer {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Router serving the configured root.
    pub fn router(&self) -> Router {
        Router::new().fallback_service(ServeDir::new(&self.config.root))
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Serve requests on `listener` until the process stops.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener.local_addr().map_err(ServerError::Serve)?;
        let url = format!("http://{}", addr);

        tracing::info!("Serving {} at {}", self.config.root.display(), url);

        if self.config.open {
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        axum::serve(listener, self.router())
            .await
            .map_err(ServerError::Serve)
    }

    /// Bind and serve.
    pub async fn start(self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[test]
    fn default_config() {
        let config = PreviewConfig::default();

        assert_eq!(config.port, 4000);
        assert_eq!(config.root, PathBuf::from("dist"));
        assert!(!config.open);
    }

    #[tokio::test]
    async fn serves_directory_indexes() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("index.html"), "home").unwrap();
        std::fs::create_dir_all(temp.path().join("docs")).unwrap();
        std::fs::write(temp.path().join("docs/index.html"), "docs").unwrap();

        let server = PreviewServer::new(PreviewConfig {
            root: temp.path().to_path_buf(),
            port: 0,
            ..Default::default()
        });
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server.serve(listener));

        let home = get(addr, "/").await;
        assert!(home.starts_with("HTTP/1.1 200"));
        assert!(home.ends_with("home"));

        let docs = get(addr, "/docs/").await;
        assert!(docs.starts_with("HTTP/1.1 200"));
        assert!(docs.ends_with("docs"));

        let missing = get(addr, "/missing.html").await;
        assert!(missing.starts_with("HTTP/1.1 404"));
    }

    #[tokio::test]
    async fn taken_port_is_a_bind_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let server = PreviewServer::new(PreviewConfig {
            port,
            ..Default::default()
        });
        let err = server.bind().await.unwrap_err();

        assert!(matches!(err, ServerError::Bind { .. }));
        assert!(err.to_string().contains(&port.to_string()));
    }
}
