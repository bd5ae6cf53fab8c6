use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use url::Url;

pub(crate) async fn spawn_server(app: Router) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

/// A base url nothing listens on.
pub(crate) async fn unreachable_server() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

pub(crate) fn endpoint(base: &str, path: &str) -> Url {
    Url::parse(base)
        .and_then(|base| base.join(path))
        .expect("endpoint url")
}

pub(crate) fn client() -> reqwest::Client {
    reqwest::Client::new()
}
