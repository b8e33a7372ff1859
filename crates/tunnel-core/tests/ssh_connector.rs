//! Dial failures of the russh-backed connector against local sockets.

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use mcm_types::{Endpoint, KeySource};
use tokio::net::TcpListener;
use tunnel_core::{
    SshAuthenticator,
    SshConnector,
    TransportOptions,
    TunnelError,
    forwarding::TransportConnector,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

async fn connector(connect_timeout: Option<Duration>) -> Result<SshConnector> {
    let auth = SshAuthenticator::from_key_source("ops", &KeySource::new(fixture("id_ed25519"))).await?;
    Ok(SshConnector::new(
        auth,
        TransportOptions {
            keepalive_interval: None,
            connect_timeout,
        },
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn refused_port_is_a_transport_dial_error() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let endpoint = Endpoint::new("127.0.0.1", port);
    let err = connector(None).await?.connect(&endpoint).await.err().unwrap();
    assert_eq!(err.phase(), "transport dial");
    match &err {
        TunnelError::TransportDial { address, .. } => assert_eq!(address, &format!("127.0.0.1:{port}")),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn silent_server_hits_the_connect_timeout() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let endpoint = Endpoint::new("127.0.0.1", listener.local_addr()?.port());
    // Accept and hold the socket without ever sending an SSH banner.
    let silent = tokio::spawn(async move {
        let (socket, _) = listener.accept().await?;
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(socket);
        Ok::<_, std::io::Error>(())
    });

    let limit = Duration::from_millis(300);
    let started = tokio::time::Instant::now();
    let err = connector(Some(limit)).await?.connect(&endpoint).await.err().unwrap();
    let elapsed = started.elapsed();
    silent.abort();

    assert!(matches!(err, TunnelError::TransportDial { .. }), "{err}");
    assert!(err.to_string().contains("timed out"), "{err}");
    assert!(elapsed >= limit, "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "returned after {elapsed:?}");
    Ok(())
}
