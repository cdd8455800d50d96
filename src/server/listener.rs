use tracing::{debug, error, info};

use crate::config::Config;
use crate::endpoint::Endpoint;
use crate::metrics::recorder::Recorder;
use crate::proxy::session::Session;

pub async fn run(cfg: &Config, recorder: Recorder) -> anyhow::Result<()> {
    let listen = Endpoint::parse(&cfg.listen_addr);
    let target = Endpoint::parse(&cfg.target_addr);

    let listener = listen.bind().await?;
    info!("Proxy listening on {}", listen);
    info!("Forwarding to {}", target);
    info!("Use Ctrl+C to stop the proxy");

    let mut connection_count: u64 = 0;

    loop {
        // One refused accept must not take the proxy down
        let (client, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };

        connection_count += 1;
        match &peer {
            Some(addr) => debug!(conn = connection_count, "New connection from {}", addr),
            None => debug!(conn = connection_count, "New connection"),
        }

        let session = Session::new(connection_count, peer, target.clone(), recorder.clone());
        tokio::spawn(async move {
            session.run(client).await;
        });
    }
}
