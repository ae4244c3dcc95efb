use crate::net::Incoming;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use routegraph_core::{QueryOutcome, QueryRequest};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

// Length-delimited JSON frames over a unix socket. One frame out per request,
// one frame back per response, in order; the driver pairs them FIFO.
pub fn spawn_client(
    sock_path: String,
    requests: mpsc::Receiver<QueryRequest>,
    tx: mpsc::Sender<Incoming>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run(sock_path.clone(), requests, tx.clone()).await {
            let _ = tx.send(Incoming::error(sock_path.clone(), format!("{e:?}"))).await;
            let _ = tx.send(Incoming::disconnected(sock_path)).await;
        }
    })
}

async fn run(
    sock_path: String,
    mut requests: mpsc::Receiver<QueryRequest>,
    tx: mpsc::Sender<Incoming>,
) -> Result<()> {
    let stream = UnixStream::connect(&sock_path)
        .await
        .with_context(|| format!("connect query service {sock_path}"))?;

    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    let _ = tx.send(Incoming::connected(sock_path.clone())).await;

    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request) = request else { break };
                framed.send(serde_json::to_vec(&request)?.into()).await?;
            }
            frame = framed.next() => {
                let Some(frame) = frame else { break };
                let bytes = frame?;
                match serde_json::from_slice::<QueryOutcome>(&bytes) {
                    Ok(outcome) => {
                        let _ = tx.send(Incoming::outcome(sock_path.clone(), outcome)).await;
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Incoming::error(sock_path.clone(), format!("decode error: {e}")))
                            .await;
                    }
                }
            }
        }
    }

    let _ = tx.send(Incoming::disconnected(sock_path.clone())).await;
    Ok(())
}
