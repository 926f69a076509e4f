use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::net::{Candidate, Network};
use crossbeam::channel::{select, Sender};
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::instrument;

/// Run the reply reader on a new thread.
pub fn spawn<N: Network + Send + Sync + 'static>(
    network: Arc<N>,
    queue: Sender<Candidate>,
    token: CancellationToken,
    read_timeout: Duration,
) -> Result<JoinHandle<Result<()>>> {
    thread::Builder::new()
        .name(String::from("pinger-reader"))
        .spawn(move || run(network.as_ref(), &queue, &token, read_timeout))
        .map_err(|err| Error::Other(err.to_string()))
}

/// Read candidate replies and pass them to the session until cancelled.
///
/// Each read waits at most `read_timeout` so that cancellation is noticed
/// promptly.  Passing a candidate blocks while the queue is full, unless the
/// session is cancelled in the meantime.
///
/// Any error other than a read timeout is fatal, it cancels the session and
/// is returned.
#[instrument(skip_all, level = "trace")]
pub fn run<N: Network>(
    network: &N,
    queue: &Sender<Candidate>,
    token: &CancellationToken,
    read_timeout: Duration,
) -> Result<()> {
    while !token.is_cancelled() {
        match network.recv_candidate(read_timeout) {
            Ok(Some(candidate)) => {
                select! {
                    send(queue, candidate) -> res => {
                        if res.is_err() {
                            tracing::debug!("reply queue disconnected");
                            break;
                        }
                    }
                    recv(token.receiver()) -> _ => break,
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::error!(%err, "failed to read replies");
                token.cancel();
                return Err(err);
            }
        }
    }
    tracing::debug!("reply reader stopped");
    Ok(())
}
