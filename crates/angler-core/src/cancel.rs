//! Quit listener.
//!
//! The listener runs beside the automation loop and has one job: cancel the
//! session token when the user asks to stop. It never reads or writes
//! session state.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CTRL_C_QUIT_KEY;

/// Wait for Ctrl-C, or for a line equal to `quit_key` on `input`, then
/// cancel `token`.
///
/// With the quit key set to `CTRL-C`, `input` is never read. Returns without
/// cancelling if the token is cancelled by someone else first. End of input
/// leaves only Ctrl-C able to stop the session.
pub async fn wait_for_quit<R>(input: R, quit_key: String, token: CancellationToken)
where
    R: AsyncBufRead + Unpin,
{
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let quit_line = async {
        if quit_key == CTRL_C_QUIT_KEY {
            std::future::pending::<()>().await;
        }
        read_until_quit(input, &quit_key).await;
    };

    tokio::select! {
        () = token.cancelled() => {
            debug!("Quit listener stopped");
            return;
        }
        () = ctrl_c => info!("Ctrl-C received"),
        () = quit_line => info!(key = %quit_key, "Quit key received"),
    }
    token.cancel();
}

/// Return once a line equal to `quit_key` is read. Never returns if input
/// ends or fails first.
async fn read_until_quit<R>(input: R, quit_key: &str)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim() == quit_key => return,
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read quit key input");
                break;
            }
        }
    }
    std::future::pending::<()>().await;
}
