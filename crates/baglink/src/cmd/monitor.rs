use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use baglink_session::{BagSession, SessionEvent};
use baglink_transport::EndpointDescriptor;

use crate::cmd::{parse_duration, MonitorArgs};
use crate::exit::{session_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_event, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint: EndpointDescriptor = args
        .endpoint
        .parse()
        .map_err(|err| CliError::new(USAGE, format!("{err}")))?;
    let delay = parse_duration(&args.delay)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut session = BagSession::default();
    let mut printed = 0usize;
    let mut failures = 0u32;

    'outer: while running.load(Ordering::SeqCst) {
        if let Err(err) = session.connect(&endpoint) {
            // Reconnection policy is ours, not the session's.
            failures += 1;
            if !args.reconnect || failures >= args.attempts {
                return Err(session_error("connect failed", err));
            }
            warn!(%err, attempt = failures, "connect failed; retrying");
            std::thread::sleep(delay);
            continue;
        }
        failures = 0;

        let rx = match session.listen() {
            Ok(Some(rx)) => rx,
            Ok(None) => continue,
            Err(err) => return Err(session_error("listen failed", err)),
        };

        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(event) => {
                    let lost = matches!(event, SessionEvent::Disconnected { .. });
                    print_event(&event, format);
                    printed = printed.saturating_add(1);

                    if args.count.is_some_and(|count| printed >= count) {
                        break 'outer;
                    }
                    if lost {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if !running.load(Ordering::SeqCst) {
                        break 'outer;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if !args.reconnect {
            session.disconnect();
            return Ok(FAILURE);
        }
        failures += 1;
        if failures >= args.attempts {
            session.disconnect();
            return Ok(FAILURE);
        }
        if running.load(Ordering::SeqCst) {
            std::thread::sleep(delay);
        }
    }

    session.disconnect();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
