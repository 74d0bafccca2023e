mod cli;
mod gateway_client;
mod terminal;

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use tracing::{debug, warn};

use amber_stream::ClientState;

use crate::cli::CliArgs;
use crate::gateway_client::GatewayClient;
use crate::terminal::{Mark, Terminal};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    amber_core::config::load_dotenv();
    let args = CliArgs::parse();
    let mut terminal = Terminal::new(!args.no_thinking);

    if !args.raw {
        terminal.print_banner(&args.gateway, &args.query)?;
    }

    let client = GatewayClient::new(&args.gateway);
    let mut events = match client.invoke(&args.query).await {
        Ok(events) => events,
        Err(e) => {
            terminal.print_error(&format!("{:#}", e))?;
            std::process::exit(1);
        }
    };

    // Fresh state per invocation.
    let mut state = ClientState::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            next = events.next() => match next {
                Some(Ok(event)) => {
                    if args.raw {
                        terminal.print_raw(&event)?;
                        state.apply(&event);
                    } else {
                        let mark = Mark::of(&state);
                        state.apply(&event);
                        terminal.render(&mark.updates(&state))?;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "gateway stream interrupted");
                    let mark = Mark::of(&state);
                    state.mark_disconnected(format!("stream interrupted: {}", e));
                    if !args.raw {
                        terminal.render(&mark.updates(&state))?;
                    }
                    break;
                }
                None => break,
            },
            _ = &mut ctrl_c => {
                debug!("interrupted by user");
                terminal.print_info("[cancelled]")?;
                state.mark_disconnected("cancelled by user");
                break;
            }
        }
    }

    if !state.finished {
        let mark = Mark::of(&state);
        state.mark_disconnected("connection closed before the agent finished");
        if !args.raw {
            terminal.render(&mark.updates(&state))?;
        }
    }
    state.record_dropped(events.dropped());

    if args.raw {
        if let Some(error) = &state.error {
            terminal.print_error(error)?;
        }
    } else {
        terminal.print_summary(&state)?;
    }

    if !state.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}
