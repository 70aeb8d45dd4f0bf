use baglink_frame::Command as BagCommand;
use baglink_session::BagSession;
use baglink_transport::EndpointDescriptor;

use crate::cmd::SendArgs;
use crate::exit::{session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint: EndpointDescriptor = args
        .endpoint
        .parse()
        .map_err(|err| CliError::new(USAGE, format!("{err}")))?;
    let command = BagCommand::from(args.command);

    let mut session = BagSession::default();
    session
        .connect(&endpoint)
        .map_err(|err| session_error("connect failed", err))?;
    // Commands are only accepted while listening.
    let _rx = session
        .listen()
        .map_err(|err| session_error("listen failed", err))?;
    session
        .send_command(command)
        .map_err(|err| session_error("send failed", err))?;
    session.disconnect();

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "sent": command.to_string() })
        ),
        OutputFormat::Table | OutputFormat::Pretty => println!("sent: {command}"),
    }
    Ok(SUCCESS)
}
