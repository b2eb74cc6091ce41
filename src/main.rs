use std::env;
use std::path::Path;
use std::process;

use slot_bazaar::script::{read_script, snapshot, write_snapshot};
use slot_bazaar::{Session, SessionConfig};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = env::args()
        .nth(1)
        .expect("usage: slot-bazaar <script.csv>");

    if !path.ends_with(".csv") {
        warn!(path, "script file seems to not be a csv file");
    }

    let commands = match read_script(Path::new(&path)) {
        Ok(commands) => commands,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    let mut session = Session::new(SessionConfig::default());
    let (command_sender, command_receiver) = tokio::sync::mpsc::channel(16);

    tokio::spawn(async move {
        for result in commands {
            match result {
                Ok(command) => {
                    if command_sender.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    session.run(ReceiverStream::new(command_receiver)).await;

    if let Err(e) = write_snapshot(std::io::stdout().lock(), snapshot(&session)) {
        error!("failed to write snapshot: {e}");
        process::exit(1);
    }
}
