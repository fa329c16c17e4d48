mod devices;
mod watch;

use crate::backend::RestSessionClient;
use crate::cli::{Cli, Commands};
use crate::error::Result;

pub async fn dispatch(cli: Cli) -> Result<()> {
    let backend = RestSessionClient::new(&cli.endpoint);
    match cli.command {
        Commands::Devices => devices::execute(backend, &cli.email, &cli.password).await,
        Commands::Watch { nickname, interval_ms, kinesis, status_only } => {
            watch::execute(
                backend,
                &cli.email,
                &cli.password,
                watch::WatchOptions { nickname, interval_ms, kinesis, status_only },
            )
            .await
        }
    }
}
