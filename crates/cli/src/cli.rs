use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "crown")]
#[command(about = "Crown session client - device status and live metrics from the command line")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Base URL of the device backend
    #[arg(
        long,
        global = true,
        value_name = "URL",
        env = "CROWN_ENDPOINT",
        default_value = "https://device-api.crown-rs.dev"
    )]
    pub endpoint: String,

    /// Account email
    #[arg(long, global = true, env = "CROWN_EMAIL")]
    pub email: String,

    /// Account password
    #[arg(long, global = true, env = "CROWN_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List devices registered to the account
    #[command(alias = "ls")]
    Devices,

    /// Bind to a device, subscribe to metrics, and poll status until Ctrl-C
    Watch {
        /// Device nickname to bind the session to
        nickname: String,

        /// Poll interval (ms)
        #[arg(long, default_value = "2000")]
        interval_ms: u64,

        /// Also subscribe to a trained kinesis label (repeatable)
        #[arg(long = "kinesis", value_name = "LABEL")]
        kinesis: Vec<String>,

        /// Poll status only; skip the calm/focus/accelerometer channels
        #[arg(long)]
        status_only: bool,
    },
}
