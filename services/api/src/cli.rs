use crate::admin::{run_admin_create, AdminCreateArgs};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use parking_pass::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Parking Pass Portal",
    about = "Run and administer the parking pass portal from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Manage administrator accounts in the configured store
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// Walk through submission, review, and pass download against an in-memory store
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Register a new administrator
    Create(AdminCreateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Admin {
            command: AdminCommand::Create(args),
        } => run_admin_create(args),
        Command::Demo(args) => run_demo(args),
    }
}
