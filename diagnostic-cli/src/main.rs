mod commands;
mod dashboard;

use clap::{Parser, Subcommand};
use kiddee_board::{Board, BoardConfig};
use log::{error, info};
use std::time::Duration;

/// Diagnostic tool for boards running the Kiddee FirmataExpress sketch.
#[derive(Parser)]
struct Cli {
    /// Serial port; every USB serial port is probed when neither this nor
    /// --ip is given
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long, default_value_t = 115_200)]
    baud: u32,

    /// Board instance ID compiled into the sketch
    #[arg(long, default_value_t = 1)]
    instance_id: u8,

    /// Seconds to wait for the board to reset after opening the port
    #[arg(long, default_value_t = 4)]
    wait: u64,

    /// Connect over TCP to StandardFirmataWifi instead of serial
    #[arg(long)]
    ip: Option<String>,

    #[arg(long, default_value_t = 3030)]
    ip_port: u16,

    /// Query reply timeout in milliseconds
    #[arg(long, default_value_t = 4000)]
    timeout: u64,

    /// Repeat the command every n milliseconds
    #[arg(long, default_value = None)]
    repeat: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(flatten)]
    Board(commands::Command),

    /// Live table of inputs
    Dashboard(dashboard::Args),
}

impl Cli {
    fn board_config(&self) -> BoardConfig {
        BoardConfig {
            com_port: self.port.clone(),
            baud_rate: self.baud,
            arduino_instance_id: self.instance_id,
            arduino_wait: Duration::from_secs(self.wait),
            ip_address: self.ip.clone(),
            ip_port: self.ip_port,
            query_timeout: Duration::from_millis(self.timeout),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The dashboard owns the terminal, so it logs nothing.
    if !matches!(cli.command, Command::Dashboard(_)) {
        env_logger::init();
    }

    let board = match Board::connect(cli.board_config()).await {
        Ok(board) => board,
        Err(e) => {
            error!("Failed to connect to board: {e}");
            std::process::exit(1);
        }
    };
    info!("Connected (FirmataExpress: {})", board.firmata_express());

    let result = match &cli.command {
        Command::Board(command) => commands::run(&board, command, cli.repeat).await,
        Command::Dashboard(args) => dashboard::run(&board, args).await,
    };

    board.shutdown().await;

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}
