use live_vote::config::Config;
use live_vote::console::{self, Command, Console};
use live_vote::transport::Transport;
use live_vote::transport::local::LocalRelay;
use log::{error, info};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };
    if config.admin_password.is_none() {
        info!("ADMIN_PASSWORD is not set; nobody can log in as admin.");
    }

    let relay: Arc<dyn Transport> = Arc::new(LocalRelay::new());
    info!("Relaying on channel '{}'", config.channel);
    let mut console = Console::new(config, relay);

    println!("{}", console::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        };

        let command = match console::parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("error: {}", e);
                continue;
            }
        };
        let quit = command == Command::Quit;

        match console.execute(command).await {
            Ok(output) => println!("{}", output),
            Err(e) => println!("error: {}", e),
        }
        if quit {
            break;
        }
    }

    console.shutdown().await;
}
