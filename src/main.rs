use std::io::Write;

use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use virtual_stylist::config::CONFIG;
use virtual_stylist::handlers::commands::{handle_command, help_text, parse_command, Command};
use virtual_stylist::llm::GeminiClient;
use virtual_stylist::stylist::Stylist;
use virtual_stylist::utils::logging::init_logging;

fn prompt() {
    print!("stylist> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let _guards = init_logging(&CONFIG);
    info!(
        "Starting virtual stylist (model={}, base={})",
        CONFIG.gemini_image_model, CONFIG.gemini_api_base
    );

    let stylist = Stylist::new(GeminiClient::from_config(&CONFIG));
    println!("{}", help_text());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        match handle_command(&stylist, command).await {
            Ok(reply) => println!("{reply}"),
            Err(err) => {
                error!("command failed: {err:#}");
                println!("Error: {err:#}");
            }
        }
    }

    info!("Virtual stylist session ended");
    Ok(())
}
