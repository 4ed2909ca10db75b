use std::{io::Stdout, sync::Arc};

use ideasguy_widget::{ChatWidget, HttpChatApi, TerminalView, WidgetConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Say(&'a str),
    ListCharacters,
    Character(&'a str),
    ListModels,
    Model(&'a str),
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return Command::Say(trimmed);
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map(|(name, arg)| (name, arg.trim()))
        .unwrap_or((command, ""));

    match (name, arg) {
        ("characters", _) => Command::ListCharacters,
        ("models", _) => Command::ListModels,
        ("character", id) if !id.is_empty() => Command::Character(id),
        ("model", id) if !id.is_empty() => Command::Model(id),
        ("help", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        _ => Command::Unknown(trimmed),
    }
}

const HELP: &str = "commands: /characters, /character <id>, /models, /model <id>, /help, /quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WidgetConfig::from_env();
    let api = Arc::new(HttpChatApi::new(&config.api_base_url)?);
    info!(api = %config.api_base_url, "starting chat session");

    let mut widget = ChatWidget::new(api, TerminalView::new(std::io::stdout()), config);
    widget.init().await;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !handle_line(&mut widget, &line).await {
            break;
        }
    }
    Ok(())
}

async fn handle_line(widget: &mut ChatWidget<TerminalView<Stdout>>, line: &str) -> bool {
    match parse_command(line) {
        Command::Say(text) => {
            widget.submit_turn(text).await;
        }
        Command::ListCharacters => widget.view_mut().print_character_options(),
        Command::Character(id) => {
            if let Err(error) = widget.set_character(id).await {
                warn!(%error, "could not switch character");
                println!("{error}");
            }
        }
        Command::ListModels => widget.view_mut().print_model_options(),
        Command::Model(id) => match widget.select_model(id) {
            Ok(()) => println!("model set to {id}"),
            Err(error) => println!("{error}"),
        },
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
        Command::Unknown(input) => println!("unknown command: {input}\n{HELP}"),
    }
    true
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
