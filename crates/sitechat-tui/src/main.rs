use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sitechat_core::embed::{self, Page};
use sitechat_core::markup::parse_fragments;
use sitechat_core::typewriter::drive;
use sitechat_core::{AdminPanel, AskClient, ChatSession, Config, Fragment, ReindexTrigger};
use std::io::Write;
use std::path::PathBuf;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "sitechat")]
#[command(version)]
#[command(about = "Chat with a site's AI search assistant")]
struct Cli {
    /// Ask endpoint URL (overrides config and SITECHAT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and type the answer to stdout
    Ask {
        /// Your question
        question: String,
    },
    /// Trigger the server-side reindex job through the host AJAX bridge
    Reindex {
        /// AJAX bridge URL
        #[arg(long)]
        ajax_url: Option<String>,
        /// CSRF nonce issued by the host
        #[arg(long)]
        nonce: Option<String>,
    },
    /// Save the resolved settings (file, env and flags) to the config file
    Configure {
        /// AJAX bridge URL
        #[arg(long)]
        ajax_url: Option<String>,
        /// CSRF nonce issued by the host
        #[arg(long)]
        nonce: Option<String>,
    },
    /// Print the host page markup for the chat widget
    Embed {
        /// Print the admin reindex panel instead
        #[arg(long)]
        admin: bool,
        /// Page content file; prints the asset tags to enqueue for it
        #[arg(long)]
        content: Option<PathBuf>,
        /// Base URL the plugin's assets are served from
        #[arg(long, default_value = "")]
        plugin_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        None => {
            let log_path = logging::init_file()?;
            tracing::info!(path = %log_path.display(), "starting chat widget");
        }
        Some(_) => logging::init_stderr(),
    }

    let mut config = Config::load()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not read config, using defaults");
            Config::new()
        })
        .with_env_overrides(|key| std::env::var(key).ok());
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    match cli.command {
        None => run_tui(config).await,
        Some(Commands::Ask { question }) => ask_once(&config, &question).await,
        Some(Commands::Reindex { ajax_url, nonce }) => {
            let ajax_url = ajax_url.or(config.ajax_url);
            let nonce = nonce.or(config.nonce);
            reindex(ajax_url, nonce).await
        }
        Some(Commands::Configure { ajax_url, nonce }) => {
            if ajax_url.is_some() {
                config.ajax_url = ajax_url;
            }
            if nonce.is_some() {
                config.nonce = nonce;
            }
            config.save()?;
            println!(
                "{} {}",
                "Saved settings to".green(),
                Config::get_config_path()?.display()
            );
            Ok(())
        }
        Some(Commands::Embed { admin, content, plugin_url }) => {
            print_embed(&config, admin, content.as_deref(), &plugin_url)
        }
    }
}

async fn run_tui(config: Config) -> Result<()> {
    let mut app = App::new(&config)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(config.cadence());

    let result = event_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}

async fn ask_once(config: &Config, question: &str) -> Result<()> {
    let client = AskClient::with_timeout(&config.api_url, config.request_timeout())?;
    let mut session = ChatSession::new();
    session.set_input(question);

    let Some(query) = session.submit() else {
        println!("{}", "Nothing to ask.".yellow());
        return Ok(());
    };

    println!("{} {}", "You:".bold().cyan(), query);
    let outcome = client.ask(&query).await;
    session.resolve(outcome);

    print!("{} ", "AI:".bold().yellow());
    let mut shown = 0;
    drive(config.cadence(), || {
        let advanced = session.advance();
        if let Some(answer) = session.messages().last() {
            print!("{}", &answer.display_text[shown..]);
            shown = answer.display_text.len();
        }
        let _ = std::io::stdout().flush();
        advanced
    })
    .await;
    println!();

    // Links only become usable once the answer settles
    if let Some(answer) = session.messages().last() {
        let links: Vec<(String, String)> = parse_fragments(&answer.rich_html)
            .into_iter()
            .filter_map(|fragment| match fragment {
                Fragment::Link { label, href } => Some((label, href)),
                _ => None,
            })
            .collect();

        if !links.is_empty() {
            println!("\n{}", "Links:".bold().blue());
            for (label, href) in links {
                println!("  • {} {}", label.green(), href.dimmed());
            }
        }
    }

    Ok(())
}

async fn reindex(ajax_url: Option<String>, nonce: Option<String>) -> Result<()> {
    let (Some(ajax_url), Some(nonce)) = (ajax_url, nonce) else {
        bail!("reindex needs an AJAX URL and a nonce (--ajax-url/--nonce, config, or SITECHAT_AJAX_URL/SITECHAT_NONCE)");
    };

    let trigger = ReindexTrigger::new(&ajax_url, &nonce);
    let mut panel = AdminPanel::new();
    panel.begin();
    print!("{}", panel.log());
    let _ = std::io::stdout().flush();

    let started = panel.log().len();
    panel.finish(trigger.trigger().await);
    println!("{}", &panel.log()[started..]);

    Ok(())
}

fn print_embed(
    config: &Config,
    admin: bool,
    content: Option<&std::path::Path>,
    plugin_url: &str,
) -> Result<()> {
    if let Some(path) = content {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read page content {:?}", path))?;
        let assets = embed::enqueue_assets(Page { singular: true, content: &text }, plugin_url);
        if assets.is_empty() {
            println!("{}", "No [ai_chat] shortcode found; nothing to enqueue.".yellow());
        }
        for asset in assets {
            println!("{}", asset.to_tag());
        }
        return Ok(());
    }

    if admin {
        print!("{}", embed::render_admin_panel());
        match (&config.ajax_url, &config.nonce) {
            (Some(ajax_url), Some(nonce)) => {
                println!("<script>{}</script>", embed::admin_script_data(ajax_url, nonce));
            }
            _ => eprintln!(
                "{}",
                "No AJAX URL/nonce configured; the AIIndexAjax script was not printed.".yellow()
            ),
        }
    } else {
        print!("{}", embed::render_chat_widget());
    }
    Ok(())
}
