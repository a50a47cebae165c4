use chatter_core::auth::{enter_display_name, LoginClient, LoginForm, DEFAULT_REJECTED_MESSAGE};
use chatter_core::chat::{ChatView, ListChange};
use chatter_core::demo::{LocalChat, SAMPLE_USERS};
use chatter_core::render::{render_message, Align, RenderRecord};
use chatter_core::session::SessionStore;
use clap::{Parser, Subcommand};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type InputLines = Lines<BufReader<Stdin>>;

/// Column own messages are right-aligned to.
const LINE_WIDTH: usize = 60;
const SAMPLE_COMMAND: &str = "/sample";

#[derive(Parser)]
#[command(name = "chatter")]
#[command(about = "Chatter CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: CHATTER_CONFIG_PATH or ~/.chatter/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Log in and chat with the message server (interactive). Type /quit to leave.
    Chat {
        /// Config file path (default: CHATTER_CONFIG_PATH or ~/.chatter/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// User id; prompted for when omitted.
        #[arg(long, value_name = "ID")]
        id: Option<String>,

        /// Password; prompted for when omitted.
        #[arg(long, value_name = "PASSWORD")]
        password: Option<String>,
    },

    /// Offline demo room: messages stay local, /sample inserts a random sample message.
    Demo {
        /// Display name; prompted for when omitted.
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("chatter {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat {
            config,
            id,
            password,
        }) => {
            if let Err(e) = run_chat(config, id, password).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Demo { name }) => {
            if let Err(e) = run_demo(name).await {
                log::error!("demo failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(chatter_core::config::default_config_path);
    let dir = chatter_core::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn is_quit(line: &str) -> bool {
    let t = line.trim();
    t.eq_ignore_ascii_case("/quit") || t.eq_ignore_ascii_case("/exit")
}

/// Ask for the password when none was given, and again after a failed attempt.
/// The form keeps the previous value until a new line replaces it.
fn needs_password_prompt(form: &LoginForm, retry: bool) -> bool {
    retry || form.password.trim().is_empty()
}

async fn read_line(lines: &mut InputLines, label: &str) -> anyhow::Result<Option<String>> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{}", label)?;
    stdout.flush()?;
    Ok(lines.next_line().await?)
}

fn print_record(record: &RenderRecord) {
    match record {
        RenderRecord::Placeholder { text } => println!("  ({})", text),
        RenderRecord::Message {
            text,
            sender_label,
            align,
            ..
        } => {
            if let Some(label) = sender_label {
                println!("[{}]", label);
            }
            match align {
                Align::Start => println!("  {}", text),
                Align::End => println!("{:>width$}", text, width = LINE_WIDTH),
            }
        }
    }
}

async fn run_chat(
    config_path: Option<std::path::PathBuf>,
    id: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let (config, _) = chatter_core::config::load_config(config_path)?;
    let server_url = chatter_core::config::resolve_server_url(&config);
    let realtime_url = chatter_core::config::resolve_realtime_url(&config)?;
    let client = LoginClient::new(server_url);
    let store = SessionStore::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let interactive = id.is_none() || password.is_none();
    let mut form = LoginForm::new();
    form.id = id.unwrap_or_default();
    form.password = password.unwrap_or_default();

    let mut retry = false;
    loop {
        if form.id.trim().is_empty() {
            match read_line(&mut lines, "id: ").await? {
                Some(line) => form.id = line,
                None => return Ok(()),
            }
        }
        if needs_password_prompt(&form, retry) {
            match read_line(&mut lines, "password: ").await? {
                Some(line) => form.password = line,
                None => return Ok(()),
            }
        }
        if form.submit(&client, &store).await.is_some() {
            break;
        }
        let error = form.error().unwrap_or(DEFAULT_REJECTED_MESSAGE).to_string();
        if !interactive {
            anyhow::bail!("login failed: {}", error);
        }
        eprintln!("{}", error);
        retry = true;
    }

    let mut view = ChatView::mount(&store, &realtime_url).await?;
    println!(
        "chat room: signed in as {} (type /quit to leave)",
        view.session().name()
    );

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if is_quit(&line) {
                    break;
                }
                if let Err(e) = view.send_text(&line) {
                    log::warn!("send failed: {}", e);
                }
            }
            change = view.next_change() => {
                match change {
                    Some(ListChange::Replaced) => view.render().iter().for_each(print_record),
                    Some(ListChange::Appended(i)) => {
                        if let Some(record) = render_message(view.messages(), i) {
                            print_record(&record);
                        }
                    }
                    None => {
                        eprintln!("connection to the server was lost");
                        break;
                    }
                }
            }
        }
    }

    view.unmount();
    Ok(())
}

async fn run_demo(name: Option<String>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input = name.unwrap_or_default();
    let name = loop {
        match enter_display_name(&input) {
            Ok(name) => break name,
            Err(e) => {
                if !input.is_empty() {
                    eprintln!("{}", e);
                }
                match read_line(&mut lines, "display name: ").await? {
                    Some(line) => input = line,
                    None => return Ok(()),
                }
            }
        }
    };

    let mut chat = LocalChat::new(name);
    println!(
        "demo room: you are {}; {} adds a message from one of {} sample users, /quit leaves",
        chat.name(),
        SAMPLE_COMMAND,
        SAMPLE_USERS.len()
    );
    chat.render().iter().for_each(print_record);

    while let Some(line) = lines.next_line().await? {
        if is_quit(&line) {
            break;
        }
        if line.trim().eq_ignore_ascii_case(SAMPLE_COMMAND) {
            chat.add_sample_message();
        } else if !chat.send_text(&line) {
            continue;
        }
        let last = chat.messages().len() - 1;
        if let Some(record) = render_message(chat.messages(), last) {
            print_record(&record);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_commands_are_case_insensitive() {
        assert!(is_quit("/quit"));
        assert!(is_quit("  /EXIT "));
        assert!(!is_quit("quit"));
    }

    #[test]
    fn cli_parses_chat_flags() {
        let cli = Cli::parse_from(["chatter", "chat", "--id", "u1", "--password", "pw"]);
        let Some(Commands::Chat { id, password, config }) = cli.command else {
            panic!("expected chat command");
        };
        assert_eq!(id.as_deref(), Some("u1"));
        assert_eq!(password.as_deref(), Some("pw"));
        assert!(config.is_none());
    }

    #[test]
    fn failed_login_reprompts_without_clearing_password() {
        let mut form = LoginForm::new();
        assert!(needs_password_prompt(&form, false));

        form.id = "u1".to_string();
        form.password = "wrong".to_string();
        assert!(!needs_password_prompt(&form, false));
        assert!(needs_password_prompt(&form, true));
        assert_eq!(form.password, "wrong");
    }
}
