use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use reedline::{DefaultHinter, DefaultPrompt, Reedline, Signal};

use crate::agent::Agent;
use crate::config::Config;
use crate::server;
use crate::tools::registry::get_tools_static;

/// 打印帮助信息
fn print_help() {
    println!("🧳 tripmate - conversational travel assistant");
    println!();
    println!("Usage: tripmate <command> [--config PATH]");
    println!();
    println!("Commands:");
    println!("  serve             Start the HTTP server (default)");
    println!("  chat              Interactive mode, one exchange per line");
    println!("  ask <message>     Run a single exchange and print the reply");
    println!("  onboard           Write a default config file");
    println!("  help              Show this help");
    println!();
    println!("Environment overrides:");
    println!("  OPENAI_API_KEY, OPENAI_MODEL, OPENAI_BASE_URL,");
    println!("  RAPIDAPI_KEY, WEATHERAPI_KEY, TRIPMATE_BIND");
    println!();
    println!("Examples:");
    println!("  tripmate serve --config ./tripmate.toml");
    println!("  tripmate ask \"What's the weather like in Paris?\"");
}

/// 命令行参数：命令、位置参数、可选的配置文件路径
#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    command: Option<String>,
    rest: Vec<String>,
    config_path: Option<PathBuf>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut parsed = Args::default();
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        if arg == "--config" || arg == "-c" {
            let path = iter.next().context("--config requires a path")?;
            parsed.config_path = Some(PathBuf::from(path));
        } else if parsed.command.is_none() {
            parsed.command = Some(arg.to_lowercase());
        } else {
            parsed.rest.push(arg);
        }
    }

    Ok(parsed)
}

fn build_agent(config: &Config) -> Agent {
    server::AppState::from_config(config).agent
}

/// Onboard 命令 - 写入默认配置
fn run_onboard(path: Option<&Path>) -> Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Config::default_path);

    if path.exists() {
        println!("ℹ️  Config already exists: {}", path.display());
        return Ok(());
    }

    Config::default()
        .save(&path)
        .with_context(|| format!("failed to write config file {}", path.display()))?;

    println!("✅ Config written: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Fill in the API keys, or export them as environment variables");
    println!("  2. Run 'tripmate serve' to start the server");

    Ok(())
}

/// Ask 命令 - 单次交换
async fn run_ask(config: Config, message: &str) -> Result<()> {
    if message.trim().is_empty() {
        anyhow::bail!("usage: tripmate ask <message>");
    }

    let agent = build_agent(&config);
    let exchange = agent.chat(message).await?;
    println!("{}", exchange.reply);
    Ok(())
}

/// Chat 命令 - 交互模式，每行都是独立的一次交换
async fn run_chat(config: Config) -> Result<()> {
    let names: Vec<&str> = get_tools_static().iter().map(|t| t.function.name.as_str()).collect();

    println!("🧳 tripmate interactive mode");
    println!("Model: {}", config.agent.model);
    println!("Tools: {}", names.join(", "));
    println!("Each line is answered independently. Type /quit to exit.\n");

    let agent = build_agent(&config);

    let mut line_editor = Reedline::create().with_hinter(Box::new(DefaultHinter::default()));
    let prompt = DefaultPrompt::default();

    loop {
        match line_editor.read_line(&prompt)? {
            Signal::Success(buffer) => {
                let input = buffer.trim();

                if input.is_empty() {
                    continue;
                }

                if matches!(input, "/quit" | "/exit" | "quit" | "exit") {
                    println!("👋 Bye!");
                    break;
                }

                match agent.chat(input).await {
                    Ok(exchange) => println!("🤖 {}\n", exchange.reply),
                    Err(e) => println!("❌ Error: {}\n", e),
                }
            }
            Signal::CtrlD => {
                println!("\n👋 Bye!");
                break;
            }
            Signal::CtrlC => {
                println!("\nType /quit to exit, or keep asking");
            }
        }
    }

    Ok(())
}

/// 主入口函数
pub async fn run_cli() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let command = args.command.as_deref().unwrap_or("serve");

    if matches!(command, "help" | "-h" | "--help" | "h") {
        print_help();
        return Ok(());
    }

    if command == "onboard" {
        return run_onboard(args.config_path.as_deref());
    }

    let config = Config::from_startup(args.config_path.as_deref())?;

    match command {
        "serve" | "s" => server::run(config).await,
        "chat" | "c" => run_chat(config).await,
        "ask" | "a" => run_ask(config, &args.rest.join(" ")).await,
        _ => {
            eprintln!("❌ Unknown command: {}", command);
            eprintln!();
            eprintln!("Run 'tripmate help' for usage");
            std::process::exit(1);
        }
    }
}
