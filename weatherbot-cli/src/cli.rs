use clap::{Args, Parser, Subcommand};
use inquire::{Password, Text};
use std::{path::PathBuf, sync::Arc};
use tracing::error;
use weatherbot_core::{
    Bot, BotOptions, Config, MatrixClient, OpenWeatherProvider, Responder, Settings, SyncState,
    http::build_client,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherbot", version, about = "Matrix bot that answers weather queries")]
pub struct Cli {
    /// Config file; defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to the homeserver and answer queries until Ctrl-C.
    Run(RunArgs),

    /// Interactively write the config file.
    Configure,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// User id of the account to use, e.g. @weatherbot:example.org.
    #[arg(long)]
    pub user: Option<String>,

    /// Url of the homeserver.
    #[arg(long)]
    pub server: Option<String>,

    /// HTTP proxy.
    #[arg(long)]
    pub proxy: Option<String>,

    /// Path to an additional certificate to trust.
    #[arg(long)]
    pub trust: Option<PathBuf>,

    /// Where the sync position is kept between runs.
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Matrix access token.
    #[arg(long, env = "TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// OpenWeatherMap app id.
    #[arg(long, env = "WEATHER_TOKEN", hide_env_values = true)]
    pub weather_token: Option<String>,
}

impl RunArgs {
    fn into_config(self) -> Config {
        Config {
            homeserver: self.server,
            user_id: self.user,
            access_token: self.token,
            weather_token: self.weather_token,
            proxy: self.proxy,
            trust: self.trust,
            state_file: self.state_file,
            ..Config::default()
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Configure => configure(&config_path),
            Command::Run(args) => {
                let settings = Config::load(&config_path)?.merge(args.into_config()).resolve()?;
                run_bot(settings).await
            }
        }
    }
}

fn prompt_keep(label: &str, current: Option<String>) -> anyhow::Result<Option<String>> {
    let mut prompt = Text::new(label).with_help_message("leave empty to keep the current value");
    if let Some(cur) = current.as_deref() {
        prompt = prompt.with_default(cur);
    }
    let answer = prompt.prompt()?;
    Ok(if answer.trim().is_empty() { current } else { Some(answer.trim().to_string()) })
}

fn prompt_secret(label: &str, current: Option<String>) -> anyhow::Result<Option<String>> {
    let answer = Password::new(label)
        .without_confirmation()
        .with_help_message("leave empty to keep the current value")
        .prompt()?;
    Ok(if answer.is_empty() { current } else { Some(answer) })
}

fn configure(path: &std::path::Path) -> anyhow::Result<()> {
    let mut cfg = Config::load(path)?;

    cfg.homeserver = prompt_keep("Homeserver url:", cfg.homeserver.take())?;
    cfg.user_id = prompt_keep("Bot user id (@name:server):", cfg.user_id.take())?;
    cfg.access_token = prompt_secret("Matrix access token:", cfg.access_token.take())?;
    cfg.weather_token = prompt_secret("OpenWeatherMap app id:", cfg.weather_token.take())?;

    cfg.save(path)?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

async fn run_bot(settings: Settings) -> anyhow::Result<()> {
    let request_timeout = settings.sync_timeout * 2 + std::time::Duration::from_secs(30);
    let http = build_client(settings.proxy.as_deref(), settings.trust.as_deref(), request_timeout)?;

    let state = SyncState::load(&settings.state_file)?;
    let matrix = Arc::new(MatrixClient::new(
        http.clone(),
        settings.homeserver.clone(),
        settings.access_token.clone(),
    ));
    let weather = Arc::new(OpenWeatherProvider::new(http, settings.weather_token.clone()));
    let responder = Responder::new(matrix.clone(), weather, settings.stale_after);

    let bot = Bot::new(
        settings.user_id.clone(),
        matrix,
        responder,
        BotOptions::from(&settings),
        state.next_batch,
    );

    bot.run_and_persist(
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        },
        &settings.state_file,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "weatherbot",
            "run",
            "--user",
            "@weatherbot:example.org",
            "--server",
            "https://matrix.example.org",
            "--proxy",
            "http://127.0.0.1:3128",
            "--token",
            "abc",
            "--weather-token",
            "def",
        ])
        .expect("valid args");

        let Command::Run(args) = cli.command else { panic!("expected run") };
        let cfg = args.into_config();
        assert_eq!(cfg.user_id.as_deref(), Some("@weatherbot:example.org"));
        assert_eq!(cfg.homeserver.as_deref(), Some("https://matrix.example.org"));
        assert_eq!(cfg.proxy.as_deref(), Some("http://127.0.0.1:3128"));
        assert_eq!(cfg.access_token.as_deref(), Some("abc"));
        assert_eq!(cfg.weather_token.as_deref(), Some("def"));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["weatherbot", "configure", "--config", "/tmp/wb.toml"])
            .expect("valid args");
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/wb.toml")));
        assert!(matches!(cli.command, Command::Configure));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["weatherbot"]).is_err());
    }
}
