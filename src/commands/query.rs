use std::env;
use std::io::{self, IsTerminal};
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, ValueEnum};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use crate::commands::CommandError;
use crate::completion::provider::{api_key_env, api_key_from_env};
use crate::completion::{CompletionClient, PreparedRequest, Provider};
use crate::config::{self, ProfileConfig};
use crate::parse::QueryMode;

/// Options shared by every task subcommand.
#[derive(Debug, Args, Clone, Default)]
pub struct QueryArgs {
    /// Completion provider (openai, ai21).
    #[arg(long)]
    pub provider: Option<String>,
    /// Model name; defaults to the provider's task model.
    #[arg(long)]
    pub model: Option<String>,
    /// Number of sampled completions.
    #[arg(long, short = 'n')]
    pub samples: Option<u32>,
    #[arg(long)]
    pub max_tokens: Option<u32>,
    /// Transport timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Override the provider endpoint base URL.
    #[arg(long)]
    pub base_url: Option<String>,
    /// Profile name from the config file.
    #[arg(long)]
    pub profile: Option<String>,
    /// Aggregate answers across samples, most frequent first.
    #[arg(long)]
    pub most_common: bool,
    /// Keep at most N aggregated entries.
    #[arg(long, value_name = "N", requires = "most_common")]
    pub limit: Option<usize>,
    #[arg(long, value_enum)]
    pub output: Option<OutputMode>,
    /// Shorthand for `--output json`.
    #[arg(long)]
    pub json: bool,
    /// Print the rendered prompt and request without calling the provider.
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long, short = 'v')]
    pub verbose: bool,
    /// Suppress all logging on stderr.
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Effective settings after applying CLI > environment > profile > default.
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: Provider,
    pub model: Option<String>,
    pub samples: Option<u32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<u64>,
    pub base_url: Option<String>,
    pub output: OutputMode,
    pub most_common: bool,
    pub limit: Option<usize>,
    pub dry_run: bool,
}

impl Settings {
    pub fn resolve(args: &QueryArgs) -> Result<Self, CommandError> {
        let profile = match &args.profile {
            Some(name) => config::load_profile(name)?,
            None => ProfileConfig::default(),
        };

        let provider = match args.provider.as_deref() {
            Some(value) => Some(parse_provider("--provider", value)?),
            None => match env_var("LITQ_PROVIDER") {
                Some(value) => Some(parse_provider("LITQ_PROVIDER", &value)?),
                None => profile.provider()?,
            },
        }
        .unwrap_or(Provider::Openai);

        let output = if args.json {
            OutputMode::Json
        } else {
            match (args.output, profile.output.as_deref()) {
                (Some(output), _) => output,
                (None, Some(value)) => OutputMode::parse(value).ok_or_else(|| {
                    CommandError::Usage(format!(
                        "Invalid profile output '{value}'. Supported values: text, json."
                    ))
                })?,
                (None, None) => OutputMode::Text,
            }
        };

        Ok(Self {
            provider,
            model: args
                .model
                .clone()
                .or_else(|| env_var("LITQ_MODEL"))
                .or(profile.model),
            samples: pick(args.samples, "LITQ_SAMPLES", profile.samples)?,
            max_tokens: pick(args.max_tokens, "LITQ_MAX_TOKENS", profile.max_tokens)?,
            timeout: pick(args.timeout, "LITQ_TIMEOUT", profile.timeout)?,
            base_url: args.base_url.clone().or(profile.base_url),
            output,
            most_common: args.most_common,
            limit: args.limit,
            dry_run: args.dry_run,
        })
    }

    /// Builds the client. A dry run does not need a credential.
    pub fn client(&self) -> Result<CompletionClient, CommandError> {
        let api_key = api_key_from_env(self.provider);
        tracing::debug!(
            provider = self.provider.as_str(),
            api_key_present = api_key.is_some(),
            dry_run = self.dry_run,
            "resolved settings"
        );
        let api_key = match api_key {
            Some(key) => key,
            None if self.dry_run => String::new(),
            None => {
                return Err(CommandError::Usage(format!(
                    "{} is not set in the environment",
                    api_key_env(self.provider)
                )));
            }
        };

        let model = self
            .model
            .clone()
            .unwrap_or_else(|| self.provider.task_default_model().to_string());
        let mut client = CompletionClient::new(self.provider, api_key).with_model(model);
        if let Some(samples) = self.samples {
            client = client.with_samples(samples);
        }
        if let Some(max_tokens) = self.max_tokens {
            client = client.with_max_tokens(max_tokens);
        }
        if let Some(base_url) = &self.base_url {
            client = client.with_base_url(base_url.clone());
        }
        if let Some(timeout) = self.timeout {
            client = client.with_timeout(Duration::from_secs(timeout));
        }
        Ok(client)
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_provider(source: &str, value: &str) -> Result<Provider, CommandError> {
    Provider::parse(value).ok_or_else(|| {
        CommandError::Usage(format!(
            "Invalid {source} '{value}'. Supported values: {}.",
            Provider::supported()
        ))
    })
}

fn pick<T: FromStr>(
    cli: Option<T>,
    key: &str,
    profile: Option<T>,
) -> Result<Option<T>, CommandError> {
    if cli.is_some() {
        return Ok(cli);
    }
    match env_var(key) {
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            CommandError::Usage(format!("Invalid {key} '{raw}': expected a positive integer."))
        }),
        None => Ok(profile),
    }
}

/// Installs the stderr subscriber. `--quiet` wins over `--verbose`;
/// otherwise `RUST_LOG` applies, defaulting to warnings.
pub fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else if verbose {
        EnvFilter::new("litquery=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

/// Returns the positional text, or stdin when none was given.
pub fn read_input(text: Option<String>) -> Result<String, CommandError> {
    if let Some(text) = text.filter(|text| !text.trim().is_empty()) {
        return Ok(text);
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(CommandError::Usage(
            "No text provided. Pass TEXT or pipe it on stdin.".to_string(),
        ));
    }
    let text = io::read_to_string(stdin).map_err(CommandError::Stdin)?;
    if text.trim().is_empty() {
        return Err(CommandError::Usage(
            "No text provided. Pass TEXT or pipe it on stdin.".to_string(),
        ));
    }
    Ok(text)
}

/// Prints the request a task would send.
pub fn print_dry_run(
    settings: &Settings,
    task: &str,
    prompt: &str,
    mode: QueryMode,
    client: &CompletionClient,
) -> Result<(), CommandError> {
    let PreparedRequest {
        provider,
        model,
        url,
        body,
    } = client.prepare(mode.request(prompt))?;
    let report = json!({
        "dry_run": true,
        "task": task,
        "provider": provider,
        "model": model,
        "url": url,
        "prompt": prompt,
        "request": body,
        "output": settings.output,
        "most_common": settings.most_common,
    });
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

/// Prints task results: one JSON document, or a heading and one line per
/// entry.
pub fn print_results<T: Serialize>(
    settings: &Settings,
    client: &CompletionClient,
    task: &str,
    results: &T,
    lines: Vec<String>,
) -> Result<(), CommandError> {
    match settings.output {
        OutputMode::Json => {
            let report = json!({
                "task": task,
                "provider": client.provider(),
                "model": client.model(),
                "most_common": settings.most_common,
                "results": serde_json::to_value(results)?,
            });
            println!("{}", serde_json::to_string(&report)?);
        }
        OutputMode::Text => {
            let heading = format!("== {} ==", task.to_uppercase());
            println!(
                "{}",
                heading.if_supports_color(Stream::Stdout, |text| text.bold())
            );
            for line in lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

/// Renders a value for text output: strings bare, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
