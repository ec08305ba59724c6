mod config;
mod gemini;
mod history;
mod markdown;
mod pipeline;
mod repl;
mod retrieve;
mod session;
#[cfg(test)]
mod testing;

pub const USER_AGENT: &str = concat!("researcher/", env!("CARGO_PKG_VERSION"));

use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::Client;
use tracing::info;

use config::Config;
use gemini::GeminiClient;
use history::HistoryPolicy;
use retrieve::{EnsembleRetriever, SerpApiRetriever, WikipediaRetriever};
use session::{Session, SessionOptions};

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Research assistant: rewrites your question, searches the web and Wikipedia,
/// summarizes the best sources with Gemini, and writes a grounded answer.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also keep answers in the history used to rewrite follow-up questions
    #[arg(long, global = true)]
    remember_answers: bool,

    /// Concurrent summarization calls (1-8)
    #[arg(long, global = true, default_value_t = 4, value_parser = clap::value_parser!(u8).range(1..=8))]
    concurrency: u8,

    /// Weight of web search results in the merge; Wikipedia gets the rest
    #[arg(long, global = true, default_value_t = 0.7)]
    web_weight: f64,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single question and exit
    Ask {
        /// The research question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "researcher=debug"
    } else {
        "researcher=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .init();

    if !(0.0..=1.0).contains(&cli.web_weight) {
        return Err(format!("--web-weight must be within 0..=1, got {}", cli.web_weight).into());
    }

    let config = Config::from_env().inspect_err(|e| tracing::error!("{e}"))?;

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()?;

    let model = GeminiClient::new(http.clone(), config.gemini_api_key, &config.gemini_model);
    let retriever = EnsembleRetriever::new(
        SerpApiRetriever::new(http.clone(), config.serpapi_api_key),
        WikipediaRetriever::new(http),
    )
    .with_weights(cli.web_weight, 1.0 - cli.web_weight);

    let options = SessionOptions {
        history_policy: if cli.remember_answers {
            HistoryPolicy::QuestionsAndAnswers
        } else {
            HistoryPolicy::QuestionsOnly
        },
        summary_concurrency: cli.concurrency.into(),
        ..SessionOptions::default()
    };
    let mut session = Session::new(model, retriever, options);

    info!(model = %config.gemini_model, "research assistant ready");

    match cli.command {
        Some(Command::Ask { question }) => repl::ask_once(&mut session, &question.join(" ")).await?,
        None => repl::run(&mut session).await?,
    }

    Ok(())
}
