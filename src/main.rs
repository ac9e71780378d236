use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use examina::config::{RateLimit, ServerConfig};
use examina::extract::resolve_count;
use examina::generate::{DEFAULT_MODEL, GeminiClient, GeminiConfig, LanguageModel, generate_topic_quiz};
use examina::protocol::DEFAULT_PORT;
use examina::{Question, Quiz, QuizError, load_questions_from_json, questions_from_paper};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract questions from a PDF paper and print them as JSON
    Extract {
        /// PDF question paper
        paper: PathBuf,

        /// Number of questions to return; missing or 0 means 2
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Take a quiz in the terminal
    Take {
        #[command(flatten)]
        source: QuizSource,

        /// Number of questions for paper and topic quizzes
        #[arg(short = 'n', long)]
        count: Option<usize>,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Serve chat, quizzes and scores over WebSocket
    Serve {
        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Question requests allowed per client address and window
        #[arg(long, env = "QUESTION_RATE_LIMIT", default_value_t = 100)]
        rate_limit: u32,

        /// Length of the rate limit window in seconds
        #[arg(long, env = "QUESTION_RATE_WINDOW_SECS", default_value_t = 900)]
        rate_window_secs: u64,

        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct QuizSource {
    /// PDF question paper to extract the quiz from
    #[arg(long)]
    paper: Option<PathBuf>,

    /// JSON file with prepared questions
    #[arg(long)]
    questions: Option<PathBuf>,

    /// Topic to generate a quiz about
    #[arg(long)]
    topic: Option<String>,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Gemini API key; without one topic quizzes are mocked
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
}

impl ModelArgs {
    fn gemini_config(&self) -> Option<GeminiConfig> {
        let api_key = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let mut config = GeminiConfig::new(api_key);
        config.model = self.model.clone();
        Some(config)
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), QuizError> {
    match command {
        Command::Extract { paper, count } => {
            init_tracing();
            let questions = questions_from_paper(&paper, resolve_count(count))?;
            let output = json!({ "questions": questions });
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            Ok(())
        }
        Command::Take {
            source,
            count,
            model,
        } => {
            let (title, questions) = load_quiz(source, resolve_count(count), &model).await?;
            if let Some(percentage) = Quiz::new(title, questions).run()? {
                println!("Score: {:.0}%", percentage);
            }
            Ok(())
        }
        Command::Serve {
            port,
            rate_limit,
            rate_window_secs,
            model,
        } => {
            init_tracing();
            let config = ServerConfig {
                port,
                gemini: model.gemini_config(),
                question_limit: RateLimit {
                    max_requests: rate_limit,
                    window: Duration::from_secs(rate_window_secs),
                },
            };
            examina::server::run(config).await
        }
    }
}

async fn load_quiz(
    source: QuizSource,
    count: usize,
    model: &ModelArgs,
) -> Result<(String, Vec<Question>), QuizError> {
    if let Some(paper) = source.paper {
        let title = paper
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Paper".to_string());
        return Ok((title, questions_from_paper(&paper, count)?));
    }

    if let Some(path) = source.questions {
        return Ok(("Quiz".to_string(), load_questions_from_json(path)?));
    }

    let topic = source.topic.unwrap_or_default();
    let client = model.gemini_config().map(GeminiClient::new).transpose()?;
    let questions = generate_topic_quiz(
        client.as_ref().map(|c| c as &dyn LanguageModel),
        &topic,
        count,
    )
    .await?;
    Ok((topic, questions))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use examina::extract::DEFAULT_QUESTION_COUNT;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_count_defaults_like_take() {
        for args in [vec!["examina", "extract", "paper.pdf", "-n", "0"], vec!["examina", "extract", "paper.pdf"]] {
            match Cli::try_parse_from(args).unwrap().command {
                Command::Extract { count, .. } => assert_eq!(resolve_count(count), DEFAULT_QUESTION_COUNT),
                other => panic!("unexpected {:?}", other),
            }
        }

        match Cli::try_parse_from(["examina", "extract", "paper.pdf", "--count", "5"]).unwrap().command {
            Command::Extract { count, .. } => assert_eq!(resolve_count(count), 5),
            other => panic!("unexpected {:?}", other),
        }
    }
}
