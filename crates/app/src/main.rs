use chrono::Utc;
use clap::{Parser, Subcommand};
use doc_relevance_core::{
    Analyzer, AuthError, CharacterNgramEmbedder, CredentialStore, HttpEmbedderConfig,
    JsonFileStore, ModelSource, UploadedFile, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_HTTP_MODEL,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-relevance", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON file holding users and the current session
    #[arg(long, env = "DOC_RELEVANCE_STORE", default_value = ".doc-relevance/storage.json")]
    store_path: PathBuf,

    /// OpenAI-compatible embeddings endpoint; the local n-gram model is used when unset
    #[arg(long, env = "EMBEDDING_ENDPOINT")]
    embedding_endpoint: Option<String>,

    /// Model name sent to the embeddings endpoint
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_HTTP_MODEL)]
    embedding_model: String,

    /// Bearer token for the embeddings endpoint
    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Vector size of the local n-gram model
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    local_dimensions: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account.
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and start a session.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// End the current session.
    Logout,
    /// Show who is logged in.
    Whoami,
    /// Score a document against a query. Requires a session.
    Analyze {
        /// PDF or plain text document.
        #[arg(long)]
        file: PathBuf,
        /// Free-text query.
        #[arg(long)]
        query: String,
        /// Override the MIME type guessed from the file extension.
        #[arg(long)]
        mime_type: Option<String>,
    },
}

impl Cli {
    fn model_source(&self) -> ModelSource {
        match self
            .embedding_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
        {
            Some(endpoint) => ModelSource::Http(HttpEmbedderConfig {
                endpoint: endpoint.to_string(),
                model: self.embedding_model.clone(),
                api_key: self.embedding_api_key.clone(),
            }),
            None => ModelSource::Local(CharacterNgramEmbedder {
                dimensions: self.local_dimensions,
            }),
        }
    }
}

fn success(message: impl std::fmt::Display) {
    println!("ok: {message}");
}

fn alert(message: impl std::fmt::Display) -> ExitCode {
    eprintln!("error: {message}");
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let credentials = CredentialStore::new(JsonFileStore::new(&cli.store_path));

    info!(
        version = app_version,
        store = %cli.store_path.display(),
        started_at = %Utc::now().to_rfc3339(),
        "doc-relevance boot"
    );

    let model = cli.model_source();

    match cli.command {
        Command::Signup { username, password } => match credentials.signup(&username, &password) {
            Ok(()) => success("Account created successfully!"),
            Err(error @ AuthError::Storage(_)) => return Err(error.into()),
            Err(error) => return Ok(alert(error)),
        },
        Command::Login { username, password } => match credentials.login(&username, &password) {
            Ok(session) => success(format!("Login successful! Welcome, {}", session.username)),
            Err(error @ AuthError::Storage(_)) => return Err(error.into()),
            Err(error) => return Ok(alert(error)),
        },
        Command::Logout => {
            credentials.logout()?;
            success("Logged out");
        }
        Command::Whoami => match credentials.check_session()? {
            Some(session) => println!("{}", session.username),
            None => return Ok(alert(AuthError::NoSession)),
        },
        Command::Analyze {
            file,
            query,
            mime_type,
        } => {
            let session = match credentials.require_session() {
                Ok(session) => session,
                Err(error @ AuthError::Storage(_)) => return Err(error.into()),
                Err(error) => return Ok(alert(format!("{error}; run `login` first"))),
            };

            let mut upload = match UploadedFile::from_path(&file).await {
                Ok(upload) => upload,
                Err(error) => {
                    return Ok(alert(format!(
                        "Error analyzing document: {}: {error}",
                        file.display()
                    )))
                }
            };
            if let Some(mime_type) = mime_type {
                upload.mime_type = mime_type;
            }

            info!(
                user = %session.username,
                file = %file.display(),
                mime = %upload.mime_type,
                "analyzing document"
            );
            println!("Analyzing document...");

            let analyzer = Analyzer::new(model);
            match analyzer.analyze(Some(&upload), &query).await {
                Ok(report) => println!("{}", report.message),
                Err(error) => {
                    warn!(%error, "analysis failed");
                    return Ok(alert(format!("Error analyzing document: {error}")));
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
