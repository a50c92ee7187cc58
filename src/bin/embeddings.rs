//! Embeddings command-line tool
//!
//! Derives text or image embeddings from a remote embeddings service and
//! writes the result to stdout as a single JSON object.
//!
//! # Usage
//!
//! ```bash
//! embeddings text "a photograph of a cat"
//! embeddings text notes.txt
//! echo "hello" | embeddings text -
//! embeddings --model s2 image cat.jpg
//! embeddings --client-uri null:// text anything
//! ```

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use embeddings_client::{
    config::{loader, Config},
    new_client, observability, registry, CallContext, EmbeddingsRequest,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

const AFTER_HELP: &str = "\
If the first argument is \"image\" then the body of the image to derive embeddings for is read from the second argument.

If the first argument is \"text\" then the body of the text is determined as follows: with exactly two arguments and a second argument of \"-\" the body is read from STDIN; with exactly two arguments the body is read from the file named by the second argument; with more than two arguments the body is the second to last arguments joined by spaces.";

/// Derive text or image embeddings from an embeddings service.
///
/// Results are written as a JSON-encoded object to STDOUT.
#[derive(Parser)]
#[command(name = "embeddings", version, about, after_help = AFTER_HELP)]
struct Cli {
    /// A registered client URI [default: grpc://localhost:8080]
    #[arg(long)]
    client_uri: Option<String>,

    /// Model used to derive embeddings. Valid options are: s0, s1, s2, blt [default: s0]
    #[arg(long)]
    model: Option<String>,

    /// TOML configuration file (values may be overridden by EMBEDDINGS__* variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the registered client schemes and exit
    #[arg(long)]
    schemes: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// "text" or "image", followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = resolve_config(&cli)?;

    observability::init_tracing(&config.logging);

    if cli.schemes {
        for scheme in registry::schemes() {
            println!("{}", scheme);
        }
        return Ok(());
    }

    if cli.args.len() < 2 {
        warn!("Insufficient arguments");
        Cli::command().print_help()?;
        return Ok(());
    }

    let root = CallContext::new();
    root.cancel_on_shutdown_signal();

    let ctx = match config.client.timeout_secs {
        0 => root.child(),
        secs => root.with_timeout(Duration::from_secs(secs)),
    };

    let client = new_client(&ctx, &config.client.uri)
        .await
        .context("Failed to create new embeddings client")?;

    info!("Using {} with model {}", config.client.uri, config.client.model);

    let embeddings = match cli.args[0].as_str() {
        "text" => {
            let body = read_text_body(&cli.args[1..]).await?;
            let req = EmbeddingsRequest::text(config.client.model.clone(), body);

            client
                .compute_text_embeddings(&ctx, &req)
                .await
                .context("Failed to compute embeddings")?
        }
        "image" => {
            let path = &cli.args[1];
            let body = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read file {}", path))?;
            let req = EmbeddingsRequest::image(path.clone(), config.client.model.clone(), body);

            client
                .compute_image_embeddings(&ctx, &req)
                .await
                .context("Failed to compute embeddings")?
        }
        other => bail!("Invalid mode '{}', expected \"text\" or \"image\"", other),
    };

    let json = serde_json::to_string(&embeddings).context("Failed to encode embeddings")?;
    println!("{}", json);

    Ok(())
}

/// Load file/env configuration, apply command-line overrides, then validate
///
/// Validation runs once on the merged result so a flag can correct a bad
/// file or environment value.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => loader::load_config_with_env(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => loader::load_env_only().context("Failed to load configuration")?,
    };

    if let Some(uri) = &cli.client_uri {
        config.client.uri = uri.clone();
    }
    if let Some(model) = &cli.model {
        config.client.model = model.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.client.timeout_secs = timeout;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Resolve the text body from the arguments following "text"
async fn read_text_body(args: &[String]) -> Result<Vec<u8>> {
    match args {
        [single] if single == "-" => {
            let mut body = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut body)
                .await
                .context("Failed to read STDIN")?;
            Ok(body)
        }
        [single] => tokio::fs::read(single)
            .await
            .with_context(|| format!("Failed to read file {}", single)),
        words => Ok(words.join(" ").into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_trailing_words() {
        let cli = Cli::try_parse_from([
            "embeddings",
            "--model",
            "s1",
            "text",
            "hello",
            "-",
            "world",
        ])
        .unwrap();

        assert_eq!(cli.model.as_deref(), Some("s1"));
        assert_eq!(cli.args, vec!["text", "hello", "-", "world"]);
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_flags_override_before_validation() {
        let file = config_file("[client]\nuri = \"null://local\"\ntimeout_secs = 400\n");
        let path = file.path().display().to_string();

        let cli = Cli::try_parse_from(["embeddings", "--config", path.as_str()]).unwrap();
        assert!(resolve_config(&cli).is_err());

        let cli = Cli::try_parse_from(["embeddings", "--config", path.as_str(), "--timeout", "10"])
            .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.client.timeout_secs, 10);
        assert_eq!(config.client.uri, "null://local");
    }

    #[tokio::test]
    async fn test_text_body_joins_words() {
        let args = vec!["a".to_string(), "photo".to_string(), "of a cat".to_string()];
        let body = read_text_body(&args).await.unwrap();
        assert_eq!(body, b"a photo of a cat");
    }

    #[tokio::test]
    async fn test_text_body_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.txt");
        std::fs::write(&path, "from a file").unwrap();

        let body = read_text_body(&[path.display().to_string()]).await.unwrap();
        assert_eq!(body, b"from a file");
    }
}
