//! supabase-fs - command-line access to a Supabase Storage bucket

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use supabase_fs::{AdapterConfig, PublicFlag, SupabaseAdapter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prefix of variables overriding config file entries, e.g.
/// `SUPABASE_FS_SIGNED_URL_EXPIRES`. Plain `SUPABASE_URL` is the project
/// endpoint and must not land on the URL base.
const ENV_PREFIX: &str = "SUPABASE_FS";

#[derive(Parser, Debug)]
#[command(name = "supabase-fs")]
#[command(about = "Filesystem-style access to a Supabase Storage bucket")]
#[command(version)]
struct Args {
    /// Project endpoint, e.g. https://xyz.supabase.co
    #[arg(long, env = "SUPABASE_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Bucket to operate on
    #[arg(short, long, env = "SUPABASE_BUCKET", global = true)]
    bucket: Option<String>,

    /// API key
    #[arg(short, long, env = "SUPABASE_KEY", hide_env_values = true, global = true)]
    key: Option<String>,

    /// Base for generated URLs (CDN or custom domain)
    #[arg(long, env = "SUPABASE_PUBLIC_URL", global = true)]
    url: Option<String>,

    /// Treat the bucket as private
    #[arg(long, global = true)]
    private: bool,

    /// Config file (TOML, JSON or YAML); SUPABASE_FS_* variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "SUPABASE_FS_DEBUG", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List entries under a prefix
    Ls {
        #[arg(default_value = "")]
        path: String,
        /// Recurse into directories
        #[arg(short = 'R', long)]
        deep: bool,
        /// Show kind, size and modification time
        #[arg(short, long)]
        long: bool,
    },
    /// Print an object to stdout
    Cat { path: String },
    /// Upload a local file
    Put {
        local: PathBuf,
        remote: String,
        /// Content type, sniffed when omitted
        #[arg(long)]
        content_type: Option<String>,
        /// Cache-Control header value
        #[arg(long, default_value = "3600")]
        cache_control: String,
    },
    /// Delete an object
    Rm { path: String },
    /// Delete everything under a prefix
    Rmdir { path: String },
    /// Create an empty directory
    Mkdir { path: String },
    /// Move an object
    Mv { from: String, to: String },
    /// Copy an object
    Cp { from: String, to: String },
    /// Show object attributes as JSON
    Stat { path: String },
    /// Generate a URL for an object
    Url {
        path: String,
        /// Request a signed URL
        #[arg(long, conflicts_with = "public")]
        signed: bool,
        /// Build a public URL
        #[arg(long)]
        public: bool,
        /// Signed URL lifetime in seconds
        #[arg(long)]
        expires: Option<u64>,
        /// Serve the object as an attachment
        #[arg(long)]
        download: bool,
    },
    /// Check whether a file (or with --dir, a directory) exists
    Exists {
        path: String,
        #[arg(long)]
        dir: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("supabase_fs={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let adapter_config = load_config(&args, config::Environment::with_prefix(ENV_PREFIX))?;
    let adapter = SupabaseAdapter::new(adapter_config)?;
    tracing::debug!(bucket = adapter.bucket(), "adapter ready");

    let mut stdout = tokio::io::stdout();
    commands::run(&adapter, args.command, &mut stdout).await
}

/// Merge the config file, `SUPABASE_FS_*` variables and command-line flags,
/// later sources winning.
fn load_config(args: &Args, environment: config::Environment) -> anyhow::Result<AdapterConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = &args.config {
        builder = builder.add_source(config::File::from(path.as_path()));
    }

    let mut adapter_config: AdapterConfig = builder
        .add_source(environment.try_parsing(true))
        .build()?
        .try_deserialize()?;

    if let Some(endpoint) = &args.endpoint {
        adapter_config.endpoint = Some(endpoint.clone());
    }
    if let Some(bucket) = &args.bucket {
        adapter_config.bucket = Some(bucket.clone());
    }
    if let Some(key) = &args.key {
        adapter_config.key = Some(key.clone());
    }
    if let Some(url) = &args.url {
        adapter_config.url = Some(url.clone());
    }
    if args.private {
        adapter_config.public = Some(PublicFlag::Bool(false));
    }

    Ok(adapter_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use supabase_fs::{ListingErrorPolicy, Settings, UrlGeneration};

    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let vars = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(vars))
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn args_with_config(file: &tempfile::NamedTempFile, extra: &[&str]) -> Args {
        let path = file.path().to_string_lossy().to_string();
        let mut argv = vec!["supabase-fs", "--config", path.as_str()];
        argv.extend_from_slice(extra);
        argv.push("ls");
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_put() {
        let args = Args::try_parse_from([
            "supabase-fs",
            "--bucket",
            "media",
            "put",
            "./a.png",
            "images/a.png",
            "--content-type",
            "image/png",
        ])
        .unwrap();

        assert_eq!(args.bucket.as_deref(), Some("media"));
        match args.command {
            Command::Put {
                local,
                remote,
                content_type,
                cache_control,
            } => {
                assert_eq!(local, PathBuf::from("./a.png"));
                assert_eq!(remote, "images/a.png");
                assert_eq!(content_type.as_deref(), Some("image/png"));
                assert_eq!(cache_control, "3600");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_url_flags_conflict() {
        let result =
            Args::try_parse_from(["supabase-fs", "url", "a.jpg", "--signed", "--public"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let file = config_file(
            r#"
endpoint = "https://file.example.com"
bucket = "from-file"
key = "file-key"
signed_url_expires = 60
"#,
        );
        let args = args_with_config(&file, &["--bucket", "from-flag", "--private"]);

        let config = load_config(&args, environment(&[])).unwrap();
        assert_eq!(config.bucket.as_deref(), Some("from-flag"));
        assert_eq!(config.signed_url_expires, Some(60));
        assert_eq!(config.public, Some(PublicFlag::Bool(false)));
    }

    #[test]
    fn test_camel_case_config_file() {
        let file = config_file(
            r#"
endpoint = "https://file.example.com"
bucket = "media"
key = "file-key"
signedUrlExpires = 60
defaultUrlGeneration = "signed"
listingErrorPolicy = "fail"
userAgent = "backup-job/2.0"

[defaultUrlGenerationOptions]
expiresIn = 30
download = true
"#,
        );
        let args = args_with_config(&file, &[]);

        let config = load_config(&args, environment(&[])).unwrap();
        assert_eq!(config.signed_url_expires, Some(60));
        assert_eq!(config.default_url_generation.as_deref(), Some("signed"));
        assert_eq!(config.listing_error_policy, ListingErrorPolicy::Fail);
        assert_eq!(config.default_url_generation_options.expires_in, Some(30));

        let settings = Settings::from_config(config).unwrap();
        assert_eq!(settings.url_generation, UrlGeneration::Signed);
        assert_eq!(settings.user_agent, "backup-job/2.0");
        assert!(settings.url_options.download);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = config_file(
            r#"
endpoint = "https://file.example.com"
bucket = "media"
key = "file-key"
signedUrlExpires = 60
"#,
        );
        let args = args_with_config(&file, &[]);
        let env = environment(&[
            ("SUPABASE_FS_SIGNED_URL_EXPIRES", "90"),
            ("SUPABASE_FS_LISTING_ERROR_POLICY", "fail"),
            ("SUPABASE_URL", "https://xyz.supabase.co"),
        ]);

        let config = load_config(&args, env).unwrap();
        assert_eq!(config.signed_url_expires, Some(90));
        assert_eq!(config.listing_error_policy, ListingErrorPolicy::Fail);
        // the project URL is not the URL base override
        assert_eq!(config.url, None);
    }
}
