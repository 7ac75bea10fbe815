use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use direktiv_hooks::api::ApiClient;
use direktiv_hooks::config::{validate_namespace, Config};
use direktiv_hooks::resource::{
    extract_json_value, get_all_resource_keys, get_resource, Identity, Mode, ResourceChannel, ResourceState,
};
use direktiv_hooks::VERSION;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command line client for Direktiv
#[derive(Parser, Debug)]
#[command(name = "direktiv-hooks", version, about, long_about = None)]
struct Args {
    /// API root, e.g. http://localhost:8080/api/
    #[arg(short, long)]
    url: Option<String>,

    /// Namespace to use
    #[arg(short, long)]
    namespace: Option<String>,

    /// API key sent with every request
    #[arg(long)]
    apikey: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Block all write operations
    #[arg(long)]
    readonly: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the resources that can be listed or watched
    Resources,
    /// Fetch a resource once and print it
    List(Target),
    /// Follow a resource live until Ctrl-C
    Watch(Target),
    /// Create or delete namespaces
    Namespace {
        #[command(subcommand)]
        action: NamespaceAction,
    },
    /// Create, update or execute workflows
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },
    /// Remember settings for later runs
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
struct Target {
    /// Resource key (see `resources`)
    resource: String,

    /// Path variables, e.g. --var instance=<id> --var path=dir/wf.yaml
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Raw query tokens, e.g. --param first=10
    #[arg(long = "param")]
    params: Vec<String>,

    /// Dot-notation fields to print as columns, e.g. --field node.name
    #[arg(long = "field")]
    fields: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum NamespaceAction {
    Create { name: String },
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum WorkflowAction {
    Create {
        path: String,
        #[arg(long)]
        file: PathBuf,
    },
    Update {
        path: String,
        #[arg(long)]
        file: PathBuf,
    },
    Execute {
        path: String,
        /// JSON input file
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    SetUrl { url: String },
    SetNamespace { namespace: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn parse_var(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("direktiv-hooks {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("direktiv-hooks").join("direktiv-hooks.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".direktiv-hooks").join("direktiv-hooks.log");
    }
    PathBuf::from("direktiv-hooks.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let mut config = Config::load();

    if let Command::Config { action } = &args.command {
        return match action {
            ConfigAction::SetUrl { url } => config.set_url(url).context("Failed to save config"),
            ConfigAction::SetNamespace { namespace } => {
                if !validate_namespace(namespace) {
                    bail!("Invalid namespace name: {}", namespace);
                }
                config.set_namespace(namespace).context("Failed to save config")
            },
        };
    }

    if let Command::Resources = &args.command {
        for key in get_all_resource_keys() {
            if let Some(def) = get_resource(key) {
                println!("{:<32}{}", key, def.display_name);
            }
        }
        return Ok(());
    }

    // Flags win over the config file, which wins over the environment
    if args.url.is_some() {
        config.url = args.url.clone();
    }
    if args.namespace.is_some() {
        config.namespace = args.namespace.clone();
    }
    if args.apikey.is_some() {
        config.apikey = args.apikey.clone();
    }

    let client_config = config.client_config().context("No usable API URL")?;
    let client = ApiClient::new(&client_config).context("Failed to create API client")?;
    tracing::info!("Using API at {}", client.base_url());

    match args.command {
        Command::List(target) => list(client, &config, &target).await,
        Command::Watch(target) => watch(client, &config, &target).await,
        Command::Namespace { action } => {
            ensure_writable(args.readonly)?;
            match action {
                NamespaceAction::Create { name } => {
                    client.create_namespace(&name).await?;
                    println!("Namespace {} created", name);
                },
                NamespaceAction::Delete { name } => {
                    client.delete_namespace(&name).await?;
                    println!("Namespace {} deleted", name);
                },
            }
            Ok(())
        },
        Command::Workflow { action } => {
            let namespace = require_namespace(&config)?;
            workflow(&client, &namespace, action, args.readonly).await
        },
        Command::Resources | Command::Config { .. } => Ok(()),
    }
}

fn ensure_writable(readonly: bool) -> Result<()> {
    if readonly {
        bail!("Write operations are disabled in read-only mode");
    }
    Ok(())
}

fn require_namespace(config: &Config) -> Result<String> {
    config
        .effective_namespace()
        .context("No namespace configured. Set DIREKTIV_NAMESPACE or use --namespace")
}

fn identity_for(config: &Config, target: &Target) -> Identity {
    let mut identity = Identity::new();
    if let Some(namespace) = config.effective_namespace() {
        identity = identity.with("namespace", &namespace);
    }
    for (name, value) in &target.vars {
        identity = identity.with(name, value);
    }
    identity
}

async fn list(client: ApiClient, config: &Config, target: &Target) -> Result<()> {
    let mut channel = ResourceChannel::for_key(client, &target.resource)?;
    channel
        .bind(identity_for(config, target), target.params.clone(), Mode::Polled)
        .await
        .with_context(|| format!("Failed to fetch {}", target.resource))?;

    print_state(&channel.state(), &target.fields);
    Ok(())
}

async fn watch(client: ApiClient, config: &Config, target: &Target) -> Result<()> {
    let mut channel = ResourceChannel::for_key(client, &target.resource)?;
    channel
        .bind(identity_for(config, target), target.params.clone(), Mode::Streaming)
        .await?;

    let mut updates = channel.watch();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                print_state(&state, &target.fields);

                if let Some(err) = state.error {
                    if !channel.is_streaming() {
                        bail!("{}: {}", target.resource, err);
                    }
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, closing subscription");
                break;
            }
        }
    }

    channel.close();
    Ok(())
}

fn print_state(state: &ResourceState, fields: &[String]) {
    if let Some(err) = &state.error {
        eprintln!("error: {}", err);
    }
    let Some(data) = &state.data else {
        return;
    };

    for value in data.values() {
        if fields.is_empty() {
            println!("{}", value);
        } else {
            let columns: Vec<String> = fields.iter().map(|f| extract_json_value(value, f)).collect();
            println!("{}", columns.join("\t"));
        }
    }
    if let Some(total) = state.total_count {
        eprintln!("({} total)", total);
    }
}

fn read_yaml(file: &Path) -> Result<String> {
    let yaml = std::fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    serde_yaml::from_str::<serde_yaml::Value>(&yaml).with_context(|| format!("{:?} is not valid YAML", file))?;
    Ok(yaml)
}

async fn workflow(client: &ApiClient, namespace: &str, action: WorkflowAction, readonly: bool) -> Result<()> {
    match action {
        WorkflowAction::Create { path, file } => {
            ensure_writable(readonly)?;
            let yaml = read_yaml(&file)?;
            let (dir, name) = path.trim_matches('/').rsplit_once('/').unwrap_or(("", path.as_str()));
            client.create_workflow(namespace, dir, name, &yaml).await?;
            println!("Workflow {} created", path);
        },
        WorkflowAction::Update { path, file } => {
            ensure_writable(readonly)?;
            let yaml = read_yaml(&file)?;
            client.update_workflow(namespace, &path, &yaml).await?;
            println!("Workflow {} updated", path);
        },
        WorkflowAction::Execute { path, input } => {
            ensure_writable(readonly)?;
            let input = match input {
                Some(file) => {
                    let content = std::fs::read_to_string(&file).with_context(|| format!("Failed to read {:?}", file))?;
                    serde_json::from_str::<serde_json::Value>(&content)
                        .with_context(|| format!("{:?} is not valid JSON", file))?;
                    content
                },
                None => "{}".to_string(),
            };
            let instance = client.execute_workflow(namespace, &path, &input).await?;
            println!("{}", instance);
        },
    }
    Ok(())
}
