mod script;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use canvas::data_path;
use canvas::doc::Element;
use canvas::engine::Action;
use clap::{Args, Parser, Subcommand};
use formstamp::config::{ConfigError, ServiceConfig};
use formstamp::services::http::HttpTemplateService;
use formstamp::services::{ImageUpload, MappingUpdate, RenderRequest, ServiceError, TemplateService};
use formstamp::session::{EditorSession, SessionError};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use script::{ScriptError, ScriptEvent};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("mapping file must hold an element array or an object with `elements` and `pages`")]
    InvalidMapping,
}

#[derive(Parser, Debug)]
#[command(name = "formstamp", about = "Template field mapping CLI")]
struct Cli {
    #[arg(long, env = "FORMSTAMP_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Templates(TemplatesCommand),
    /// Save the page raster of a template.
    Preview {
        template_id: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        output: PathBuf,
    },
    Mapping(MappingCommand),
    Image(ImageCommand),
    /// Render a filled document.
    Render {
        template_id: String,
        #[arg(long, help = "JSON object with the data to stamp")]
        data: PathBuf,
        #[arg(long, help = "JSON element array to use instead of the saved mapping")]
        elements: Option<PathBuf>,
        #[arg(long)]
        output: PathBuf,
    },
    /// Print an example data payload for a template's saved elements.
    Example { template_id: String },
    /// Replay a JSON-lines editing script against a template.
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct TemplatesCommand {
    #[command(subcommand)]
    command: TemplatesSubcommand,
}

#[derive(Subcommand, Debug)]
enum TemplatesSubcommand {
    List,
    Show { template_id: String },
}

#[derive(Args, Debug)]
struct MappingCommand {
    #[command(subcommand)]
    command: MappingSubcommand,
}

#[derive(Subcommand, Debug)]
enum MappingSubcommand {
    Save {
        template_id: String,
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ImageCommand {
    #[command(subcommand)]
    command: ImageSubcommand,
}

#[derive(Subcommand, Debug)]
enum ImageSubcommand {
    Upload { file: PathBuf },
}

#[derive(Args, Debug)]
struct ReplayArgs {
    template_id: String,

    #[arg(long, help = "JSON-lines event script")]
    script: PathBuf,

    #[arg(long, default_value = "600x849", value_parser = script::parse_display, help = "Display size in pixels, WIDTHxHEIGHT")]
    display: script::DisplaySize,

    #[arg(long, default_value_t = false, help = "Save the resulting mapping")]
    save: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ServiceConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    let service = Arc::new(HttpTemplateService::new(&config)?);

    match cli.command {
        Command::Templates(templates) => run_templates(service.as_ref(), templates).await,
        Command::Preview { template_id, page, output } => {
            let bytes = service.page_preview(&template_id, page).await?;
            write_file(&output, &bytes).await
        }
        Command::Mapping(mapping) => run_mapping(service.as_ref(), mapping).await,
        Command::Image(image) => match image.command {
            ImageSubcommand::Upload { file } => {
                let bytes = read_file(&file).await?;
                let uploaded = service.upload_image(ImageUpload::new(bytes, file_name(&file))).await?;
                print_json(&serde_json::to_value(&uploaded)?)?;
                println!("{}", service.image_url(&uploaded.image_path));
                Ok(())
            }
        },
        Command::Render { template_id, data, elements, output } => {
            let data = read_json(&data).await?;
            let mut request = RenderRequest::new(data)?;
            if let Some(path) = elements {
                let elements: Vec<Element> = serde_json::from_value(read_json(&path).await?)?;
                request = request.with_elements(elements);
            }
            let bytes = service.render(&template_id, &request).await?;
            write_file(&output, &bytes).await
        }
        Command::Example { template_id } => {
            let template = service.fetch_template(&template_id).await?;
            print_json(&data_path::example_payload(&template.elements))
        }
        Command::Replay(args) => run_replay(service, args).await,
    }
}

async fn run_templates(service: &impl TemplateService, templates: TemplatesCommand) -> Result<(), CliError> {
    match templates.command {
        TemplatesSubcommand::List => {
            let list = service.list_templates().await?;
            print_json(&serde_json::to_value(&list)?)
        }
        TemplatesSubcommand::Show { template_id } => {
            let template = service.fetch_template(&template_id).await?;
            print_json(&serde_json::to_value(&template)?)
        }
    }
}

async fn run_mapping(service: &impl TemplateService, mapping: MappingCommand) -> Result<(), CliError> {
    match mapping.command {
        MappingSubcommand::Save { template_id, file } => {
            let update = match read_json(&file).await? {
                Value::Array(elements) => {
                    let elements: Vec<Element> = serde_json::from_value(Value::Array(elements))?;
                    let pages = service.fetch_template(&template_id).await?.pages;
                    MappingUpdate { elements, pages }
                }
                value @ Value::Object(_) => serde_json::from_value(value)?,
                _ => return Err(CliError::InvalidMapping),
            };
            service.save_mapping(&template_id, &update).await?;
            println!("saved {} elements", update.elements.len());
            Ok(())
        }
    }
}

async fn run_replay(service: Arc<HttpTemplateService>, args: ReplayArgs) -> Result<(), CliError> {
    let text = tokio::fs::read_to_string(&args.script)
        .await
        .map_err(|source| CliError::Io { path: args.script.clone(), source })?;
    let events = script::parse_script(&text)?;
    let display = args.display;
    let mut session = EditorSession::open(service, &args.template_id, display.width, display.height).await?;

    for (index, event) in events.iter().enumerate() {
        let actions = match event {
            ScriptEvent::Image { file } => {
                let bytes = read_file(file).await?;
                session.upload_image(bytes, file_name(file)).await?
            }
            other => other.apply(session.core_mut()).unwrap_or_default(),
        };
        log_actions(index + 1, &actions);
    }

    if args.save {
        session.save().await?;
    }
    print_json(&serde_json::to_value(session.core().elements())?)
}

fn log_actions(step: usize, actions: &[Action]) {
    for action in actions {
        match action {
            Action::ElementCreated(element) => {
                tracing::info!(step, id = %element.id, kind = element.kind.name(), "element created");
            }
            Action::ElementUpdated(element) => tracing::info!(step, id = %element.id, "element updated"),
            Action::ElementDeleted { id } => tracing::info!(step, id = %id, "element deleted"),
            Action::DataPathRequested => tracing::info!(step, "waiting for a data path"),
            Action::ImageRequested => tracing::info!(step, "waiting for an image"),
            other => tracing::debug!(step, action = ?other, "engine action"),
        }
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    tokio::fs::read(path).await.map_err(|source| CliError::Io { path: path.to_path_buf(), source })
}

async fn read_json(path: &Path) -> Result<Value, CliError> {
    let bytes = read_file(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| CliError::Io { path: path.to_path_buf(), source })?;
    tracing::info!(path = %path.display(), size = bytes.len(), "wrote file");
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(|| "upload".to_owned(), |name| name.to_string_lossy().into_owned())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
