use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use activity_upload::{
    select, NamedFile, NoMatchPolicy, Selection, StatusSink, SubmitHandler, SubmitOutcome,
    Transport, UploadConfig, UploadError, UploadPayload,
};
use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use reqwest::blocking::{multipart, Client as HttpClient};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(author, version, about = "Find an activities export and upload it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show which file would be uploaded from the given directories/files
    Locate(LocateArgs),
    /// Upload the target file to the server's upload endpoint
    Upload(UploadArgs),
}

#[derive(Parser, Debug)]
struct LocateArgs {
    /// Directories or files to search
    #[arg(required = true, value_hint = ValueHint::AnyPath)]
    inputs: Vec<PathBuf>,

    /// Exact filename to look for
    #[arg(long)]
    target: Option<String>,

    /// Optional JSON/TOML upload config
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct UploadArgs {
    /// Directories or files to search
    #[arg(required = true, value_hint = ValueHint::AnyPath)]
    inputs: Vec<PathBuf>,

    /// Server base URL, e.g. http://127.0.0.1:5000
    #[arg(long, default_value = "http://127.0.0.1:5000", value_hint = ValueHint::Url)]
    server: String,

    /// Exact filename to look for
    #[arg(long)]
    target: Option<String>,

    /// Optional JSON/TOML upload config
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Skip the request when no file matches instead of posting an empty form
    #[arg(long, action = ArgAction::SetTrue)]
    report_missing: bool,

    /// Request timeout in seconds (0 disables)
    #[arg(long, default_value_t = 0)]
    timeout: u64,

    /// Verbose logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Clone, Debug)]
struct DiskFile {
    path: PathBuf,
    name: String,
    /// Multipart filename: the path below the input's parent, `/`-separated,
    /// e.g. `export/activities.csv` for a chosen `export` folder.
    upload_name: String,
}

impl DiskFile {
    fn new(path: &Path, base: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let rel = path.strip_prefix(base).unwrap_or(path);
        let upload_name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Self {
            path: path.to_path_buf(),
            name,
            upload_name,
        }
    }
}

impl NamedFile for DiskFile {
    fn file_name(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Default)]
struct Collected {
    files: Vec<DiskFile>,
    /// Entries the walk could not read; their files are not candidates.
    unreadable: Vec<String>,
}

/// Mirrors a directory picker: every regular file below each input, in path
/// order, named relative to the input's parent the way browsers report
/// `webkitRelativePath`.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Collected> {
    let mut out = Collected::default();
    for input in inputs {
        let input = std::fs::canonicalize(input)
            .with_context(|| format!("cannot read {}", input.display()))?;
        let base = input.parent().unwrap_or(&input).to_path_buf();
        if !input.is_dir() {
            out.files.push(DiskFile::new(&input, &base));
            continue;
        }
        for ent in WalkDir::new(&input).follow_links(true).sort_by_file_name() {
            match ent {
                Ok(ent) if ent.file_type().is_file() => {
                    out.files.push(DiskFile::new(ent.path(), &base));
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry");
                    out.unreadable.push(err.to_string());
                }
            }
        }
    }
    debug!(
        count = out.files.len(),
        unreadable = out.unreadable.len(),
        "collected candidate files"
    );
    Ok(out)
}

fn load_config(path: Option<&Path>, target: Option<&str>) -> Result<UploadConfig> {
    let mut cfg = match path {
        Some(p) => UploadConfig::load(p).with_context(|| format!("loading {}", p.display()))?,
        None => UploadConfig::default(),
    };
    if let Some(t) = target {
        cfg.target_filename = t.to_string();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn join_url(server: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        server.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

struct HttpTransport {
    client: HttpClient,
    server: String,
}

impl HttpTransport {
    fn new(server: &str, timeout_s: u64) -> Result<Self> {
        let mut builder = HttpClient::builder();
        if timeout_s > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_s));
        }
        let client = builder.build().context("building HTTP client")?;
        Ok(Self {
            client,
            server: server.to_string(),
        })
    }

    fn post(&self, url: &str, payload: UploadPayload<DiskFile>) -> Result<String, UploadError> {
        let field = payload.field_name().to_string();
        // Browsers send the filename unescaped; the server splits it on `/`.
        let form = multipart::Form::new().percent_encode_noop();
        let form = match payload.into_entry() {
            Some(file) => {
                let part = multipart::Part::file(&file.path)
                    .map_err(|e| UploadError::Io(format!("{}: {e}", file.path.display())))?
                    .file_name(file.upload_name);
                form.part(field, part)
            }
            None => form,
        };
        let resp = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .map_err(|e| UploadError::Network(e.to_string()))?;
        debug!(status = %resp.status(), "upload endpoint replied");
        resp.text().map_err(|e| UploadError::Network(e.to_string()))
    }
}

impl Transport<DiskFile> for HttpTransport {
    fn send(
        &self,
        endpoint: &str,
        payload: UploadPayload<DiskFile>,
    ) -> LocalBoxFuture<'static, Result<String, UploadError>> {
        let url = join_url(&self.server, endpoint);
        info!(url = %url, entries = payload.len(), "posting upload");
        future::ready(self.post(&url, payload)).boxed_local()
    }
}

struct StdoutSink;

impl StatusSink for StdoutSink {
    fn show(&self, text: &str) {
        println!("{text}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Locate(args) => args.verbose,
        Command::Upload(args) => args.verbose,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Locate(args) => handle_locate(args),
        Command::Upload(args) => handle_upload(args),
    }
}

fn handle_locate(args: LocateArgs) -> Result<()> {
    let cfg = load_config(args.config.as_deref(), args.target.as_deref())?;
    let collected = collect_inputs(&args.inputs)?;
    match select(&collected.files, &cfg.target_filename) {
        Selection::Found { index, file } => {
            println!("{}\t{}", file.path.display(), file.upload_name);
            info!(index, total = collected.files.len(), "target located");
            Ok(())
        }
        Selection::NotFound { scanned } => Err(anyhow!(
            "'{}' not found among {scanned} file(s), {} unreadable entries skipped",
            cfg.target_filename,
            collected.unreadable.len()
        )),
    }
}

fn handle_upload(args: UploadArgs) -> Result<()> {
    let mut cfg = load_config(args.config.as_deref(), args.target.as_deref())?;
    if args.report_missing {
        cfg.no_match = NoMatchPolicy::Report;
    }
    let files = collect_inputs(&args.inputs)?.files;
    let transport = HttpTransport::new(&args.server, args.timeout)?;
    let handler = SubmitHandler::new(cfg, transport, StdoutSink);

    match futures::executor::block_on(handler.submit(&files)) {
        SubmitOutcome::Displayed(resp) => {
            if let Some(name) = resp.file_name {
                debug!(file = %name, "server stored file");
            }
            Ok(())
        }
        SubmitOutcome::Failed(err) => Err(err).context("upload failed"),
        SubmitOutcome::Rejected(err) => Err(err).context("nothing uploaded"),
    }
}
