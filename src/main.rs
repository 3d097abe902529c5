//! comfy-notes CLI - translate the Note nodes of a ComfyUI workflow.

use anyhow::{Context, Result};
use clap::Parser;
use comfy_notes::config::{BackendKind, Config, ConfigStatus};
use comfy_notes::console::Console;
use comfy_notes::pipeline::process_workflow;
use comfy_notes::translator::{create_backend, language_name};
use std::path::{Path, PathBuf};

/// Translate the notes of a ComfyUI workflow file.
#[derive(Parser, Debug)]
#[command(name = "comfy-notes")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Workflow .json file. Asked for interactively if omitted.
    input: Option<PathBuf>,

    /// Translation backend: google or ai. Asked for interactively if omitted.
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Source language code, or "auto" (overrides the config file).
    #[arg(long)]
    source: Option<String>,

    /// Target language code (overrides the config file).
    #[arg(long)]
    target: Option<String>,

    /// Use this config file instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let console = Console::new();

    console.section("comfy-notes - ComfyUI Note Translator");

    // Load configuration
    console.step("Loading configuration...");
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let loaded = Config::load_from(&config_path).context("Failed to load configuration")?;
    match loaded.status {
        ConfigStatus::Created => console.warning(&format!(
            "Created a default config at {}. Edit it to set your API key and languages.",
            config_path.display()
        )),
        ConfigStatus::Patched => console.info(&format!(
            "Added missing default keys to {}",
            config_path.display()
        )),
        ConfigStatus::Unchanged => {}
    }

    let mut config = loaded.config;
    if let Some(source) = args.source {
        config.languages.source = source;
    }
    if let Some(target) = args.target {
        config.languages.target = target;
    }
    config.validate().context("Invalid configuration")?;
    console.success("Configuration loaded");

    let input = match args.input {
        Some(path) => path,
        None => PathBuf::from(
            console
                .ask("Path of the ComfyUI .json workflow:")
                .context("Failed to read input path")?,
        ),
    };
    check_input(&input, &console)?;

    let backend_kind = match args.backend {
        Some(kind) => kind,
        None => ask_backend(config.translation.backend, &console)?,
    };
    let Some(backend_kind) = confirm_backend(backend_kind, &config, &console)? else {
        console.info(&format!(
            "Translation cancelled. Set api.key in {} to use the AI backend.",
            config_path.display()
        ));
        return Ok(());
    };

    match backend_kind {
        BackendKind::Ai => console.info(&format!("Using AI model {}", config.api.model)),
        BackendKind::Google => console.info("Using Google Translate"),
    }
    console.info(&format!(
        "Target language: {}",
        language_name(&config.languages.target)
    ));

    let backend = create_backend(backend_kind, &config, &console)
        .context("Failed to set up translation backend")?;

    process_workflow(&input, backend.as_ref(), &config.languages, &console)
        .await
        .with_context(|| format!("Failed to process {}", input.display()))?;

    console.section("Done!");
    Ok(())
}

/// Rejects a missing input file and warns about an unexpected extension.
fn check_input(input: &Path, console: &Console) -> Result<()> {
    let is_json = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        console.warning("The file does not have a .json extension, trying anyway");
    }

    if !input.exists() {
        anyhow::bail!("Input file '{}' does not exist", input.display());
    }

    Ok(())
}

/// Asks which backend to use until a valid answer is given.
///
/// Pressing Enter picks `default`, the `translation.backend` config value.
fn ask_backend(default: BackendKind, console: &Console) -> Result<BackendKind> {
    console.info("Choose a translation backend:");
    console.detail("1: Google Translate (fast, no API key, standard quality)");
    console.detail("2: AI via OpenAI-compatible API (needs api.key, higher quality)");

    let default_option = match default {
        BackendKind::Google => "1",
        BackendKind::Ai => "2",
    };

    loop {
        let answer = console
            .ask(&format!("Option (1 or 2, Enter for {}):", default_option))
            .context("Failed to read backend choice")?;
        match BackendKind::from_answer(&answer, default) {
            Some(kind) => return Ok(kind),
            None => console.warning("Invalid option, please enter 1 or 2"),
        }
    }
}

/// Offers a fallback to Google when the AI backend has no API key.
///
/// Returns `None` if the user declines.
fn confirm_backend(
    kind: BackendKind,
    config: &Config,
    console: &Console,
) -> Result<Option<BackendKind>> {
    if kind != BackendKind::Ai || config.api.is_configured() {
        return Ok(Some(kind));
    }

    console.warning("The API key is not configured, the AI backend cannot be used.");
    let answer = console
        .ask("Continue with Google Translate instead? (y/N)")
        .context("Failed to read answer")?;

    if matches!(answer.to_lowercase().as_str(), "y" | "yes" | "s" | "si" | "sí") {
        console.info("Switching to Google Translate");
        Ok(Some(BackendKind::Google))
    } else {
        Ok(None)
    }
}
