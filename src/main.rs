use anyhow::Context;
use clap::Parser;
use robodoc::{browse, capture, cli, config, dashboard, error, guided, logging, manifest_store, ui};
use robodoc_common::{require_context, ChecklistCatalog};
use cli::{Cli, Commands, ManifestAction};
use config::Config;
use error::RoboDocError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = Config::load().context("loading settings")?;

    match cli.command {
        Commands::Capture { serial, robot_type, checklists } => {
            println!("📸 robodoc - guided capture\n");

            let catalog = match checklists {
                Some(path) => ChecklistCatalog::from_file(&path)
                    .with_context(|| format!("reading checklists from {}", path.display()))?,
                None => config.checklist_catalog()?,
            };
            let storage = config.open_storage();
            if storage.is_none() {
                println!("⚠ {}", RoboDocError::MissingStorageConfig);
            }

            let mut controller = capture::CaptureController::new(storage, catalog);
            guided::run_guided_capture(&mut controller, guided::Prefill { serial, robot_type }).await?;
        }

        Commands::Browse => {
            println!("🗂 robodoc - storage dashboard");
            let storage = config.open_storage().ok_or(RoboDocError::MissingStorageConfig)?;
            let mut browser = dashboard::DashboardBrowser::new(Some(storage), config.signed_url_ttl_seconds);
            browse::run_browse(&mut browser).await?;
        }

        Commands::Open { robot_type, serial, context, file } => {
            let storage = config.open_storage().ok_or(RoboDocError::MissingStorageConfig)?;
            let mut browser = dashboard::DashboardBrowser::new(Some(storage), config.signed_url_ttl_seconds);

            browser.load_robot_types().await?;
            let found = browser.select_robot_type(robot_type.as_str()).await?
                && browser.select_serial(&serial).await?
                && browser.select_context(&context).await?;
            if !found {
                return Err(RoboDocError::FileNotFound(format!("{}/{}/{}", robot_type, serial, context)).into());
            }
            println!("{}", browser.open_file(&file).await?);
        }

        Commands::Manifest { action } => {
            let storage = config.open_storage().ok_or(RoboDocError::MissingStorageConfig)?;
            match action {
                ManifestAction::Init { robot_type, serial, context } => {
                    let context = require_context(&context)?;
                    let pb = ui::spinner("Creating manifest…");
                    let created = manifest_store::init_manifest(storage.as_ref(), robot_type, &serial, context.key).await;
                    pb.finish_and_clear();
                    println!("✔ Manifest created: {}", created?);
                }
                ManifestAction::Show { robot_type, serial, context } => {
                    let context = require_context(&context)?;
                    let manifest =
                        manifest_store::read_manifest(storage.as_ref(), robot_type, &serial, context.key).await?;
                    println!("{}", manifest.to_json_pretty()?);
                }
            }
        }

        Commands::Checklist { context, robot_type, checklists } => {
            let catalog = match checklists {
                Some(path) => ChecklistCatalog::from_file(&path)?,
                None => config.checklist_catalog()?,
            };
            let context = require_context(&context)?;
            let steps = catalog.for_context(context.key, robot_type);

            println!("📋 {} / {}", context.label, robot_type);
            if steps.is_empty() {
                println!("  (no steps)");
            }
            for (i, step) in steps.iter().enumerate() {
                println!(
                    "  {:>2}. {}{}  → {}",
                    i + 1,
                    step.label,
                    if step.required { " *" } else { "" },
                    robodoc_common::naming::format_step_for_name(&step.label)
                );
            }
        }

        Commands::Config {
            set_backend,
            set_storage_url,
            set_storage_key,
            set_bucket,
            set_local_root,
            show,
        } => {
            let mut config = Config::load_file()?;
            let mut changed = false;
            if let Some(backend) = set_backend {
                config.backend = backend;
                changed = true;
            }
            if let Some(url) = set_storage_url {
                config.storage_url = Some(url);
                changed = true;
            }
            if let Some(key) = set_storage_key {
                config.storage_key = Some(key);
                changed = true;
            }
            if let Some(bucket) = set_bucket {
                config.bucket = bucket;
                changed = true;
            }
            if let Some(root) = set_local_root {
                config.local_root = Some(root);
                changed = true;
            }
            if changed {
                config.save()?;
                println!("✔ Settings saved: {}", Config::config_path()?.display());
            }

            if show || !changed {
                println!("⚙ Settings");
                println!("  backend: {}", config.backend);
                println!("  storage url: {}", config.storage_url.as_deref().unwrap_or("(unset)"));
                println!(
                    "  storage key: {}",
                    if config.storage_key.is_some() { "********" } else { "(unset)" }
                );
                println!("  bucket: {}", config.bucket);
                println!(
                    "  local root: {}",
                    config
                        .local_root
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(unset)".into())
                );
                println!("  signed url ttl: {}s", config.signed_url_ttl_seconds);
            }
        }
    }

    Ok(())
}
