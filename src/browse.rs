//! Interactive storage dashboard

use dialoguer::Select;

use crate::dashboard::DashboardBrowser;
use crate::error::Result;
use crate::ui::{format_size, spinner};

const BACK: &str = "← Back";
const QUIT: &str = "Quit";

/// Drill down through the bucket until the operator quits
pub async fn run_browse(browser: &mut DashboardBrowser) -> Result<()> {
    let pb = spinner("Listing robot types…");
    let loaded = browser.load_robot_types().await;
    pb.finish_and_clear();
    loaded?;

    // depth of the current level: 0 types, 1 serials, 2 contexts, 3 files
    let mut depth = 0usize;
    loop {
        println!("\n📂 {}", browser.active_path());
        let (options, prompt): (Vec<String>, &str) = match depth {
            0 => (browser.robot_types().to_vec(), "Robot type"),
            1 => (browser.serials().to_vec(), "Serial"),
            2 => (browser.contexts().to_vec(), "Context"),
            _ => (file_lines(browser), "File"),
        };
        if options.is_empty() {
            println!("  (empty)");
        }

        let mut items = options.clone();
        items.push(if depth == 0 { QUIT } else { BACK }.to_string());
        let picked = Select::new()
            .with_prompt(prompt)
            .items(&items)
            .default(0)
            .interact()?;

        if picked == options.len() {
            if depth == 0 {
                return Ok(());
            }
            depth -= 1;
            continue;
        }

        match depth {
            0 => {
                let name = options[picked].clone();
                if select(browser.select_robot_type(&name).await)? {
                    depth = 1;
                }
            }
            1 => {
                let name = options[picked].clone();
                if select(browser.select_serial(&name).await)? {
                    depth = 2;
                }
            }
            2 => {
                let name = options[picked].clone();
                if select(browser.select_context(&name).await)? {
                    let pb = spinner("Resolving previews…");
                    let resolved = browser.resolve_previews().await;
                    pb.finish_and_clear();
                    if let Err(e) = resolved {
                        println!("⚠ Previews unavailable: {}", e);
                    }
                    depth = 3;
                }
            }
            _ => {
                let name = browser.files()[picked].name.clone();
                match browser.open_file(&name).await {
                    Ok(url) => println!("🔗 {}", url),
                    Err(e) => println!("⚠ {}", e),
                }
            }
        }
    }
}

/// Listing failures are shown and keep the operator on the same level
fn select(outcome: Result<bool>) -> Result<bool> {
    match outcome {
        Ok(moved) => Ok(moved),
        Err(e) => {
            println!("⚠ {}", e);
            Ok(false)
        }
    }
}

fn file_lines(browser: &DashboardBrowser) -> Vec<String> {
    browser
        .files()
        .iter()
        .map(|f| {
            let size = f
                .metadata
                .as_ref()
                .map(|m| format_size(m.size))
                .unwrap_or_default();
            let preview = if browser.preview_url(&f.name).is_some() { " 🖼" } else { "" };
            format!("{}  {}{}", f.name, size, preview)
        })
        .collect()
}
