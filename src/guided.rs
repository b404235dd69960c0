//! Interactive guided capture
//!
//! Terminal rendering of the four capture screens on top of
//! [`CaptureController`]. All state lives in the controller; this module
//! only prompts and prints.

use dialoguer::{Confirm, Input, Select};
use robodoc_common::{RobotType, Screen, Session, CONTEXTS};
use std::path::PathBuf;

use crate::capture::CaptureController;
use crate::error::Result;
use crate::preview::PhotoFile;
use crate::ui::{format_size, spinner, status_mark};

/// Values to prefill on the identify screen
#[derive(Debug, Default, Clone)]
pub struct Prefill {
    pub serial: Option<String>,
    pub robot_type: Option<RobotType>,
}

enum Flow {
    Continue,
    Quit,
}

/// Run guided sessions until the operator quits
pub async fn run_guided_capture(controller: &mut CaptureController, prefill: Prefill) -> Result<()> {
    if let Some(serial) = &prefill.serial {
        controller.set_serial(serial);
    }
    if let Some(robot_type) = prefill.robot_type {
        controller.set_robot_type(robot_type);
    }

    loop {
        let screen = controller.session().screen();
        println!(
            "\n━━ Step {}/4: {} ━━",
            screen.index() + 1,
            screen.title()
        );
        let flow = match screen {
            Screen::Identify => identify_screen(controller)?,
            Screen::ContextSelect => context_screen(controller)?,
            Screen::Checklist => checklist_screen(controller).await?,
            Screen::Summary => summary_screen(controller).await?,
        };
        if let Flow::Quit = flow {
            return Ok(());
        }
    }
}

fn identify_screen(controller: &mut CaptureController) -> Result<Flow> {
    let serial: String = Input::new()
        .with_prompt("Robot serial number")
        .with_initial_text(controller.session().robot_serial())
        .allow_empty(true)
        .interact_text()?;
    controller.set_serial(&serial);

    let types: Vec<&str> = RobotType::ALL.iter().map(|t| t.as_str()).collect();
    let current = RobotType::ALL
        .iter()
        .position(|t| *t == controller.session().robot_type())
        .unwrap_or(0);
    let picked = Select::new()
        .with_prompt("Robot type")
        .items(&types)
        .default(current)
        .interact()?;
    controller.set_robot_type(RobotType::ALL[picked]);

    let choice = Select::new()
        .items(&["Start documentation", "Quit"])
        .default(0)
        .interact()?;
    if choice == 1 {
        return Ok(Flow::Quit);
    }
    if !controller.start() {
        println!("⚠ Enter a serial number to start");
    }
    Ok(Flow::Continue)
}

fn context_screen(controller: &mut CaptureController) -> Result<Flow> {
    let session = controller.session();
    println!("Robot: {} {}", session.robot_type(), session.robot_serial());

    let mut items: Vec<String> = CONTEXTS
        .iter()
        .map(|c| {
            if c.enabled {
                c.label.to_string()
            } else {
                format!("{} (not available yet)", c.label)
            }
        })
        .collect();
    items.push("← Back".to_string());

    let picked = Select::new()
        .with_prompt("Workflow context")
        .items(&items)
        .default(0)
        .interact()?;

    if picked == CONTEXTS.len() {
        controller.back_to_identify();
        return Ok(Flow::Continue);
    }
    let context = &CONTEXTS[picked];
    if !controller.select_context(context.key) {
        println!("⚠ {} is not available yet", context.label);
    }
    Ok(Flow::Continue)
}

async fn checklist_screen(controller: &mut CaptureController) -> Result<Flow> {
    let session = controller.session();
    let total = session.checklist().len();
    let completeness = session.completeness();
    println!(
        "Required complete: {}/{}",
        completeness.completed_required(),
        completeness.required_count
    );

    match session.active_step() {
        Some(step) => {
            println!(
                "[{}/{}] {}{}",
                session.current_step_index() + 1,
                total,
                step.label,
                if step.required { " (required)" } else { "" }
            );
            let photos = session.photos_for(&step.id);
            if photos.is_empty() {
                println!("  no photos yet");
            }
            for photo in photos {
                let preview = photo
                    .preview
                    .as_deref()
                    .filter(|h| controller.previews().resolve(h).is_some())
                    .map(|_| " 🖼")
                    .unwrap_or("");
                println!("  ✔ {} ({}){}", photo.name, format_size(photo.size_bytes), preview);
            }
        }
        None => println!("No checklist is configured for this context."),
    }
    if !session.can_go_next() {
        println!("  → a photo is required before moving on");
    }

    let actions = checklist_actions(session);
    let labels: Vec<&str> = actions.iter().map(|(l, _)| *l).collect();
    let picked = Select::new().items(&labels).default(0).interact()?;

    match actions[picked].1 {
        ChecklistAction::Upload => upload_prompt(controller).await?,
        ChecklistAction::Next => {
            controller.next();
        }
        ChecklistAction::Previous => {
            controller.previous();
        }
        ChecklistAction::Cancel => cancel_prompt(controller)?,
    }
    Ok(Flow::Continue)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChecklistAction {
    Upload,
    Next,
    Previous,
    Cancel,
}

/// Menu entries for the checklist screen; Next only when the step allows it
fn checklist_actions(session: &Session) -> Vec<(&'static str, ChecklistAction)> {
    let mut actions = Vec::new();
    if session.active_step().is_some() {
        actions.push(("Take photo (file path)", ChecklistAction::Upload));
    }
    if session.can_go_next() {
        let label = if session.is_last_step() { "Review →" } else { "Next →" };
        actions.push((label, ChecklistAction::Next));
    }
    actions.push(("← Previous", ChecklistAction::Previous));
    actions.push(("Cancel session", ChecklistAction::Cancel));
    actions
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SummaryAction {
    Finish,
    BackToChecklist,
    Cancel,
}

const SUMMARY_ACTIONS: [(&str, SummaryAction); 3] = [
    ("Finish", SummaryAction::Finish),
    ("← Back to checklist", SummaryAction::BackToChecklist),
    ("Cancel session", SummaryAction::Cancel),
];

async fn upload_prompt(controller: &mut CaptureController) -> Result<()> {
    let raw: String = Input::new()
        .with_prompt("Photo file (empty to cancel)")
        .allow_empty(true)
        .interact_text()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(());
    }

    let file = match PhotoFile::from_path(&PathBuf::from(raw)) {
        Ok(f) => f,
        Err(e) => {
            println!("⚠ {}", e);
            return Ok(());
        }
    };

    let pb = spinner("Uploading…");
    let outcome = controller.upload(Some(file)).await;
    pb.finish_and_clear();

    match outcome {
        Ok(Some(photo)) => println!("✔ Uploaded {}", photo.name),
        Ok(None) => println!("⚠ Upload skipped"),
        Err(e) => println!("⚠ Upload failed: {}", e),
    }
    Ok(())
}

fn cancel_prompt(controller: &mut CaptureController) -> Result<()> {
    let confirmed = Confirm::new()
        .with_prompt("Discard this session and start over?")
        .default(false)
        .interact()?;
    if confirmed {
        controller.cancel();
        println!("Session discarded");
    }
    Ok(())
}

async fn summary_screen(controller: &mut CaptureController) -> Result<Flow> {
    let session = controller.session();
    println!("Robot: {} {}", session.robot_type(), session.robot_serial());
    println!("Context: {}", session.context_key());
    for step in session.checklist() {
        let count = session.photos_for(&step.id).len();
        let done = count > 0 || !step.required;
        println!(
            "  {} {}{} ({} photo{})",
            status_mark(done),
            step.label,
            if step.required { " *" } else { "" },
            count,
            if count == 1 { "" } else { "s" }
        );
    }
    let completeness = session.completeness();
    println!(
        "Total photos: {}  Status: {}",
        completeness.total_photos,
        if completeness.complete { "Complete" } else { "Incomplete" }
    );

    let labels: Vec<&str> = SUMMARY_ACTIONS.iter().map(|(l, _)| *l).collect();
    let picked = Select::new().items(&labels).default(0).interact()?;

    match SUMMARY_ACTIONS[picked].1 {
        SummaryAction::Finish => {
            let pb = spinner("Saving manifest…");
            let outcome = controller.finish().await;
            pb.finish_and_clear();
            match outcome {
                Ok(Some(report)) => {
                    println!("✔ Records saved: {}", report.manifest_path);
                    println!("  workflow {} ({} photos)", report.workflow_id, report.total_photos);
                    let again = Confirm::new()
                        .with_prompt("Document another robot?")
                        .default(true)
                        .interact()?;
                    if !again {
                        return Ok(Flow::Quit);
                    }
                }
                Ok(None) => {}
                Err(e) => println!("⚠ {}", e),
            }
        }
        SummaryAction::BackToChecklist => {
            controller.back_to_checklist();
        }
        SummaryAction::Cancel => cancel_prompt(controller)?,
    }
    Ok(Flow::Continue)
}
