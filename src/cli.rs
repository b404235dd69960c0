use clap::{Parser, Subcommand};
use robodoc_common::RobotType;
use std::path::PathBuf;

use crate::config::StorageBackend;

#[derive(Parser)]
#[command(name = "robodoc")]
#[command(about = "Guided robot photo documentation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose diagnostic logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Guided capture: identify, pick context, photo checklist, finish
    Capture {
        /// Prefill the robot serial number
        #[arg(short, long)]
        serial: Option<String>,

        /// Prefill the robot type (SCARA/IVR)
        #[arg(short = 't', long)]
        robot_type: Option<RobotType>,

        /// Checklist catalog JSON (overrides config and built-in)
        #[arg(long)]
        checklists: Option<PathBuf>,
    },

    /// Browse uploaded folders and files
    Browse,

    /// Print a URL for one stored file
    Open {
        /// Robot type folder
        #[arg(required = true)]
        robot_type: RobotType,

        /// Serial folder
        #[arg(required = true)]
        serial: String,

        /// Context folder
        #[arg(required = true)]
        context: String,

        /// File name
        #[arg(required = true)]
        file: String,
    },

    /// Manifest administration
    Manifest {
        #[command(subcommand)]
        action: ManifestAction,
    },

    /// Show the checklist for a context and robot type
    Checklist {
        /// Context key (Incoming/Analysis/Assembly/Delivery)
        #[arg(short, long, default_value = "Incoming")]
        context: String,

        /// Robot type (SCARA/IVR)
        #[arg(short = 't', long, default_value = "SCARA")]
        robot_type: RobotType,

        /// Checklist catalog JSON
        #[arg(long)]
        checklists: Option<PathBuf>,
    },

    /// Show or edit settings
    Config {
        /// Storage backend (supabase/local)
        #[arg(long)]
        set_backend: Option<StorageBackend>,

        /// Storage endpoint URL
        #[arg(long)]
        set_storage_url: Option<String>,

        /// Storage access key
        #[arg(long)]
        set_storage_key: Option<String>,

        /// Bucket name
        #[arg(long)]
        set_bucket: Option<String>,

        /// Root folder for the local backend
        #[arg(long)]
        set_local_root: Option<PathBuf>,

        /// Show settings
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum ManifestAction {
    /// Create the manifest once so guided runs can update it
    Init {
        #[arg(required = true)]
        robot_type: RobotType,
        #[arg(required = true)]
        serial: String,
        /// Context key
        #[arg(default_value = "Incoming")]
        context: String,
    },

    /// Print the stored manifest
    Show {
        #[arg(required = true)]
        robot_type: RobotType,
        #[arg(required = true)]
        serial: String,
        /// Context key
        #[arg(default_value = "Incoming")]
        context: String,
    },
}
