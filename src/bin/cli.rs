//! sshs settings-file tool
//!
//! Validates, dumps, reads, and edits on-disk sshs XML settings files.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sshs::{AttributeFlags, AttributeType, Node, Result, SshsError, Tree};
use tracing_subscriber::{fmt, EnvFilter};

/// sshs settings-file tool
#[derive(Parser, Debug)]
#[command(name = "sshs-cli")]
#[command(about = "Inspect and edit sshs XML settings files")]
#[command(version)]
struct Args {
    /// Settings file to operate on
    #[arg(short, long)]
    file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate that the file parses as an sshs v1.0 document
    Check,

    /// Parse the file and re-emit the normalized document on stdout
    Dump,

    /// Read one attribute value
    Get {
        /// Absolute node path, e.g. /sensor/
        path: String,

        /// Attribute type (bool, byte, short, int, long, float, double, string)
        #[arg(value_name = "TYPE")]
        attr_type: String,

        /// Attribute key
        key: String,
    },

    /// Write one attribute value and save the file
    Set {
        /// Absolute node path, e.g. /sensor/
        path: String,

        /// Attribute type (bool, byte, short, int, long, float, double, string)
        #[arg(value_name = "TYPE")]
        attr_type: String,

        /// Attribute key
        key: String,

        /// New value, in the same form the file uses
        value: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sshs=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    if let Err(error) = run(&args) {
        tracing::error!("{error}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let tree = Tree::new();
    let root = tree.root();

    match File::open(&args.file) {
        Ok(file) => {
            let mut reader = BufReader::new(file);
            root.import_sub_tree_from_xml(&mut reader, false)?;
            // File-loaded attributes bootstrap as NO_EXPORT until some owner
            // re-describes them. This tool is that owner: claim everything,
            // so the document round-trips back to disk.
            claim_exportable(&root);
        }
        Err(error)
            if error.kind() == ErrorKind::NotFound && matches!(args.command, Commands::Set { .. }) =>
        {
            tracing::info!("settings file {} not found, starting empty", args.file.display());
        }
        Err(error) => return Err(error.into()),
    }

    match &args.command {
        Commands::Check => {
            println!("OK: {} parses as an sshs v1.0 settings document", args.file.display());
        }

        Commands::Dump => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            root.export_sub_tree_to_xml(&mut out)?;
        }

        Commands::Get { path, attr_type, key } => {
            let attr_type: AttributeType = attr_type.parse()?;
            let node = tree
                .existing_node(path)
                .ok_or_else(|| SshsError::NodeNotFound { path: path.clone() })?;
            if !node.attribute_exists(key, attr_type) {
                return Err(SshsError::AttributeNotFound {
                    key: key.clone(),
                    attr_type,
                });
            }
            println!("{}", node.get_attribute(key, attr_type));
        }

        Commands::Set { path, attr_type, key, value } => {
            let node = tree.node(path);
            node.put_attribute_from_strings(key, attr_type, value)?;
            claim_exportable(&node);

            let file = File::create(&args.file)?;
            let mut writer = BufWriter::new(file);
            root.export_sub_tree_to_xml(&mut writer)?;
            tracing::info!("updated {}", args.file.display());
        }
    }

    Ok(())
}

/// Re-describe every attribute in the subtree with NORMAL flags, keeping its
/// value, ranges, and description.
fn claim_exportable(node: &Node) {
    for key in node.attribute_keys() {
        for attr_type in node.attribute_types(&key) {
            let value = node.get_attribute(&key, attr_type);
            let ranges = node.attribute_ranges(&key, attr_type);
            let description = node.attribute_description(&key, attr_type);
            node.create_attribute(&key, value, ranges, AttributeFlags::NORMAL, &description);
        }
    }

    for child in node.children() {
        claim_exportable(&child);
    }
}
