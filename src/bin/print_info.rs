use std::path::PathBuf;
use anyhow::Result;
use clap::Parser;
use hdf5::File;
use log::LevelFilter;
use hdf5_persist::logger::init_log;
use hdf5_persist::{IoConfig, NodeHandle};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to an hdf5 file written by this crate.
    #[clap(long, required = true)]
    path: String,

    /// Log level for diagnostics written to stderr.
    #[clap(long, default_value_t = LevelFilter::Warn)]
    log_level: LevelFilter,

    /// Also append diagnostics to this file.
    #[clap(long)]
    log_file: Option<PathBuf>,
}

fn print_node(node: &NodeHandle, depth: usize) -> Result<()> {
    println!("{}{}", "  ".repeat(depth), node.describe()?);
    for name in node.child_names()? {
        let child = NodeHandle::open(node, &name)?;
        print_node(&child, depth + 1)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_log(args.log_level, args.log_file.as_deref())?;

    let file = File::open(args.path.as_str())?;
    let root = NodeHandle::root(&file, IoConfig::default())?;
    print_node(&root, 0)
}
