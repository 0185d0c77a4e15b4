// CLASSIFICATION: COMMUNITY
// Filename: cbfstool.rs v0.3
// Author: Lukas Bower
// Date Modified: 2027-09-14

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use cbfs::{type_name, CbfsArchive, HEADER_VERSION_1, HEADER_VERSION_2};

#[derive(Parser)]
#[command(about = "Inspect coreboot filesystem (CBFS) ROM images")]
struct Cli {
    /// Locate the master header at the fixed base offset instead of
    /// through the end-of-ROM trailer
    #[arg(long, global = true)]
    base_header: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the master header
    Info { rom: PathBuf },
    /// List the files in the archive
    Ls { rom: PathBuf },
    /// Write a file's payload to stdout
    Cat { rom: PathBuf, name: String },
    /// Extract a file's payload to disk
    Extract {
        rom: PathBuf,
        name: String,
        out: PathBuf,
    },
}

fn read_image(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn open(image: &[u8], base_header: bool) -> anyhow::Result<CbfsArchive<'_>> {
    let archive = if base_header {
        CbfsArchive::from_base(image)
    } else {
        CbfsArchive::from_end(image)
    };
    Ok(archive?)
}

fn version_label(version: u32) -> &'static str {
    match version {
        HEADER_VERSION_1 => " (version 1)",
        HEADER_VERSION_2 => " (version 2)",
        _ => "",
    }
}

fn info(image: &[u8], base_header: bool) -> anyhow::Result<()> {
    let archive = open(image, base_header)?;
    let header = archive.header();
    println!("version:           {:#x}{}", header.version, version_label(header.version));
    println!("rom size:          {}", header.rom_size);
    println!("boot block size:   {}", header.boot_block_size);
    println!("alignment:         {}", header.align);
    println!("first file offset: {:#x}", header.offset);
    println!("files:             {}", archive.len());
    Ok(())
}

fn ls(image: &[u8], base_header: bool) -> anyhow::Result<()> {
    let archive = open(image, base_header)?;
    println!("{:<28} {:<14} {:>10}", "name", "type", "size");
    for file in archive.iter() {
        println!(
            "{:<28} {:<14} {:>10}",
            file.name(),
            type_name(file.ftype()),
            file.size()
        );
    }
    Ok(())
}

fn cat(image: &[u8], base_header: bool, name: &str) -> anyhow::Result<()> {
    let archive = open(image, base_header)?;
    let file = archive.find(name).with_context(|| format!("looking up {name}"))?;
    io::stdout().write_all(file.data())?;
    Ok(())
}

fn extract(image: &[u8], base_header: bool, name: &str, out: &Path) -> anyhow::Result<()> {
    let archive = open(image, base_header)?;
    let file = archive.find(name).with_context(|| format!("looking up {name}"))?;
    fs::write(out, file.data()).with_context(|| format!("writing {}", out.display()))?;
    log::info!("wrote {} bytes to {}", file.size(), out.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match &cli.cmd {
        Cmd::Info { rom } => info(&read_image(rom)?, cli.base_header),
        Cmd::Ls { rom } => ls(&read_image(rom)?, cli.base_header),
        Cmd::Cat { rom, name } => cat(&read_image(rom)?, cli.base_header, name),
        Cmd::Extract { rom, name, out } => {
            extract(&read_image(rom)?, cli.base_header, name, out)
        }
    }
}
