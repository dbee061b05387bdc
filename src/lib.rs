#[macro_use]
extern crate lazy_static;

pub mod cfg;
pub mod cli;
pub mod dex;
pub mod emit;
pub mod errors;
pub mod insns;

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::path::Path;

use ::dex::DexReader;
use log::{error, info, warn};
use regex::bytes::Regex;
use zip::ZipArchive;

use cfg::ProgramGraph;
use cli::{Args, Layout};
use dex::DexHeader;
use emit::edg::EdgWriter;
use errors::RunError;

lazy_static! {
    static ref DEX_MAGIC: Regex = Regex::new(r"\x64\x65\x78\x0A\x30\x33[\x35-\x39]\x00").unwrap();
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const EDG_FILENAME: &str = "graph.edg";

/// Process every input file and emit the outputs. Returns the process
/// exit code: 0 when everything succeeded, 1 when any file failed.
pub fn run(args: &Args) -> i32 {
    let mut failed = false;
    let mut programs: Vec<ProgramGraph> = Vec::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for path in &args.files {
        if let Err(e) = process_file(path, args, &mut programs, &mut out) {
            error!("{}: {e}", path.display());
            failed = true;
        }
    }

    if args.disassemble && !programs.is_empty() {
        if let Err(e) = write_edg(&programs) {
            error!("{EDG_FILENAME}: {e}");
            failed = true;
        }
    }

    if failed {
        1
    } else {
        0
    }
}

fn process_file<W: Write>(
    path: &Path,
    args: &Args,
    programs: &mut Vec<ProgramGraph>,
    out: &mut W,
) -> Result<(), RunError> {
    let bytes = fs::read(path)?;
    if bytes.starts_with(ZIP_MAGIC) {
        let images = extract_images(&bytes)?;
        if images.is_empty() {
            return Err(RunError::NoDexFound(path.to_path_buf()));
        }
        if let Some(temp) = &args.temp_file {
            fs::write(temp, &images[0])?;
        }
        for image in &images {
            process_image(image, args, programs, out)?;
        }
        Ok(())
    } else {
        process_image(&bytes, args, programs, out)
    }
}

/// Every archive entry carrying the DEX magic, in archive order.
fn extract_images(bytes: &[u8]) -> Result<Vec<Vec<u8>>, RunError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut images = Vec::new();
    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                error!("archive entry {i}: {e}");
                continue;
            }
        };
        let mut buf = Vec::new();
        if let Err(e) = entry.read_to_end(&mut buf) {
            warn!("archive entry {i}: {e}");
            continue;
        }
        if DEX_MAGIC.is_match(&buf) {
            images.push(buf);
        }
    }
    Ok(images)
}

fn process_image<W: Write>(
    bytes: &[u8],
    args: &Args,
    programs: &mut Vec<ProgramGraph>,
    out: &mut W,
) -> Result<(), RunError> {
    let header = DexHeader::parse(bytes)?;
    match header.verify_checksum(bytes) {
        Ok(()) => {}
        Err(e) if args.ignore_bad_checksum => warn!("{e}"),
        Err(e) => return Err(e.into()),
    }
    if args.checksum_only {
        info!("checksum verified: {:#010x}", header.checksum);
        return Ok(());
    }

    if args.show_file_header {
        writeln!(out, "{}", header.summary())?;
    }
    if args.show_section_headers {
        writeln!(out, "{}", header.section_headers())?;
    }
    if args.register_maps {
        // register maps only exist in optimized images
        writeln!(out, "No register map section found")?;
        return Ok(());
    }

    let dex = DexReader::from_vec(bytes)?;
    match args.layout {
        Layout::Plain => dex::list_plain(&dex),
        Layout::Xml => dex::list_xml(&dex, out)?,
    }

    if args.disassemble {
        let program = dex::build_graphs(&dex, bytes, &header)?;
        for method in 0..program.methods.len() {
            emit::dot::dump_method(&program, method, out)?;
        }
        programs.push(program);
    }
    Ok(())
}

/// One writer for the whole run: magic once, then the node block for every
/// processed image, then the edge block.
fn write_edg(programs: &[ProgramGraph]) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(EDG_FILENAME)?;
    let mut writer = EdgWriter::new(BufWriter::new(file))?;
    writer.write_nodes(programs)?;
    writer.write_edges(programs)?;
    writer.flush()
}
