use std::env;
use std::io;
use std::path;
use std::process::ExitCode;

use imzdata::io::imzml::ImzMLParser;
use imzdata::meta::keys;
use imzdata::PropertyStore;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let path = if args.len() > 1 {
        path::Path::new(&args[1])
    } else {
        path::Path::new("./test/data/small.imzML")
    };
    println!("Path: {}", path.display());
    match run(path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &path::Path) -> io::Result<()> {
    let dataset = ImzMLParser::new().open_path(path)?;
    let meta = &dataset.metadata;
    let [x, y, z] = meta.dimensions();
    let [sx, sy, sz] = meta.pixel_size();
    let [ox, oy, oz] = meta.origin();
    println!("Dimensions: {x} x {y} x {z}");
    println!("Pixel size (mm): {sx} x {sy} x {sz}");
    println!("Origin (mm): {ox}, {oy}, {oz}");
    if let Some(info) = meta.get_text(keys::PIXEL_SIZE_INFO) {
        println!("Note: {info}");
    }
    if let Some(uuid) = meta.get_text(keys::UUID) {
        println!("UUID: {uuid}");
    }
    println!("Spectra: {}", dataset.len());
    for source in dataset.sources.iter() {
        if source.ibd_path.exists() {
            source.check_ibd_uuid(meta);
        }
        if let Some(first) = source.spectra.first() {
            println!(
                "{}: first spectrum at {:?}, m/z at byte {}, {} points",
                source.imzml_path.display(),
                first.index,
                first.mz_offset,
                first.mz_length
            );
        }
    }
    Ok(())
}
