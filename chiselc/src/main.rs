use std::{env, path::Path, process};

use chisel_gen::{GenBuilder, GenError};
use getopts::Options;

const ERROR: &str = "[Error]";

fn usage(prog: &str, msg: &str) -> ! {
    let path = Path::new(prog);
    let leaf = match path.file_name() {
        Some(m) => m.to_str().unwrap(),
        None => "chiselc",
    };
    if !msg.is_empty() {
        eprintln!("{}", msg);
    }
    eprintln!("Usage: {} [-o <output file>] <grammar file>", leaf);
    process::exit(1);
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let prog = &args[0];
    let matches = match Options::new()
        .optflag("h", "help", "")
        .optopt(
            "o",
            "output",
            "Output file path (default: chisel.hpp)",
            "FILE",
        )
        .parse(&args[1..])
    {
        Ok(m) => m,
        Err(f) => usage(prog, f.to_string().as_str()),
    };

    if matches.opt_present("h") {
        usage(prog, "");
    }
    if matches.free.len() != 1 {
        usage(prog, "Exactly one grammar file must be given.");
    }

    let inp = &matches.free[0];
    let outp = matches
        .opt_str("o")
        .unwrap_or_else(|| "chisel.hpp".to_string());

    match GenBuilder::new().output_path(&outp).process_file(inp) {
        Ok(()) => (),
        Err(GenError::Grammar(e)) => {
            eprintln!(
                "{} {}: {} error at byte {}: {}",
                ERROR,
                inp,
                e.phase(),
                e.span().start(),
                e
            );
            process::exit(1);
        }
        Err(GenError::Io(e)) => {
            eprintln!("{} {}: {}", ERROR, inp, e);
            process::exit(1);
        }
    }
}
