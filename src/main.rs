//! A patchelf-style command line front-end over the [`elfpatch`] library.

use std::env;
use std::fs;
use std::process;

use elfpatch::Patcher;

fn print_usage() {
    eprintln!("Usage: elfpatch [options] FILENAME [OUTPUT_FILE]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --print-interpreter | --pi     Print the program interpreter");
    eprintln!("  --print-needed      | --pn     Print the needed libraries, one per line");
    eprintln!("  --print-soname      | --ps     Print the DT_SONAME");
    eprintln!("  --print-runpath     | --pr     Print the DT_RUNPATH (or DT_RPATH)");
    eprintln!("  --set-interpreter   | --interp INTERP   Set the program interpreter");
    eprintln!("  --set-soname        | --so SONAME       Set the DT_SONAME");
    eprintln!("  --set-runpath       | --runpath PATH    Set the library search path");
    eprintln!("  --force-rpath                  Operate on DT_RPATH instead of DT_RUNPATH");
    eprintln!("  --debug                        Verbose placement diagnostics");
    eprintln!("  --version                      Print the version");
    eprintln!("  --help                         This text");
    eprintln!();
    eprintln!("When OUTPUT_FILE is omitted, FILENAME is modified in place.");
}

enum Operation {
    PrintInterpreter,
    PrintNeeded,
    PrintSoname,
    PrintRunpath,
    SetInterpreter(String),
    SetSoname(String),
    SetRunpath(String),
}

fn value_for(args: &[String], i: usize) -> String {
    if i + 1 >= args.len() {
        eprintln!("Error: {} requires an argument", args[i]);
        process::exit(1);
    }
    args[i + 1].clone()
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut operations = Vec::new();
    let mut force_rpath = false;
    let mut debug = false;
    let mut input_file: Option<String> = None;
    let mut output_file: Option<String> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--print-interpreter" | "--pi" => {
                operations.push(Operation::PrintInterpreter);
                i += 1;
            }
            "--print-needed" | "--pn" => {
                operations.push(Operation::PrintNeeded);
                i += 1;
            }
            "--print-soname" | "--ps" => {
                operations.push(Operation::PrintSoname);
                i += 1;
            }
            "--print-runpath" | "--pr" => {
                operations.push(Operation::PrintRunpath);
                i += 1;
            }
            "--set-interpreter" | "--interp" => {
                operations.push(Operation::SetInterpreter(value_for(&args, i)));
                i += 2;
            }
            "--set-soname" | "--so" => {
                operations.push(Operation::SetSoname(value_for(&args, i)));
                i += 2;
            }
            "--set-runpath" | "--runpath" => {
                operations.push(Operation::SetRunpath(value_for(&args, i)));
                i += 2;
            }
            "--force-rpath" => {
                force_rpath = true;
                i += 1;
            }
            "--debug" => {
                debug = true;
                i += 1;
            }
            "--version" => {
                println!("elfpatch {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "--help" => {
                print_usage();
                return;
            }
            arg => {
                if arg.starts_with("--") {
                    eprintln!("Error: Unknown option: {}", arg);
                    print_usage();
                    process::exit(1);
                }
                if input_file.is_none() {
                    input_file = Some(arg.to_string());
                } else if output_file.is_none() {
                    output_file = Some(arg.to_string());
                } else {
                    eprintln!("Error: Too many positional arguments");
                    process::exit(1);
                }
                i += 1;
            }
        }
    }

    let Some(input_file) = input_file else {
        eprintln!("Error: No input file specified");
        print_usage();
        process::exit(1);
    };

    let _ = stderrlog::new()
        .verbosity(if debug { 4 } else { 1 })
        .init();

    let mut patcher = match Patcher::open(&input_file) {
        Ok(patcher) => patcher,
        Err(e) => {
            eprintln!("Error parsing ELF file '{}': {}", input_file, e);
            process::exit(1);
        }
    };

    if force_rpath {
        patcher.use_rpath();
    }

    let mut mutated = false;
    for operation in &operations {
        let result = match operation {
            Operation::PrintInterpreter => patcher.interpreter().map(|interp| {
                if let Some(interp) = interp {
                    println!("{}", interp);
                }
            }),
            Operation::PrintNeeded => patcher.needed().map(|needed| {
                for lib in needed {
                    println!("{}", lib);
                }
            }),
            Operation::PrintSoname => patcher.soname().map(|soname| {
                if let Some(soname) = soname {
                    println!("{}", soname);
                }
            }),
            Operation::PrintRunpath => patcher.runpath().map(|runpath| {
                if let Some(runpath) = runpath {
                    println!("{}", runpath);
                }
            }),
            Operation::SetInterpreter(interp) => {
                mutated = true;
                patcher.set_interpreter(interp)
            }
            Operation::SetSoname(soname) => {
                mutated = true;
                patcher.set_soname(soname)
            }
            Operation::SetRunpath(path) => {
                mutated = true;
                patcher.set_runpath(path)
            }
        };
        if let Err(e) = result {
            eprintln!("Error applying operation: {}", e);
            process::exit(1);
        }
    }

    if !mutated && output_file.is_none() {
        return;
    }

    // Write to a temporary file first, then rename, so a failed save never
    // leaves a half-written binary at the destination.
    let target = output_file.unwrap_or_else(|| input_file.clone());
    let temp_output = format!("{}.tmp", target);
    if let Err(e) = patcher.save_to(&temp_output) {
        eprintln!("Error writing output file '{}': {}", temp_output, e);
        let _ = fs::remove_file(&temp_output);
        process::exit(1);
    }
    if let Err(e) = fs::rename(&temp_output, &target) {
        eprintln!("Error renaming temporary file: {}", e);
        let _ = fs::remove_file(&temp_output);
        process::exit(1);
    }
}
