//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las fases de compilación sobre archivos y
//! directorios, y expone una CLI.

use anyhow::{self, bail, Context};
use clap::{self, crate_version, Arg};
use jackc::error::Diagnostics;

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = clap::Command::new("jackc")
        .version(crate_version!())
        .about("Jack to VM compiler for the Hack platform")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .required(true)
                .help("Source file (.jack) or directory of .jack files"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .takes_value(true)
                .help("Directory for .vm output (defaults to each source's directory)"),
        )
        .get_matches();

    // Se extraen argumentos necesarios
    let input = Path::new(args.value_of("input").expect("main.rs requires INPUT"));
    let output = args.value_of("output").map(Path::new);

    if let Some(output) = output {
        fs::create_dir_all(output)
            .with_context(|| format!("Failed to create output directory: {}", output.display()))?;
    }

    let units = scan(input)?;

    let mut failures = 0;
    for unit in &units {
        if !build(unit, output)? {
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{} of {} units failed to compile", failures, units.len());
    }

    Ok(())
}

/// Enumera las unidades de compilación bajo la entrada.
///
/// Un archivo se compila solo, mientras que de un directorio se toman
/// sus archivos `*.jack` inmediatos en orden de nombre.
fn scan(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if input.is_file() {
        if input.extension() != Some(OsStr::new("jack")) {
            bail!("Not a .jack source file: {}", input.display());
        }

        return Ok(vec![input.to_path_buf()]);
    }

    let entries = fs::read_dir(input)
        .with_context(|| format!("Failed to read input directory: {}", input.display()))?;

    let mut units = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to scan directory: {}", input.display()))?
            .path();

        if path.is_file() && path.extension() == Some(OsStr::new("jack")) {
            units.push(path);
        }
    }

    if units.is_empty() {
        bail!("No .jack source files in {}", input.display());
    }

    units.sort();
    Ok(units)
}

/// Compila una unidad y escribe su `.vm` si no hubo errores.
///
/// Los errores de compilación se informan por `stderr` y no un `Err`,
/// ya que no deben detener a las demás unidades.
fn build(unit: &Path, output: Option<&Path>) -> anyhow::Result<bool> {
    let text = fs::read_to_string(unit)
        .with_context(|| format!("Failed to read source file: {}", unit.display()))?;

    let commands = match jackc::compile(&unit.display().to_string(), &text) {
        Ok(commands) => commands,
        Err(error) => {
            eprint!("{}", Diagnostics::from(error));
            return Ok(false);
        }
    };

    // Nada se escribe hasta que la unidad entera haya compilado
    let mut buffer = Vec::new();
    jackc::vm::write(&commands, &mut buffer)?;

    let target = target_path(unit, output);
    fs::write(&target, buffer)
        .with_context(|| format!("Failed to write output file: {}", target.display()))?;

    Ok(true)
}

/// `Foo.jack` se traduce a `Foo.vm`, en el directorio de la fuente
/// salvo que se haya pedido otro.
fn target_path(unit: &Path, output: Option<&Path>) -> PathBuf {
    let mut target = match output {
        Some(output) => output.join(unit.file_name().expect("scan() yielded a nameless file")),
        None => unit.to_path_buf(),
    };

    target.set_extension("vm");
    target
}
