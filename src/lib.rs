//! Compilador de Jack para la plataforma Hack.
//!
//! # Fases
//! Cada clase deriva de un único archivo de código fuente. El archivo
//! se somete primero a análisis léxico en [`lex`], de lo cual se
//! obtiene un flujo de tokens. El flujo de tokens se dispone en un
//! árbol sintáctico por medio de análisis descendente en [`parse`].
//! Finalmente, [`semantic`] resuelve nombres contra las tablas de
//! símbolos de [`symbol`] y baja el árbol a comandos de la máquina
//! virtual de pila descritos en [`vm`].
//!
//! No existe un back end propio: los archivos `.vm` que emite
//! [`vm::write`] son la entrada del traductor VM-a-ensamblador de la
//! plataforma, por lo cual la compilación de cada unidad es
//! independiente de las demás.

pub mod error;
pub mod lex;
pub mod parse;
pub mod semantic;
pub mod source;
pub mod symbol;
pub mod vm;

use crate::{error::CompileError, lex::Lexer, vm::Command};

/// Compila una unidad de código fuente hasta comandos de VM.
///
/// El nombre identifica a la unidad en los mensajes de error y no
/// tiene que coincidir con una ruta real.
pub fn compile(name: &str, text: &str) -> Result<Vec<Command>, CompileError> {
    let (start, stream) = source::consume(text, name);
    let tokens = Lexer::new(start.clone(), stream).tokenize()?;
    let class = parse::parse(tokens, start)?;

    Ok(class.lower()?)
}
