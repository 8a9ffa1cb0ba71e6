//! Modelo de comandos de la máquina virtual de pila.
//!
//! La salida del compilador es texto plano, un comando por línea, en
//! el que cada unidad de compilación produce un módulo independiente.
//! Los comandos se representan primero como datos para que las fases
//! y las pruebas puedan examinarlos antes de su emisión.

use std::{
    fmt::{self, Display},
    io::{self, Write},
};

/// Segmento de memoria virtual.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Display for Segment {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Segment::*;
        let string = match self {
            Constant => "constant",
            Argument => "argument",
            Local    => "local",
            Static   => "static",
            This     => "this",
            That     => "that",
            Pointer  => "pointer",
            Temp     => "temp",
        };

        fmt.write_str(string)
    }
}

/// Operación aritmético-lógica sobre la pila.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arithmetic {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl Display for Arithmetic {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Arithmetic::*;
        let string = match self {
            Add => "add",
            Sub => "sub",
            Neg => "neg",
            Eq  => "eq",
            Gt  => "gt",
            Lt  => "lt",
            And => "and",
            Or  => "or",
            Not => "not",
        };

        fmt.write_str(string)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Push(Segment, u16),
    Pop(Segment, u16),
    Arithmetic(Arithmetic),
    Label(String),
    Goto(String),
    IfGoto(String),
    Function(String, u16),
    Call(String, u16),
    Return,
}

impl Display for Command {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Command::*;

        match self {
            Push(segment, index) => write!(fmt, "push {} {}", segment, index),
            Pop(segment, index) => write!(fmt, "pop {} {}", segment, index),
            Arithmetic(operation) => write!(fmt, "{}", operation),
            Label(label) => write!(fmt, "label {}", label),
            Goto(label) => write!(fmt, "goto {}", label),
            IfGoto(label) => write!(fmt, "if-goto {}", label),
            Function(name, locals) => write!(fmt, "function {} {}", name, locals),
            Call(name, args) => write!(fmt, "call {} {}", name, args),
            Return => fmt.write_str("return"),
        }
    }
}

/// Emite un módulo completo, un comando por línea.
pub fn write<W: Write>(commands: &[Command], output: &mut W) -> io::Result<()> {
    for command in commands {
        writeln!(output, "{}", command)?;
    }

    Ok(())
}

/// Acumulador ordenado de comandos.
///
/// Los comandos se emiten exactamente en el orden en el que las
/// operaciones de este objeto son invocadas. Dos recorridos iguales
/// del mismo árbol producen secuencias idénticas.
pub struct Writer {
    code: Vec<Command>,
}

impl Writer {
    pub fn new() -> Self {
        Writer { code: Vec::new() }
    }

    pub fn push(&mut self, segment: Segment, index: u16) {
        self.code.push(Command::Push(segment, index));
    }

    pub fn pop(&mut self, segment: Segment, index: u16) {
        self.code.push(Command::Pop(segment, index));
    }

    pub fn arithmetic(&mut self, operation: Arithmetic) {
        self.code.push(Command::Arithmetic(operation));
    }

    pub fn label<S: Into<String>>(&mut self, label: S) {
        self.code.push(Command::Label(label.into()));
    }

    pub fn goto<S: Into<String>>(&mut self, label: S) {
        self.code.push(Command::Goto(label.into()));
    }

    pub fn if_goto<S: Into<String>>(&mut self, label: S) {
        self.code.push(Command::IfGoto(label.into()));
    }

    pub fn function<S: Into<String>>(&mut self, name: S, locals: u16) {
        self.code.push(Command::Function(name.into(), locals));
    }

    pub fn call<S: Into<String>>(&mut self, name: S, args: u16) {
        self.code.push(Command::Call(name.into(), args));
    }

    pub fn ret(&mut self) {
        self.code.push(Command::Return);
    }

    /// Entrega la secuencia acumulada.
    pub fn finish(self) -> Vec<Command> {
        self.code
    }
}
