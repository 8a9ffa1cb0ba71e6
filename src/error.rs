use crate::{
    lex::LexError,
    parse::SyntaxError,
    semantic::SemanticError,
    source::{Located, Location},
};
use std::{
    error::Error,
    fmt::{self, Display},
};
use thiserror::Error;

mod sealed {
    pub trait Sealed {}
}

pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

/// Falla que aborta la compilación de una unidad.
///
/// Cada fase reporta un solo error y ninguna unidad que falle
/// produce salida alguna.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{0}")]
    Lex(#[from] Located<LexError>),

    #[error("{0}")]
    Syntax(#[from] Located<SyntaxError>),

    #[error("{0}")]
    Semantic(#[from] Located<SemanticError>),
}

pub struct Diagnostics {
    kind: &'static str,
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            errors: Default::default(),
        }
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
            ..Default::default()
        }
    }
}

impl From<CompileError> for Diagnostics {
    fn from(error: CompileError) -> Self {
        match error {
            CompileError::Lex(error) => Diagnostics::from(error).kind("Lexical error"),
            CompileError::Syntax(error) => Diagnostics::from(error).kind("Syntax error"),
            CompileError::Semantic(error) => Diagnostics::from(error).kind("Semantic error"),
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { kind, errors } = self;

        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for error in errors {
            writeln!(fmt, "{}: {}", kind, error.source())?;

            let location = error.location();
            writeln!(fmt, " --> {}", location)?;

            //FIXME: Demasiado indecente
            let digits = location.end().line().to_string().chars().count();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            for line_number in location.start().line()..=location.end().line() {
                if let Some(line) = location.source().line(line_number) {
                    writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)?;
                }
            }

            let from = location.start().column();
            let to = location.end().column().saturating_sub(1);
            let min = from.min(to).max(1);
            let max = from.max(to);

            let skip = (min - 1) as usize;
            let highlight = (max - min + 1) as usize;

            writeln!(
                fmt,
                "{:digits$} | {:skip$}{:^<highlight$}",
                "",
                "",
                "",
                digits = digits,
                skip = skip,
                highlight = highlight
            )?;

            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}

impl<E: Error + 'static> Error for Located<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.as_ref())
    }
}
