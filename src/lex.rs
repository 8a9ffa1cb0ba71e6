//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone un [`InputStream`]
//! (flujo de caracteres) en unidades léxicas denominadas tokens. Los espacios
//! en blanco y los comentarios se descartan durante esta operación. Cada
//! token emitido esta asociado a una ubicación en el código fuente original,
//! lo cual permite rastrear errores en tanto los mismos como constructos
//! más elevados de fases posteriores.
//!
//! # Contenido de un token
//! Este lexer no produce lexemas para casos donde no son necesarios o terminan
//! siendo más complicados. Por ejemplo, operadores, puntuación y palabras clave
//! se identifican por el hecho de lo que son y no incluyen lexemas. Por su parte,
//! los identificadores sí incluyen su lexema original. Las constantes literales
//! se resuelven a sus valores en vez de preservar sus lexemas, aunque
//! [`Token::lexeme`] es capaz de reconstruir el texto original de cualquier
//! token.
//!
//! # Reglas importantes del lenguaje
//! - El lenguaje distingue mayúsculas de minúsculas.
//! - Los identificadores pueden incluir `'_'` y dígitos, pero no pueden
//!   comenzar con un dígito.
//! - Las constantes enteras son decimales sin signo y no pueden exceder
//!   el rango de una palabra de 16 bits con signo, es decir `32767`.
//! - Las constantes de hilera no admiten saltos de línea ni comillas
//!   interiores, y no existen secuencias de escape. Cada carácter debe
//!   caber en el rango de una constante entera.
//! - Existen comentarios de línea `//` y de bloque `/* */`. Ambas formas
//!   se descartan junto con los espacios en blanco.
//!
//! # Errores
//! El primer error léxico abandona la unidad de compilación por completo.
//! Las fases posteriores nunca observan una secuencia parcial de tokens,
//! por lo cual una unidad que falla no produce salida alguna.

use crate::source::{InputStream, Located, Location};
use std::{
    fmt::{self, Display},
    rc::Rc,
    str::FromStr,
};

use thiserror::Error;

/// Literal entero máximo, el mayor positivo de una palabra de la plataforma.
const INT_MAX: u16 = 32767;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Una constante entera se encuentra fuera de rango.
    #[error("Integer literal overflow, valid range is [0, {INT_MAX}]")]
    IntOverflow,

    /// Una constante de hilera alcanzó un salto de línea o el final
    /// de la unidad antes de su comilla de cierre.
    #[error("String constant is never closed")]
    UnterminatedString,

    /// Un comentario de bloque alcanzó el final de la unidad.
    #[error("Block comment is never closed")]
    UnterminatedComment,
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<str>);

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(fmt)
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identificador.
    Id(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Constante entera.
    IntConstant(u16),

    /// Constante de hilera, sin incluir comillas.
    StrConstant(Rc<str>),

    /// `{`
    OpenCurly,

    /// `}`
    CloseCurly,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `[`
    OpenSquare,

    /// `]`
    CloseSquare,

    /// `.`
    Period,

    /// `,`
    Comma,

    /// `;`
    Semicolon,

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Divide,

    /// `&`
    Ampersand,

    /// `|`
    Pipe,

    /// `<`
    Less,

    /// `>`
    Greater,

    /// `=`
    Assign,

    /// `~`
    Tilde,
}

impl Token {
    /// Reconstruye el lexema original del token.
    ///
    /// La concatenación de los lexemas de una unidad es la unidad
    /// original sin espacios en blanco ni comentarios.
    pub fn lexeme(&self) -> String {
        use Token::*;

        match self {
            Id(id) => id.to_string(),
            Keyword(keyword) => keyword.to_string(),
            IntConstant(integer) => integer.to_string(),
            StrConstant(string) => format!("\"{}\"", string),
            OpenCurly => "{".to_owned(),
            CloseCurly => "}".to_owned(),
            OpenParen => "(".to_owned(),
            CloseParen => ")".to_owned(),
            OpenSquare => "[".to_owned(),
            CloseSquare => "]".to_owned(),
            Period => ".".to_owned(),
            Comma => ",".to_owned(),
            Semicolon => ";".to_owned(),
            Plus => "+".to_owned(),
            Minus => "-".to_owned(),
            Times => "*".to_owned(),
            Divide => "/".to_owned(),
            Ampersand => "&".to_owned(),
            Pipe => "|".to_owned(),
            Less => "<".to_owned(),
            Greater => ">".to_owned(),
            Assign => "=".to_owned(),
            Tilde => "~".to_owned(),
        }
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(id) => write!(fmt, "identifier `{}`", id),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            IntConstant(integer) => write!(fmt, "literal `{}`", integer),
            StrConstant(string) => write!(fmt, "string constant \"{}\"", string),
            OpenCurly => fmt.write_str("`{`"),
            CloseCurly => fmt.write_str("`}`"),
            OpenParen => fmt.write_str("`(`"),
            CloseParen => fmt.write_str("`)`"),
            OpenSquare => fmt.write_str("`[`"),
            CloseSquare => fmt.write_str("`]`"),
            Period => fmt.write_str("`.`"),
            Comma => fmt.write_str("`,`"),
            Semicolon => fmt.write_str("`;`"),
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Times => fmt.write_str("`*`"),
            Divide => fmt.write_str("`/`"),
            Ampersand => fmt.write_str("`&`"),
            Pipe => fmt.write_str("`|`"),
            Less => fmt.write_str("`<`"),
            Greater => fmt.write_str("`>`"),
            Assign => fmt.write_str("`=`"),
            Tilde => fmt.write_str("`~`"),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Keyword::*;
        let string = match self {
            Class       => "class",
            Constructor => "constructor",
            Function    => "function",
            Method      => "method",
            Field       => "field",
            Static      => "static",
            Var         => "var",
            Int         => "int",
            Char        => "char",
            Boolean     => "boolean",
            Void        => "void",
            True        => "true",
            False       => "false",
            Null        => "null",
            This        => "this",
            Let         => "let",
            Do          => "do",
            If          => "if",
            Else        => "else",
            While       => "while",
            Return      => "return",
        };

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        use Keyword::*;

        const KEYWORDS: &[(&str, Keyword)] = &[
            ("class",       Class),
            ("constructor", Constructor),
            ("function",    Function),
            ("method",      Method),
            ("field",       Field),
            ("static",      Static),
            ("var",         Var),
            ("int",         Int),
            ("char",        Char),
            ("boolean",     Boolean),
            ("void",        Void),
            ("true",        True),
            ("false",       False),
            ("null",        Null),
            ("this",        This),
            ("let",         Let),
            ("do",          Do),
            ("if",          If),
            ("else",        Else),
            ("while",       While),
            ("return",      Return),
        ];

        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Máquina de estados para análisis léxico.
///
/// Un lexer puede encontrarse en uno de diversos estados. La
/// salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en el flujo de entrada.
pub struct Lexer<S: Iterator> {
    source: std::iter::Peekable<S>,
    state: State,
    start: Location,
    last: Location,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado terminal tras un error; no se emite nada más.
    Failed,

    /// Estado de completitud; siempre emite el token incluido,
    /// consume la entrada actual y pasa a [`State::Start`].
    Complete(Token),

    /// Se encontró `/`.
    ///
    /// Puede seguir otro `/` o un `*` para entrar en un comentario.
    /// De lo contrario se trata del operador de división.
    Slash,

    /// Comentario de línea.
    ///
    /// Este estado vuelve a [`State::Start`] al encontrar `'\n'`.
    LineComment,

    /// Comentario de bloque.
    ///
    /// Se abandona únicamente a través de [`State::BlockClosing`].
    BlockComment,

    /// Se encontró `*` dentro de un comentario de bloque.
    BlockClosing,

    /// Constante entera.
    ///
    /// Este estado incluirá dígitos en el token mientras que
    /// el siguiente carácter sea un dígito.
    Integer(u16),

    /// Constante de hilera, sin incluir comillas.
    Str(String),

    /// Término que puede ser un identificador o una palabra clave.
    Word(String),
}

impl<S: InputStream> Lexer<S> {
    /// Crea un lexer en estado inicial a partir de un flujo.
    pub fn new(start: Location, source: S) -> Self {
        let last = start.clone();
        Lexer {
            source: source.peekable(),
            state: State::Start,
            start,
            last,
        }
    }

    /// Reduce la entrada a una secuencia de tokens o al primer error.
    pub fn tokenize(mut self) -> Result<Vec<Located<Token>>, Located<LexError>> {
        let mut tokens = Vec::new();
        while let Some(result) = self.next() {
            tokens.push(result?);
        }

        Ok(tokens)
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<Token>, LexError> {
        use {State::*, Token::*};

        let token = loop {
            let next_char = self.source.peek().map(|&(c, _)| c);

            // La posición de origen se mueve junto a la posición
            // siguiente siempre que no se haya encontrado una
            // frontera de token
            if let Start = self.state {
                if let Some((_, location)) = self.source.peek() {
                    self.start = location.clone();
                }
            }

            // Switch table principal, determina cambios de estado
            // y de salida del lexer a partir de combinaciones del
            // estado actual y el siguiente carácter
            match (&mut self.state, next_char) {
                (Failed, _) => return Ok(None),

                // Tokens triviales
                (Start, None) => return Ok(None),
                (Start, Some('{')) => self.state = Complete(OpenCurly),
                (Start, Some('}')) => self.state = Complete(CloseCurly),
                (Start, Some('(')) => self.state = Complete(OpenParen),
                (Start, Some(')')) => self.state = Complete(CloseParen),
                (Start, Some('[')) => self.state = Complete(OpenSquare),
                (Start, Some(']')) => self.state = Complete(CloseSquare),
                (Start, Some('.')) => self.state = Complete(Period),
                (Start, Some(',')) => self.state = Complete(Comma),
                (Start, Some(';')) => self.state = Complete(Semicolon),
                (Start, Some('+')) => self.state = Complete(Plus),
                (Start, Some('-')) => self.state = Complete(Minus),
                (Start, Some('*')) => self.state = Complete(Times),
                (Start, Some('&')) => self.state = Complete(Ampersand),
                (Start, Some('|')) => self.state = Complete(Pipe),
                (Start, Some('<')) => self.state = Complete(Less),
                (Start, Some('>')) => self.state = Complete(Greater),
                (Start, Some('=')) => self.state = Complete(Assign),
                (Start, Some('~')) => self.state = Complete(Tilde),
                (Start, Some('/')) => self.state = Slash,
                (Start, Some('"')) => self.state = Str(String::new()),

                // Identificadores y palabras clave
                (Start, Some(c)) if c.is_ascii_alphabetic() || c == '_' => {
                    self.state = Word(c.to_string())
                }

                // Inicio de una constante numérica. No se consume
                // el entero, ya que esta lógica ya está implementada
                // en el respectivo caso para un estado de constante
                // entera para el cual el siguiente carácter es un
                // dígito. Por tanto, la constante es inicialmente cero.
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Integer(0);
                    continue;
                }

                // Espacios en blanco y caracteres inesperados
                (Start, Some(c)) if c.is_whitespace() => (),
                (Start, Some(c)) => break Err(LexError::BadChar(c)),

                // Emisión retardada de tokens cualesquiera
                (Complete(value), _) => break Ok(std::mem::replace(value, Semicolon)),

                // `/` inicia un comentario o es el operador de división
                (Slash, Some('/')) => self.state = LineComment,
                (Slash, Some('*')) => self.state = BlockComment,
                (Slash, _) => break Ok(Divide),

                // Los comentarios de línea descartan la línea donde ocurren
                (LineComment, Some('\n')) => self.state = Start,
                (LineComment, Some(_)) => (),
                (LineComment, None) => self.state = Start,

                // Los comentarios de bloque terminan solamente en `*/`
                (BlockComment, Some('*')) => self.state = BlockClosing,
                (BlockComment, Some(_)) => (),
                (BlockComment, None) => break Err(LexError::UnterminatedComment),
                (BlockClosing, Some('/')) => self.state = Start,
                (BlockClosing, Some('*')) => (),
                (BlockClosing, Some(_)) => self.state = BlockComment,
                (BlockClosing, None) => break Err(LexError::UnterminatedComment),

                // Acumulación dígito por dígito de constantes enteras
                (Integer(accumulated), Some(digit)) if digit.is_ascii_digit() => {
                    let digit = digit.to_digit(10).unwrap() as u16;

                    match accumulated
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(digit))
                    {
                        Some(result) if result <= INT_MAX => *accumulated = result,
                        _ => break Err(LexError::IntOverflow),
                    }
                }

                // Si sigue algo que no es un dígito, la constante ha terminado
                (Integer(integer), _) => break Ok(IntConstant(*integer)),

                // Las hileras terminan en su comilla de cierre, la cual
                // debe ocurrir antes del final de la línea
                (Str(_), Some('\n')) | (Str(_), None) => {
                    break Err(LexError::UnterminatedString)
                }

                (Str(string), Some('"')) => {
                    let string = std::mem::take(string);
                    self.state = Complete(StrConstant(Rc::from(string)));
                }

                // Cada carácter de hilera se baja como constante entera,
                // así que comparte el rango de los literales
                (Str(_), Some(c)) if c as u32 > INT_MAX as u32 => {
                    break Err(LexError::BadChar(c))
                }

                (Str(string), Some(c)) => string.push(c),

                // Extensión de términos
                (Word(word), Some(c)) if is_word_char(c) => {
                    word.push(c);
                }

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => {
                    if let Ok(keyword) = self::Keyword::from_str(word) {
                        break Ok(Keyword(keyword));
                    } else {
                        break Ok(Id(Identifier(Rc::from(std::mem::take(word)))));
                    }
                }
            }

            // Si no hubo `continue`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some((_, location)) = self.source.next() {
                self.last = location;
            }
        };

        token.map(Some)
    }
}

impl<S: InputStream> Iterator for Lexer<S> {
    type Item = Result<Located<Token>, Located<LexError>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lex() {
            Ok(None) => None,
            Ok(Some(token)) => {
                self.state = State::Start;

                let location = Location::span(self.start.clone(), &self.last);
                Some(Ok(Located::at(token, location)))
            }

            Err(error) => {
                self.state = State::Failed;

                // El carácter culpable sigue sin consumirse, excepto
                // cuando el error ocurre en el final de la unidad
                let location = match self.source.peek() {
                    Some((_, location)) => location.clone(),
                    None => self.last.clone(),
                };

                Some(Err(Located::at(error, location)))
            }
        }
    }
}

/// Determina si un carácter puede pertenecer a un término.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
