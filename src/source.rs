//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de posiciones o rangos de ubicaciones en
//! el código fuente original, lo cual permite determinar un punto
//! exacto o aproximado en donde ocurre un error de abstracción
//! arbitraria.
//!
//! El núcleo del compilador recibe cada unidad de compilación como
//! una hilera ya leída por el driver, nunca como un descriptor de
//! archivo. Por tanto, el flujo de caracteres que produce [`consume`]
//! es infalible y el objeto [`Source`] archiva todas las líneas de
//! la unidad desde el inicio.

use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::Range,
    rc::Rc,
};

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Un flujo de entrada, carácter por carácter.
pub trait InputStream: Iterator<Item = (char, Location)> {}

impl<I: Iterator<Item = (char, Location)>> InputStream for I {}

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T: Display> Display for Located<T> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.location, self.value)
    }
}

/// Una ubicación está conformada por un origen y un rango de posiciones.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    position: Range<Position>,
}

impl Location {
    /// Unifica un rango de ubicaciones. Se asume el mismo origen.
    pub fn span(from: Location, to: &Location) -> Self {
        Location {
            from: from.from,
            position: from.position.start..to.position.end,
        }
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.position.start
    }

    /// Obtiene la posición de fin.
    pub fn end(&self) -> Position {
        self.position.end
    }

    /// Obtiene el origen de la ubicación.
    pub fn source(&self) -> &Source {
        &self.from
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.from.name)?;

        let Range { start, end } = self.position;
        if end == start.advance() {
            // Solo se señala una columna en específico
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "[{}-{}]", start, end.back())
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Decrementa el número de columna.
    pub fn back(self) -> Position {
        Position {
            line: self.line,
            column: self.column - 1,
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Ajusta la posición a la siguiente columna de tabulador.
    pub fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Nombre de origen e histórico interior de líneas.
pub struct Source {
    name: String,
    lines: Vec<String>,
}

impl Source {
    /// Obtiene el nombre de la unidad de compilación.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Obtiene una línea por su número, si existe.
    pub fn line(&self, number: u32) -> Option<&str> {
        let index = number.checked_sub(1)? as usize;
        self.lines.get(index).map(String::as_str)
    }
}

/// Transforma una unidad fuente en un flujo que itera por carácter.
///
/// La ubicación que se encuentra en la tupla de retorno es la posición
/// inicial de la unidad, lo cual permite señalar errores incluso en
/// unidades vacías. Cada carácter emitido viene acompañado de su
/// propia ubicación.
pub fn consume<S>(text: &str, name: S) -> (Location, impl InputStream + '_)
where
    S: Into<String>,
{
    let source = Rc::new(Source {
        name: name.into(),
        lines: text.lines().map(String::from).collect(),
    });

    let start = Location {
        from: Rc::clone(&source),
        position: Position::default()..Position::default().advance(),
    };

    let mut here = Position::default();
    let chars = text.chars().map(move |c| {
        let next = match c {
            '\n' => here.newline(),
            '\t' => here.tab(),
            _ => here.advance(),
        };

        let location = Location {
            from: Rc::clone(&source),
            position: here..here.advance(),
        };

        here = next;
        (c, location)
    });

    (start, chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_follow_lines_and_columns() {
        let (_, stream) = consume("ab\ncd", "test");
        let positions: Vec<_> = stream
            .map(|(c, location)| (c, location.start().line(), location.start().column()))
            .collect();

        assert_eq!(
            positions,
            vec![
                ('a', 1, 1),
                ('b', 1, 2),
                ('\n', 1, 3),
                ('c', 2, 1),
                ('d', 2, 2),
            ]
        );
    }

    #[test]
    fn tabs_advance_to_the_next_stop() {
        let (_, stream) = consume("\tx", "test");
        let last = stream.last().unwrap();

        assert_eq!(last.0, 'x');
        assert_eq!(last.1.start().column(), 5);
    }

    #[test]
    fn sources_archive_their_lines() {
        let (start, _) = consume("one\ntwo", "test");

        assert_eq!(start.source().name(), "test");
        assert_eq!(start.source().line(1), Some("one"));
        assert_eq!(start.source().line(2), Some("two"));
        assert_eq!(start.source().line(3), None);
    }

    #[test]
    fn spans_merge_endpoints() {
        let (_, stream) = consume("abc", "test");
        let locations: Vec<_> = stream.map(|(_, location)| location).collect();

        let span = Location::span(locations[0].clone(), &locations[2]);
        assert_eq!(span.start().column(), 1);
        assert_eq!(span.end().column(), 4);
    }
}
