//! Tabla de símbolos de dos niveles.
//!
//! Una clase aporta el nivel exterior (variables `static` y `field`)
//! y cada subrutina aporta el interior (argumentos y locales). La
//! resolución consulta primero el nivel de subrutina, por lo cual los
//! nombres interiores ocultan a los exteriores sin que eso constituya
//! una colisión. Cada categoría lleva su propio contador de índices,
//! que comienza en cero.

use std::collections::HashMap;

use crate::{lex::Identifier, parse::Type, vm::Segment};

/// Categoría de una variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VarKind {
    Static,
    Field,
    Argument,
    Local,
}

impl VarKind {
    /// Segmento de memoria virtual donde vive la categoría.
    pub fn segment(self) -> Segment {
        match self {
            VarKind::Static => Segment::Static,
            VarKind::Field => Segment::This,
            VarKind::Argument => Segment::Argument,
            VarKind::Local => Segment::Local,
        }
    }
}

/// Una variable definida, con su tipo, categoría e índice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    of: Type,
    kind: VarKind,
    index: u16,
}

impl Symbol {
    pub fn of(&self) -> &Type {
        &self.of
    }

    pub fn kind(&self) -> VarKind {
        self.kind
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    /// Segmento e índice, listos para `push` o `pop`.
    pub fn segment(&self) -> (Segment, u16) {
        (self.kind.segment(), self.index)
    }
}

/// Tabla de símbolos de la unidad en compilación.
pub struct SymbolTable {
    class_scope: HashMap<Identifier, Symbol>,
    subroutine_scope: HashMap<Identifier, Symbol>,
    counters: [u16; 4],
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            class_scope: HashMap::new(),
            subroutine_scope: HashMap::new(),
            counters: [0; 4],
        }
    }

    /// Abre el alcance de una nueva subrutina.
    ///
    /// Los símbolos y contadores del nivel de clase sobreviven,
    /// mientras que los del nivel de subrutina se descartan.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.counters[VarKind::Argument as usize] = 0;
        self.counters[VarKind::Local as usize] = 0;
    }

    /// Define una variable con el siguiente índice de su categoría.
    ///
    /// Si el mismo nivel ya contenía al nombre, se devuelve el
    /// símbolo anterior.
    pub fn define(&mut self, name: Identifier, of: Type, kind: VarKind) -> Option<Symbol> {
        let index = self.counters[kind as usize];
        self.counters[kind as usize] += 1;

        let symbol = Symbol { of, kind, index };
        match kind {
            VarKind::Static | VarKind::Field => self.class_scope.insert(name, symbol),
            VarKind::Argument | VarKind::Local => self.subroutine_scope.insert(name, symbol),
        }
    }

    /// Busca un nombre, primero en la subrutina y luego en la clase.
    pub fn resolve(&self, name: &Identifier) -> Option<&Symbol> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    /// Categoría de un nombre visible.
    pub fn kind_of(&self, name: &Identifier) -> Option<VarKind> {
        self.resolve(name).map(Symbol::kind)
    }

    /// Tipo declarado de un nombre visible.
    pub fn type_of(&self, name: &Identifier) -> Option<&Type> {
        self.resolve(name).map(Symbol::of)
    }

    /// Índice de un nombre visible dentro de su categoría.
    pub fn index_of(&self, name: &Identifier) -> Option<u16> {
        self.resolve(name).map(Symbol::index)
    }

    /// Cantidad de variables definidas hasta ahora en una categoría.
    pub fn var_count(&self, kind: VarKind) -> u16 {
        self.counters[kind as usize]
    }
}
