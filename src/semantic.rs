use thiserror::Error;

use std::collections::HashMap;

use crate::{
    lex::Identifier,
    parse::{
        self, BinOp, Call, ClassVarKind, Expr, ReturnType, Statement, SubroutineKind, Term, Type,
        UnaryOp,
    },
    source::{Located, Location},
    symbol::{Symbol, SymbolTable, VarKind},
    vm::{Arithmetic, Command, Segment, Writer},
};

pub type Semantic<T> = Result<T, Located<SemanticError>>;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("Symbol `{0}` is undefined")]
    Undefined(Identifier),

    #[error("Redefinition of `{0}` within the same scope")]
    Duplicate(Identifier),

    #[error("Redefinition of subroutine `{0}`")]
    DuplicateSubroutine(Identifier),

    #[error("Subroutine `{0}` returns void and cannot produce a value")]
    VoidInExpression(Identifier),

    #[error("Non-void subroutine `{0}` must return a value on every path")]
    MissingReturnValue(Identifier),

    #[error("Void subroutine `{0}` cannot return a value")]
    ValueFromVoid(Identifier),

    #[error("Constructor `{0}` must declare its own class as return type")]
    BadConstructorType(Identifier),

    #[error("`this` cannot be referenced inside a function")]
    ThisInFunction,

    #[error("Field `{0}` cannot be referenced inside a function")]
    FieldInFunction(Identifier),

    #[error("Method `{0}` requires an instance receiver")]
    MethodWithoutReceiver(Identifier),

    #[error("Subroutine `{0}` is not a method and must be called through its class name")]
    NotAMethod(Identifier),

    #[error("Method call on `{0}`, which does not have an object type")]
    MethodOnPrimitive(Identifier),
}

impl parse::Class {
    /// Baja la clase completa a una secuencia de comandos.
    ///
    /// El recorrido emite código en el mismo orden del árbol, por lo
    /// cual la misma clase produce siempre la misma secuencia.
    pub fn lower(&self) -> Semantic<Vec<Command>> {
        let signatures = scan_signatures(self)?;

        let mut table = SymbolTable::new();
        for var in self.vars() {
            let kind = match var.kind() {
                ClassVarKind::Static => VarKind::Static,
                ClassVarKind::Field => VarKind::Field,
            };

            for name in var.names() {
                define(&mut table, name, var.of().as_ref().clone(), kind)?;
            }
        }

        let mut code = Writer::new();
        for subroutine in self.subroutines() {
            let mut context = Context {
                class: self.name().as_ref(),
                signatures: &signatures,
                subroutine,
                table: &mut table,
                code: &mut code,
                labels: 0,
            };

            context.subroutine()?;
        }

        Ok(code.finish())
    }
}

/// Firma visible de una subrutina de la clase.
#[derive(Copy, Clone)]
struct Signature {
    kind: SubroutineKind,
    void: bool,
}

/// Registra las firmas de todas las subrutinas de la clase.
///
/// Las llamadas pueden referirse a subrutinas declaradas más adelante
/// en la misma unidad, por lo cual este paso ocurre antes de bajar
/// cualquier cuerpo.
fn scan_signatures(class: &parse::Class) -> Semantic<HashMap<Identifier, Signature>> {
    let mut signatures = HashMap::new();
    for subroutine in class.subroutines() {
        let name = subroutine.name();
        let signature = Signature {
            kind: subroutine.kind(),
            void: *subroutine.returns().as_ref() == ReturnType::Void,
        };

        if signatures.insert(name.as_ref().clone(), signature).is_some() {
            return Err(Located::at(
                SemanticError::DuplicateSubroutine(name.as_ref().clone()),
                name.location().clone(),
            ));
        }
    }

    Ok(signatures)
}

fn define(
    table: &mut SymbolTable,
    name: &Located<Identifier>,
    of: Type,
    kind: VarKind,
) -> Semantic<()> {
    match table.define(name.as_ref().clone(), of, kind) {
        None => Ok(()),
        Some(_) => Err(Located::at(
            SemanticError::Duplicate(name.as_ref().clone()),
            name.location().clone(),
        )),
    }
}

/// Estado de la subrutina actualmente en compilación.
struct Context<'a> {
    class: &'a Identifier,
    signatures: &'a HashMap<Identifier, Signature>,
    subroutine: &'a parse::Subroutine,
    table: &'a mut SymbolTable,
    code: &'a mut Writer,
    labels: u32,
}

impl Context<'_> {
    fn subroutine(&mut self) -> Semantic<()> {
        let subroutine = self.subroutine;
        self.check_return_type()?;

        self.table.start_subroutine();
        if subroutine.kind() == SubroutineKind::Method {
            // El receptor implícito ocupa el índice 0 de los argumentos
            let receiver = Type::Object(self.class.clone());
            self.table.define("this".into(), receiver, VarKind::Argument);
        }

        for parameter in subroutine.parameters() {
            define(
                self.table,
                parameter.name(),
                parameter.of().as_ref().clone(),
                VarKind::Argument,
            )?;
        }

        for var in subroutine.body().vars() {
            for name in var.names() {
                define(self.table, name, var.of().as_ref().clone(), VarKind::Local)?;
            }
        }

        let name = format!("{}.{}", self.class, subroutine.name().as_ref());
        self.code.function(name, self.table.var_count(VarKind::Local));

        match subroutine.kind() {
            SubroutineKind::Constructor => {
                let fields = self.table.var_count(VarKind::Field);
                self.code.push(Segment::Constant, fields);
                self.code.call("Memory.alloc", 1);
                self.code.pop(Segment::Pointer, 0);
            }

            SubroutineKind::Method => {
                self.code.push(Segment::Argument, 0);
                self.code.pop(Segment::Pointer, 0);
            }

            SubroutineKind::Function => (),
        }

        self.statements(subroutine.body().statements())?;

        if !always_returns(subroutine.body().statements()) {
            self.implicit_return()?;
        }

        Ok(())
    }

    /// Los constructores deben declarar su propia clase como retorno.
    fn check_return_type(&self) -> Semantic<()> {
        let subroutine = self.subroutine;
        if subroutine.kind() != SubroutineKind::Constructor {
            return Ok(());
        }

        match subroutine.returns().as_ref() {
            ReturnType::Of(Type::Object(class)) if class == self.class => Ok(()),
            _ => Err(Located::at(
                SemanticError::BadConstructorType(subroutine.name().as_ref().clone()),
                subroutine.returns().location().clone(),
            )),
        }
    }

    /// Epílogo de subrutinas cuyo cuerpo puede terminar sin `return`.
    fn implicit_return(&mut self) -> Semantic<()> {
        let subroutine = self.subroutine;
        match (subroutine.kind(), subroutine.returns().as_ref()) {
            (SubroutineKind::Constructor, _) => {
                self.code.push(Segment::Pointer, 0);
                self.code.ret();
                Ok(())
            }

            (_, ReturnType::Void) => {
                self.code.push(Segment::Constant, 0);
                self.code.ret();
                Ok(())
            }

            _ => Err(Located::at(
                SemanticError::MissingReturnValue(subroutine.name().as_ref().clone()),
                subroutine.name().location().clone(),
            )),
        }
    }

    fn statements(&mut self, statements: &[Statement]) -> Semantic<()> {
        statements
            .iter()
            .try_for_each(|statement| self.statement(statement))
    }

    fn statement(&mut self, statement: &Statement) -> Semantic<()> {
        match statement {
            Statement::Let {
                target,
                index,
                value,
            } => self.let_statement(target, index.as_ref(), value),

            Statement::If {
                condition,
                then_body,
                else_body,
            } => self.if_statement(condition, then_body, else_body.as_deref()),

            Statement::While { condition, body } => self.while_statement(condition, body),

            Statement::Do(call) => {
                self.call(call, false)?;
                self.code.pop(Segment::Temp, 0);
                Ok(())
            }

            Statement::Return { location, value } => {
                self.return_statement(location, value.as_ref())
            }
        }
    }

    fn let_statement(
        &mut self,
        target: &Located<Identifier>,
        index: Option<&Located<Expr>>,
        value: &Located<Expr>,
    ) -> Semantic<()> {
        let symbol = self.variable(target.as_ref(), target.location())?;
        let (segment, offset) = symbol.segment();

        match index {
            None => {
                self.expr(value)?;
                self.code.pop(segment, offset);
            }

            // La dirección base más el índice se calcula antes del
            // valor, y `temp 0` preserva el valor mientras `pointer 1`
            // recibe la dirección
            Some(index) => {
                self.code.push(segment, offset);
                self.expr(index)?;
                self.code.arithmetic(Arithmetic::Add);

                self.expr(value)?;
                self.code.pop(Segment::Temp, 0);
                self.code.pop(Segment::Pointer, 1);
                self.code.push(Segment::Temp, 0);
                self.code.pop(Segment::That, 0);
            }
        }

        Ok(())
    }

    fn if_statement(
        &mut self,
        condition: &Located<Expr>,
        then_body: &[Statement],
        else_body: Option<&[Statement]>,
    ) -> Semantic<()> {
        let label = self.labels;
        self.labels += 1;

        let else_label = format!("IF_ELSE_{}", label);
        let end_label = format!("IF_END_{}", label);

        self.expr(condition)?;
        self.code.arithmetic(Arithmetic::Not);
        self.code.if_goto(else_label.as_str());

        self.statements(then_body)?;
        self.code.goto(end_label.as_str());

        self.code.label(else_label);
        if let Some(else_body) = else_body {
            self.statements(else_body)?;
        }

        self.code.label(end_label);
        Ok(())
    }

    fn while_statement(&mut self, condition: &Located<Expr>, body: &[Statement]) -> Semantic<()> {
        let label = self.labels;
        self.labels += 1;

        let top_label = format!("WHILE_TOP_{}", label);
        let end_label = format!("WHILE_END_{}", label);

        self.code.label(top_label.as_str());
        self.expr(condition)?;
        self.code.arithmetic(Arithmetic::Not);
        self.code.if_goto(end_label.as_str());

        self.statements(body)?;
        self.code.goto(top_label);
        self.code.label(end_label);

        Ok(())
    }

    fn return_statement(
        &mut self,
        location: &Location,
        value: Option<&Located<Expr>>,
    ) -> Semantic<()> {
        let subroutine = self.subroutine;
        let void = *subroutine.returns().as_ref() == ReturnType::Void;

        match value {
            Some(value) => {
                if void {
                    return Err(Located::at(
                        SemanticError::ValueFromVoid(subroutine.name().as_ref().clone()),
                        location.clone(),
                    ));
                }

                self.expr(value)?;
            }

            None if subroutine.kind() == SubroutineKind::Constructor => {
                self.code.push(Segment::Pointer, 0);
            }

            None if void => self.code.push(Segment::Constant, 0),

            None => {
                return Err(Located::at(
                    SemanticError::MissingReturnValue(subroutine.name().as_ref().clone()),
                    location.clone(),
                ))
            }
        }

        self.code.ret();
        Ok(())
    }

    fn expr(&mut self, expr: &Located<Expr>) -> Semantic<()> {
        let expr = expr.as_ref();
        self.term(expr.first())?;

        for (op, term) in expr.rest() {
            self.term(term)?;
            self.binary(*op);
        }

        Ok(())
    }

    fn binary(&mut self, op: BinOp) {
        match op {
            BinOp::Add => self.code.arithmetic(Arithmetic::Add),
            BinOp::Sub => self.code.arithmetic(Arithmetic::Sub),
            BinOp::Mul => self.code.call("Math.multiply", 2),
            BinOp::Div => self.code.call("Math.divide", 2),
            BinOp::And => self.code.arithmetic(Arithmetic::And),
            BinOp::Or => self.code.arithmetic(Arithmetic::Or),
            BinOp::Less => self.code.arithmetic(Arithmetic::Lt),
            BinOp::Greater => self.code.arithmetic(Arithmetic::Gt),
            BinOp::Equal => self.code.arithmetic(Arithmetic::Eq),
        }
    }

    fn term(&mut self, term: &Located<Term>) -> Semantic<()> {
        match term.as_ref() {
            Term::Int(integer) => self.code.push(Segment::Constant, *integer),

            Term::Str(string) => {
                let length = string.chars().count() as u16;
                self.code.push(Segment::Constant, length);
                self.code.call("String.new", 1);

                for c in string.chars() {
                    // El lexer acota los caracteres al rango de una constante
                    self.code.push(Segment::Constant, c as u16);
                    self.code.call("String.appendChar", 2);
                }
            }

            Term::True => {
                self.code.push(Segment::Constant, 0);
                self.code.arithmetic(Arithmetic::Not);
            }

            Term::False | Term::Null => self.code.push(Segment::Constant, 0),

            Term::This => {
                if self.subroutine.kind() == SubroutineKind::Function {
                    return Err(Located::at(
                        SemanticError::ThisInFunction,
                        term.location().clone(),
                    ));
                }

                self.code.push(Segment::Pointer, 0);
            }

            Term::Var(name) => {
                let symbol = self.variable(name, term.location())?;
                let (segment, offset) = symbol.segment();
                self.code.push(segment, offset);
            }

            Term::Index { variable, index } => {
                let symbol = self.variable(variable.as_ref(), variable.location())?;
                let (segment, offset) = symbol.segment();

                self.code.push(segment, offset);
                self.expr(index)?;
                self.code.arithmetic(Arithmetic::Add);
                self.code.pop(Segment::Pointer, 1);
                self.code.push(Segment::That, 0);
            }

            Term::Call(call) => self.call(call, true)?,

            Term::Grouped(expr) => self.expr(expr)?,

            Term::Unary(op, operand) => {
                self.term(operand)?;
                match op {
                    UnaryOp::Neg => self.code.arithmetic(Arithmetic::Neg),
                    UnaryOp::Not => self.code.arithmetic(Arithmetic::Not),
                }
            }
        }

        Ok(())
    }

    fn call(&mut self, call: &Call, value_required: bool) -> Semantic<()> {
        let name = call.name();

        match call.receiver() {
            // Sin receptor: método implícito sobre `this`
            None => {
                let signature = self.signature(name)?;
                if signature.kind != SubroutineKind::Method {
                    return Err(Located::at(
                        SemanticError::NotAMethod(name.as_ref().clone()),
                        name.location().clone(),
                    ));
                }

                if self.subroutine.kind() == SubroutineKind::Function {
                    return Err(Located::at(
                        SemanticError::MethodWithoutReceiver(name.as_ref().clone()),
                        name.location().clone(),
                    ));
                }

                self.check_value(signature, name, value_required)?;

                self.code.push(Segment::Pointer, 0);
                self.args(call)?;
                self.code.call(
                    format!("{}.{}", self.class, name.as_ref()),
                    call.args().len() as u16 + 1,
                );
            }

            Some(receiver) => match self.table.resolve(receiver.as_ref()).cloned() {
                // El receptor es una variable visible: llamada de método
                Some(symbol) => {
                    if symbol.kind() == VarKind::Field
                        && self.subroutine.kind() == SubroutineKind::Function
                    {
                        return Err(Located::at(
                            SemanticError::FieldInFunction(receiver.as_ref().clone()),
                            receiver.location().clone(),
                        ));
                    }

                    let class = match symbol.of() {
                        Type::Object(class) => class.clone(),
                        _ => {
                            return Err(Located::at(
                                SemanticError::MethodOnPrimitive(receiver.as_ref().clone()),
                                receiver.location().clone(),
                            ))
                        }
                    };

                    // Un receptor de la clase en compilación se verifica
                    // contra las firmas conocidas
                    if &class == self.class {
                        let signature = self.signature(name)?;
                        if signature.kind != SubroutineKind::Method {
                            return Err(Located::at(
                                SemanticError::NotAMethod(name.as_ref().clone()),
                                name.location().clone(),
                            ));
                        }

                        self.check_value(signature, name, value_required)?;
                    }

                    let (segment, offset) = symbol.segment();
                    self.code.push(segment, offset);
                    self.args(call)?;
                    self.code.call(
                        format!("{}.{}", class, name.as_ref()),
                        call.args().len() as u16 + 1,
                    );
                }

                // El receptor es un nombre de clase: llamada directa.
                // Solo las llamadas a la clase en compilación pueden
                // verificarse, las demás clases no son visibles.
                None => {
                    if receiver.as_ref() == self.class {
                        let signature = self.signature(name)?;
                        if signature.kind == SubroutineKind::Method {
                            return Err(Located::at(
                                SemanticError::MethodWithoutReceiver(name.as_ref().clone()),
                                name.location().clone(),
                            ));
                        }

                        self.check_value(signature, name, value_required)?;
                    }

                    self.args(call)?;
                    self.code.call(
                        format!("{}.{}", receiver.as_ref(), name.as_ref()),
                        call.args().len() as u16,
                    );
                }
            },
        }

        Ok(())
    }

    fn args(&mut self, call: &Call) -> Semantic<()> {
        call.args().iter().try_for_each(|arg| self.expr(arg))
    }

    /// Resuelve una variable visible desde la subrutina actual.
    fn variable(&self, name: &Identifier, location: &Location) -> Semantic<Symbol> {
        let symbol = match self.table.resolve(name) {
            Some(symbol) => symbol,
            None => {
                return Err(Located::at(
                    SemanticError::Undefined(name.clone()),
                    location.clone(),
                ))
            }
        };

        if symbol.kind() == VarKind::Field && self.subroutine.kind() == SubroutineKind::Function {
            return Err(Located::at(
                SemanticError::FieldInFunction(name.clone()),
                location.clone(),
            ));
        }

        Ok(symbol.clone())
    }

    fn signature(&self, name: &Located<Identifier>) -> Semantic<Signature> {
        match self.signatures.get(name.as_ref()) {
            Some(signature) => Ok(*signature),
            None => Err(Located::at(
                SemanticError::Undefined(name.as_ref().clone()),
                name.location().clone(),
            )),
        }
    }

    fn check_value(
        &self,
        signature: Signature,
        name: &Located<Identifier>,
        value_required: bool,
    ) -> Semantic<()> {
        if value_required && signature.void {
            return Err(Located::at(
                SemanticError::VoidInExpression(name.as_ref().clone()),
                name.location().clone(),
            ));
        }

        Ok(())
    }
}

/// Determina si un bloque siempre alcanza un `return` propio.
fn always_returns(statements: &[Statement]) -> bool {
    match statements.last() {
        Some(Statement::Return { .. }) => true,

        Some(Statement::If {
            then_body,
            else_body: Some(else_body),
            ..
        }) => always_returns(then_body) && always_returns(else_body),

        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::Lexer, source};

    fn lower(text: &str) -> Result<Vec<Command>, SemanticError> {
        let (start, stream) = source::consume(text, "test");
        let tokens = Lexer::new(start.clone(), stream).tokenize().unwrap();
        let class = parse::parse(tokens, start).unwrap();

        class.lower().map_err(Located::into_inner)
    }

    fn render(text: &str) -> Vec<String> {
        lower(text)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn lowers_a_minimal_program() {
        let commands = render(
            "class Main {
                function void main() {
                    do Output.printInt(1 + 2);
                    return;
                }
            }",
        );

        assert_eq!(
            commands,
            vec![
                "function Main.main 0",
                "push constant 1",
                "push constant 2",
                "add",
                "call Output.printInt 1",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn constructors_allocate_their_fields() {
        let commands = render(
            "class Point {
                field int x, y;

                constructor Point new(int ax, int ay) {
                    let x = ax;
                    let y = ay;
                    return this;
                }
            }",
        );

        assert_eq!(
            commands,
            vec![
                "function Point.new 0",
                "push constant 2",
                "call Memory.alloc 1",
                "pop pointer 0",
                "push argument 0",
                "pop this 0",
                "push argument 1",
                "pop this 1",
                "push pointer 0",
                "return",
            ]
        );
    }

    #[test]
    fn methods_bind_their_receiver_before_parameters() {
        let commands = render(
            "class Point {
                field int x;

                method int plus(int dx) {
                    return x + dx;
                }
            }",
        );

        assert_eq!(
            commands,
            vec![
                "function Point.plus 0",
                "push argument 0",
                "pop pointer 0",
                "push this 0",
                "push argument 1",
                "add",
                "return",
            ]
        );
    }

    #[test]
    fn if_else_negates_and_uses_two_labels() {
        let commands = render(
            "class Main {
                function int abs(int n) {
                    if (n < 0) { return -n; } else { return n; }
                }
            }",
        );

        assert_eq!(
            commands,
            vec![
                "function Main.abs 0",
                "push argument 0",
                "push constant 0",
                "lt",
                "not",
                "if-goto IF_ELSE_0",
                "push argument 0",
                "neg",
                "return",
                "goto IF_END_0",
                "label IF_ELSE_0",
                "push argument 0",
                "return",
                "label IF_END_0",
            ]
        );
    }

    #[test]
    fn lone_if_still_emits_both_labels() {
        let commands = render(
            "class Main {
                function void f(int n) {
                    if (n) { do Output.println(); }
                    return;
                }
            }",
        );

        assert_eq!(
            commands,
            vec![
                "function Main.f 0",
                "push argument 0",
                "not",
                "if-goto IF_ELSE_0",
                "call Output.println 0",
                "pop temp 0",
                "goto IF_END_0",
                "label IF_ELSE_0",
                "label IF_END_0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn while_loops_test_at_the_top() {
        let commands = render(
            "class Main {
                function void count(int n) {
                    var int i;
                    let i = 0;
                    while (i < n) { let i = i + 1; }
                    return;
                }
            }",
        );

        assert_eq!(
            commands,
            vec![
                "function Main.count 1",
                "push constant 0",
                "pop local 0",
                "label WHILE_TOP_0",
                "push local 0",
                "push argument 0",
                "lt",
                "not",
                "if-goto WHILE_END_0",
                "push local 0",
                "push constant 1",
                "add",
                "pop local 0",
                "goto WHILE_TOP_0",
                "label WHILE_END_0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn label_numbers_restart_on_each_subroutine() {
        let commands = render(
            "class Main {
                function void f(int n) {
                    while (n) { let n = 0; }
                    return;
                }

                function void g(int n) {
                    while (n) { let n = 0; }
                    return;
                }
            }",
        );

        let tops: Vec<_> = commands
            .iter()
            .filter(|command| command.starts_with("label WHILE_TOP"))
            .collect();

        assert_eq!(tops, vec!["label WHILE_TOP_0", "label WHILE_TOP_0"]);
    }

    #[test]
    fn array_accesses_run_through_that() {
        let commands = render(
            "class Main {
                function int swap(Array a) {
                    var int t;
                    let t = a[0];
                    let a[1] = t;
                    return t;
                }
            }",
        );

        assert_eq!(
            commands,
            vec![
                "function Main.swap 1",
                "push argument 0",
                "push constant 0",
                "add",
                "pop pointer 1",
                "push that 0",
                "pop local 0",
                "push argument 0",
                "push constant 1",
                "add",
                "push local 0",
                "pop temp 0",
                "pop pointer 1",
                "push temp 0",
                "pop that 0",
                "push local 0",
                "return",
            ]
        );
    }

    #[test]
    fn string_constants_build_through_the_runtime() {
        let commands = render(
            "class Main {
                function void greet() {
                    do Output.printString(\"Hi\");
                    return;
                }
            }",
        );

        assert_eq!(
            commands,
            vec![
                "function Main.greet 0",
                "push constant 2",
                "call String.new 1",
                "push constant 72",
                "call String.appendChar 2",
                "push constant 105",
                "call String.appendChar 2",
                "call Output.printString 1",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn keyword_constants_have_stack_idioms() {
        let commands = render(
            "class Main {
                function boolean yes() { return true; }
                function boolean no() { return false; }
                function int nothing() { return null; }
            }",
        );

        assert_eq!(
            commands,
            vec![
                "function Main.yes 0",
                "push constant 0",
                "not",
                "return",
                "function Main.no 0",
                "push constant 0",
                "return",
                "function Main.nothing 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn implicit_method_calls_pass_this_along() {
        let commands = render(
            "class Counter {
                field int n;

                method void bump() {
                    let n = n + 1;
                    return;
                }

                method void twice() {
                    do bump();
                    do bump();
                    return;
                }
            }",
        );

        let calls: Vec<_> = commands
            .iter()
            .filter(|command| command.starts_with("call"))
            .collect();

        assert_eq!(calls, vec!["call Counter.bump 1", "call Counter.bump 1"]);
        assert!(commands.contains(&"push pointer 0".to_owned()));
    }

    #[test]
    fn object_receivers_dispatch_on_their_class() {
        let commands = render(
            "class Main {
                function int use(Point p) {
                    return p.getX();
                }
            }",
        );

        assert_eq!(
            commands,
            vec![
                "function Main.use 0",
                "push argument 0",
                "call Point.getX 1",
                "return",
            ]
        );
    }

    #[test]
    fn unknown_receivers_are_class_calls() {
        let commands = render(
            "class Main {
                function void clear() {
                    do Screen.clearScreen();
                    return;
                }
            }",
        );

        assert_eq!(
            commands,
            vec![
                "function Main.clear 0",
                "call Screen.clearScreen 0",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn statics_are_visible_from_functions() {
        let commands = render(
            "class Main {
                static int counter;

                function void reset() {
                    let counter = 0;
                    return;
                }
            }",
        );

        assert!(commands.contains(&"pop static 0".to_owned()));
    }

    #[test]
    fn void_results_cannot_feed_expressions() {
        let error = lower(
            "class Main {
                function void f() { return; }

                function void g() {
                    var int x;
                    let x = Main.f();
                    return;
                }
            }",
        )
        .unwrap_err();

        assert!(matches!(error, SemanticError::VoidInExpression(_)));
    }

    #[test]
    fn undefined_names_abort_the_unit() {
        let error = lower(
            "class Main {
                function int f() { return missing; }
            }",
        )
        .unwrap_err();

        assert!(matches!(error, SemanticError::Undefined(_)));

        let error = lower(
            "class Main {
                method void f() { do missing(); return; }
            }",
        )
        .unwrap_err();

        assert!(matches!(error, SemanticError::Undefined(_)));
    }

    #[test]
    fn duplicate_definitions_abort_the_unit() {
        let error = lower("class Main { field int x; static int x; }").unwrap_err();
        assert!(matches!(error, SemanticError::Duplicate(_)));

        let error = lower(
            "class Main {
                function void f(int a) {
                    var int a;
                    return;
                }
            }",
        )
        .unwrap_err();

        assert!(matches!(error, SemanticError::Duplicate(_)));

        let error = lower(
            "class Main {
                function void f() { return; }
                function int f() { return 0; }
            }",
        )
        .unwrap_err();

        assert!(matches!(error, SemanticError::DuplicateSubroutine(_)));
    }

    #[test]
    fn locals_may_shadow_fields() {
        let commands = render(
            "class Main {
                field int x;

                method int f() {
                    var int x;
                    let x = 1;
                    return x;
                }
            }",
        );

        assert!(commands.contains(&"pop local 0".to_owned()));
        assert!(commands.contains(&"push local 0".to_owned()));
    }

    #[test]
    fn functions_cannot_touch_instance_state() {
        let error = lower(
            "class Main {
                function int f() { return this; }
            }",
        )
        .unwrap_err();
        assert!(matches!(error, SemanticError::ThisInFunction));

        let error = lower(
            "class Main {
                field int x;
                function int f() { return x; }
            }",
        )
        .unwrap_err();
        assert!(matches!(error, SemanticError::FieldInFunction(_)));

        let error = lower(
            "class Main {
                method void m() { return; }
                function void f() { do m(); return; }
            }",
        )
        .unwrap_err();
        assert!(matches!(error, SemanticError::MethodWithoutReceiver(_)));
    }

    #[test]
    fn methods_cannot_be_called_like_functions() {
        let error = lower(
            "class Main {
                method void m() { return; }
                function void f() { do Main.m(); return; }
            }",
        )
        .unwrap_err();

        assert!(matches!(error, SemanticError::MethodWithoutReceiver(_)));
    }

    #[test]
    fn functions_cannot_be_called_like_methods() {
        let error = lower(
            "class Main {
                function void f() { return; }
                method void m() { do f(); return; }
            }",
        )
        .unwrap_err();

        assert!(matches!(error, SemanticError::NotAMethod(_)));
    }

    #[test]
    fn primitive_receivers_have_no_methods() {
        let error = lower(
            "class Main {
                function int f(int n) { return n.abs(); }
            }",
        )
        .unwrap_err();

        assert!(matches!(error, SemanticError::MethodOnPrimitive(_)));
    }

    #[test]
    fn own_class_receivers_are_checked_against_signatures() {
        let commands = render(
            "class Counter {
                field int n;

                method int get() { return n; }

                method int relay(Counter other) {
                    return other.get();
                }
            }",
        );

        assert!(commands.contains(&"call Counter.get 1".to_owned()));

        let error = lower(
            "class Main {
                function void f(Main m) { do m.missing(); return; }
            }",
        )
        .unwrap_err();
        assert!(matches!(error, SemanticError::Undefined(_)));

        let error = lower(
            "class Main {
                function void f() { return; }
                function void g(Main m) { do m.f(); return; }
            }",
        )
        .unwrap_err();
        assert!(matches!(error, SemanticError::NotAMethod(_)));

        let error = lower(
            "class Main {
                method void m() { return; }
                function int f(Main o) { return o.m(); }
            }",
        )
        .unwrap_err();
        assert!(matches!(error, SemanticError::VoidInExpression(_)));
    }

    #[test]
    fn constructors_must_return_their_own_class() {
        let error = lower(
            "class Point {
                constructor int new() { return 0; }
            }",
        )
        .unwrap_err();

        assert!(matches!(error, SemanticError::BadConstructorType(_)));
    }

    #[test]
    fn return_values_must_match_voidness() {
        let error = lower(
            "class Main {
                function void f() { return 1; }
            }",
        )
        .unwrap_err();
        assert!(matches!(error, SemanticError::ValueFromVoid(_)));

        let error = lower(
            "class Main {
                function int f() { return; }
            }",
        )
        .unwrap_err();
        assert!(matches!(error, SemanticError::MissingReturnValue(_)));
    }

    #[test]
    fn every_path_of_a_non_void_subroutine_must_return() {
        let error = lower(
            "class Main {
                function int f(int n) {
                    if (n) { return 1; }
                }
            }",
        )
        .unwrap_err();
        assert!(matches!(error, SemanticError::MissingReturnValue(_)));

        let commands = render(
            "class Main {
                function int g(int n) {
                    if (n) { return 1; } else { return 2; }
                }
            }",
        );
        assert_eq!(commands.last().unwrap(), "label IF_END_0");
    }

    #[test]
    fn void_bodies_receive_an_implicit_epilogue() {
        let commands = render(
            "class Main {
                function void f() {
                    do Output.println();
                }
            }",
        );

        assert_eq!(
            commands,
            vec![
                "function Main.f 0",
                "call Output.println 0",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn constructors_may_fall_off_the_end() {
        let commands = render(
            "class Point {
                constructor Point new() { }
            }",
        );

        assert_eq!(
            commands,
            vec![
                "function Point.new 0",
                "push constant 0",
                "call Memory.alloc 1",
                "pop pointer 0",
                "push pointer 0",
                "return",
            ]
        );
    }
}
