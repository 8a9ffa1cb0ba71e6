//! Análisis sintáctico.
//!
//! La gramática es LL(1) con la única excepción de los términos que
//! comienzan con un identificador, los cuales se resuelven observando
//! el token que sigue al identificador. No hay precedencia entre
//! operadores binarios: las cadenas se evalúan de izquierda a derecha.

use std::{iter::Peekable, rc::Rc, vec};
use thiserror::Error;

use crate::{
    lex::{Identifier, Keyword, Token},
    source::{Located, Location},
};

#[derive(Debug)]
pub struct Class {
    name: Located<Identifier>,
    vars: Vec<ClassVar>,
    subroutines: Vec<Subroutine>,
}

impl Class {
    pub fn name(&self) -> &Located<Identifier> {
        &self.name
    }

    pub fn vars(&self) -> &[ClassVar] {
        &self.vars
    }

    pub fn subroutines(&self) -> &[Subroutine] {
        &self.subroutines
    }
}

#[derive(Debug)]
pub struct ClassVar {
    kind: ClassVarKind,
    of: Located<Type>,
    names: Vec<Located<Identifier>>,
}

impl ClassVar {
    pub fn kind(&self) -> ClassVarKind {
        self.kind
    }

    pub fn of(&self) -> &Located<Type> {
        &self.of
    }

    pub fn names(&self) -> &[Located<Identifier>] {
        &self.names
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClassVarKind {
    Static,
    Field,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Char,
    Boolean,
    Object(Identifier),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Of(Type),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

#[derive(Debug)]
pub struct Subroutine {
    kind: SubroutineKind,
    returns: Located<ReturnType>,
    name: Located<Identifier>,
    parameters: Vec<Parameter>,
    body: Body,
}

impl Subroutine {
    pub fn kind(&self) -> SubroutineKind {
        self.kind
    }

    pub fn returns(&self) -> &Located<ReturnType> {
        &self.returns
    }

    pub fn name(&self) -> &Located<Identifier> {
        &self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

#[derive(Debug)]
pub struct Parameter {
    name: Located<Identifier>,
    of: Located<Type>,
}

impl Parameter {
    pub fn name(&self) -> &Located<Identifier> {
        &self.name
    }

    pub fn of(&self) -> &Located<Type> {
        &self.of
    }
}

#[derive(Debug)]
pub struct Body {
    vars: Vec<VarDec>,
    statements: Vec<Statement>,
}

impl Body {
    pub fn vars(&self) -> &[VarDec] {
        &self.vars
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }
}

#[derive(Debug)]
pub struct VarDec {
    of: Located<Type>,
    names: Vec<Located<Identifier>>,
}

impl VarDec {
    pub fn of(&self) -> &Located<Type> {
        &self.of
    }

    pub fn names(&self) -> &[Located<Identifier>] {
        &self.names
    }
}

#[derive(Debug)]
pub enum Statement {
    Let {
        target: Located<Identifier>,
        index: Option<Located<Expr>>,
        value: Located<Expr>,
    },

    If {
        condition: Located<Expr>,
        then_body: Vec<Statement>,
        else_body: Option<Vec<Statement>>,
    },

    While {
        condition: Located<Expr>,
        body: Vec<Statement>,
    },

    Do(Call),

    Return {
        location: Location,
        value: Option<Located<Expr>>,
    },
}

#[derive(Debug)]
pub struct Expr {
    first: Located<Term>,
    rest: Vec<(BinOp, Located<Term>)>,
}

impl Expr {
    pub fn first(&self) -> &Located<Term> {
        &self.first
    }

    pub fn rest(&self) -> &[(BinOp, Located<Term>)] {
        &self.rest
    }
}

#[derive(Debug)]
pub enum Term {
    Int(u16),
    Str(Rc<str>),
    True,
    False,
    Null,
    This,
    Var(Identifier),

    Index {
        variable: Located<Identifier>,
        index: Box<Located<Expr>>,
    },

    Call(Call),
    Grouped(Box<Located<Expr>>),
    Unary(UnaryOp, Box<Located<Term>>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Less,
    Greater,
    Equal,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug)]
pub struct Call {
    receiver: Option<Located<Identifier>>,
    name: Located<Identifier>,
    args: Vec<Located<Expr>>,
}

impl Call {
    pub fn receiver(&self) -> Option<&Located<Identifier>> {
        self.receiver.as_ref()
    }

    pub fn name(&self) -> &Located<Identifier> {
        &self.name
    }

    pub fn args(&self) -> &[Located<Expr>] {
        &self.args
    }
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SyntaxError {
    #[error("Expected {0}, found {1} instead")]
    UnexpectedToken(Token, Token),

    #[error("Expected {0}, none was found instead")]
    MissingToken(Token),

    #[error("Expected identifier")]
    ExpectedId,

    #[error("Expected a type: `int`, `char`, `boolean` or a class name")]
    ExpectedType,

    #[error("Expected `static`, `field`, `constructor`, `function`, `method` or `}}`")]
    ExpectedClassMember,

    #[error("Expected a statement: `let`, `if`, `while`, `do` or `return`")]
    ExpectedStatement,

    #[error("Expected a term")]
    ExpectedTerm,

    #[error("Trailing input after the end of the class")]
    TrailingInput,

    #[error("Abrupt end of program")]
    UnexpectedEof,
}

/// Construye el árbol sintáctico de una unidad de compilación.
///
/// La ubicación inicial se utiliza para señalar errores que ocurren
/// antes del primer token, como una unidad vacía.
pub fn parse(tokens: Vec<Located<Token>>, start: Location) -> Result<Class, Located<SyntaxError>> {
    let mut parser = Parser {
        tokens: tokens.into_iter().peekable(),
        last_known: start,
    };

    parser.class()
}

struct Parser {
    tokens: Peekable<vec::IntoIter<Located<Token>>>,
    last_known: Location,
}

type Parse<T> = Result<T, Located<SyntaxError>>;

impl Parser {
    fn class(&mut self) -> Parse<Class> {
        self.keyword(Keyword::Class)?;
        let name = self.id()?;

        self.expect(Token::OpenCurly)?;

        let mut vars = Vec::new();
        while let Some(Token::Keyword(Keyword::Static | Keyword::Field)) = self.peek() {
            vars.push(self.class_var()?);
        }

        let mut subroutines = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Keyword(
                    Keyword::Constructor | Keyword::Function | Keyword::Method,
                )) => subroutines.push(self.subroutine()?),

                Some(Token::CloseCurly) | None => break,

                Some(_) => {
                    self.next()?;
                    self.fail(SyntaxError::ExpectedClassMember)?;
                }
            }
        }

        self.expect(Token::CloseCurly)?;

        if self.tokens.peek().is_some() {
            self.next()?;
            return self.fail(SyntaxError::TrailingInput);
        }

        Ok(Class {
            name,
            vars,
            subroutines,
        })
    }

    fn class_var(&mut self) -> Parse<ClassVar> {
        let kind = match self.next()?.into_inner() {
            Token::Keyword(Keyword::Static) => ClassVarKind::Static,
            Token::Keyword(Keyword::Field) => ClassVarKind::Field,
            _ => self.fail(SyntaxError::ExpectedClassMember)?,
        };

        let of = self.typ()?;
        let names = self.comma_separated(Parser::id)?;
        self.expect(Token::Semicolon)?;

        Ok(ClassVar { kind, of, names })
    }

    fn subroutine(&mut self) -> Parse<Subroutine> {
        let kind = match self.next()?.into_inner() {
            Token::Keyword(Keyword::Constructor) => SubroutineKind::Constructor,
            Token::Keyword(Keyword::Function) => SubroutineKind::Function,
            Token::Keyword(Keyword::Method) => SubroutineKind::Method,
            _ => self.fail(SyntaxError::ExpectedClassMember)?,
        };

        let returns = self.returns()?;
        let name = self.id()?;

        self.expect(Token::OpenParen)?;
        let parameters = match self.peek() {
            Some(Token::CloseParen) => Vec::new(),
            _ => self.comma_separated(Parser::parameter)?,
        };

        self.expect(Token::CloseParen)?;
        let body = self.body()?;

        Ok(Subroutine {
            kind,
            returns,
            name,
            parameters,
            body,
        })
    }

    fn parameter(&mut self) -> Parse<Parameter> {
        let of = self.typ()?;
        let name = self.id()?;

        Ok(Parameter { name, of })
    }

    fn body(&mut self) -> Parse<Body> {
        self.expect(Token::OpenCurly)?;

        let mut vars = Vec::new();
        while let Some(Token::Keyword(Keyword::Var)) = self.peek() {
            vars.push(self.var_dec()?);
        }

        let statements = self.statements()?;
        self.expect(Token::CloseCurly)?;

        Ok(Body { vars, statements })
    }

    fn var_dec(&mut self) -> Parse<VarDec> {
        self.keyword(Keyword::Var)?;

        let of = self.typ()?;
        let names = self.comma_separated(Parser::id)?;
        self.expect(Token::Semicolon)?;

        Ok(VarDec { of, names })
    }

    fn statements(&mut self) -> Parse<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Keyword(Keyword::Let)) => statements.push(self.let_statement()?),
                Some(Token::Keyword(Keyword::If)) => statements.push(self.if_statement()?),
                Some(Token::Keyword(Keyword::While)) => statements.push(self.while_statement()?),
                Some(Token::Keyword(Keyword::Do)) => statements.push(self.do_statement()?),
                Some(Token::Keyword(Keyword::Return)) => statements.push(self.return_statement()?),

                Some(Token::CloseCurly) | None => break Ok(statements),

                Some(_) => {
                    self.next()?;
                    self.fail(SyntaxError::ExpectedStatement)?;
                }
            }
        }
    }

    fn let_statement(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::Let)?;
        let target = self.id()?;

        let index = match self.peek() {
            Some(Token::OpenSquare) => Some(self.index()?),
            _ => None,
        };

        self.expect(Token::Assign)?;
        let value = self.expr()?;
        self.expect(Token::Semicolon)?;

        Ok(Statement::Let {
            target,
            index,
            value,
        })
    }

    fn if_statement(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::If)?;

        self.expect(Token::OpenParen)?;
        let condition = self.expr()?;
        self.expect(Token::CloseParen)?;

        let then_body = self.block()?;
        let else_body = match self.peek() {
            Some(Token::Keyword(Keyword::Else)) => {
                self.keyword(Keyword::Else)?;
                Some(self.block()?)
            }

            _ => None,
        };

        Ok(Statement::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn while_statement(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::While)?;

        self.expect(Token::OpenParen)?;
        let condition = self.expr()?;
        self.expect(Token::CloseParen)?;

        let body = self.block()?;
        Ok(Statement::While { condition, body })
    }

    fn do_statement(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::Do)?;

        let first = self.id()?;
        let call = self.call(first)?;
        self.expect(Token::Semicolon)?;

        Ok(Statement::Do(call))
    }

    fn return_statement(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::Return)?;
        let location = self.last_known.clone();

        let value = match self.peek() {
            Some(Token::Semicolon) => None,
            _ => Some(self.expr()?),
        };

        self.expect(Token::Semicolon)?;
        Ok(Statement::Return { location, value })
    }

    /// Llamada a subrutina cuyo primer identificador ya fue consumido.
    ///
    /// El identificador puede resultar ser el receptor (si sigue `.`)
    /// o directamente el nombre de la subrutina (si sigue `(`).
    fn call(&mut self, first: Located<Identifier>) -> Parse<Call> {
        let (receiver, name) = match self.peek() {
            Some(Token::Period) => {
                self.expect(Token::Period)?;
                (Some(first), self.id()?)
            }

            _ => (None, first),
        };

        self.expect(Token::OpenParen)?;
        let args = match self.peek() {
            Some(Token::CloseParen) => Vec::new(),
            _ => self.comma_separated(Parser::expr)?,
        };

        self.expect(Token::CloseParen)?;
        Ok(Call {
            receiver,
            name,
            args,
        })
    }

    fn block(&mut self) -> Parse<Vec<Statement>> {
        self.expect(Token::OpenCurly)?;
        let statements = self.statements()?;
        self.expect(Token::CloseCurly)?;

        Ok(statements)
    }

    fn index(&mut self) -> Parse<Located<Expr>> {
        self.expect(Token::OpenSquare)?;
        let index = self.expr()?;
        self.expect(Token::CloseSquare)?;

        Ok(index)
    }

    fn typ(&mut self) -> Parse<Located<Type>> {
        let (location, token) = self.next()?.split();
        let typ = match token {
            Token::Keyword(Keyword::Int) => Type::Int,
            Token::Keyword(Keyword::Char) => Type::Char,
            Token::Keyword(Keyword::Boolean) => Type::Boolean,
            Token::Id(id) => Type::Object(id),

            _ => self.fail(SyntaxError::ExpectedType)?,
        };

        Ok(Located::at(typ, location))
    }

    fn returns(&mut self) -> Parse<Located<ReturnType>> {
        if let Some(Token::Keyword(Keyword::Void)) = self.peek() {
            let (location, _) = self.next()?.split();
            return Ok(Located::at(ReturnType::Void, location));
        }

        Ok(self.typ()?.map(ReturnType::Of))
    }

    fn expr(&mut self) -> Parse<Located<Expr>> {
        let first = self.term()?;
        let start = first.location().clone();

        let mut rest = Vec::new();
        while let Some(op) = self.peek().and_then(binary_op) {
            self.next()?;
            rest.push((op, self.term()?));
        }

        let location = match rest.last() {
            Some((_, last)) => Location::span(start, last.location()),
            None => start,
        };

        Ok(Located::at(Expr { first, rest }, location))
    }

    fn term(&mut self) -> Parse<Located<Term>> {
        let (location, token) = self.next()?.split();
        let term = match token {
            Token::IntConstant(integer) => Term::Int(integer),
            Token::StrConstant(string) => Term::Str(string),
            Token::Keyword(Keyword::True) => Term::True,
            Token::Keyword(Keyword::False) => Term::False,
            Token::Keyword(Keyword::Null) => Term::Null,
            Token::Keyword(Keyword::This) => Term::This,

            Token::OpenParen => {
                let expr = self.expr()?;
                self.expect(Token::CloseParen)?;

                let location = Location::span(location, &self.last_known);
                return Ok(Located::at(Term::Grouped(Box::new(expr)), location));
            }

            Token::Minus => return self.unary(UnaryOp::Neg, location),
            Token::Tilde => return self.unary(UnaryOp::Not, location),

            Token::Id(id) => {
                let id = Located::at(id, location.clone());
                return match self.peek() {
                    Some(Token::OpenSquare) => {
                        let index = Box::new(self.index()?);
                        let location = Location::span(location, &self.last_known);

                        Ok(Located::at(
                            Term::Index {
                                variable: id,
                                index,
                            },
                            location,
                        ))
                    }

                    Some(Token::Period | Token::OpenParen) => {
                        let call = self.call(id)?;
                        let location = Location::span(location, &self.last_known);

                        Ok(Located::at(Term::Call(call), location))
                    }

                    _ => Ok(Located::at(Term::Var(id.into_inner()), location)),
                };
            }

            _ => self.fail(SyntaxError::ExpectedTerm)?,
        };

        Ok(Located::at(term, location))
    }

    fn unary(&mut self, op: UnaryOp, start: Location) -> Parse<Located<Term>> {
        let operand = self.term()?;
        let location = Location::span(start, operand.location());

        Ok(Located::at(Term::Unary(op, Box::new(operand)), location))
    }

    fn comma_separated<T, F>(&mut self, mut rule: F) -> Parse<Vec<T>>
    where
        F: FnMut(&mut Self) -> Parse<T>,
    {
        let mut items = vec![rule(self)?];
        while let Some(Token::Comma) = self.peek() {
            self.next()?;
            items.push(rule(self)?);
        }

        Ok(items)
    }

    fn id(&mut self) -> Parse<Located<Identifier>> {
        let (location, token) = self.next()?.split();
        match token {
            Token::Id(id) => Ok(Located::at(id, location)),
            _ => self.fail(SyntaxError::ExpectedId),
        }
    }

    fn keyword(&mut self, keyword: Keyword) -> Parse<()> {
        self.expect(Token::Keyword(keyword))
    }

    fn expect(&mut self, token: Token) -> Parse<()> {
        match self.next().map(Located::into_inner) {
            Ok(found) if found == token => Ok(()),
            Ok(found) => self.fail(SyntaxError::UnexpectedToken(token, found)),
            Err(_) => self.fail(SyntaxError::MissingToken(token)),
        }
    }

    fn peek(&mut self) -> Option<&Token> {
        self.tokens.peek().map(|token| token.as_ref())
    }

    fn next(&mut self) -> Parse<Located<Token>> {
        match self.tokens.next() {
            Some(token) => {
                self.last_known = token.location().clone();
                Ok(token)
            }

            None => self.fail(SyntaxError::UnexpectedEof),
        }
    }

    fn fail<T>(&self, error: SyntaxError) -> Parse<T> {
        Err(Located::at(error, self.last_known.clone()))
    }
}

fn binary_op(token: &Token) -> Option<BinOp> {
    match token {
        Token::Plus => Some(BinOp::Add),
        Token::Minus => Some(BinOp::Sub),
        Token::Times => Some(BinOp::Mul),
        Token::Divide => Some(BinOp::Div),
        Token::Ampersand => Some(BinOp::And),
        Token::Pipe => Some(BinOp::Or),
        Token::Less => Some(BinOp::Less),
        Token::Greater => Some(BinOp::Greater),
        Token::Assign => Some(BinOp::Equal),
        _ => None,
    }
}
