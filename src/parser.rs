//! Token-level grammar for the `trash` language.
//!
//! The grammar is one combinator stack per precedence level, folded
//! left over `(operator, operand)` tails. Mutually recursive rules
//! (`expression`, `statement`, `block`) go through deferred slots that
//! are filled once every rule has been built.

use std::rc::Rc;

use thiserror::Error;

use crate::ast::{Expression, ObjectKey, Program, Statement};
use crate::combinator::{
    Failure, Input, Parsed, Parser, either, enclosed, many0, maybe, seq, separated,
};
use crate::lexer;
use crate::position::Pos;
use crate::token::{Token, TokenKind};

/// Lexing or parsing failure, positioned in the source.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", self.render())]
pub struct ParseError {
    pub pos: Pos,
    pub message: String,
    pub expectations: Vec<String>,
    pub context: Option<String>,
}

impl ParseError {
    pub(crate) fn from_failure(failure: Failure) -> Self {
        Self {
            pos: failure.pos,
            message: failure.message,
            expectations: failure.expectations.into_iter().collect(),
            context: failure.context,
        }
    }

    fn render(&self) -> String {
        let mut out = format!("error on line {}: {}", self.pos, self.message);
        if !self.expectations.is_empty() {
            out.push_str(", expected ");
            out.push_str(&self.expectations.join(" or "));
        }
        if let Some(context) = &self.context {
            out.push_str(" while parsing ");
            out.push_str(context);
        }
        out
    }
}

/// Cheaply cloneable cursor over the lexed token stream. The trailing
/// `Eof` token stays in view so "unexpected end of input" carries its
/// position.
#[derive(Debug, Clone)]
pub struct TokenInput {
    tokens: Rc<[Token]>,
    index: usize,
}

impl TokenInput {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into(),
            index: 0,
        }
    }
}

impl Input for TokenInput {
    type Item = Token;

    fn next(&self) -> Option<(Token, Self)> {
        let token = self.tokens.get(self.index)?.clone();
        Some((
            token,
            Self {
                tokens: Rc::clone(&self.tokens),
                index: self.index + 1,
            },
        ))
    }

    fn pos(&self) -> Pos {
        match self.tokens.get(self.index) {
            Some(token) => token.pos,
            None => self.tokens.last().map(|token| token.pos).unwrap_or_default(),
        }
    }

    fn is_empty(&self) -> bool {
        self.index >= self.tokens.len()
    }
}

/// The one primitive over tokens: exactly the given kind.
fn tok(kind: TokenKind) -> Parser<TokenInput, Token> {
    Parser::new(move |input: TokenInput| match input.next() {
        Some((token, rest)) if token.kind == kind => Ok(Parsed {
            output: token,
            rest,
            consumed: true,
            best_alternative: None,
        }),
        _ => Err(Failure::expecting(
            input.pos(),
            kind.name(),
            unexpected_token(&input),
        )),
    })
}

fn unexpected_token(input: &TokenInput) -> String {
    match input.next() {
        Some((token, _)) => format!("unexpected {}", token.kind.name()),
        None => "unexpected end of input".to_string(),
    }
}

#[derive(Clone)]
enum PostfixTail {
    Call(Vec<Expression>),
    Index(Expression),
    Field(Token),
}

fn apply_tail(lhs: Expression, tail: PostfixTail) -> Expression {
    match tail {
        PostfixTail::Call(args) => Expression::Call {
            callee: Box::new(lhs),
            args,
        },
        PostfixTail::Index(index) => Expression::BracketAccess {
            lhs: Box::new(lhs),
            index: Box::new(index),
        },
        PostfixTail::Field(ident) => Expression::DotAccess {
            lhs: Box::new(lhs),
            ident,
        },
    }
}

/// One left-associative precedence level: `operand ((op) operand)*`.
fn binary_level(
    operand: &Parser<TokenInput, Expression>,
    ops: &[TokenKind],
) -> Parser<TokenInput, Expression> {
    let op = either(ops.iter().copied().map(tok).collect());
    let tail = op.pair(operand);
    seq(operand, &many0(&tail), |first, tails| {
        tails.into_iter().fold(first, |lhs, (op, rhs)| Expression::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    })
}

fn grammar() -> Parser<TokenInput, Program> {
    let (expression, expression_slot) = Parser::deferred();
    let (statement, statement_slot) = Parser::deferred();
    let (block, block_slot) = Parser::<TokenInput, Vec<Statement>>::deferred();
    let (unary, unary_slot) = Parser::deferred();

    let identifier = tok(TokenKind::Identifier);

    // primary
    let literal_expr = either(vec![
        tok(TokenKind::Str),
        tok(TokenKind::Number),
        tok(TokenKind::True),
        tok(TokenKind::False),
        tok(TokenKind::Nil),
    ])
    .map(Expression::Literal);

    let object_key = either(vec![
        identifier.map(ObjectKey::Identifier),
        enclosed(&tok(TokenKind::LBracket), &expression, &tok(TokenKind::RBracket))
            .map(ObjectKey::Computed),
    ]);
    let object_pair = seq(
        &object_key.skip(&tok(TokenKind::Colon)),
        &expression,
        |key, value| (key, value),
    )
    .tagged("key-value pair");
    let object_def = enclosed(
        &tok(TokenKind::LBrace),
        &separated(&object_pair, &tok(TokenKind::Comma)),
        &tok(TokenKind::RBrace),
    )
    .map(|pairs| Expression::ObjectDef { pairs })
    .tagged("object literal");

    let params = enclosed(
        &tok(TokenKind::LParen),
        &separated(&identifier, &tok(TokenKind::Comma)),
        &tok(TokenKind::RParen),
    );
    let function_def = seq(&tok(TokenKind::Function).then(&params), &block, |params, body| {
        Expression::FunctionDef { params, body }
    })
    .tagged("function literal");

    let paren_expr = enclosed(&tok(TokenKind::LParen), &expression, &tok(TokenKind::RParen));

    let primary = either(vec![
        literal_expr,
        object_def,
        function_def,
        identifier.map(Expression::Identifier),
        paren_expr,
    ]);

    // postfix: calls, bracket accesses, dotted accesses
    let call_tail = enclosed(
        &tok(TokenKind::LParen),
        &separated(&expression, &tok(TokenKind::Comma)),
        &tok(TokenKind::RParen),
    )
    .map(PostfixTail::Call);
    let index_tail = enclosed(&tok(TokenKind::LBracket), &expression, &tok(TokenKind::RBracket))
        .map(PostfixTail::Index);
    let field_tail = tok(TokenKind::Dot).then(&identifier).map(PostfixTail::Field);
    let postfix = seq(
        &primary,
        &many0(&either(vec![call_tail, index_tail, field_tail])),
        |first, tails| tails.into_iter().fold(first, apply_tail),
    );

    // unary is the only right-associative level
    let unary_op = either(vec![
        tok(TokenKind::Plus),
        tok(TokenKind::Minus),
        tok(TokenKind::Bang),
    ]);
    unary_slot.fill(either(vec![
        seq(&unary_op, &unary, |op, rhs| Expression::Unary {
            op,
            rhs: Box::new(rhs),
        }),
        postfix.clone(),
    ]));

    let multiplication = binary_level(
        &unary,
        &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
    );
    let addition = binary_level(&multiplication, &[TokenKind::Plus, TokenKind::Minus]);
    let relation = binary_level(
        &addition,
        &[
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
        ],
    );
    let equality = binary_level(&relation, &[TokenKind::EqualEqual, TokenKind::BangEqual]);
    let xor = binary_level(&equality, &[TokenKind::Caret]);
    let and = binary_level(&xor, &[TokenKind::AndAnd]);
    let or = binary_level(&and, &[TokenKind::OrOr]);
    expression_slot.fill(or.tagged("expression"));

    // statements
    let semicolon = tok(TokenKind::Semicolon);
    let empty = semicolon.map(|_| Statement::Empty);

    let var_decl_body = seq(
        &tok(TokenKind::Var)
            .then(&identifier)
            .skip(&tok(TokenKind::Assign)),
        &expression,
        |name, initializer| Statement::VarDecl { name, initializer },
    );
    let var_decl = var_decl_body
        .skip(&semicolon)
        .tagged("variable declaration");

    let assign_op = either(vec![
        tok(TokenKind::Assign),
        tok(TokenKind::PlusAssign),
        tok(TokenKind::MinusAssign),
        tok(TokenKind::StarAssign),
        tok(TokenKind::SlashAssign),
        tok(TokenKind::PercentAssign),
    ])
    .tagged("assignment operator");
    let assignment_body = seq(
        &postfix.pair(&assign_op),
        &expression,
        |(lhs, op), rhs| Statement::Assignment { op, lhs, rhs },
    );
    let assignment = assignment_body.skip(&semicolon);

    let expr_stmt = expression.skip(&semicolon).map(Statement::Expr);
    let block_stmt = block.map(Statement::Block);

    let break_stmt = tok(TokenKind::Break).skip(&semicolon).map(|_| Statement::Break);
    let continue_stmt = tok(TokenKind::Continue)
        .skip(&semicolon)
        .map(|_| Statement::Continue);
    let return_stmt = tok(TokenKind::Return)
        .then(&expression)
        .skip(&semicolon)
        .map(Statement::Return)
        .tagged("return statement");

    let condition = enclosed(&tok(TokenKind::LParen), &expression, &tok(TokenKind::RParen));

    let if_stmt = seq(
        &tok(TokenKind::If).then(&condition),
        &statement.pair(&maybe(&tok(TokenKind::Else).then(&statement))),
        |condition, (then_branch, else_branch)| Statement::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        },
    )
    .tagged("if statement");

    let while_stmt = seq(
        &tok(TokenKind::While).then(&condition),
        &statement,
        |condition, body| Statement::While {
            condition,
            body: Box::new(body),
        },
    )
    .tagged("while statement");

    let for_init = either(vec![var_decl_body.clone(), assignment_body.clone()]);
    let for_stmt = seq(
        &seq(
            &tok(TokenKind::For)
                .then(&tok(TokenKind::LParen))
                .then(&maybe(&for_init))
                .skip(&semicolon),
            &maybe(&expression).skip(&semicolon),
            |init, condition| (init, condition),
        ),
        &seq(
            &maybe(&assignment_body).skip(&tok(TokenKind::RParen)),
            &statement,
            |step, body| (step, body),
        ),
        |(init, condition), (step, body)| Statement::For {
            init: init.map(Box::new),
            condition,
            step: step.map(Box::new),
            body: Box::new(body),
        },
    )
    .tagged("for statement");

    statement_slot.fill(
        either(vec![
            empty,
            var_decl,
            assignment,
            expr_stmt,
            block_stmt,
            break_stmt,
            continue_stmt,
            return_stmt,
            if_stmt,
            while_stmt,
            for_stmt,
        ])
        .tagged("statement"),
    );

    block_slot.fill(enclosed(
        &tok(TokenKind::LBrace),
        &many0(&statement),
        &tok(TokenKind::RBrace),
    ));

    many0(&statement)
        .skip(&tok(TokenKind::Eof))
        .map(|statements| Program { statements })
}

/// Lexes and parses a whole source text.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = lexer::tokenize(source)?;
    match grammar().parse(TokenInput::new(tokens)) {
        Ok(parsed) => Ok(parsed.output),
        Err(failure) => Err(ParseError::from_failure(failure)),
    }
}
