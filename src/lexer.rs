//! Combinator-based lexer: characters in, positioned tokens out.
//!
//! Whitespace and comments are consumed between lexemes. Multi-character
//! operators are alternated before their single-character prefixes, and
//! every operator is alternated before the number rule so `1-2` lexes as
//! three tokens rather than `1` followed by `-2`.

use std::rc::Rc;

use crate::combinator::{
    Failure, Input, Parsed, Parser, chr, either, eof, fail, literal, many, many0, many1, maybe,
    neg_literal, none_of, one_of, pure, seq,
};
use crate::parser::ParseError;
use crate::position::Pos;
use crate::token::{Literal, Token, TokenKind};

const IDENT_START: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";
const IDENT_CONT: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_0123456789";
const DIGITS: &str = "0123456789";
const NONZERO_DIGITS: &str = "123456789";

/// Cheaply cloneable character cursor tracking line and column.
#[derive(Debug, Clone)]
pub struct CharInput {
    chars: Rc<[char]>,
    index: usize,
    pos: Pos,
}

impl CharInput {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            pos: Pos::default(),
        }
    }
}

impl Input for CharInput {
    type Item = char;

    fn next(&self) -> Option<(char, Self)> {
        let c = *self.chars.get(self.index)?;
        let pos = if c == '\n' {
            Pos::new(self.pos.line + 1, 0)
        } else {
            Pos::new(self.pos.line, self.pos.column + 1)
        };
        Some((
            c,
            Self {
                chars: Rc::clone(&self.chars),
                index: self.index + 1,
                pos,
            },
        ))
    }

    fn pos(&self) -> Pos {
        self.pos
    }

    fn is_empty(&self) -> bool {
        self.index >= self.chars.len()
    }
}

type Lexeme = (TokenKind, Option<Literal>);

fn padding() -> Parser<CharInput, ()> {
    let whitespace = one_of(" \t\r\n").map(|_| ());
    let line_comment = literal("//").then(&many0(&none_of("\n\r"))).map(|_| ());
    let block_comment = literal("/*")
        .then(&many0(&neg_literal("*/")))
        .skip(&literal("*/"))
        .map(|_| ());
    many(
        &either(vec![whitespace, line_comment, block_comment]),
        (),
        |(), ()| (),
    )
}

fn word() -> Parser<CharInput, Lexeme> {
    let rest = many(&one_of(IDENT_CONT), String::new(), |mut s, c| {
        s.push(c);
        s
    });
    seq(&one_of(IDENT_START), &rest, |first, rest| {
        let mut word = String::new();
        word.push(first);
        word.push_str(&rest);
        word
    })
    .map(classify_word)
}

fn classify_word(word: String) -> Lexeme {
    match word.as_str() {
        "if" => (TokenKind::If, None),
        "else" => (TokenKind::Else, None),
        "for" => (TokenKind::For, None),
        "while" => (TokenKind::While, None),
        "return" => (TokenKind::Return, None),
        "break" => (TokenKind::Break, None),
        "continue" => (TokenKind::Continue, None),
        "var" => (TokenKind::Var, None),
        "function" => (TokenKind::Function, None),
        "nil" => (TokenKind::Nil, Some(Literal::Nil)),
        "true" => (TokenKind::True, Some(Literal::Bool(true))),
        "false" => (TokenKind::False, Some(Literal::Bool(false))),
        _ => (TokenKind::Identifier, Some(Literal::Str(word))),
    }
}

fn string_lexeme() -> Parser<CharInput, Lexeme> {
    let escape = chr('\\').then(&one_of("\\\""));
    let element = either(vec![escape, none_of("\"")]);
    let body = many(&element, String::new(), |mut s, c| {
        s.push(c);
        s
    });
    chr('"')
        .then(&body)
        .skip(&chr('"'))
        .map(|text| (TokenKind::Str, Some(Literal::Str(text))))
}

/// Multi-character operators must come before their prefixes.
const OPERATORS: [(&str, TokenKind); 31] = [
    ("==", TokenKind::EqualEqual),
    ("!=", TokenKind::BangEqual),
    ("<=", TokenKind::LessEqual),
    (">=", TokenKind::GreaterEqual),
    ("+=", TokenKind::PlusAssign),
    ("-=", TokenKind::MinusAssign),
    ("*=", TokenKind::StarAssign),
    ("/=", TokenKind::SlashAssign),
    ("%=", TokenKind::PercentAssign),
    ("&&", TokenKind::AndAnd),
    ("||", TokenKind::OrOr),
    ("=", TokenKind::Assign),
    ("<", TokenKind::Less),
    (">", TokenKind::Greater),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("!", TokenKind::Bang),
    ("^", TokenKind::Caret),
    (";", TokenKind::Semicolon),
    (":", TokenKind::Colon),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
];

fn operator() -> Parser<CharInput, Lexeme> {
    let branches = OPERATORS
        .iter()
        .map(|&(text, kind)| literal(text).map(move |_| (kind, None)))
        .collect();
    either(branches)
}

fn digits1() -> Parser<CharInput, String> {
    many1(&one_of(DIGITS), String::new(), |mut s, c| {
        s.push(c);
        s
    })
}

fn number_lexeme() -> Parser<CharInput, Lexeme> {
    let zero = chr('0').map(|_| "0".to_string());
    let nonzero_led = seq(&one_of(NONZERO_DIGITS), &many(&one_of(DIGITS), String::new(), |mut s, c| {
        s.push(c);
        s
    }), |first, rest| {
        let mut text = String::new();
        text.push(first);
        text.push_str(&rest);
        text
    });
    let integer = either(vec![zero, nonzero_led]);
    let fraction = maybe(&chr('.').then(&digits1()));
    let exponent = maybe(&seq(
        &one_of("eE").then(&maybe(&one_of("+-"))),
        &digits1(),
        |sign, digits| (sign, digits),
    ));

    let text = seq(
        &integer,
        &fraction.pair(&exponent),
        |mut text, (fraction, exponent)| {
            if let Some(fraction) = fraction {
                text.push('.');
                text.push_str(&fraction);
            }
            if let Some((sign, digits)) = exponent {
                text.push('e');
                if let Some(sign) = sign {
                    text.push(sign);
                }
                text.push_str(&digits);
            }
            text
        },
    );

    text.skip(&ident_boundary())
        .bind(|text| match text.parse::<f64>() {
            Ok(value) => pure((TokenKind::Number, Some(Literal::Number(value)))),
            Err(_) => fail("invalid number literal"),
        })
}

/// Rejects a number lexeme running straight into an identifier character,
/// so `123abc` is a lexing error rather than two tokens.
fn ident_boundary() -> Parser<CharInput, ()> {
    Parser::new(|input: CharInput| match input.next() {
        Some((c, _)) if IDENT_CONT.contains(c) => Err(Failure::new(
            input.pos(),
            format!("unexpected character {c:?}"),
        )),
        _ => Ok(Parsed {
            output: (),
            rest: input,
            consumed: false,
            best_alternative: None,
        }),
    })
}

fn token() -> Parser<CharInput, Token> {
    let lexeme = either(vec![word(), string_lexeme(), operator(), number_lexeme()]);
    lexeme
        .positional()
        .map(|(pos, (kind, literal))| match literal {
            Some(literal) => Token::with_literal(kind, pos, literal),
            None => Token::new(kind, pos),
        })
}

fn token_stream() -> Parser<CharInput, Vec<Token>> {
    padding()
        .then(&many0(&token().skip(&padding())))
        .skip(&eof())
}

/// Lexes the whole source, appending a final `Eof` token positioned past
/// the last character.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    match token_stream().parse(CharInput::new(source)) {
        Ok(parsed) => {
            let mut tokens = parsed.output;
            tokens.push(Token::new(TokenKind::Eof, parsed.rest.pos()));
            Ok(tokens)
        }
        Err(failure) => Err(ParseError::from_failure(failure)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    fn number_values(source: &str) -> Vec<f64> {
        tokenize(source)
            .expect("tokenize should succeed")
            .into_iter()
            .filter_map(|token| match token.literal {
                Some(Literal::Number(value)) => Some(value),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn lexes_simple_statement() {
        let tokens = tokenize("var a = 1;").expect("tokenize should succeed");
        let expected = vec![
            TokenKind::Var,
            TokenKind::Identifier,
            TokenKind::Assign,
            TokenKind::Number,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ];
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            expected
        );
        assert_eq!(tokens[1].identifier_name(), Some("a"));
        assert_eq!(tokens[0].pos, Pos::new(0, 0));
        assert_eq!(tokens[3].pos, Pos::new(0, 8));
        assert_eq!(tokens[5].pos, Pos::new(0, 10));
    }

    #[test]
    fn tracks_line_and_column_across_newlines() {
        let tokens = tokenize(indoc! {"
            var a = 1;
            a = 2;
        "})
        .expect("tokenize should succeed");
        // 'a' on the second line
        assert_eq!(tokens[5].pos, Pos::new(1, 0));
        assert_eq!(tokens[6].pos, Pos::new(1, 2));
    }

    #[test]
    fn skips_line_and_block_comments() {
        let source = indoc! {"
            // leading comment
            var a /* inline */ = 1; // trailing
            /* multi
               line */ a = 2;
        "};
        let expected = vec![
            TokenKind::Var,
            TokenKind::Identifier,
            TokenKind::Assign,
            TokenKind::Number,
            TokenKind::Semicolon,
            TokenKind::Identifier,
            TokenKind::Assign,
            TokenKind::Number,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(source), expected);
    }

    #[test]
    fn block_comments_do_not_nest() {
        // The comment ends at the first "*/"; what follows must lex on
        // its own.
        assert_eq!(kinds("/*/**/"), vec![TokenKind::Eof]);
        assert_eq!(
            kinds("/* a /* b */ 1;"),
            vec![TokenKind::Number, TokenKind::Semicolon, TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_number_shapes() {
        assert_eq!(
            number_values("0 42 3.25 0.5 1e3 2.5E-2 7e+1"),
            vec![0.0, 42.0, 3.25, 0.5, 1000.0, 0.025, 70.0]
        );
    }

    #[test]
    fn minus_before_number_is_an_operator() {
        assert_eq!(
            kinds("1-2"),
            vec![
                TokenKind::Number,
                TokenKind::Minus,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn rejects_identifier_starting_with_digit() {
        let error = tokenize("var 1abc = 2;").expect_err("expected lex failure");
        assert_eq!(error.pos, Pos::new(0, 5));
    }

    #[test]
    fn rejects_integer_with_leading_zero() {
        assert!(tokenize("01;").is_err());
    }

    #[test]
    fn lexes_string_escapes() {
        let tokens = tokenize(r#""a\"b\\c""#).expect("tokenize should succeed");
        assert_eq!(
            tokens[0].literal,
            Some(Literal::Str("a\"b\\c".to_string()))
        );
    }

    #[test]
    fn rejects_unterminated_string() {
        let error = tokenize("\"abc").expect_err("expected lex failure");
        assert_eq!(error.pos, Pos::new(0, 4));
    }

    #[test]
    fn keywords_are_not_identifiers() {
        assert_eq!(
            kinds("while whilex"),
            vec![TokenKind::While, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn multi_char_operators_win_over_prefixes() {
        assert_eq!(
            kinds("a <= b == c += 1 && d"),
            vec![
                TokenKind::Identifier,
                TokenKind::LessEqual,
                TokenKind::Identifier,
                TokenKind::EqualEqual,
                TokenKind::Identifier,
                TokenKind::PlusAssign,
                TokenKind::Number,
                TokenKind::AndAnd,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn reports_unexpected_character() {
        let error = tokenize("var a = @;").expect_err("expected lex failure");
        assert_eq!(error.pos, Pos::new(0, 8));
    }

    #[test]
    fn literal_payloads_for_keyword_literals() {
        let tokens = tokenize("true false nil").expect("tokenize should succeed");
        assert_eq!(tokens[0].literal, Some(Literal::Bool(true)));
        assert_eq!(tokens[1].literal, Some(Literal::Bool(false)));
        assert_eq!(tokens[2].literal, Some(Literal::Nil));
    }
}
