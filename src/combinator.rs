//! Generic backtracking parser combinators.
//!
//! A parser is a pure function from an input view to either a success
//! (output, remaining input, consumed-input flag) or a positioned failure
//! carrying an expectation set. The `consumed` flag marks a failure as
//! *committed*: committed failures propagate through `optional` and
//! `many` instead of being absorbed, and dominate error reporting in
//! `either`. `attempt` strips the flag, restoring backtracking at a
//! chosen point.
//!
//! Failure merging follows two rules. A sequence that fails in its second
//! half reports the farther of that failure and any `best_alternative`
//! recorded on the first half's success; at equal positions the
//! expectation sets are unioned. An alternation keeps the best failure
//! seen so far, replacing it only for a committed failure that reached
//! strictly farther, and unioning expectations at equal positions; a
//! branch success occurring while a farther committed failure is held
//! carries that failure along as `best_alternative`.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::position::Pos;

/// Abstract parser input: a cheaply cloneable cursor over items.
pub trait Input: Clone {
    type Item;

    /// The item under the cursor and the input after it.
    fn next(&self) -> Option<(Self::Item, Self)>;
    fn pos(&self) -> Pos;
    fn is_empty(&self) -> bool;
}

/// A failed parse: where it happened, whether input had been consumed by
/// then, and what would have been acceptable instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub pos: Pos,
    pub consumed: bool,
    pub expectations: BTreeSet<String>,
    pub message: String,
    pub context: Option<String>,
}

impl Failure {
    pub fn new(pos: Pos, message: impl Into<String>) -> Self {
        Self {
            pos,
            consumed: false,
            expectations: BTreeSet::new(),
            message: message.into(),
            context: None,
        }
    }

    pub fn expecting(pos: Pos, expectation: impl Into<String>, message: impl Into<String>) -> Self {
        let mut failure = Self::new(pos, message);
        failure.expectations.insert(expectation.into());
        failure
    }
}

/// A successful parse. `best_alternative` records a committed failure from
/// a discarded alternation branch that reached farther than this success;
/// sequencing surfaces it if the overall parse fails later.
#[derive(Debug, Clone)]
pub struct Parsed<I, T> {
    pub output: T,
    pub rest: I,
    pub consumed: bool,
    pub best_alternative: Option<Failure>,
}

pub type ParseResult<I, T> = Result<Parsed<I, T>, Failure>;

/// Of two failures, the one that got farther; expectation sets are unioned
/// when neither did.
fn farther(a: Failure, b: Failure) -> Failure {
    if a.pos.later_than(b.pos) {
        a
    } else if b.pos.later_than(a.pos) {
        b
    } else {
        let mut merged = a;
        merged.expectations.extend(b.expectations);
        merged.consumed = merged.consumed || b.consumed;
        if merged.context.is_none() {
            merged.context = b.context;
        }
        merged
    }
}

fn merge_alternatives(a: Option<Failure>, b: Option<Failure>) -> Option<Failure> {
    match (a, b) {
        (Some(a), Some(b)) => Some(farther(a, b)),
        (a, b) => a.or(b),
    }
}

/// Failure of the second half of a sequence whose first half succeeded:
/// the farther of the failure and the first half's recorded alternative
/// wins, and the sequence counts as consumed if either half consumed.
fn merge_seq_failure(first_consumed: bool, first_best: Option<Failure>, failure: Failure) -> Failure {
    let mut merged = match first_best {
        Some(best) => farther(failure, best),
        None => failure,
    };
    merged.consumed = merged.consumed || first_consumed;
    merged
}

pub struct Parser<I, T> {
    run: Rc<dyn Fn(I) -> ParseResult<I, T>>,
}

impl<I, T> Clone for Parser<I, T> {
    fn clone(&self) -> Self {
        Self {
            run: Rc::clone(&self.run),
        }
    }
}

/// Write-once slot backing a parser created with [`Parser::deferred`];
/// lets mutually recursive grammar rules reference each other before they
/// are built.
pub struct ParserSlot<I, T> {
    cell: Rc<RefCell<Option<Parser<I, T>>>>,
}

impl<I, T> ParserSlot<I, T> {
    pub fn fill(&self, parser: Parser<I, T>) {
        *self.cell.borrow_mut() = Some(parser);
    }
}

impl<I: Input + 'static, T: 'static> Parser<I, T> {
    pub fn new(run: impl Fn(I) -> ParseResult<I, T> + 'static) -> Self {
        Self { run: Rc::new(run) }
    }

    pub fn parse(&self, input: I) -> ParseResult<I, T> {
        (self.run)(input)
    }

    /// A parser that delegates to whatever is later stored in the slot.
    pub fn deferred() -> (Self, ParserSlot<I, T>) {
        let cell: Rc<RefCell<Option<Parser<I, T>>>> = Rc::new(RefCell::new(None));
        let delegate = Rc::clone(&cell);
        let parser = Parser::new(move |input| {
            let inner = delegate
                .borrow()
                .clone()
                .expect("deferred parser used before its slot was filled");
            inner.parse(input)
        });
        (parser, ParserSlot { cell })
    }

    pub fn map<U: 'static>(&self, f: impl Fn(T) -> U + 'static) -> Parser<I, U> {
        let p = self.clone();
        Parser::new(move |input| {
            let parsed = p.parse(input)?;
            Ok(Parsed {
                output: f(parsed.output),
                rest: parsed.rest,
                consumed: parsed.consumed,
                best_alternative: parsed.best_alternative,
            })
        })
    }

    pub fn bind<U: 'static>(&self, f: impl Fn(T) -> Parser<I, U> + 'static) -> Parser<I, U> {
        let p = self.clone();
        Parser::new(move |input| {
            let first = p.parse(input)?;
            match f(first.output).parse(first.rest) {
                Ok(second) => Ok(Parsed {
                    output: second.output,
                    rest: second.rest,
                    consumed: first.consumed || second.consumed,
                    best_alternative: merge_alternatives(
                        first.best_alternative,
                        second.best_alternative,
                    ),
                }),
                Err(failure) => Err(merge_seq_failure(
                    first.consumed,
                    first.best_alternative,
                    failure,
                )),
            }
        })
    }

    /// Both in sequence, keeping both outputs.
    pub fn pair<U: 'static>(&self, q: &Parser<I, U>) -> Parser<I, (T, U)> {
        seq(self, q, |a, b| (a, b))
    }

    /// Both in sequence, keeping only the second output.
    pub fn then<U: 'static>(&self, q: &Parser<I, U>) -> Parser<I, U> {
        seq(self, q, |_, b| b)
    }

    /// Both in sequence, keeping only the first output.
    pub fn skip<U: 'static>(&self, q: &Parser<I, U>) -> Parser<I, T> {
        seq(self, q, |a, _| a)
    }

    /// Names a production for diagnostics: an uncommitted failure has its
    /// expectations replaced by `name`; a committed one gains `name` as
    /// context if it has none yet.
    pub fn tagged(&self, name: &str) -> Parser<I, T> {
        let p = self.clone();
        let name = name.to_string();
        Parser::new(move |input| match p.parse(input) {
            Ok(parsed) => Ok(parsed),
            Err(mut failure) => {
                if !failure.consumed {
                    failure.expectations = BTreeSet::from([name.clone()]);
                } else if failure.context.is_none() {
                    failure.context = Some(name.clone());
                }
                Err(failure)
            }
        })
    }

    /// Reports the inner parser as not having consumed input, so an
    /// enclosing alternation can still backtrack past a committed failure.
    pub fn attempt(&self) -> Parser<I, T> {
        let p = self.clone();
        Parser::new(move |input| match p.parse(input) {
            Ok(mut parsed) => {
                parsed.consumed = false;
                Ok(parsed)
            }
            Err(mut failure) => {
                failure.consumed = false;
                Err(failure)
            }
        })
    }

    /// Pairs the output with the position the parser started at.
    pub fn positional(&self) -> Parser<I, (Pos, T)> {
        let p = self.clone();
        Parser::new(move |input: I| {
            let start = input.pos();
            let parsed = p.parse(input)?;
            Ok(Parsed {
                output: (start, parsed.output),
                rest: parsed.rest,
                consumed: parsed.consumed,
                best_alternative: parsed.best_alternative,
            })
        })
    }
}

/// Succeeds without consuming input.
pub fn pure<I: Input + 'static, T: Clone + 'static>(value: T) -> Parser<I, T> {
    Parser::new(move |input| {
        Ok(Parsed {
            output: value.clone(),
            rest: input,
            consumed: false,
            best_alternative: None,
        })
    })
}

/// Fails without consuming input.
pub fn fail<I: Input + 'static, T: 'static>(message: &str) -> Parser<I, T> {
    let message = message.to_string();
    Parser::new(move |input: I| Err(Failure::new(input.pos(), message.clone())))
}

/// Succeeds only when no input remains.
pub fn eof<I: Input + 'static>() -> Parser<I, ()> {
    Parser::new(|input: I| {
        if input.is_empty() {
            Ok(Parsed {
                output: (),
                rest: input,
                consumed: true,
                best_alternative: None,
            })
        } else {
            Err(Failure::expecting(input.pos(), "end of input", "unexpected"))
        }
    })
}

pub fn seq<I: Input + 'static, A: 'static, B: 'static, C: 'static>(
    p: &Parser<I, A>,
    q: &Parser<I, B>,
    combine: impl Fn(A, B) -> C + 'static,
) -> Parser<I, C> {
    let p = p.clone();
    let q = q.clone();
    Parser::new(move |input| {
        let first = p.parse(input)?;
        match q.parse(first.rest) {
            Ok(second) => Ok(Parsed {
                output: combine(first.output, second.output),
                rest: second.rest,
                consumed: first.consumed || second.consumed,
                best_alternative: merge_alternatives(
                    first.best_alternative,
                    second.best_alternative,
                ),
            }),
            Err(failure) => Err(merge_seq_failure(
                first.consumed,
                first.best_alternative,
                failure,
            )),
        }
    })
}

/// First branch to succeed wins. Branch failures feed a best-so-far error:
/// a committed failure that reached strictly farther replaces it, an
/// equal-position failure unions expectations into it, anything else is
/// discarded. If a branch then succeeds while the held error is committed
/// and reaches past the success, the error rides along as
/// `best_alternative` so later sequencing can still surface it.
pub fn either<I: Input + 'static, T: 'static>(branches: Vec<Parser<I, T>>) -> Parser<I, T> {
    assert!(!branches.is_empty(), "either requires at least one branch");
    Parser::new(move |input: I| {
        let mut best: Option<Failure> = None;
        for branch in &branches {
            match branch.parse(input.clone()) {
                Ok(mut parsed) => {
                    if let Some(failure) = best.take()
                        && failure.consumed
                        && failure.pos.later_than(parsed.rest.pos())
                    {
                        parsed.best_alternative =
                            Some(match parsed.best_alternative.take() {
                                Some(alt) => farther(alt, failure),
                                None => failure,
                            });
                    }
                    return Ok(parsed);
                }
                Err(failure) => merge_into_best(&mut best, failure),
            }
        }
        Err(best.expect("either evaluated no branch"))
    })
}

fn merge_into_best(best: &mut Option<Failure>, new: Failure) {
    match best {
        None => *best = Some(new),
        Some(held) => {
            if new.consumed && new.pos.later_than(held.pos) {
                *held = new;
            } else if !new.pos.later_than(held.pos) && !held.pos.later_than(new.pos) {
                held.expectations.extend(new.expectations);
                held.consumed = held.consumed || new.consumed;
                if held.context.is_none() {
                    held.context = new.context;
                }
            }
        }
    }
}

/// The parser's output, or `default` if it failed without consuming input.
pub fn optional<I: Input + 'static, T: Clone + 'static>(
    default: T,
    p: &Parser<I, T>,
) -> Parser<I, T> {
    let p = p.clone();
    Parser::new(move |input: I| match p.parse(input.clone()) {
        Ok(parsed) => Ok(parsed),
        Err(failure) if !failure.consumed => Ok(Parsed {
            output: default.clone(),
            rest: input,
            consumed: false,
            best_alternative: None,
        }),
        Err(failure) => Err(failure),
    })
}

/// `optional` specialised to `Option`.
pub fn maybe<I: Input + 'static, T: Clone + 'static>(p: &Parser<I, T>) -> Parser<I, Option<T>> {
    optional(None, &p.map(Some))
}

/// Folds zero or more outputs of `p`. Stops at an uncommitted failure or
/// when input runs out; a committed failure mid-stream propagates. A
/// success that consumes nothing also ends the loop, so a nullable parser
/// cannot spin forever.
pub fn many<I: Input + 'static, T: 'static, A: Clone + 'static>(
    p: &Parser<I, T>,
    seed: A,
    fold: impl Fn(A, T) -> A + 'static,
) -> Parser<I, A> {
    let p = p.clone();
    Parser::new(move |input: I| {
        let mut acc = seed.clone();
        let mut rest = input;
        let mut consumed = false;
        loop {
            if rest.is_empty() {
                break;
            }
            match p.parse(rest.clone()) {
                Ok(parsed) => {
                    let stalled = !parsed.consumed;
                    acc = fold(acc, parsed.output);
                    rest = parsed.rest;
                    consumed = consumed || parsed.consumed;
                    if stalled {
                        break;
                    }
                }
                Err(failure) => {
                    if failure.consumed {
                        return Err(failure);
                    }
                    break;
                }
            }
        }
        Ok(Parsed {
            output: acc,
            rest,
            consumed,
            best_alternative: None,
        })
    })
}

/// Like [`many`] but requires at least one output.
pub fn many1<I: Input + 'static, T: 'static, A: Clone + 'static>(
    p: &Parser<I, T>,
    seed: A,
    fold: impl Fn(A, T) -> A + 'static,
) -> Parser<I, A> {
    let fold = Rc::new(fold);
    let tail_fold = Rc::clone(&fold);
    let first = p.clone();
    let rest = p.clone();
    first.bind(move |head| {
        let acc = tail_fold(seed.clone(), head);
        many(&rest, acc, {
            let fold = Rc::clone(&tail_fold);
            move |acc, item| fold(acc, item)
        })
    })
}

/// Zero or more outputs of `p` collected into a vector.
pub fn many0<I: Input + 'static, T: Clone + 'static>(p: &Parser<I, T>) -> Parser<I, Vec<T>> {
    many(p, Vec::new(), |mut items, item| {
        items.push(item);
        items
    })
}

/// Possibly empty list of `p` separated by `sep`; separator output is
/// discarded.
pub fn separated<I: Input + 'static, T: Clone + 'static, S: 'static>(
    p: &Parser<I, T>,
    sep: &Parser<I, S>,
) -> Parser<I, Vec<T>> {
    let tail = many0(&sep.then(p));
    let nonempty = seq(p, &tail, |head, mut rest| {
        rest.insert(0, head);
        rest
    });
    either(vec![nonempty, pure(Vec::new())])
}

/// `p` between `open` and `close`, keeping only `p`'s output.
pub fn enclosed<I: Input + 'static, L: 'static, T: 'static, R: 'static>(
    open: &Parser<I, L>,
    p: &Parser<I, T>,
    close: &Parser<I, R>,
) -> Parser<I, T> {
    open.then(p).skip(close)
}

fn unexpected<I: Input<Item = char>>(input: &I) -> String {
    match input.next() {
        Some((c, _)) => format!("unexpected character {c:?}"),
        None => "unexpected end of input".to_string(),
    }
}

/// Exactly the character `expected`.
pub fn chr<I: Input<Item = char> + 'static>(expected: char) -> Parser<I, char> {
    Parser::new(move |input: I| match input.next() {
        Some((c, rest)) if c == expected => Ok(Parsed {
            output: c,
            rest,
            consumed: true,
            best_alternative: None,
        }),
        _ => Err(Failure::expecting(
            input.pos(),
            format!("{expected:?}"),
            unexpected(&input),
        )),
    })
}

/// Any single character contained in `set`.
pub fn one_of<I: Input<Item = char> + 'static>(set: &str) -> Parser<I, char> {
    let set = set.to_string();
    Parser::new(move |input: I| match input.next() {
        Some((c, rest)) if set.contains(c) => Ok(Parsed {
            output: c,
            rest,
            consumed: true,
            best_alternative: None,
        }),
        _ => Err(Failure::expecting(
            input.pos(),
            format!("one of {set:?}"),
            unexpected(&input),
        )),
    })
}

/// Any single character not contained in `set`.
pub fn none_of<I: Input<Item = char> + 'static>(set: &str) -> Parser<I, char> {
    let set = set.to_string();
    Parser::new(move |input: I| match input.next() {
        Some((c, rest)) if !set.contains(c) => Ok(Parsed {
            output: c,
            rest,
            consumed: true,
            best_alternative: None,
        }),
        _ => Err(Failure::expecting(
            input.pos(),
            format!("none of {set:?}"),
            unexpected(&input),
        )),
    })
}

/// The exact character sequence `expected`. Fails without consuming input
/// on any mismatch, so alternations can order longer operators before
/// their prefixes.
pub fn literal<I: Input<Item = char> + 'static>(expected: &str) -> Parser<I, String> {
    let expected = expected.to_string();
    Parser::new(move |input: I| {
        let mut rest = input.clone();
        for want in expected.chars() {
            match rest.next() {
                Some((c, next)) if c == want => rest = next,
                _ => {
                    return Err(Failure::expecting(
                        input.pos(),
                        format!("{expected:?}"),
                        unexpected(&input),
                    ));
                }
            }
        }
        Ok(Parsed {
            output: expected.clone(),
            rest,
            consumed: !expected.is_empty(),
            best_alternative: None,
        })
    })
}

/// One character, provided the input does not start with `stop`.
pub fn neg_literal<I: Input<Item = char> + 'static>(stop: &str) -> Parser<I, char> {
    let stop = stop.to_string();
    Parser::new(move |input: I| {
        let mut probe = input.clone();
        let mut matches = true;
        for want in stop.chars() {
            match probe.next() {
                Some((c, next)) if c == want => probe = next,
                _ => {
                    matches = false;
                    break;
                }
            }
        }
        if matches {
            return Err(Failure::expecting(
                input.pos(),
                format!("not {stop:?}"),
                unexpected(&input),
            ));
        }
        match input.next() {
            Some((c, rest)) => Ok(Parsed {
                output: c,
                rest,
                consumed: true,
                best_alternative: None,
            }),
            None => Err(Failure::new(input.pos(), "unexpected end of input")),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::CharInput;

    fn input(src: &str) -> CharInput {
        CharInput::new(src)
    }

    fn expectations(failure: &Failure) -> Vec<&str> {
        failure.expectations.iter().map(String::as_str).collect()
    }

    #[test]
    fn literal_matches_and_fails_uncommitted() {
        let p = literal::<CharInput>("ab");
        let parsed = p.parse(input("abc")).expect("should match");
        assert!(parsed.consumed);
        assert_eq!(parsed.output, "ab");

        let failure = p.parse(input("ax")).expect_err("should fail");
        assert!(!failure.consumed);
        assert_eq!(failure.pos, Pos::new(0, 0));
    }

    #[test]
    fn either_unions_expectations_at_same_position() {
        let p = either(vec![literal::<CharInput>("foo"), literal::<CharInput>("bar")]);
        let failure = p.parse(input("qux")).expect_err("should fail");
        assert_eq!(expectations(&failure), vec!["\"bar\"", "\"foo\""]);
    }

    #[test]
    fn either_replaces_best_with_farther_committed_failure() {
        let short = chr::<CharInput>('a').then(&chr('x'));
        let long = chr::<CharInput>('a').then(&chr('b')).then(&chr('x'));
        let p = either(vec![short, long]);
        let failure = p.parse(input("abc")).expect_err("should fail");
        assert!(failure.consumed);
        assert_eq!(failure.pos, Pos::new(0, 2));
        assert_eq!(expectations(&failure), vec!["'x'"]);
    }

    #[test]
    fn either_discards_farther_uncommitted_failure() {
        // attempt strips the consumed flag, so the deeper second failure
        // loses to the held first one.
        let short = chr::<CharInput>('a').then(&chr('x')).attempt();
        let long = chr::<CharInput>('a').then(&chr('b')).then(&chr('x')).attempt();
        let p = either(vec![short, long]);
        let failure = p.parse(input("abc")).expect_err("should fail");
        assert_eq!(failure.pos, Pos::new(0, 1));
    }

    #[test]
    fn either_recovers_after_committed_branch_failure() {
        let committed = chr::<CharInput>('a').then(&chr('b')).then(&chr('c'));
        let p = either(vec![committed, chr::<CharInput>('a').map(|_| 'z')]);
        let parsed = p.parse(input("abx")).expect("later branch should run");
        assert_eq!(parsed.output, 'z');
        // The committed failure outran the one-char success and must be
        // kept for later sequencing.
        let alt = parsed.best_alternative.expect("alternative recorded");
        assert_eq!(alt.pos, Pos::new(0, 2));
    }

    #[test]
    fn seq_reports_discarded_alternative_that_reached_farther() {
        // The first alternation branch consumes "ab" before failing; the
        // winning branch only consumes "a". When the following 'z' then
        // fails, the error surfaces from the discarded branch.
        let deep = chr::<CharInput>('a').then(&chr('b')).then(&chr('c'));
        let shallow = chr::<CharInput>('a');
        let p = either(vec![deep, shallow]).then(&chr('z'));
        let failure = p.parse(input("abq")).expect_err("should fail");
        assert_eq!(failure.pos, Pos::new(0, 2));
        assert_eq!(expectations(&failure), vec!["'c'"]);
    }

    #[test]
    fn seq_unions_expectations_with_alternative_at_same_position() {
        // The discarded branch reaches (0, 2); so does the failure of the
        // parser sequenced after the winning branch.
        let deep = chr::<CharInput>('a').then(&chr('b')).then(&chr('c'));
        let shallow = chr::<CharInput>('a');
        let p = either(vec![deep, shallow]).then(&chr('b')).then(&chr('z'));
        let failure = p.parse(input("abq")).expect_err("should fail");
        assert_eq!(failure.pos, Pos::new(0, 2));
        assert_eq!(expectations(&failure), vec!["'c'", "'z'"]);
    }

    #[test]
    fn optional_defaults_on_uncommitted_failure_only() {
        let p = optional('d', &chr::<CharInput>('a'));
        let parsed = p.parse(input("x")).expect("should default");
        assert_eq!(parsed.output, 'd');
        assert!(!parsed.consumed);

        let committed = chr::<CharInput>('a').then(&chr('b'));
        let p = optional('d', &committed);
        let failure = p.parse(input("ax")).expect_err("committed failure propagates");
        assert!(failure.consumed);
    }

    #[test]
    fn many_stops_at_uncommitted_failure_and_propagates_committed() {
        let p = many0(&chr::<CharInput>('a'));
        let parsed = p.parse(input("aab")).expect("should stop at 'b'");
        assert_eq!(parsed.output, vec!['a', 'a']);

        let pair = chr::<CharInput>('a').then(&chr('b'));
        let p = many0(&pair);
        let failure = p.parse(input("abax")).expect_err("mid-stream failure");
        assert!(failure.consumed);
        assert_eq!(failure.pos, Pos::new(0, 3));
    }

    #[test]
    fn many1_requires_one_output() {
        let p = many1(&chr::<CharInput>('a'), String::new(), |mut s, c| {
            s.push(c);
            s
        });
        assert_eq!(p.parse(input("aa")).expect("two").output, "aa");
        assert!(p.parse(input("b")).is_err());
    }

    #[test]
    fn separated_allows_empty_lists() {
        let p = separated(&chr::<CharInput>('a'), &chr(','));
        assert_eq!(p.parse(input("a,a,a")).expect("three").output.len(), 3);
        assert_eq!(p.parse(input("b")).expect("empty").output.len(), 0);
    }

    #[test]
    fn tagged_replaces_expectations_when_uncommitted() {
        let p = either(vec![literal::<CharInput>("foo"), literal::<CharInput>("bar")])
            .tagged("greeting");
        let failure = p.parse(input("qux")).expect_err("should fail");
        assert_eq!(expectations(&failure), vec!["greeting"]);
    }

    #[test]
    fn tagged_attaches_context_when_committed() {
        let p = chr::<CharInput>('a').then(&chr('b')).tagged("pair");
        let failure = p.parse(input("ax")).expect_err("should fail");
        assert!(failure.consumed);
        assert_eq!(expectations(&failure), vec!["'b'"]);
        assert_eq!(failure.context.as_deref(), Some("pair"));
    }

    #[test]
    fn eof_matches_only_at_end() {
        assert!(eof::<CharInput>().parse(input("")).is_ok());
        let failure = eof::<CharInput>().parse(input("x")).expect_err("not at end");
        assert_eq!(expectations(&failure), vec!["end of input"]);
    }

    #[test]
    fn neg_literal_advances_one_char_unless_stopped() {
        let p = neg_literal::<CharInput>("*/");
        assert_eq!(p.parse(input("ab")).expect("plain char").output, 'a');
        assert_eq!(p.parse(input("*a")).expect("lone star").output, '*');
        assert!(p.parse(input("*/")).is_err());
    }

    #[test]
    fn deferred_supports_recursive_grammars() {
        // nest := '(' nest ')' | 'x', depth as output
        let (nest, slot) = Parser::<CharInput, usize>::deferred();
        let wrapped = enclosed(&chr('('), &nest, &chr(')')).map(|depth| depth + 1);
        slot.fill(either(vec![wrapped, chr::<CharInput>('x').map(|_| 0)]));

        assert_eq!(nest.parse(input("((x))")).expect("nested").output, 2);
        let failure = nest.parse(input("((x)")).expect_err("missing close");
        assert_eq!(failure.pos, Pos::new(0, 4));
    }
}
