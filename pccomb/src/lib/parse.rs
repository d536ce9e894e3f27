// Copyright (c) 2018 King's College London
// created by the Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0
//
// Subject to the condition set forth below, permission is hereby granted to any person obtaining a
// copy of this software, associated documentation and/or data (collectively the "Software"), free
// of charge and under any and all copyright rights in the Software, and any and all patent rights
// owned or freely licensable by each licensor hereunder covering either (i) the unmodified
// Software as contributed to or provided by such licensor, or (ii) the Larger Works (as defined
// below), to deal in both
//
// (a) the Software, and
// (b) any piece of software and/or hardware listed in the lrgrwrks.txt file
// if one is included with the Software (each a "Larger Work" to which the Software is contributed
// by such licensors),
//
// without restriction, including without limitation the rights to copy, create derivative works
// of, display, perform, and distribute the Software and make, use, sell, offer for sale, import,
// export, have made, and have sold the Software and the Larger Work(s), and to sublicense the
// foregoing rights on either these or other terms.
//
// This license is subject to the following condition: The above copyright notice and either this
// complete permission notice or at a minimum a reference to the UPL must be included in all copies
// or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Driver entry points: run a grammar against an input, producing one value, all values, or a
//! position-bearing error.

use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process;
use std::rc::Rc;

use pcbuf::{Buf, Pos, PosStyle};
use pclex::{eof, BlankFn};

use comb::{lexeme, seq, Grm};
use cont::{null_err, Cont, ErrFn, LazyVal};
use env::Env;
use sched::Sched;

/// A failed parse: the furthest position any terminal reached, and the expectation messages
/// accumulated there, deduplicated and sorted.
#[derive(Debug)]
pub struct ParseError {
    buf: Buf,
    col: usize,
    msgs: Vec<String>
}

impl ParseError {
    fn new(buf: Buf, col: usize, msgs: Vec<String>) -> ParseError {
        ParseError { buf, col, msgs }
    }

    pub fn buf(&self) -> &Buf {
        &self.buf
    }

    /// Absolute byte offset of the failure.
    pub fn col(&self) -> usize {
        self.col
    }

    pub fn pos(&self) -> Pos {
        self.buf.pos(self.col)
    }

    pub fn msgs(&self) -> &[String] {
        &self.msgs
    }

    pub fn styled(&self, style: PosStyle) -> ParseErrorDisplay {
        ParseErrorDisplay { err: self, style }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.styled(PosStyle::Short).fmt(f)
    }
}

pub struct ParseErrorDisplay<'a> {
    err: &'a ParseError,
    style: PosStyle
}

impl<'a> fmt::Display for ParseErrorDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Parse error: {}", self.err.pos().style(self.style))?;
        if !self.err.msgs.is_empty() {
            write!(f, "\nexpecting: {}", self.err.msgs.join(", "))?;
        }
        Ok(())
    }
}

/// Print `e` on stderr in the given style.
pub fn report(e: &ParseError, style: PosStyle) {
    let _ = writeln!(io::stderr(), "{}", e.styled(style));
}

/// Unwrap a parse result, reporting any error on stderr and exiting with status 1.
pub fn handle<T>(r: Result<T, ParseError>, style: PosStyle) -> T {
    match r {
        Ok(v) => v,
        Err(e) => {
            report(&e, style);
            process::exit(1)
        }
    }
}

/// A parse that may also fail before parsing, while reading its input.
#[derive(Debug)]
pub enum InputError {
    Io(io::Error),
    Parse(ParseError)
}

impl From<io::Error> for InputError {
    fn from(err: io::Error) -> InputError {
        InputError::Io(err)
    }
}

impl From<ParseError> for InputError {
    fn from(err: ParseError) -> InputError {
        InputError::Parse(err)
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            InputError::Io(ref e) => e.fmt(f),
            InputError::Parse(ref e) => e.fmt(f)
        }
    }
}

fn unwrap_rc<T: Clone>(rc: Rc<T>) -> T {
    Rc::try_unwrap(rc).unwrap_or_else(|rc| (*rc).clone())
}

// Run `g` to the scheduler's end. Per result: the value, the end buffer, the pre-blank end
// column and the post-blank end column.
fn run_parse<T: 'static>(
    g: &Grm<T>,
    blank: &BlankFn,
    buf: &Buf,
    col: usize,
    all: bool
) -> Result<Vec<(Rc<T>, Buf, usize, usize)>, ParseError> {
    let mut s = Sched::new(all);
    let env = Env::start(buf.clone(), col, Rc::clone(blank));
    let env0 = env.clone();
    let kterm = Cont::base(|s: &mut Sched, env: Env, lv: LazyVal, err: ErrFn| match lv.force() {
        Ok(v) => {
            s.record(v, env);
            if s.all() {
                err(s);
            } else {
                s.stop();
            }
        }
        Err(rej) => {
            env.record_reject(&rej);
            err(s);
        }
    });
    g.call(&mut s, env, kterm, null_err());
    s.drain();
    let results = s.into_results();
    if results.is_empty() {
        let (ebuf, ecol, msgs) = env0.progress_snapshot();
        return Err(ParseError::new(ebuf, ecol, msgs));
    }
    Ok(results
        .into_iter()
        .map(|(v, env)| {
            let v = v.downcast::<T>().unwrap();
            (v, env.lex_buf.clone(), env.lex_col, env.cur_col)
        })
        .collect())
}

fn to_end<T: Clone + 'static>(g: &Grm<T>) -> Grm<T> {
    seq(g.clone(), lexeme(eof()), |v: &T, _| v.clone())
}

/// Parse the whole of `buf` from `col`, returning the first complete value.
pub fn parse_buffer<T: Clone + 'static>(
    g: &Grm<T>,
    blank: &BlankFn,
    buf: &Buf,
    col: usize
) -> Result<T, ParseError> {
    let mut results = run_parse(&to_end(g), blank, buf, col, false)?;
    let (v, _, _, _) = results.remove(0);
    Ok(unwrap_rc(v))
}

/// Parse the whole of `buf` from `col`, returning every complete value. The number of results is
/// the number of distinct derivations, unless a merging cache has folded some together.
pub fn parse_all_buffer<T: Clone + 'static>(
    g: &Grm<T>,
    blank: &BlankFn,
    buf: &Buf,
    col: usize
) -> Result<Vec<T>, ParseError> {
    let results = run_parse(&to_end(g), blank, buf, col, true)?;
    Ok(results.into_iter().map(|(v, _, _, _)| unwrap_rc(v)).collect())
}

/// Parse a prefix of `buf` from `col`, returning the value and the end position — pre-blank or
/// post-blank according to `blank_after`. It is an error for the grammar to match the prefix in
/// more than one way.
pub fn partial_parse_buffer<T: Clone + 'static>(
    g: &Grm<T>,
    blank: &BlankFn,
    blank_after: bool,
    buf: &Buf,
    col: usize
) -> Result<(T, Buf, usize), ParseError> {
    let results = run_parse(g, blank, buf, col, true)?;
    if results.len() > 1 {
        let (_, ref ebuf, lex_col, _) = results[0];
        return Err(ParseError::new(
            ebuf.clone(),
            lex_col,
            vec!["ambiguous parse".to_owned()]
        ));
    }
    let (v, ebuf, lex_col, cur_col) = results.into_iter().next().unwrap();
    let end = if blank_after { cur_col } else { lex_col };
    Ok((unwrap_rc(v), ebuf, end))
}

/// Parse a complete string.
pub fn parse_str<T: Clone + 'static>(
    g: &Grm<T>,
    blank: &BlankFn,
    name: &str,
    s: &str
) -> Result<T, ParseError> {
    parse_buffer(g, blank, &Buf::from_str(name, s), 0)
}

/// Parse a complete string, returning every value.
pub fn parse_all_str<T: Clone + 'static>(
    g: &Grm<T>,
    blank: &BlankFn,
    name: &str,
    s: &str
) -> Result<Vec<T>, ParseError> {
    parse_all_buffer(g, blank, &Buf::from_str(name, s), 0)
}

/// Parse a prefix of a string.
pub fn partial_parse_str<T: Clone + 'static>(
    g: &Grm<T>,
    blank: &BlankFn,
    blank_after: bool,
    name: &str,
    s: &str
) -> Result<(T, Buf, usize), ParseError> {
    partial_parse_buffer(g, blank, blank_after, &Buf::from_str(name, s), 0)
}

/// Parse everything a reader yields.
pub fn parse_read<T: Clone + 'static, R: Read>(
    g: &Grm<T>,
    blank: &BlankFn,
    name: &str,
    rdr: R
) -> Result<T, InputError> {
    let buf = Buf::from_read(name, rdr)?;
    Ok(parse_buffer(g, blank, &buf, 0)?)
}

/// Parse a complete file.
pub fn parse_file<T: Clone + 'static, P: AsRef<Path>>(
    g: &Grm<T>,
    blank: &BlankFn,
    path: P
) -> Result<T, InputError> {
    let buf = Buf::from_file(path)?;
    Ok(parse_buffer(g, blank, &buf, 0)?)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;
    use std::thread;

    use pcbuf::PosStyle;
    use pclex::{blank_charset, blank_none, char_t, float, ident, string_t, BlankFn};
    use pcset::CharSet;

    use assoc::Key;
    use cache::{cache, cache_merge};
    use comb::{
        alt, change_layout, lexeme, lr, map, read_tbl, seq, seq_left, seq_right, star, Grm,
        GrmCell, LayoutConfig
    };
    use super::{parse_all_str, parse_read, parse_str, partial_parse_str};

    fn sp() -> BlankFn {
        blank_charset(CharSet::from_bytes(b" "))
    }

    // expr = atom | expr '*' atom | expr '+' expr, layered so that '*' binds tighter and both
    // operators associate left.
    fn calc() -> Grm<f64> {
        let expr_cell: GrmCell<f64> = GrmCell::new("expr");
        let expr = expr_cell.grammar();
        let atom = alt(
            CharSet::range(b'0', b'9'),
            map(lexeme(float()), |f: &f64| *f),
            CharSet::from_bytes(b"("),
            seq_left(seq_right(lexeme(char_t('(')), expr), lexeme(char_t(')')))
        );
        let kp = Key::<f64>::new();
        let prod = lr(
            atom.clone(),
            kp,
            seq(seq_left(read_tbl(kp), lexeme(char_t('*'))), atom, |l, r| l * r)
        );
        let ks = Key::<f64>::new();
        let sum = lr(
            prod.clone(),
            ks,
            seq(seq_left(read_tbl(ks), lexeme(char_t('+'))), prod, |l, r| l + r)
        );
        expr_cell.set(sum.clone());
        sum
    }

    #[test]
    fn test_arith_priorities() {
        let g = calc();
        assert_eq!(parse_str(&g, &sp(), "t", "1+2*3").unwrap(), 7.0);
        assert_eq!(parse_all_str(&g, &sp(), "t", "1+2*3").unwrap(), vec![7.0]);
        assert_eq!(parse_str(&g, &sp(), "t", "(1+2)*3").unwrap(), 9.0);
        assert_eq!(parse_str(&g, &sp(), "t", "2 * 3 + 4 * 5").unwrap(), 26.0);
    }

    #[derive(Clone, Debug, PartialEq)]
    enum Sexp {
        Atom(String),
        List(Vec<Sexp>)
    }

    // Number of list elements, at every nesting level.
    fn sexp_size(s: &Sexp) -> usize {
        match *s {
            Sexp::Atom(_) => 0,
            Sexp::List(ref v) => v.len() + v.iter().map(sexp_size).sum::<usize>()
        }
    }

    fn sexp() -> Grm<Sexp> {
        let cell: GrmCell<Sexp> = GrmCell::new("sexp");
        let mut item_cs = CharSet::range(b'a', b'z');
        item_cs.union(&CharSet::range(b'A', b'Z'));
        item_cs.union(&CharSet::from_bytes(b"_("));
        let atom = map(lexeme(ident()), |s: &String| Sexp::Atom(s.clone()));
        let list = map(
            seq_left(
                seq_right(lexeme(char_t('(')), star(item_cs.clone(), cell.grammar())),
                lexeme(char_t(')'))
            ),
            |v: &Vec<Sexp>| Sexp::List(v.clone())
        );
        let mut atom_cs = CharSet::range(b'a', b'z');
        atom_cs.union(&CharSet::range(b'A', b'Z'));
        atom_cs.union(&CharSet::from_bytes(b"_"));
        cell.set(alt(atom_cs, atom, CharSet::from_bytes(b"("), list));
        cell.grammar()
    }

    #[test]
    fn test_sexp() {
        let g = sexp();
        let v = parse_str(&g, &sp(), "t", "(a (b c) d)").unwrap();
        assert_eq!(sexp_size(&v), 5);
        match v {
            Sexp::List(ref v) => {
                assert_eq!(v.len(), 3);
                match v[1] {
                    Sexp::List(ref w) => assert_eq!(w.len(), 2),
                    _ => panic!("middle child should be a list")
                }
            }
            _ => panic!("expected a list")
        }
        assert!(parse_str(&g, &sp(), "t", "(a (b c d)").is_err());
    }

    #[test]
    fn test_right_recursion_is_linear() {
        // 10,000 items: quadratic transformer evaluation or per-item descent would take far too
        // long here, and unbounded recursion would blow the stack. The generous stack is for
        // dropping the O(n) result chain, not for parsing.
        let h = thread::Builder::new()
            .stack_size(32 * 1024 * 1024)
            .spawn(|| {
                let g = star(CharSet::from_bytes(b"a"), map(lexeme(char_t('a')), |c| *c));
                let mut s = String::new();
                for _ in 0..10_000 {
                    s.push_str("a ");
                }
                let vs = parse_all_str(&g, &sp(), "t", &s).unwrap();
                assert_eq!(vs.len(), 1);
                assert_eq!(vs[0].len(), 10_000);
            })
            .unwrap();
        h.join().unwrap();
    }

    fn ambiguous_a() -> Grm<char> {
        let a = CharSet::from_bytes(b"a");
        alt(
            a.clone(),
            map(lexeme(char_t('a')), |c| *c),
            a,
            map(lexeme(char_t('a')), |c| *c)
        )
    }

    #[test]
    fn test_cache_merge_folds_ambiguity() {
        // Uncached, both derivations are reported.
        assert_eq!(parse_all_str(&ambiguous_a(), &sp(), "t", "a").unwrap().len(), 2);
        // A plain cache is transparent.
        assert_eq!(
            parse_all_str(&cache(ambiguous_a()), &sp(), "t", "a").unwrap().len(),
            2
        );
        // A merging cache folds the two same-end derivations into one.
        let g = cache_merge(ambiguous_a(), |x: &char, _: &char| *x);
        assert_eq!(parse_all_str(&g, &sp(), "t", "a").unwrap(), vec!['a']);
    }

    #[test]
    fn test_alt_commutes_under_parse_all() {
        let one = || map(lexeme(char_t('a')), |_| 1);
        let two = || map(lexeme(char_t('a')), |_| 2);
        let a = || CharSet::from_bytes(b"a");
        let mut r12 = parse_all_str(&alt(a(), one(), a(), two()), &sp(), "t", "a").unwrap();
        let mut r21 = parse_all_str(&alt(a(), two(), a(), one()), &sp(), "t", "a").unwrap();
        r12.sort();
        r21.sort();
        assert_eq!(r12, r21);
        assert_eq!(r12, vec![1, 2]);
    }

    #[test]
    fn test_furthest_position_reported() {
        let g = map(lexeme(string_t("abc")), |s: &String| s.clone());
        let e = parse_str(&g, &blank_none(), "t", "abd").unwrap_err();
        assert_eq!(e.col(), 2);
        assert_eq!(e.pos().col(), 2);
        assert!(e.msgs().iter().any(|m| m == "abc"));
        let rendered = format!("{}", e.styled(PosStyle::Short));
        assert!(rendered.starts_with("Parse error: t:1:2"));
        assert!(rendered.contains("expecting: abc"));
        let long = format!("{}", e.styled(PosStyle::Long));
        assert!(long.contains("File \"t\", line 1, character 2"));
    }

    #[test]
    fn test_change_layout_is_scoped() {
        let inner = map(lexeme(char_t('a')), |c| *c);
        let mid = change_layout(
            blank_charset(CharSet::from_bytes(b" \t")),
            LayoutConfig::default(),
            inner
        );
        let braced = seq(
            seq_right(lexeme(char_t('{')), mid),
            lexeme(char_t('}')),
            |a, _| *a
        );
        let g = seq(braced, lexeme(char_t('z')), |a, _| *a);
        // Inside the braces tabs are blanks; after the closing brace the outer blank (spaces
        // only) is back in force and still consumes the following space.
        assert_eq!(parse_str(&g, &sp(), "t", "{\ta\t} z").unwrap(), 'a');
        assert!(parse_str(&g, &sp(), "t", "{\ta\t}\tz").is_err());
    }

    #[test]
    fn test_partial_parse() {
        let g = map(lexeme(ident()), |s: &String| s.clone());
        let (v, _, end) = partial_parse_str(&g, &sp(), false, "t", "abc  def").unwrap();
        assert_eq!((v.as_str(), end), ("abc", 3));
        let (_, _, end) = partial_parse_str(&g, &sp(), true, "t", "abc  def").unwrap();
        assert_eq!(end, 5);
        let e = partial_parse_str(&ambiguous_a(), &sp(), false, "t", "a").unwrap_err();
        assert_eq!(e.msgs(), &["ambiguous parse".to_owned()]);
    }

    #[test]
    fn test_read_wrapper() {
        let v = parse_read(&calc(), &sp(), "rdr", Cursor::new("40 + 2")).unwrap();
        assert_eq!(v, 42.0);
    }
}
