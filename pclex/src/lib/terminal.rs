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

use std::rc::Rc;

use num_traits::{CheckedAdd, CheckedMul, CheckedSub, NumCast, PrimInt, Signed, Unsigned};
use regex::Regex;

use pcbuf::Buf;
use pcset::CharSet;

use {ALNUM_CS, DIGIT_CS};

/// A terminal failure: `col` is the byte column at which matching broke down (which may be past
/// the column the match started at), `msg` an optional expectation message for that column.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TermErr {
    pub col: usize,
    pub msg: Option<String>
}

impl TermErr {
    /// An unrecoverable local mismatch with no message of its own.
    pub fn no_parse(col: usize) -> TermErr {
        TermErr { col, msg: None }
    }

    /// A mismatch contributing an expectation message at `col`.
    pub fn give_up<S: Into<String>>(col: usize, msg: S) -> TermErr {
        TermErr {
            col,
            msg: Some(msg.into())
        }
    }
}

type TermFn<T> = Rc<dyn Fn(&Buf, usize) -> Result<(T, usize), TermErr>>;

/// A first-class terminal: a parse function from (buffer, column) to a value and the post-consume
/// column (blanks not yet skipped), plus a predict set and a name for expectation messages.
pub struct Terminal<T> {
    name: Option<String>,
    cs: CharSet,
    f: TermFn<T>
}

impl<T> Clone for Terminal<T> {
    fn clone(&self) -> Self {
        Terminal {
            name: self.name.clone(),
            cs: self.cs.clone(),
            f: Rc::clone(&self.f)
        }
    }
}

impl<T: 'static> Terminal<T> {
    pub fn new<F>(name: Option<String>, cs: CharSet, f: F) -> Terminal<T>
    where
        F: Fn(&Buf, usize) -> Result<(T, usize), TermErr> + 'static
    {
        Terminal {
            name,
            cs,
            f: Rc::new(f)
        }
    }

    /// Attempt a match at (buf, col).
    pub fn parse(&self, buf: &Buf, col: usize) -> Result<(T, usize), TermErr> {
        (self.f)(buf, col)
    }

    pub fn charset(&self) -> &CharSet {
        &self.cs
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(|s| s.as_str())
    }

    /// Replace the terminal's name (and hence its expectation message).
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Terminal<T> {
        self.name = Some(name.into());
        self
    }

    /// Apply `g` to the terminal's value.
    pub fn map<U: 'static, G: Fn(T) -> U + 'static>(self, g: G) -> Terminal<U> {
        let f = self.f;
        Terminal {
            name: self.name,
            cs: self.cs,
            f: Rc::new(move |buf, col| f(buf, col).map(|(v, ncol)| (g(v), ncol)))
        }
    }
}

/// Any single character.
pub fn any() -> Terminal<char> {
    Terminal::new(Some("any character".to_owned()), CharSet::full(), |buf, col| match buf
        .char_at(col)
    {
        Some(c) => Ok((c, col + c.len_utf8())),
        None => Err(TermErr::no_parse(col))
    })
}

/// A single character satisfying `pred`. `cs` must predict at least every byte a matching
/// character can start with.
pub fn pred_t<S, F>(name: S, cs: CharSet, pred: F) -> Terminal<char>
where
    S: Into<String>,
    F: Fn(char) -> bool + 'static
{
    let name = name.into();
    let msg = name.clone();
    Terminal::new(Some(name), cs, move |buf, col| match buf.char_at(col) {
        Some(c) if pred(c) => Ok((c, col + c.len_utf8())),
        _ => Err(TermErr::give_up(col, msg.clone()))
    })
}

/// Exactly the character `c`.
pub fn char_t(c: char) -> Terminal<char> {
    let mut utf8 = [0; 4];
    let cs = CharSet::from_bytes(&c.encode_utf8(&mut utf8).as_bytes()[..1]);
    let msg = c.to_string();
    Terminal::new(Some(msg.clone()), cs, move |buf, col| match buf.char_at(col) {
        Some(d) if d == c => Ok((c, col + c.len_utf8())),
        _ => Err(TermErr::give_up(col, msg.clone()))
    })
}

/// A single character drawn from `cs`.
pub fn charset_t(cs: CharSet) -> Terminal<char> {
    let msg = format!("{}", cs);
    let cs2 = cs.clone();
    Terminal::new(Some(msg.clone()), cs, move |buf, col| {
        match buf.char_at(col) {
            Some(c) if cs2.contains(buf.byte_at(col)) => Ok((c, col + c.len_utf8())),
            _ => Err(TermErr::give_up(col, msg.clone()))
        }
    })
}

/// The literal string `s`. On a partial match, the reported failure column is that of the first
/// mismatching byte.
pub fn string_t(s: &str) -> Terminal<String> {
    assert!(!s.is_empty(), "string terminal must be non-empty");
    let cs = CharSet::from_bytes(&s.as_bytes()[..1]);
    let want = s.to_owned();
    let msg = s.to_owned();
    Terminal::new(Some(s.to_owned()), cs, move |buf, col| {
        let bs = want.as_bytes();
        for (i, b) in bs.iter().enumerate() {
            if buf.byte_at(col + i) != Some(*b) {
                return Err(TermErr::give_up(col + i, msg.clone()));
            }
        }
        Ok((want.clone(), col + bs.len()))
    })
}

fn digits_end(buf: &Buf, mut col: usize) -> usize {
    while let Some(b) = buf.byte_at(col) {
        if !b.is_ascii_digit() {
            break;
        }
        col += 1;
    }
    col
}

/// A natural number literal, generic over the unsigned integer type it produces. Overflowing
/// literals are rejected with a message rather than wrapped.
pub fn nat<N>() -> Terminal<N>
where
    N: PrimInt + Unsigned + CheckedAdd + CheckedMul + 'static
{
    Terminal::new(Some("natural".to_owned()), DIGIT_CS.clone(), |buf, col| {
        let end = digits_end(buf, col);
        if end == col {
            return Err(TermErr::give_up(col, "natural"));
        }
        let mut acc = N::zero();
        let ten: N = NumCast::from(10u8).unwrap();
        for i in col..end {
            let d: N = NumCast::from(buf.byte_at(i).unwrap() - b'0').unwrap();
            acc = match acc.checked_mul(&ten).and_then(|a| a.checked_add(&d)) {
                Some(a) => a,
                None => return Err(TermErr::give_up(col, "natural (overflows)"))
            };
        }
        Ok((acc, end))
    })
}

/// A signed integer literal with an optional leading `+` or `-`.
pub fn int<N>() -> Terminal<N>
where
    N: PrimInt + Signed + CheckedAdd + CheckedMul + CheckedSub + 'static
{
    let mut cs = DIGIT_CS.clone();
    cs.union(&CharSet::from_bytes(b"+-"));
    Terminal::new(Some("integer".to_owned()), cs, |buf, col| {
        let (neg, dstart) = match buf.byte_at(col) {
            Some(b'-') => (true, col + 1),
            Some(b'+') => (false, col + 1),
            _ => (false, col)
        };
        let end = digits_end(buf, dstart);
        if end == dstart {
            return Err(TermErr::give_up(col, "integer"));
        }
        let mut acc = N::zero();
        let ten: N = NumCast::from(10u8).unwrap();
        for i in dstart..end {
            let d: N = NumCast::from(buf.byte_at(i).unwrap() - b'0').unwrap();
            // Accumulate negatively so N::min_value() parses.
            acc = match acc.checked_mul(&ten).and_then(|a| a.checked_sub(&d)) {
                Some(a) => a,
                None => return Err(TermErr::give_up(col, "integer (overflows)"))
            };
        }
        if !neg {
            acc = match N::zero().checked_sub(&acc) {
                Some(a) => a,
                None => return Err(TermErr::give_up(col, "integer (overflows)"))
            };
        }
        Ok((acc, end))
    })
}

lazy_static! {
    static ref FLOAT_RE: Regex =
        Regex::new(r"^[-+]?[0-9]+(\.[0-9]*)?([eE][-+]?[0-9]+)?").unwrap();
}

/// A floating point literal in the usual decimal-with-exponent syntax.
pub fn float() -> Terminal<f64> {
    let mut cs = DIGIT_CS.clone();
    cs.union(&CharSet::from_bytes(b"+-"));
    Terminal::new(Some("float".to_owned()), cs, |buf, col| {
        match buf.text().get(col..).and_then(|s| FLOAT_RE.find(s)) {
            Some(m) if m.end() > 0 => {
                let v = match m.as_str().parse::<f64>() {
                    Ok(v) => v,
                    Err(_) => return Err(TermErr::give_up(col, "float"))
                };
                Ok((v, col + m.end()))
            }
            _ => Err(TermErr::give_up(col, "float"))
        }
    })
}

/// A terminal matching the regular expression `re` anchored at the current column, yielding the
/// matched text. Since a predict set cannot in general be derived from `re`, the caller supplies
/// one; pass [`CharSet::full`] to disable pruning. Empty matches are treated as failures.
pub fn regex_t<S: Into<String>>(name: S, cs: CharSet, re: &str) -> Result<Terminal<String>, regex::Error> {
    let re = Regex::new(&format!("^(?:{})", re))?;
    let name = name.into();
    let msg = name.clone();
    Ok(Terminal::new(Some(name), cs, move |buf, col| {
        match buf.text().get(col..).and_then(|s| re.find(s)) {
            Some(m) if m.end() > 0 => Ok((m.as_str().to_owned(), col + m.end())),
            _ => Err(TermErr::give_up(col, msg.clone()))
        }
    }))
}

/// An identifier in the usual letter-then-alphanumeric syntax.
pub fn ident() -> Terminal<String> {
    Terminal::new(Some("identifier".to_owned()), ALPHA_CS_START.clone(), |buf, col| {
        match buf.char_at(col) {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = col + 1;
                while let Some(b) = buf.byte_at(end) {
                    if !ALNUM_CS.contains(Some(b)) {
                        break;
                    }
                    end += 1;
                }
                Ok((buf.text()[col..end].to_owned(), end))
            }
            _ => Err(TermErr::give_up(col, "identifier"))
        }
    })
}

lazy_static! {
    static ref ALPHA_CS_START: CharSet = {
        let mut cs = ::ALPHA_CS.clone();
        cs.union(&CharSet::from_bytes(b"_"));
        cs
    };
}

/// Succeeds, with `()`, exactly at the end of the input. Its predict set is empty, so `alt`
/// branches guarded by it are only entered through the fallthrough path.
pub fn eof() -> Terminal<()> {
    Terminal::new(Some("end of input".to_owned()), CharSet::new(), |buf, col| {
        if col >= buf.len() {
            Ok(((), col))
        } else {
            Err(TermErr::give_up(col, "end of input"))
        }
    })
}

#[cfg(test)]
mod test {
    use super::{any, char_t, eof, float, int, nat, pred_t, regex_t, string_t, TermErr};
    use pcbuf::Buf;
    use pcset::CharSet;

    #[test]
    fn test_string_reports_break_column() {
        let b = Buf::from_str("t", "abd");
        let t = string_t("abc");
        assert_eq!(t.parse(&b, 0), Err(TermErr::give_up(2, "abc")));
        let b2 = Buf::from_str("t", "xabcx");
        assert_eq!(t.parse(&b2, 1), Ok(("abc".to_owned(), 4)));
        assert!(t.charset().contains(Some(b'a')));
        assert!(!t.charset().contains(Some(b'b')));
    }

    #[test]
    fn test_chars() {
        let b = Buf::from_str("t", "éx");
        assert_eq!(any().parse(&b, 0), Ok(('é', 2)));
        assert_eq!(char_t('x').parse(&b, 2), Ok(('x', 3)));
        assert!(char_t('y').parse(&b, 2).is_err());
        let up = pred_t("uppercase", CharSet::range(b'A', b'Z'), |c| c.is_ascii_uppercase());
        assert!(up.parse(&b, 2).is_err());
        assert_eq!(up.parse(&Buf::from_str("t", "Q"), 0), Ok(('Q', 1)));
    }

    #[test]
    fn test_numbers() {
        let b = Buf::from_str("t", "042 -17 1.5e2 99999999999999999999");
        assert_eq!(nat::<u32>().parse(&b, 0), Ok((42u32, 3)));
        assert_eq!(int::<i32>().parse(&b, 4), Ok((-17i32, 7)));
        assert_eq!(float().parse(&b, 8), Ok((150.0f64, 13)));
        // Overflow is a rejection, not a wrap or a panic.
        assert!(nat::<u32>().parse(&b, 14).is_err());
        assert_eq!(int::<i8>().parse(&Buf::from_str("t", "-128"), 0), Ok((-128i8, 4)));
    }

    #[test]
    fn test_regex() {
        let t = regex_t("hexnum", CharSet::from_str("0"), r"0x[0-9a-f]+").unwrap();
        let b = Buf::from_str("t", "0xff+1");
        assert_eq!(t.parse(&b, 0), Ok(("0xff".to_owned(), 4)));
        assert_eq!(t.parse(&b, 4), Err(TermErr::give_up(4, "hexnum")));
        assert!(regex_t("bad", CharSet::new(), r"(").is_err());
    }

    #[test]
    fn test_eof_and_map() {
        let b = Buf::from_str("t", "a");
        assert!(eof().parse(&b, 0).is_err());
        assert_eq!(eof().parse(&b, 1), Ok(((), 1)));
        let t = nat::<u32>().map(|n| n * 2);
        assert_eq!(t.parse(&Buf::from_str("t", "21"), 0), Ok((42u32, 2)));
    }
}
