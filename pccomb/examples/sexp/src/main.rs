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

extern crate pcbuf;
extern crate pccomb;
extern crate pclex;
extern crate pcset;

use std::fmt;
use std::io::{self, BufRead, Write};

use pcbuf::PosStyle;
use pccomb::{alt, lexeme, map, parse_str, report, seq_left, seq_right, star, Grm, GrmCell};
use pclex::{blank_charset, char_t, ident, SPACE_CS};
use pcset::CharSet;

#[derive(Clone, Debug, PartialEq)]
enum Sexp {
    Atom(String),
    List(Vec<Sexp>)
}

impl Sexp {
    // Number of list elements, at every nesting level.
    fn size(&self) -> usize {
        match *self {
            Sexp::Atom(_) => 0,
            Sexp::List(ref v) => v.len() + v.iter().map(Sexp::size).sum::<usize>()
        }
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Sexp::Atom(ref s) => write!(f, "{}", s),
            Sexp::List(ref v) => {
                write!(f, "(")?;
                for (i, s) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    s.fmt(f)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn sexp() -> Grm<Sexp> {
    let cell: GrmCell<Sexp> = GrmCell::new("sexp");
    let mut atom_cs = CharSet::range(b'a', b'z');
    atom_cs.union(&CharSet::range(b'A', b'Z'));
    atom_cs.add(b'_');
    let mut item_cs = atom_cs.clone();
    item_cs.add(b'(');
    let atom = map(lexeme(ident()), |s: &String| Sexp::Atom(s.clone()));
    let list = map(
        seq_left(
            seq_right(lexeme(char_t('(')), star(item_cs, cell.grammar())),
            lexeme(char_t(')'))
        ),
        |v: &Vec<Sexp>| Sexp::List(v.clone())
    );
    cell.set(alt(atom_cs, atom, CharSet::from_bytes(b"("), list));
    cell.grammar()
}

fn main() {
    let g = sexp();
    let blank = blank_charset(SPACE_CS.clone());
    let stdin = io::stdin();
    loop {
        print!(">>> ");
        io::stdout().flush().ok();
        match stdin.lock().lines().next() {
            Some(Ok(ref l)) => {
                if l.trim().is_empty() {
                    continue;
                }
                match parse_str(&g, &blank, "<stdin>", l) {
                    Ok(v) => println!("{} (size {})", v, v.size()),
                    Err(e) => report(&e, PosStyle::Short)
                }
            }
            _ => break
        }
    }
}
