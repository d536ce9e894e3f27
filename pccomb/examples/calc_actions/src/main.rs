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

extern crate getopts;
extern crate pcbuf;
extern crate pccomb;
extern crate pclex;
extern crate pcset;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use getopts::Options;
use pcbuf::PosStyle;
use pccomb::{
    alt, handle, lexeme, lr, map, parse_str, read_tbl, report, seq, seq_left, seq_right, Grm,
    GrmCell, Key
};
use pclex::{blank_charset, char_t, float};
use pcset::CharSet;

fn usage(prog: &str, opts: &Options) -> ! {
    let brief = format!("Usage: {} [options] [expression ...]", prog);
    let _ = write!(io::stderr(), "{}", opts.usage(&brief));
    process::exit(1)
}

// expr   : expr ('+'|'-') prod | prod ;
// prod   : prod ('*'|'/') atom | atom ;
// atom   : FLOAT | '(' expr ')' ;
fn calc() -> Grm<f64> {
    let expr_cell: GrmCell<f64> = GrmCell::new("expression");
    let expr = expr_cell.grammar();
    let atom = alt(
        {
            // A float may open with an explicit sign; '+' and '-' in operator position are never
            // reached through this branch because atoms are only predicted at operand positions.
            let mut cs = CharSet::range(b'0', b'9');
            cs.union(&CharSet::from_bytes(b"+-"));
            cs
        },
        map(lexeme(float()), |f: &f64| *f),
        CharSet::from_bytes(b"("),
        seq_left(seq_right(lexeme(char_t('(')), expr), lexeme(char_t(')')))
    );
    let kp = Key::<f64>::new();
    let prod = lr(
        atom.clone(),
        kp,
        alt(
            CharSet::from_bytes(b"*"),
            seq(
                seq_left(read_tbl(kp), lexeme(char_t('*'))),
                atom.clone(),
                |l, r| l * r
            ),
            CharSet::from_bytes(b"/"),
            seq(seq_left(read_tbl(kp), lexeme(char_t('/'))), atom, |l, r| l / r)
        )
    );
    let ks = Key::<f64>::new();
    let sum = lr(
        prod.clone(),
        ks,
        alt(
            CharSet::from_bytes(b"+"),
            seq(
                seq_left(read_tbl(ks), lexeme(char_t('+'))),
                prod.clone(),
                |l, r| l + r
            ),
            CharSet::from_bytes(b"-"),
            seq(seq_left(read_tbl(ks), lexeme(char_t('-'))), prod, |l, r| l - r)
        )
    );
    expr_cell.set(sum.clone());
    sum
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let prog = &args[0];
    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help");
    opts.optflag("l", "long", "report parse errors in the long style");
    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(_) => usage(prog, &opts)
    };
    if matches.opt_present("h") {
        usage(prog, &opts);
    }
    let style = if matches.opt_present("l") {
        PosStyle::Long
    } else {
        PosStyle::Short
    };

    let g = calc();
    let blank = blank_charset(CharSet::from_bytes(b" \t"));

    if !matches.free.is_empty() {
        for arg in &matches.free {
            let v = handle(parse_str(&g, &blank, "<arg>", arg), style);
            println!("{}", v);
        }
        return;
    }

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
                    Ok(v) => println!("Result: {}", v),
                    Err(e) => report(&e, style)
                }
            }
            _ => break
        }
    }
}
