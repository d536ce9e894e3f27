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

//! Terminals and blank functions for the scannerless combinator engine.
//!
//! A [`Terminal`](struct.Terminal.html) is a first-class value bundling a parse function over
//! (buffer, column), a predict character set used for one-byte lookahead, and a name used in
//! expectation messages. Terminals report how far they got before failing, so "abc" applied to
//! "abd" blames the third column, not the first.
//!
//! Blank functions advance past insignificant input between lexemes; the engine applies the
//! current blank function after every successful terminal and once at parse start.

#[macro_use]
extern crate lazy_static;
extern crate num_traits;
extern crate pcbuf;
extern crate pcset;
extern crate regex;

mod blank;
mod terminal;

pub use blank::{blank_charset, blank_line_comment, blank_none, BlankFn};
pub use terminal::{
    any, char_t, charset_t, eof, float, ident, int, nat, pred_t, regex_t, string_t, TermErr,
    Terminal
};

use pcset::CharSet;

lazy_static! {
    /// ASCII decimal digits.
    pub static ref DIGIT_CS: CharSet = CharSet::range(b'0', b'9');
    /// ASCII letters.
    pub static ref ALPHA_CS: CharSet = {
        let mut cs = CharSet::range(b'a', b'z');
        cs.union(&CharSet::range(b'A', b'Z'));
        cs
    };
    /// ASCII letters, digits and underscore.
    pub static ref ALNUM_CS: CharSet = {
        let mut cs = ALPHA_CS.clone();
        cs.union(&DIGIT_CS);
        cs.union(&CharSet::from_bytes(b"_"));
        cs
    };
    /// Space, tab, newline and carriage return.
    pub static ref SPACE_CS: CharSet = CharSet::from_bytes(b" \t\n\r");
}
