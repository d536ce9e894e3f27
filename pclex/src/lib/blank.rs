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

use pcbuf::Buf;
use pcset::CharSet;

/// A blank function advances the column past insignificant input. It must be a pure function of
/// its arguments: the engine calls it after every successful lexeme and relies on equal inputs
/// giving equal outputs when merging parse paths.
pub type BlankFn = Rc<dyn Fn(&Buf, usize) -> usize>;

/// Skips nothing.
pub fn blank_none() -> BlankFn {
    Rc::new(|_: &Buf, col: usize| col)
}

/// Skips any run of bytes drawn from `cs`.
pub fn blank_charset(cs: CharSet) -> BlankFn {
    Rc::new(move |buf: &Buf, mut col: usize| {
        while cs.contains(buf.byte_at(col)) {
            col += 1;
        }
        col
    })
}

/// Skips runs of bytes from `cs` interleaved with line comments introduced by `start` and ended
/// by a newline (or the end of input).
pub fn blank_line_comment(cs: CharSet, start: &str) -> BlankFn {
    assert!(!start.is_empty(), "comment marker must be non-empty");
    let start = start.as_bytes().to_vec();
    Rc::new(move |buf: &Buf, mut col: usize| loop {
        if cs.contains(buf.byte_at(col)) {
            col += 1;
            continue;
        }
        if (0..start.len()).all(|i| buf.byte_at(col + i) == Some(start[i])) {
            col += start.len();
            while let Some(b) = buf.byte_at(col) {
                col += 1;
                if b == b'\n' {
                    break;
                }
            }
            continue;
        }
        return col;
    })
}

#[cfg(test)]
mod test {
    use super::{blank_charset, blank_line_comment, blank_none};
    use pcbuf::Buf;
    use pcset::CharSet;

    #[test]
    fn test_charset_blank() {
        let b = Buf::from_str("t", "  \tx y");
        let bl = blank_charset(CharSet::from_bytes(b" \t"));
        assert_eq!(bl(&b, 0), 3);
        assert_eq!(bl(&b, 3), 3);
        assert_eq!(bl(&b, 4), 5);
        assert_eq!(blank_none()(&b, 0), 0);
    }

    #[test]
    fn test_line_comment() {
        let b = Buf::from_str("t", "  # note\n ! # tail");
        let bl = blank_line_comment(CharSet::from_bytes(b" "), "#");
        assert_eq!(bl(&b, 0), 10);
        assert_eq!(b.byte_at(10), Some(b'!'));
        // A trailing comment with no newline runs to the end of input.
        assert_eq!(bl(&b, 11), 18);
    }
}
