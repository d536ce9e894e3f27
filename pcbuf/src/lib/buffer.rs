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

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use pos::Pos;

static NEXT_UID: AtomicU64 = AtomicU64::new(0);

/// An immutable input buffer. Clones are cheap (`Rc`) and share identity: positions and cached
/// parse state are only meaningful between buffers for which [`same`](#method.same) holds.
#[derive(Clone, Debug)]
pub struct Buf {
    inner: Rc<BufInner>
}

#[derive(Debug)]
struct BufInner {
    uid: u64,
    name: String,
    data: String,
    // Byte offset of the start of each line; always non-empty, first element 0.
    lines: Vec<usize>
}

impl Buf {
    pub fn from_string(name: &str, data: String) -> Buf {
        let mut lines = vec![0];
        for (i, b) in data.bytes().enumerate() {
            if b == b'\n' {
                lines.push(i + 1);
            }
        }
        Buf {
            inner: Rc::new(BufInner {
                uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
                name: name.to_owned(),
                data,
                lines
            })
        }
    }

    pub fn from_str(name: &str, data: &str) -> Buf {
        Buf::from_string(name, data.to_owned())
    }

    pub fn from_read<R: Read>(name: &str, mut rdr: R) -> io::Result<Buf> {
        let mut data = String::new();
        rdr.read_to_string(&mut data)?;
        Ok(Buf::from_string(name, data))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Buf> {
        let name = path.as_ref().to_string_lossy().into_owned();
        Buf::from_read(&name, File::open(path)?)
    }

    /// Do `self` and `other` denote the very same buffer (not merely equal contents)?
    pub fn same(&self, other: &Buf) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn uid(&self) -> u64 {
        self.inner.uid
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn text(&self) -> &str {
        &self.inner.data
    }

    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    pub fn byte_at(&self, col: usize) -> Option<u8> {
        self.inner.data.as_bytes().get(col).cloned()
    }

    /// The character starting at byte offset `col`, or `None` at end of input or if `col` is not
    /// a character boundary.
    pub fn char_at(&self, col: usize) -> Option<char> {
        self.inner.data.get(col..).and_then(|s| s.chars().next())
    }

    /// 1-based line number and the byte offset of that line's start, for byte offset `col`.
    fn line_of(&self, col: usize) -> (usize, usize) {
        let i = match self.inner.lines.binary_search(&col) {
            Ok(i) => i,
            Err(i) => i - 1
        };
        (i + 1, self.inner.lines[i])
    }

    /// Derive a full `Pos` for byte offset `col`.
    pub fn pos(&self, col: usize) -> Pos {
        self.mk_pos(col, false)
    }

    /// As [`pos`](#method.pos), but flagged as a synthetic position (an empty-input match).
    pub fn pos_phantom(&self, col: usize) -> Pos {
        self.mk_pos(col, true)
    }

    fn mk_pos(&self, col: usize, phantom: bool) -> Pos {
        let (line, lstart) = self.line_of(col);
        let bcol = col - lstart;
        let utf8_col = match self.inner.data.get(lstart..col) {
            Some(s) => s.chars().count(),
            // `col` in the middle of a multi-byte character; count what precedes it.
            None => self.inner.data[lstart..].char_indices().take_while(|&(i, _)| lstart + i < col).count()
        };
        Pos::new(self.inner.name.clone(), line, bcol, utf8_col, phantom)
    }
}

#[cfg(test)]
mod test {
    use super::Buf;

    #[test]
    fn test_identity() {
        let b1 = Buf::from_str("t", "abc");
        let b2 = Buf::from_str("t", "abc");
        let b3 = b1.clone();
        assert!(b1.same(&b3));
        assert!(!b1.same(&b2));
        assert!(b1.uid() != b2.uid());
    }

    #[test]
    fn test_lines() {
        let b = Buf::from_str("t", "ab\ncd\n\ne");
        assert_eq!(b.pos(0).line(), 1);
        assert_eq!(b.pos(1).col(), 1);
        assert_eq!(b.pos(3).line(), 2);
        assert_eq!(b.pos(3).col(), 0);
        assert_eq!(b.pos(6).line(), 3);
        assert_eq!(b.pos(7).line(), 4);
        assert_eq!(b.byte_at(2), Some(b'\n'));
        assert_eq!(b.byte_at(8), None);
        assert!(!b.pos(0).is_phantom());
        assert!(b.pos_phantom(0).is_phantom());
    }

    #[test]
    fn test_utf8_cols() {
        let b = Buf::from_str("t", "é=1");
        // 'é' is two bytes; '=' is at byte column 2 but UTF-8 column 1.
        let p = b.pos(2);
        assert_eq!(p.col(), 2);
        assert_eq!(p.utf8_col(), 1);
        assert_eq!(b.char_at(0), Some('é'));
        assert_eq!(b.char_at(2), Some('='));
    }
}
