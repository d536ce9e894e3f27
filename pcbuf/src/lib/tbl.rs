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

use indexmap::IndexMap;

use buffer::Buf;

/// A position-keyed associative table. Keys are (buffer identity, byte column), so entries for
/// byte-identical but distinct buffers never collide. Iteration follows insertion order.
#[derive(Clone, Debug)]
pub struct PosTbl<T> {
    map: IndexMap<(u64, usize), T>
}

impl<T> PosTbl<T> {
    pub fn new() -> PosTbl<T> {
        PosTbl { map: IndexMap::new() }
    }

    /// Insert `v` at (buf, col), returning the previous entry if there was one.
    pub fn insert(&mut self, buf: &Buf, col: usize, v: T) -> Option<T> {
        self.map.insert((buf.uid(), col), v)
    }

    pub fn get(&self, buf: &Buf, col: usize) -> Option<&T> {
        self.map.get(&(buf.uid(), col))
    }

    pub fn get_mut(&mut self, buf: &Buf, col: usize) -> Option<&mut T> {
        self.map.get_mut(&(buf.uid(), col))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear()
    }
}

#[cfg(test)]
mod test {
    use super::PosTbl;
    use buffer::Buf;

    #[test]
    fn test_identity_keys() {
        let b1 = Buf::from_str("t", "xy");
        let b2 = Buf::from_str("t", "xy");
        let mut tbl = PosTbl::new();
        assert_eq!(tbl.insert(&b1, 0, 1), None);
        assert_eq!(tbl.insert(&b2, 0, 2), None);
        assert_eq!(tbl.get(&b1, 0), Some(&1));
        assert_eq!(tbl.get(&b2, 0), Some(&2));
        assert_eq!(tbl.get(&b1, 1), None);
        assert_eq!(tbl.insert(&b1, 0, 3), Some(1));
        assert_eq!(tbl.len(), 2);
        tbl.clear();
        assert!(tbl.is_empty());
    }
}
