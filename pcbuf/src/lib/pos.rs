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

use std::fmt;

/// A fully derived source position. Line numbers are 1-based; both column forms are 0-based. The
/// `phantom` flag marks synthetic positions produced for empty-input matches, which occupy no
/// character of the input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pos {
    name: String,
    line: usize,
    col: usize,
    utf8_col: usize,
    phantom: bool
}

/// How positions render: `Long` in the traditional compiler-banner form, `Short` in the
/// `file:line:col` form most tooling expects.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PosStyle {
    Long,
    Short
}

impl Pos {
    pub fn new(name: String, line: usize, col: usize, utf8_col: usize, phantom: bool) -> Pos {
        Pos {
            name,
            line,
            col,
            utf8_col,
            phantom
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// 0-based byte column within the line.
    pub fn col(&self) -> usize {
        self.col
    }

    /// 0-based character column within the line.
    pub fn utf8_col(&self) -> usize {
        self.utf8_col
    }

    pub fn is_phantom(&self) -> bool {
        self.phantom
    }

    pub fn style(&self, style: PosStyle) -> PosDisplay {
        PosDisplay { pos: self, style }
    }
}

/// Default rendering is the `Short` style.
impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.style(PosStyle::Short).fmt(f)
    }
}

pub struct PosDisplay<'a> {
    pos: &'a Pos,
    style: PosStyle
}

impl<'a> fmt::Display for PosDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.style {
            PosStyle::Long => {
                if self.pos.name.is_empty() {
                    write!(f, "line {}, character {}", self.pos.line, self.pos.utf8_col)
                } else {
                    write!(
                        f,
                        "File {:?}, line {}, character {}",
                        self.pos.name, self.pos.line, self.pos.utf8_col
                    )
                }
            }
            PosStyle::Short => write!(f, "{}:{}:{}", self.pos.name, self.pos.line, self.pos.utf8_col)
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Pos, PosStyle};

    #[test]
    fn test_styles() {
        let p = Pos::new("foo.txt".to_owned(), 3, 7, 5, false);
        assert_eq!(format!("{}", p.style(PosStyle::Short)), "foo.txt:3:5");
        assert_eq!(
            format!("{}", p.style(PosStyle::Long)),
            "File \"foo.txt\", line 3, character 5"
        );
        assert_eq!(format!("{}", p), "foo.txt:3:5");
    }

    #[test]
    fn test_anonymous_long() {
        let p = Pos::new(String::new(), 1, 0, 0, true);
        assert!(p.is_phantom());
        assert_eq!(format!("{}", p.style(PosStyle::Long)), "line 1, character 0");
    }
}
