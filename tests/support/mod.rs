//! Instrumented functions defined away from the tests that wrap them.

use ztrace::{Frame, step};

#[rustfmt::skip]
pub fn marked(frame: &Frame, _: ()) -> i64 {
    step!(frame);                   let mut res = 0;
    step!(frame; res);              res += 1; // ztrace: ignore
    step!(frame; res);              res += 2;
    step!(frame; res);
    res
}
