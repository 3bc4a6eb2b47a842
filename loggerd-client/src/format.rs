//! Bounded rendering of format arguments.
//!
//! Output past [`FORMAT_BUFFER_SIZE`] is dropped silently; rendering never
//! fails because of length.

use std::fmt::{self, Write};

use loggerd_core::record::truncate_to;

use crate::errno;

/// Rendering buffer size, terminating NUL included.
pub const FORMAT_BUFFER_SIZE: usize = 4096;

struct Bounded {
    buf: String,
    limit: usize,
}

impl Write for Bounded {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.limit - self.buf.len();
        self.buf.push_str(truncate_to(s, room));
        Ok(())
    }
}

fn render_into(args: fmt::Arguments<'_>, suffix: Option<&str>) -> String {
    let mut out = Bounded {
        buf: String::new(),
        limit: FORMAT_BUFFER_SIZE - 1,
    };
    // Bounded::write_str never errors; a user Display impl might, in which
    // case whatever it produced so far is kept.
    let _ = out.write_fmt(args);
    if let Some(suffix) = suffix {
        let _ = write!(out, ": {suffix}");
    }
    out.buf
}

pub fn render(args: fmt::Arguments<'_>) -> String {
    render_into(args, None)
}

/// Render `args`, then append `": <description of code>"` unless `code` is 0.
pub fn render_with_errno(args: fmt::Arguments<'_>, code: i32) -> String {
    if code == 0 {
        render_into(args, None)
    } else {
        render_into(args, Some(errno::describe(code)))
    }
}
