//! The calling thread's ambient error code.
//!
//! Logging calls must leave `errno` as they found it, except when a daemon
//! exchange took place: then it carries the remote result.

use nix::errno::Errno;

pub fn last() -> i32 {
    Errno::last_raw()
}

pub fn set(code: i32) {
    Errno::set_raw(code);
}

/// `strerror`-style text for `code`.
pub fn describe(code: i32) -> &'static str {
    Errno::from_raw(code).desc()
}

/// Captures `errno` on creation and puts it back on drop.
#[must_use]
pub struct ErrnoGuard {
    saved: i32,
    armed: bool,
}

impl ErrnoGuard {
    pub fn save() -> Self {
        Self {
            saved: last(),
            armed: true,
        }
    }

    /// The value captured at creation.
    pub fn saved(&self) -> i32 {
        self.saved
    }

    /// Leave whatever `errno` holds now.
    pub fn release(mut self) {
        self.armed = false;
    }
}

impl Drop for ErrnoGuard {
    fn drop(&mut self) {
        if self.armed {
            set(self.saved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_on_drop() {
        set(Errno::ENOENT as i32);
        {
            let guard = ErrnoGuard::save();
            assert_eq!(guard.saved(), Errno::ENOENT as i32);
            set(Errno::EBADF as i32);
        }
        assert_eq!(last(), Errno::ENOENT as i32);
    }

    #[test]
    fn released_guard_keeps_new_value() {
        set(Errno::ENOENT as i32);
        let guard = ErrnoGuard::save();
        set(0);
        guard.release();
        assert_eq!(last(), 0);
    }

    #[test]
    fn describe_matches_strerror() {
        assert_eq!(describe(Errno::ENOENT as i32), "No such file or directory");
    }
}
