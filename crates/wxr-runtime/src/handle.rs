//! Opaque handle values handed to applications.

use std::fmt;

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub const NULL: Self = Self(0);

            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn into_raw(self) -> u64 {
                self.0
            }

            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

handle_type!(InstanceHandle);
handle_type!(SessionHandle);
handle_type!(SwapchainHandle);
handle_type!(
    /// Reference and action spaces share one handle namespace.
    SpaceHandle
);
handle_type!(ActionSetHandle);
handle_type!(ActionHandle);

/// Monotonic handle source starting at a fixed base.
#[derive(Debug, Clone)]
pub struct HandleAllocator {
    next: u64,
}

impl HandleAllocator {
    pub const fn starting_at(base: u64) -> Self {
        Self { next: base }
    }

    pub fn next_raw(&mut self) -> u64 {
        let raw = self.next;
        self.next += 1;
        raw
    }
}
