//! Capture of unexpected handler faults.
//!
//! A [`Fault`] records where a failure happened, the full message, and a short
//! code derived from the message. Only the code is ever shown to a client.
//!
//! Panics are located through a chained panic hook (see
//! [`install_panic_hook`]) that stores the panic site in a thread-local slot.
//! The slot is read back by [`Fault::from_panic`] on the same thread, right
//! after `catch_unwind` returns.

use sha2::{Digest, Sha256};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::Location;
use std::sync::Once;

const UNKNOWN_LOCATION: &str = "<unknown>";

thread_local! {
    static PANIC_SITE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Derives the client-facing code for a fault message.
///
/// The code is the first four bytes of the SHA-256 digest, big endian. Equal
/// messages always produce equal codes.
///
/// ```
/// use tessera_core::fault::fault_code;
///
/// assert_eq!(fault_code("boom"), fault_code("boom"));
/// assert_ne!(fault_code("boom"), fault_code("bang"));
/// ```
#[must_use]
pub fn fault_code(message: &str) -> u32 {
    let digest = Sha256::digest(message.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Installs the panic hook that records panic sites.
///
/// The previous hook is kept and still runs. Calling this more than once has
/// no further effect.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Some(location) = info.location() {
                let site = format_location(location);
                PANIC_SITE.with(|slot| *slot.borrow_mut() = Some(site));
            }
            previous(info);
        }));
    });
}

/// Takes the panic site recorded on this thread, if any.
pub fn take_panic_location() -> Option<String> {
    PANIC_SITE.with(|slot| slot.borrow_mut().take())
}

fn format_location(location: &Location<'_>) -> String {
    format!(
        "{}:{}:{}",
        location.file(),
        location.line(),
        location.column()
    )
}

/// An unexpected failure inside a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Source location, `file:line:column`.
    pub location: String,
    /// Full message. Logged, never sent to the client.
    pub reason: String,
    /// Code derived from `reason`.
    pub code: u32,
}

impl Fault {
    /// Creates a fault at an explicit location.
    #[must_use]
    pub fn new(location: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            location: location.into(),
            code: fault_code(&reason),
            reason,
        }
    }

    /// Creates a fault located at the caller.
    #[track_caller]
    #[must_use]
    pub fn here(reason: impl Into<String>) -> Self {
        Self::new(format_location(Location::caller()), reason)
    }

    /// Converts a caught panic payload into a fault.
    ///
    /// The location comes from the panic hook when it is installed, else it
    /// is reported as unknown.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let reason = panic_message(payload.as_ref());
        let location = take_panic_location().unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
        Self::new(location, reason)
    }

    /// Converts a panic payload caught on another thread, such as one taken
    /// from a `JoinError`.
    ///
    /// The recorded site belongs to the panicking thread, so the location is
    /// reported as unknown and this thread's slot is left alone.
    #[must_use]
    pub fn from_remote_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::new(UNKNOWN_LOCATION, panic_message(payload.as_ref()))
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{} {}", self.location, self.code, self.reason)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_stable() {
        // First four bytes of SHA-256("abc") = ba 78 16 bf.
        assert_eq!(fault_code("abc"), 0xba78_16bf);
        assert_eq!(Fault::new("x", "abc").code, 0xba78_16bf);
    }

    #[test]
    fn test_here_records_this_file() {
        let fault = Fault::here("oops");
        assert!(fault.location.contains("fault.rs"), "{}", fault.location);
        assert_eq!(fault.reason, "oops");
    }

    #[test]
    fn test_from_panic_with_hook() {
        install_panic_hook();
        let payload = std::panic::catch_unwind(|| panic!("kaput {}", 7)).unwrap_err();
        let fault = Fault::from_panic(payload);

        assert_eq!(fault.reason, "kaput 7");
        assert_eq!(fault.code, fault_code("kaput 7"));
        assert!(fault.location.contains("fault.rs"), "{}", fault.location);
    }

    #[test]
    fn test_remote_panic_ignores_local_site() {
        install_panic_hook();
        // Leaves a site in this thread's slot.
        let _ = std::panic::catch_unwind(|| panic!("earlier"));

        let fault = Fault::from_remote_panic(Box::new("worker died".to_string()));
        assert_eq!(fault.location, UNKNOWN_LOCATION);
        assert_eq!(fault.code, fault_code("worker died"));
        assert!(take_panic_location().is_some_and(|site| site.contains("fault.rs")));
    }

    #[test]
    fn test_from_panic_static_str_payload() {
        let fault = Fault::from_panic(Box::new("plain"));
        assert_eq!(fault.reason, "plain");
    }
}
