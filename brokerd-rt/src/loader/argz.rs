// Layer 1: Standard library imports
use std::ffi::{c_char, CString, NulError};
use std::os::raw::c_int;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// The packed argument vector passed to a module's entry point
/// (`spec.md §3`, field `argz`; `§4.4` step 7: "Extract `argz` into an
/// argv, invoke `entry_point(handle, argc, argv)`").
///
/// Stored as owned `CString`s so the record can hold `argz` for its
/// whole lifetime without re-allocating on every `start`.
#[derive(Debug, Clone, Default)]
pub struct Argz {
    args: Vec<CString>,
}

impl Argz {
    /// Pack a sequence of argument strings, failing if any contains an
    /// interior NUL.
    pub fn new<I, S>(args: I) -> Result<Self, NulError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        let args = args
            .into_iter()
            .map(CString::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { args })
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Borrow the packed arguments as a null-terminated argv, valid
    /// for the lifetime of the returned guard (`spec.md §4.4` step 7).
    pub fn as_argv(&self) -> ArgvGuard<'_> {
        let mut ptrs: Vec<*const c_char> = self.args.iter().map(|a| a.as_ptr()).collect();
        ptrs.push(std::ptr::null());
        ArgvGuard {
            _owner: self,
            ptrs,
        }
    }
}

/// A transient view of an [`Argz`] as a C-compatible `argc`/`argv`
/// pair, null-terminated like a conventional `argv`.
///
/// Borrows its owning `Argz` so the backing `CString` buffers cannot
/// be dropped while the raw pointers are in use.
pub struct ArgvGuard<'a> {
    _owner: &'a Argz,
    ptrs: Vec<*const c_char>,
}

impl ArgvGuard<'_> {
    /// `argc` for the entry point call.
    pub fn argc(&self) -> c_int {
        (self.ptrs.len() - 1) as c_int
    }

    /// `argv` for the entry point call: a null-terminated array of
    /// `const char*`.
    pub fn argv(&self) -> *const *const c_char {
        self.ptrs.as_ptr()
    }
}
