// Layer 1: Standard library imports
use std::ffi::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};

// Layer 2: Third-party crate imports
use libloading::{Library, Symbol};
use tracing::{info, warn};

// Layer 3: Internal module imports
use super::error::LoadError;

/// `mod_main(handle, argc, argv) -> int` (`spec.md §3`, field
/// `entry_point`; `§6`, loadable-artifact contract).
pub type ModMainFn = unsafe extern "C" fn(*mut c_void, c_int, *const *const c_char) -> c_int;

const ENTRY_SYMBOL: &[u8] = b"mod_main\0";
const LEGACY_NAME_SYMBOL: &[u8] = b"mod_name\0";

#[cfg(target_os = "linux")]
mod dlopen_flags {
    // glibc's <dlfcn.h> values; `libloading::os::unix::Library::open`
    // forwards these straight to `dlopen(3)`.
    pub const RTLD_NOW: i32 = 0x0000_0002;
    pub const RTLD_GLOBAL: i32 = 0x0000_0100;
    pub const RTLD_DEEPBIND: i32 = 0x0000_0008;
}

/// Owning handle on a loaded artifact plus its resolved entry point.
///
/// Mirrors the corpus's loaded-plugin-owns-its-`Library` shape: the
/// `Library` is dropped last, after every symbol taken from it has
/// gone out of scope, so no dangling function pointer survives a
/// premature unload (`spec.md §9`: "wrapped in an opaque owner whose
/// drop closes the handle last").
pub struct DsoHandle {
    library: Option<Library>,
    entry_point: ModMainFn,
    path: PathBuf,
    /// When set, the `Library` is leaked instead of closed on drop, to
    /// cooperate with address-sanitizer builds that otherwise report
    /// the unloaded code's allocations as leaks attributed to nothing
    /// (`spec.md §3`, field `dso_handle`).
    leak_on_destroy: bool,
}

impl DsoHandle {
    /// Open `path` with deep binding and immediate resolution, symbols
    /// visible globally to subsequently loaded modules (`spec.md §6`),
    /// resolve `mod_main`, and validate the optional legacy `mod_name`
    /// symbol against `expected_name` if the caller supplied one.
    ///
    /// # Safety
    ///
    /// Calls into foreign code during loading and symbol resolution;
    /// the caller is trusted to pass a path to a trusted, correctly
    /// built artifact (`spec.md §9`: isolation is limited to a
    /// separate thread, not memory sandboxing).
    pub unsafe fn load(path: &Path, expected_name: Option<&str>) -> Result<Self, LoadError> {
        let library = Self::open_with_deep_bind(path)?;

        let entry_point: ModMainFn = {
            let symbol: Symbol<ModMainFn> =
                library
                    .get(ENTRY_SYMBOL)
                    .map_err(|_| LoadError::EntryPointMissing {
                        path: path.to_path_buf(),
                    })?;
            *symbol
        };

        if let Some(expected) = expected_name {
            if let Ok(found) = Self::read_legacy_name(&library) {
                if found != expected {
                    return Err(LoadError::NameMismatch {
                        expected: expected.to_string(),
                        found,
                    });
                }
            }
        }

        info!(path = %path.display(), "loaded module artifact");
        Ok(Self {
            library: Some(library),
            entry_point,
            path: path.to_path_buf(),
            leak_on_destroy: false,
        })
    }

    #[cfg(target_os = "linux")]
    unsafe fn open_with_deep_bind(path: &Path) -> Result<Library, LoadError> {
        use libloading::os::unix::Library as UnixLibrary;
        let flags = dlopen_flags::RTLD_NOW | dlopen_flags::RTLD_GLOBAL | dlopen_flags::RTLD_DEEPBIND;
        UnixLibrary::open(Some(path), flags)
            .map(Library::from)
            .map_err(|reason| LoadError::OpenFailed {
                path: path.to_path_buf(),
                reason: reason.to_string(),
            })
    }

    #[cfg(not(target_os = "linux"))]
    unsafe fn open_with_deep_bind(path: &Path) -> Result<Library, LoadError> {
        Library::new(path).map_err(|reason| LoadError::OpenFailed {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        })
    }

    unsafe fn read_legacy_name(library: &Library) -> Result<String, libloading::Error> {
        let symbol: Symbol<*const *const c_char> = library.get(LEGACY_NAME_SYMBOL)?;
        let ptr = **symbol;
        if ptr.is_null() {
            return Ok(String::new());
        }
        Ok(std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }

    /// Resolved `mod_main` entry point.
    pub fn entry_point(&self) -> ModMainFn {
        self.entry_point
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Select leak-on-destroy to cooperate with address-sanitizer
    /// builds (`spec.md §3`).
    pub fn set_leak_on_destroy(&mut self, leak: bool) {
        self.leak_on_destroy = leak;
    }
}

impl Drop for DsoHandle {
    fn drop(&mut self) {
        if self.leak_on_destroy {
            if let Some(library) = self.library.take() {
                warn!(path = %self.path.display(), "leaking loaded module artifact on destroy");
                std::mem::forget(library);
            }
        }
        // Otherwise `self.library` drops normally here, last, after
        // `entry_point` (a plain function pointer, not borrowed) goes
        // out of scope with the rest of `self`.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_nonexistent_path_is_open_failed() {
        let path = PathBuf::from("/nonexistent/mod_echo.so");
        let result = unsafe { DsoHandle::load(&path, None) };
        assert!(matches!(result, Err(LoadError::OpenFailed { .. })));
    }

    #[test]
    fn leak_on_destroy_defaults_to_false() {
        // Constructed indirectly: a handle that failed to load never
        // reaches this state, so this documents the default via the
        // flag's own type rather than a live `DsoHandle`.
        let flag_default: bool = Default::default();
        assert!(!flag_default);
    }
}
