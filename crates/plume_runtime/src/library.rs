//! Native libraries loaded from disk.
//!
//! A program names its libraries in the bytecode header. Standard entries
//! live under the `PLUME_PATH` directory; the rest are found next to the
//! bytecode file. Each one is opened with `libloading` and its functions are
//! resolved by symbol name on first call.
//!
//! Exported functions use the C calling convention
//!
//! ```c
//! uint64_t f(int32_t argc, void *vm, const uint64_t *args);
//! ```
//!
//! where arguments and the result are raw NaN-boxed values.

use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use plume_bytecode::LibraryEntry;
use plume_foundation::{Error, ErrorKind, Result, Value};
use plume_vm::{NativeFn, NativeProvider, Vm};

/// Signature of an exported native function.
pub type RawNative = unsafe extern "C" fn(i32, *mut c_void, *const u64) -> u64;

/// Resolves where `entry` lives on disk.
pub fn library_path(entry: &LibraryEntry, bytecode_dir: &Path, std_path: Option<&Path>) -> Result<PathBuf> {
    if entry.standard {
        let dir = std_path.ok_or_else(|| {
            Error::new(ErrorKind::StandardPathMissing {
                library: entry.name.clone(),
            })
        })?;
        Ok(dir.join(&entry.name))
    } else {
        Ok(bytecode_dir.join(&entry.name))
    }
}

struct Loaded {
    library: Rc<libloading::Library>,
    path: PathBuf,
}

/// [`NativeProvider`] over shared libraries.
#[derive(Default)]
pub struct DylibProvider {
    libraries: Vec<Loaded>,
}

impl DylibProvider {
    /// Opens every library a program declares, in declaration order.
    pub fn open(entries: &[LibraryEntry], bytecode_dir: &Path, std_path: Option<&Path>) -> Result<Self> {
        let mut provider = Self::default();
        for entry in entries {
            let path = library_path(entry, bytecode_dir, std_path)?;
            provider.load(path)?;
        }
        Ok(provider)
    }

    /// Opens the library at `path` as the next library index.
    pub fn load(&mut self, path: PathBuf) -> Result<usize> {
        // SAFETY: loading runs the library's initialisers; the program
        // chose to link against it.
        let library = unsafe { libloading::Library::new(&path) }.map_err(|err| {
            Error::new(ErrorKind::LibraryLoad {
                path: path.display().to_string(),
                message: err.to_string(),
            })
        })?;

        tracing::debug!(path = %path.display(), index = self.libraries.len(), "loaded library");
        self.libraries.push(Loaded {
            library: Rc::new(library),
            path,
        });
        Ok(self.libraries.len() - 1)
    }

    /// Number of open libraries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    /// Returns true if no library is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

impl NativeProvider for DylibProvider {
    fn has_library(&self, library: usize) -> bool {
        library < self.libraries.len()
    }

    fn resolve(&self, library: usize, symbol: &str) -> Option<NativeFn> {
        let loaded = self.libraries.get(library)?;
        // SAFETY: exported natives follow the `RawNative` convention.
        let raw: RawNative = unsafe { *loaded.library.get::<RawNative>(symbol.as_bytes()).ok()? };
        let keep_alive = Rc::clone(&loaded.library);

        let native: NativeFn = Rc::new(move |vm: &mut Vm, args: &[Value]| {
            let _library = &keep_alive;
            let bits: Vec<u64> = args.iter().map(|v| v.to_bits()).collect();
            let argc = i32::try_from(bits.len())
                .map_err(|_| Error::new(ErrorKind::Native("too many arguments".to_string())))?;
            let vm: *mut Vm = vm;
            // SAFETY: `bits` outlives the call and holds `argc` values.
            let result = unsafe { raw(argc, vm.cast::<c_void>(), bits.as_ptr()) };
            Ok(Value::from_bits(result))
        });
        Some(native)
    }
}

impl fmt::Debug for DylibProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.libraries.iter().map(|l| l.path.display().to_string()))
            .finish()
    }
}
