//! Native function bridge.
//!
//! `LoadNative` pushes a `(library, slot, name)` triple; `Call` hands it to
//! the [`NativeBridge`], which resolves the name through a
//! [`NativeProvider`] the first time a slot is used and caches the result.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use plume_bytecode::LibraryEntry;
use plume_foundation::{Error, ErrorKind, Result, Value};

use super::Vm;

/// A callable native function.
///
/// Receives the VM and exactly the arguments passed by the call, bottom of
/// the stack first. The returned value is pushed in place of the arguments.
pub type NativeFn = Rc<dyn Fn(&mut Vm, &[Value]) -> Result<Value>>;

/// Source of native functions, looked up by library index and symbol name.
pub trait NativeProvider {
    /// Returns true if library `library` is loaded.
    fn has_library(&self, library: usize) -> bool;

    /// Looks up `symbol` in library `library`.
    fn resolve(&self, library: usize, symbol: &str) -> Option<NativeFn>;
}

/// In-memory registry of Rust closures.
#[derive(Default)]
pub struct StaticProvider {
    libraries: HashMap<usize, HashMap<String, NativeFn>>,
}

impl StaticProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares library `library` as loaded, even if it exports nothing.
    #[must_use]
    pub fn library(mut self, library: usize) -> Self {
        self.libraries.entry(library).or_default();
        self
    }

    /// Builder form of [`StaticProvider::register`].
    #[must_use]
    pub fn function<F>(mut self, library: usize, symbol: &str, f: F) -> Self
    where
        F: Fn(&mut Vm, &[Value]) -> Result<Value> + 'static,
    {
        self.register(library, symbol, f);
        self
    }

    /// Registers `f` as `symbol` in library `library`.
    pub fn register<F>(&mut self, library: usize, symbol: &str, f: F)
    where
        F: Fn(&mut Vm, &[Value]) -> Result<Value> + 'static,
    {
        self.libraries
            .entry(library)
            .or_default()
            .insert(symbol.to_string(), Rc::new(f));
    }
}

impl NativeProvider for StaticProvider {
    fn has_library(&self, library: usize) -> bool {
        self.libraries.contains_key(&library)
    }

    fn resolve(&self, library: usize, symbol: &str) -> Option<NativeFn> {
        self.libraries.get(&library)?.get(symbol).cloned()
    }
}

/// Per-library cache of resolved natives in front of a provider.
pub struct NativeBridge {
    provider: Box<dyn NativeProvider>,
    caches: Vec<Vec<Option<NativeFn>>>,
    resolutions: u64,
}

impl NativeBridge {
    /// Creates a bridge with one cache slot per declared library function.
    #[must_use]
    pub fn new(provider: Box<dyn NativeProvider>, libraries: &[LibraryEntry]) -> Self {
        Self {
            provider,
            caches: libraries
                .iter()
                .map(|lib| vec![None; lib.function_count])
                .collect(),
            resolutions: 0,
        }
    }

    /// Returns the native for `(library, slot)`, resolving `symbol` on
    /// first use.
    pub fn lookup(&mut self, library: i64, slot: i64, symbol: &str) -> Result<NativeFn> {
        let missing = || {
            Error::new(ErrorKind::NativeLibraryMissing {
                library: usize::try_from(library).unwrap_or(usize::MAX),
                symbol: symbol.to_string(),
            })
        };
        let lib = usize::try_from(library).map_err(|_| missing())?;
        let cache = self.caches.get_mut(lib).ok_or_else(missing)?;

        let count = cache.len();
        let entry = usize::try_from(slot)
            .ok()
            .and_then(|s| cache.get_mut(s))
            .ok_or_else(|| {
                Error::new(ErrorKind::NativeSlotOutOfRange {
                    library: lib,
                    slot,
                    count,
                })
            })?;

        if let Some(f) = entry.as_ref() {
            return Ok(Rc::clone(f));
        }

        if !self.provider.has_library(lib) {
            return Err(missing());
        }
        let f = self.provider.resolve(lib, symbol).ok_or_else(|| {
            Error::new(ErrorKind::NativeSymbolMissing {
                library: lib,
                symbol: symbol.to_string(),
            })
        })?;

        tracing::trace!(library = lib, slot, symbol, "resolved native");
        self.resolutions += 1;
        *entry = Some(Rc::clone(&f));
        Ok(f)
    }

    /// Number of provider lookups performed so far.
    #[must_use]
    pub fn resolutions(&self) -> u64 {
        self.resolutions
    }
}

impl fmt::Debug for NativeBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBridge")
            .field("libraries", &self.caches.len())
            .field("resolutions", &self.resolutions)
            .finish_non_exhaustive()
    }
}
