//! Heap-resident objects: strings, lists and mutable cells.
//!
//! [`Heap`] owns every block and hands out pointer [`Value`]s. It computes
//! each block's reference array for the [`Collector`] and keeps it in sync
//! when a mutable cell is overwritten.

use std::fmt::Write as _;

use crate::error::{Error, ErrorKind, Result};
use crate::gc::{Collector, DEFAULT_THRESHOLD, GcStats, HeapRef};
use crate::types::ValueType;
use crate::value::{Decoded, Pointer, Value};

/// Discriminant of a heap block, also carried in pointer values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// UTF-8 string.
    String,
    /// Array of values.
    List,
    /// Single overwritable value.
    Mutable,
}

impl BlockKind {
    /// Returns the 2-bit tag stored in pointer values.
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::String => 0,
            Self::List => 1,
            Self::Mutable => 2,
        }
    }

    /// Parses a 2-bit tag.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::String),
            1 => Some(Self::List),
            2 => Some(Self::Mutable),
            _ => None,
        }
    }

    /// Returns the value type of pointers to this kind of block.
    #[must_use]
    pub const fn value_type(self) -> ValueType {
        match self {
            Self::String => ValueType::String,
            Self::List => ValueType::List,
            Self::Mutable => ValueType::Mutable,
        }
    }
}

/// Payload of a heap block.
#[derive(Clone, Debug, PartialEq)]
pub enum HeapBlock {
    /// A string.
    String(String),
    /// A list of values.
    List(Vec<Value>),
    /// A mutable cell.
    Mutable(Value),
}

impl HeapBlock {
    /// Returns the block's kind.
    #[must_use]
    pub const fn kind(&self) -> BlockKind {
        match self {
            Self::String(_) => BlockKind::String,
            Self::List(_) => BlockKind::List,
            Self::Mutable(_) => BlockKind::Mutable,
        }
    }

    /// Handles of every block this one points to.
    #[must_use]
    pub fn refs(&self) -> Vec<HeapRef> {
        match self {
            Self::String(_) => Vec::new(),
            Self::List(items) => items.iter().copied().filter_map(handle_of).collect(),
            Self::Mutable(value) => handle_of(*value).into_iter().collect(),
        }
    }

    fn size(&self) -> usize {
        match self {
            Self::String(s) => s.len(),
            Self::List(items) => items.len() * size_of::<Value>(),
            Self::Mutable(_) => size_of::<Value>(),
        }
    }
}

/// Returns the heap handle of a pointer value.
#[must_use]
pub fn handle_of(value: Value) -> Option<HeapRef> {
    match value.decode() {
        Decoded::Pointer(p) => Some(p.handle),
        _ => None,
    }
}

fn handles<R>(roots: R) -> impl Iterator<Item = HeapRef>
where
    R: IntoIterator<Item = Value>,
{
    roots.into_iter().filter_map(handle_of)
}

/// Garbage-collected store of heap blocks.
///
/// Every allocating method takes the caller's roots (normally the live
/// stack). They are only walked when the allocation triggers a collection.
pub struct Heap {
    gc: Collector<HeapBlock>,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl Heap {
    /// Creates a heap that collects once `threshold` blocks are live.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            gc: Collector::new(threshold),
        }
    }

    /// Allocates a block and returns a pointer to it.
    pub fn alloc<R>(&mut self, block: HeapBlock, roots: R) -> Value
    where
        R: IntoIterator<Item = Value>,
    {
        let kind = block.kind();
        let refs = block.refs();
        let size = block.size();
        let handle = self.gc.allocate(block, size, refs, handles(roots));
        Value::pointer(Pointer { kind, handle })
    }

    /// Allocates a string.
    pub fn alloc_string<R>(&mut self, s: impl Into<String>, roots: R) -> Value
    where
        R: IntoIterator<Item = Value>,
    {
        self.alloc(HeapBlock::String(s.into()), roots)
    }

    /// Allocates a list.
    pub fn alloc_list<R>(&mut self, items: Vec<Value>, roots: R) -> Value
    where
        R: IntoIterator<Item = Value>,
    {
        self.alloc(HeapBlock::List(items), roots)
    }

    /// Allocates a mutable cell holding `content`.
    pub fn alloc_mutable<R>(&mut self, content: Value, roots: R) -> Value
    where
        R: IntoIterator<Item = Value>,
    {
        self.alloc(HeapBlock::Mutable(content), roots)
    }

    fn block(&self, value: Value, kind: BlockKind) -> Result<&HeapBlock> {
        let handle = value.get_block(kind)?;
        let block = self.gc.get(handle)?;
        if block.kind() == kind {
            Ok(block)
        } else {
            Err(Error::type_mismatch(kind.value_type(), block.kind().value_type()))
        }
    }

    /// Borrows a string.
    pub fn string(&self, value: Value) -> Result<&str> {
        match self.block(value, BlockKind::String)? {
            HeapBlock::String(s) => Ok(s),
            other => Err(Error::type_mismatch(
                ValueType::String,
                other.kind().value_type(),
            )),
        }
    }

    /// Borrows a list's elements.
    pub fn list(&self, value: Value) -> Result<&[Value]> {
        match self.block(value, BlockKind::List)? {
            HeapBlock::List(items) => Ok(items),
            other => Err(Error::type_mismatch(
                ValueType::List,
                other.kind().value_type(),
            )),
        }
    }

    /// Returns element `index` of a list.
    pub fn list_get(&self, value: Value, index: i64) -> Result<Value> {
        let items = self.list(value)?;
        usize::try_from(index)
            .ok()
            .and_then(|i| items.get(i).copied())
            .ok_or_else(|| Error::index_out_of_bounds(index, items.len()))
    }

    /// Returns the content of a mutable cell.
    pub fn cell(&self, value: Value) -> Result<Value> {
        match self.block(value, BlockKind::Mutable)? {
            HeapBlock::Mutable(content) => Ok(*content),
            other => Err(Error::type_mismatch(
                ValueType::Mutable,
                other.kind().value_type(),
            )),
        }
    }

    /// Overwrites a mutable cell and refreshes its reference array.
    pub fn update(&mut self, cell: Value, content: Value) -> Result<()> {
        let handle = cell.get_block(BlockKind::Mutable)?;
        match self.gc.get_mut(handle)? {
            HeapBlock::Mutable(slot) => *slot = content,
            other => {
                return Err(Error::type_mismatch(
                    ValueType::Mutable,
                    other.kind().value_type(),
                ));
            }
        }
        self.gc
            .set_refs(handle, handle_of(content).into_iter().collect())
    }

    /// Returns the dynamic type of a value, checking that heap pointers are
    /// live.
    pub fn type_of(&self, value: Value) -> Result<ValueType> {
        let ty = value.get_type();
        if let Decoded::Pointer(p) = value.decode() {
            self.block(value, p.kind)?;
        }
        Ok(ty)
    }

    /// Structural equality.
    ///
    /// Lists compare element-wise, strings byte-wise. Special equals special.
    /// Functions, activation records and mutable cells compare by identity.
    /// Operands of different types (at any depth) are a type error.
    #[allow(clippy::float_cmp)]
    pub fn equal(&self, a: Value, b: Value) -> Result<bool> {
        let mut worklist = vec![(a, b)];

        while let Some((x, y)) = worklist.pop() {
            let (tx, ty) = (self.type_of(x)?, self.type_of(y)?);
            for (value, ty) in [(x, tx), (y, ty)] {
                if ty == ValueType::Unknown {
                    return Err(Error::new(ErrorKind::UnknownValue(value.to_bits())));
                }
            }
            if tx != ty {
                return Err(Error::type_mismatch(tx, ty));
            }

            let same = match tx {
                ValueType::Integer => x.get_int()? == y.get_int()?,
                ValueType::Float => x.get_float()? == y.get_float()?,
                ValueType::String => {
                    let (sx, sy) = (self.string(x)?, self.string(y)?);
                    sx.len() == sy.len() && sx.as_bytes() == sy.as_bytes()
                }
                ValueType::List => {
                    let (lx, ly) = (self.list(x)?, self.list(y)?);
                    if lx.len() == ly.len() {
                        worklist.extend(lx.iter().copied().zip(ly.iter().copied()));
                        true
                    } else {
                        false
                    }
                }
                ValueType::Special => true,
                ValueType::Mutable | ValueType::Function | ValueType::FuncEnv => x == y,
                ValueType::Unknown => {
                    return Err(Error::new(ErrorKind::UnknownValue(x.to_bits())));
                }
            };

            if !same {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Returns the constructor name of an ADT value shaped
    /// `[special, string, ...]`.
    ///
    /// The result is the name string itself, not a copy.
    pub fn constructor_name(&self, value: Value) -> Result<Value> {
        let items = self
            .list(value)
            .map_err(|_| Error::malformed_constructor(format!("not a list: {}", value.get_type())))?;

        match items {
            [tag, name, ..] if tag.is_special() => {
                if self.type_of(*name)? == ValueType::String {
                    Ok(*name)
                } else {
                    Err(Error::malformed_constructor(format!(
                        "constructor name must be a string, got {}",
                        name.get_type()
                    )))
                }
            }
            [tag, _, ..] => Err(Error::malformed_constructor(format!(
                "first element must be special, got {}",
                tag.get_type()
            ))),
            _ => Err(Error::malformed_constructor(format!(
                "expected at least 2 elements, got {}",
                items.len()
            ))),
        }
    }

    /// Renders a value for display, following lists and cells.
    pub fn render(&self, value: Value) -> Result<String> {
        let mut out = String::new();
        self.render_into(value, &mut out)?;
        Ok(out)
    }

    fn render_into(&self, value: Value, out: &mut String) -> Result<()> {
        match value.decode() {
            Decoded::Integer(n) => {
                let _ = write!(out, "{n}");
            }
            Decoded::Float(f) => {
                let _ = write!(out, "{f:?}");
            }
            Decoded::Special => out.push_str("<special>"),
            Decoded::Function(_) => out.push_str("<function>"),
            Decoded::FuncEnv(_) => out.push_str("<function_env>"),
            Decoded::Unknown(_) => out.push_str("<unknown>"),
            Decoded::Pointer(p) => match p.kind {
                BlockKind::String => out.push_str(self.string(value)?),
                BlockKind::List => {
                    out.push('[');
                    for (i, item) in self.list(value)?.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        self.render_into(*item, out)?;
                    }
                    out.push(']');
                }
                BlockKind::Mutable => {
                    out.push_str("<mutable ");
                    self.render_into(self.cell(value)?, out)?;
                    out.push('>');
                }
            },
        }
        Ok(())
    }

    /// Runs a full collection with `roots` in addition to pinned values.
    pub fn collect<R>(&mut self, roots: R) -> usize
    where
        R: IntoIterator<Item = Value>,
    {
        self.gc.collect(handles(roots))
    }

    /// Keeps `value` alive across collections until [`Heap::unpin`].
    ///
    /// Non-pointer values are ignored.
    pub fn pin(&mut self, value: Value) {
        if let Some(handle) = handle_of(value) {
            self.gc.add_root(handle);
        }
    }

    /// Releases one [`Heap::pin`] of `value`.
    pub fn unpin(&mut self, value: Value) {
        if let Some(handle) = handle_of(value) {
            self.gc.remove_root(handle);
        }
    }

    /// Returns true if `value` is a pointer to a live block.
    #[must_use]
    pub fn contains(&self, value: Value) -> bool {
        handle_of(value).is_some_and(|h| self.gc.contains(h))
    }

    /// Number of live blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.gc.len()
    }

    /// Returns true if no blocks are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gc.is_empty()
    }

    /// Collector statistics.
    #[must_use]
    pub fn stats(&self) -> GcStats {
        self.gc.stats()
    }
}
