use crate::bytecode::static_string;

/// Append-only byte arena, zeroed on allocation
///
/// Nothing is ever freed, a heap lives as long as the VM which owns it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Heap {
  bytes: Vec<u8>,
}
impl Heap {
  /// Create an empty heap
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Reserve `count` zeroed bytes, returning the offset of the first
  pub fn allocate(&mut self, count: usize) -> usize {
    let start = self.bytes.len();
    self.bytes.resize(start + count, 0);
    start
  }

  /// Copy bytes into the heap at an offset
  ///
  /// Returns `None` if the bytes don't fit inside the allocated heap.
  pub fn write(&mut self, offset: usize, data: &[u8]) -> Option<()> {
    let end = offset.checked_add(data.len())?;
    self.bytes.get_mut(offset..end)?.copy_from_slice(data);
    Some(())
  }

  /// Copy a string into the heap, with a NUL terminator
  pub fn allocate_string(&mut self, string: &[u8]) -> usize {
    let offset = self.allocate(string.len() + 1);
    // the allocation always has room for the string
    let _ = self.write(offset, string);
    offset
  }

  /// The NUL-terminated string starting at an offset, without its terminator
  #[must_use]
  pub fn string(&self, offset: usize) -> Option<&[u8]> {
    static_string(&self.bytes, offset)
  }

  /// The bytes of the heap
  #[must_use]
  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }

  /// The number of bytes allocated
  #[must_use]
  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  /// Has nothing been allocated?
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }
}

#[cfg(test)]
mod test {
  use super::Heap;

  #[test]
  fn allocations_are_zeroed_and_contiguous() {
    let mut heap = Heap::new();

    assert_eq!(heap.allocate(3), 0);
    assert_eq!(heap.allocate(2), 3);
    assert_eq!(heap.as_bytes(), [0, 0, 0, 0, 0]);
  }

  #[test]
  fn strings() {
    let mut heap = Heap::new();
    let first = heap.allocate_string(b"hi");
    let second = heap.allocate_string(b"");

    assert_eq!(heap.as_bytes(), b"hi\0\0");
    assert_eq!(heap.string(first), Some(&b"hi"[..]));
    assert_eq!(heap.string(second), Some(&b""[..]));
    assert_eq!(heap.string(4), None);
  }

  #[test]
  fn write_in_bounds_only() {
    let mut heap = Heap::new();
    let offset = heap.allocate(4);

    assert_eq!(heap.write(offset + 1, b"ab"), Some(()));
    assert_eq!(heap.as_bytes(), b"\0ab\0");
    assert_eq!(heap.write(offset + 3, b"ab"), None);
    assert_eq!(heap.write(usize::MAX, b"a"), None);
  }
}
