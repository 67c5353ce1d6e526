//! Message tree and breadth-first layout codec
//!
//! A message is a tree: every node carries a byte block (possibly empty)
//! and an ordered list of child messages (possibly empty). On the wire a
//! tree is projected into a *layout vector*, one 32-bit word per node in
//! breadth-first order, plus the node byte blocks, also in breadth-first
//! order. The layout word packs the node's byte length into the low 30
//! bits and two tree bits on top: [`SUBMSG_FLAG`] marks a node that has
//! children, [`SIBLING_FLAG`] marks a child followed by another child of
//! the same parent. The final word of a well-formed layout carries neither
//! bit, which is how a receiver knows the tree is complete.
//!
//! Layout words are logical `u32` values here; a transport converts them
//! to little-endian on the way out.

use std::fmt;
use std::ops::{Add, AddAssign};

/// Set when the node has at least one child.
pub const SUBMSG_FLAG: u32 = 1 << 30;
/// Set when the node is followed by a sibling under the same parent.
pub const SIBLING_FLAG: u32 = 1 << 31;
/// Low 30 bits: the node's byte block length.
pub const LEN_MASK: u32 = SUBMSG_FLAG - 1;

/// A size in the message model: a byte count plus a submessage-slot count.
///
/// Generated serializers compute sizes in this unit; the dynamic part of a
/// value is the `DLen` its `count` function returns, added to the type's
/// constant base size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DLen {
    pub bytes: usize,
    pub submsgs: usize,
}

impl DLen {
    pub const ZERO: DLen = DLen {
        bytes: 0,
        submsgs: 0,
    };

    pub fn new(bytes: usize, submsgs: usize) -> Self {
        DLen { bytes, submsgs }
    }
}

impl Add for DLen {
    type Output = DLen;

    fn add(self, rhs: DLen) -> DLen {
        DLen {
            bytes: self.bytes + rhs.bytes,
            submsgs: self.submsgs + rhs.submsgs,
        }
    }
}

impl AddAssign for DLen {
    fn add_assign(&mut self, rhs: DLen) {
        self.bytes += rhs.bytes;
        self.submsgs += rhs.submsgs;
    }
}

/// Errors raised by the layout codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    /// The layout vector was empty.
    Empty,
    /// A node's byte block does not fit in 30 bits.
    Oversize,
    /// The final layout entry still carries tree bits.
    Unterminated,
    /// A child run would extend past the end of the layout.
    Truncated,
    /// Entries remained after the tree traversal completed.
    DanglingEntries,
    /// The block list does not match the tree's nonempty byte blocks.
    BlockMismatch,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayoutError::Empty => "empty layout",
            LayoutError::Oversize => "byte block too large for layout entry",
            LayoutError::Unterminated => "final layout entry has continuation bits",
            LayoutError::Truncated => "layout ends inside a child run",
            LayoutError::DanglingEntries => "layout entries left over after traversal",
            LayoutError::BlockMismatch => "block list does not match layout",
        })
    }
}

impl std::error::Error for LayoutError {}

/// A tree-structured message: one byte block and an ordered list of child
/// messages per node. Uniquely owned; moving a message into a submessage
/// slot transfers it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Msg {
    pub bytes: Vec<u8>,
    pub submsgs: Vec<Msg>,
}

impl Msg {
    /// An empty message: no bytes, no children.
    pub fn empty() -> Msg {
        Msg::default()
    }

    /// Allocates a message with `n_bytes` zeroed bytes and `n_submsgs`
    /// empty child slots. This is the allocate phase of the
    /// count/allocate/write discipline.
    pub fn new(n_bytes: usize, n_submsgs: usize) -> Msg {
        Msg {
            bytes: vec![0; n_bytes],
            submsgs: vec![Msg::empty(); n_submsgs],
        }
    }

    /// A childless message holding a copy of `bytes`.
    pub fn leaf(bytes: &[u8]) -> Msg {
        Msg {
            bytes: bytes.to_vec(),
            submsgs: Vec::new(),
        }
    }

    /// Total node count of the tree, root included.
    pub fn count(&self) -> usize {
        1 + self.submsgs.iter().map(Msg::count).sum::<usize>()
    }

    /// Builds the breadth-first layout vector for this tree.
    pub fn create_layout(&self) -> Result<Vec<u32>, LayoutError> {
        let mut layout = Vec::with_capacity(self.count());
        layout.push(self.layout_entry(false)?);

        // Queue of nodes whose children still need layout entries.
        let mut queue: Vec<&Msg> = vec![self];
        let mut head = 0;
        while head < queue.len() {
            let cur = queue[head];
            head += 1;
            for (i, sub) in cur.submsgs.iter().enumerate() {
                layout.push(sub.layout_entry(i + 1 < cur.submsgs.len())?);
                queue.push(sub);
            }
        }

        Ok(layout)
    }

    fn layout_entry(&self, has_sibling: bool) -> Result<u32, LayoutError> {
        if self.bytes.len() > LEN_MASK as usize {
            return Err(LayoutError::Oversize);
        }
        let mut entry = self.bytes.len() as u32;
        if !self.submsgs.is_empty() {
            entry |= SUBMSG_FLAG;
        }
        if has_sibling {
            entry |= SIBLING_FLAG;
        }
        Ok(entry)
    }

    /// Collects the nonempty byte blocks in breadth-first order.
    pub fn collect_blocks(&self) -> Vec<&[u8]> {
        let mut blocks = Vec::new();
        let mut queue: Vec<&Msg> = vec![self];
        let mut head = 0;
        while head < queue.len() {
            let cur = queue[head];
            head += 1;
            queue.extend(cur.submsgs.iter());
            if !cur.bytes.is_empty() {
                blocks.push(cur.bytes.as_slice());
            }
        }
        blocks
    }

    /// Reconstructs a tree from a layout vector, allocating every node in
    /// one pass. Byte blocks come back zeroed; see [`Msg::from_parts`] for
    /// the full receive path.
    pub fn alloc_by_layout(layout: &[u32]) -> Result<Msg, LayoutError> {
        let len = layout.len();
        if len == 0 {
            return Err(LayoutError::Empty);
        }
        if layout[len - 1] & (SUBMSG_FLAG | SIBLING_FLAG) != 0 {
            return Err(LayoutError::Unterminated);
        }

        // First pass: recover (byte length, child range) per node by
        // replaying the breadth-first traversal over the entry bits.
        let mut meta = Vec::with_capacity(len);
        let mut qlim = 1usize;
        let mut i = 0usize;
        while i < qlim {
            let entry = layout[i];
            let n_bytes = (entry & LEN_MASK) as usize;
            let start = qlim;
            let mut n_children = 0usize;
            if entry & SUBMSG_FLAG != 0 {
                if qlim >= len {
                    return Err(LayoutError::Truncated);
                }
                // The terminator check above bounds this scan.
                while layout[qlim] & SIBLING_FLAG != 0 {
                    qlim += 1;
                }
                qlim += 1;
                n_children = qlim - start;
            }
            meta.push((n_bytes, start, n_children));
            i += 1;
        }
        if qlim != len {
            return Err(LayoutError::DanglingEntries);
        }

        // Second pass: assemble bottom-up. Children always sit at higher
        // indices than their parent, so a reverse walk has every child
        // ready when its parent is built.
        let mut nodes: Vec<Option<Msg>> = vec![None; len];
        for idx in (0..len).rev() {
            let (n_bytes, start, n_children) = meta[idx];
            let submsgs = (start..start + n_children)
                .map(|j| nodes[j].take().expect("child built before parent"))
                .collect();
            nodes[idx] = Some(Msg {
                bytes: vec![0; n_bytes],
                submsgs,
            });
        }
        Ok(nodes[0].take().expect("root built last"))
    }

    /// Receiver-side reassembly: allocate by layout, then fill the tree's
    /// byte blocks from `blocks` in breadth-first order.
    pub fn from_parts(layout: &[u32], blocks: &[&[u8]]) -> Result<Msg, LayoutError> {
        let mut msg = Msg::alloc_by_layout(layout)?;

        let mut next = 0usize;
        let mut queue: std::collections::VecDeque<&mut Msg> = std::collections::VecDeque::new();
        queue.push_back(&mut msg);
        while let Some(cur) = queue.pop_front() {
            let Msg { bytes, submsgs } = cur;
            if !bytes.is_empty() {
                let block = blocks.get(next).ok_or(LayoutError::BlockMismatch)?;
                if block.len() != bytes.len() {
                    return Err(LayoutError::BlockMismatch);
                }
                bytes.copy_from_slice(block);
                next += 1;
            }
            queue.extend(submsgs.iter_mut());
        }
        if next != blocks.len() {
            return Err(LayoutError::BlockMismatch);
        }
        Ok(msg)
    }
}
