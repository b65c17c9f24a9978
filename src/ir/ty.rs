use std::fmt;

/// The types of IR values.
///
/// Types only matter for printing and for the size of memory accesses, so
/// they are plain values instead of interned entities.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub enum Ty {
    /// A void type, used by instructions without a result.
    Void,
    /// An integer type with the given width in bits.
    Int(u16),
    /// An IEEE 754 single precision floating point number.
    Float32,
    /// An IEEE 754 double precision floating point number.
    Float64,
    /// An opaque pointer.
    Ptr,
    /// A block label.
    Label,
}

impl Ty {
    pub fn int(width: u16) -> Ty { Ty::Int(width) }

    pub fn is_void(self) -> bool { matches!(self, Ty::Void) }

    /// The storage size in bytes, if the type can be stored in memory.
    pub fn bytewidth(self) -> Option<u64> {
        match self {
            Ty::Int(width) => Some((u64::from(width) + 7) / 8),
            Ty::Float32 => Some(4),
            Ty::Float64 | Ty::Ptr => Some(8),
            Ty::Void | Ty::Label => None,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Void => write!(f, "void"),
            Ty::Int(width) => write!(f, "i{}", width),
            Ty::Float32 => write!(f, "float"),
            Ty::Float64 => write!(f, "double"),
            Ty::Ptr => write!(f, "ptr"),
            Ty::Label => write!(f, "label"),
        }
    }
}
