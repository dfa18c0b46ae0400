//! Exception constructors
//!
//! A constructor is a two-field block `[name; id]` with the `OBJECT` tag.
//! Predefined constructors live in static memory and carry negative ids;
//! constructors defined at runtime live in the heap, are kept alive by a
//! global root, and carry positive ids. The id is the logical identity: it
//! survives the collector moving the block.

use std::fmt;

use heron_gc::{Heap, StaticBlock, Value, tags};

macro_rules! predefined_exceptions {
    ($($variant:ident($constructor:ident) => $name:literal, $id:literal;)*) => {
        paste::paste! {
            $(
                static [<$constructor _NAME>]: StaticBlock = StaticBlock::string($name);
                static [<$constructor _FIELDS>]: [Value; 2] =
                    [Value::Static(&[<$constructor _NAME>]), Value::Int($id)];
                pub(crate) static $constructor: StaticBlock =
                    StaticBlock::record(tags::OBJECT, &[<$constructor _FIELDS>]);
            )*
        }

        /// Exception constructors known to the runtime
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Predefined {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )*
        }

        impl Predefined {
            /// Every predefined constructor
            pub const ALL: &'static [Predefined] = &[$(Predefined::$variant),*];

            /// Constructor name as seen by programs
            pub fn name(self) -> &'static str {
                match self {
                    $(Predefined::$variant => $name,)*
                }
            }

            /// Constructor id (always negative)
            pub fn id(self) -> i64 {
                match self {
                    $(Predefined::$variant => $id,)*
                }
            }

            /// The static constructor block
            pub fn constructor(self) -> &'static StaticBlock {
                match self {
                    $(Predefined::$variant => &$constructor,)*
                }
            }
        }
    };
}

predefined_exceptions! {
    OutOfMemory(OUT_OF_MEMORY) => "Out_of_memory", -1;
    SysError(SYS_ERROR) => "Sys_error", -2;
    Failure(FAILURE) => "Failure", -3;
    InvalidArgument(INVALID_ARGUMENT) => "Invalid_argument", -4;
    EndOfFile(END_OF_FILE) => "End_of_file", -5;
    DivisionByZero(DIVISION_BY_ZERO) => "Division_by_zero", -6;
    NotFound(NOT_FOUND) => "Not_found", -7;
    MatchFailure(MATCH_FAILURE) => "Match_failure", -8;
}

impl Predefined {
    /// Look up a constructor by id
    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.id() == id)
    }

    /// The constructor as a value
    pub fn value(self) -> Value {
        Value::Static(self.constructor())
    }
}

impl fmt::Display for Predefined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A constructor defined at runtime.
///
/// The id carries the stamp of the defining [`Runtime`](crate::Runtime) in its
/// upper half and the definition index (from 1) in its lower half, so a tag
/// from one runtime never resolves in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserTag(i64);

impl UserTag {
    pub(crate) fn new(id: i64) -> Self {
        debug_assert!(id > 0);
        Self(id)
    }

    pub(crate) fn compose(stamp: u32, index: u32) -> Self {
        Self::new((i64::from(stamp & 0x7fff_ffff) << 32) | i64::from(index))
    }

    /// Constructor id (always positive)
    pub fn id(self) -> i64 {
        self.0
    }

    /// Stamp of the defining runtime
    pub(crate) fn stamp(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Definition index within the defining runtime, from 1
    pub(crate) fn index(self) -> u32 {
        self.0 as u32
    }
}

/// Identity of an exception constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExnTag {
    /// One of the runtime's own constructors
    Predefined(Predefined),
    /// A constructor created by [`Runtime::define_exception`](crate::Runtime::define_exception)
    User(UserTag),
}

impl ExnTag {
    /// Recover the tag of a constructor block
    pub fn of_constructor(heap: &Heap, constructor: Value) -> Option<Self> {
        if heap.header(constructor)?.tag() != tags::OBJECT {
            return None;
        }
        match heap.field(constructor, 1)?.as_int()? {
            0 => None,
            id if id < 0 => Predefined::from_id(id).map(Self::Predefined),
            id => Some(Self::User(UserTag::new(id))),
        }
    }

    /// The predefined constructor, if this is one
    pub fn predefined(self) -> Option<Predefined> {
        match self {
            Self::Predefined(p) => Some(p),
            Self::User(_) => None,
        }
    }
}

impl From<Predefined> for ExnTag {
    fn from(p: Predefined) -> Self {
        Self::Predefined(p)
    }
}

impl From<UserTag> for ExnTag {
    fn from(tag: UserTag) -> Self {
        Self::User(tag)
    }
}
