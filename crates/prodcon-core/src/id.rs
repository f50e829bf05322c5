//! Worker identifier type

use core::fmt;

/// What a worker does with the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Role {
    Producer = 0,
    Consumer = 1,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Consumer => "consumer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one pool worker: its role plus its index within that role
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId {
    role: Role,
    index: u32,
}

impl WorkerId {
    #[inline]
    pub const fn new(role: Role, index: u32) -> Self {
        WorkerId { role, index }
    }

    #[inline]
    pub const fn producer(index: u32) -> Self {
        WorkerId::new(Role::Producer, index)
    }

    #[inline]
    pub const fn consumer(index: u32) -> Self {
        WorkerId::new(Role::Consumer, index)
    }

    #[inline]
    pub const fn role(self) -> Role {
        self.role
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn is_producer(self) -> bool {
        matches!(self.role, Role::Producer)
    }

    /// Thread name used when spawning this worker
    pub fn thread_name(self) -> String {
        format!("{}-{}", self.role.as_str(), self.index)
    }
}

impl fmt::Debug for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkerId({}-{})", self.role, self.index)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.role, self.index)
    }
}
