use crate::hash::Salary;
use crate::utils::hashing::calculate_hash;
use std::fmt;

/// Longest name a command carries, in bytes. `Command` constructors cut longer names at a
/// char boundary.
pub const MAX_NAME_LEN: usize = 49;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub hash: u32,
    pub name: String,
    pub salary: Salary,
}

impl Record {
    /// Takes `name` as given. Length is bounded where commands are built, not here.
    pub fn new(name: impl Into<String>, salary: Salary) -> Self {
        let name = name.into();
        Record {
            hash: calculate_hash(&name),
            name,
            salary,
        }
    }
}

/// Renders as `hash,name,salary`, the line format of both print and the final dump.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.hash, self.name, self.salary)
    }
}

pub fn truncate_name(mut name: String) -> String {
    if name.len() > MAX_NAME_LEN {
        let mut end = MAX_NAME_LEN;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}
