//! Default action names.
//!
//! A `NameSequence` is owned by whoever sets up a simulation and handed to
//! action constructors. Names are `{prefix}{n}` with `n` strictly increasing.

/// Monotonic generator of action names.
///
/// Deliberately not `Clone`: two copies would hand out the same names.
#[derive(Debug)]
pub struct NameSequence {
    prefix: String,
    next: u64,
}

impl Default for NameSequence {
    fn default() -> Self {
        Self::new("Action")
    }
}

impl NameSequence {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 1)
    }

    pub fn starting_at(prefix: impl Into<String>, first: u64) -> Self {
        Self { prefix: prefix.into(), next: first }
    }

    pub fn next_name(&mut self) -> String {
        let name = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        name
    }

    /// Use the explicit name if given; only draws from the sequence otherwise.
    pub fn name_or_next(&mut self, explicit: Option<String>) -> String {
        match explicit {
            Some(name) => name,
            None => self.next_name(),
        }
    }

    /// Counter value the next generated name will carry.
    pub fn peek(&self) -> u64 {
        self.next
    }
}
