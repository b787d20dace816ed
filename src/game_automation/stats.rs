// Named session counters
use std::fmt;

pub const CYCLES: &str = "cycles";
pub const TIMEOUTS: &str = "timeouts";

/// Named counters in registration order. `cycles` and `timeouts` always exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counters {
    entries: Vec<(String, u64)>,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            entries: vec![(CYCLES.to_string(), 0), (TIMEOUTS.to_string(), 0)],
        }
    }
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a counter; an existing one keeps its value
    pub fn add_stat(&mut self, name: &str) {
        if self.position(name).is_none() {
            self.entries.push((name.to_string(), 0));
        }
    }

    pub fn increment(&mut self, name: &str) {
        self.increment_by(name, 1);
    }

    pub fn increment_by(&mut self, name: &str, amount: u64) {
        match self.position(name) {
            Some(i) => self.entries[i].1 += amount,
            None => self.entries.push((name.to_string(), amount)),
        }
    }

    pub fn set(&mut self, name: &str, value: u64) {
        match self.position(name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Current value, zero for an unknown counter
    pub fn get(&self, name: &str) -> u64 {
        self.position(name).map_or(0, |i| self.entries[i].1)
    }

    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.entries.clone()
    }

    pub fn reset(&mut self) {
        for (_, value) in &mut self.entries {
            *value = 0;
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }
}

/// `fish_caught` -> "Fish caught"
fn title(name: &str) -> String {
    if name == CYCLES {
        return "Cycles completed".to_string();
    }
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "{rule}")?;
        writeln!(f, "📊 STATISTICS")?;
        writeln!(f, "{rule}")?;
        for (name, value) in &self.entries {
            writeln!(f, "  {}: {value}", title(name))?;
        }
        write!(f, "{rule}")
    }
}
