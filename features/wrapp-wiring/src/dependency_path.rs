use crate::errors::WiringError;

/// Components currently being resolved, outermost first
///
/// A fresh path is created for every external lookup and handed down the
/// recursion, so the container itself keeps no in-flight state.
#[derive(Debug, Default, Clone)]
pub(crate) struct ResolutionPath {
    chain: Vec<String>,
}

impl ResolutionPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `name` as in-flight
    ///
    /// Fails if it already is - the error lists the whole chain plus the repeated name.
    pub fn enter(&mut self, name: &str) -> Result<(), WiringError> {
        if self.contains(name) {
            let mut chain = self.chain.clone();
            chain.push(name.to_string()); // Add current so chain is complete
            return Err(WiringError::DependencyLoop { chain });
        }

        self.chain.push(name.to_string());
        Ok(())
    }

    /// Marks the innermost component as done
    pub fn leave(&mut self) {
        self.chain.pop();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.chain.iter().any(|entry| entry == name)
    }
}
