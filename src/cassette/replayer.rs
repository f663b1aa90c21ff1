//! Serves recorded interactions back in recording order.

use std::collections::VecDeque;

use super::format::{Cassette, Interaction};

/// Cursor over the interactions a cassette holds for one port call.
///
/// Interactions for other ports or methods are ignored, so a cassette can be
/// shared by several replaying adapters.
#[derive(Debug)]
pub struct CassetteReplayer {
    port: String,
    method: String,
    pending: VecDeque<Interaction>,
    served: usize,
}

impl CassetteReplayer {
    /// Selects the `port::method` interactions of `cassette`, ordered by `seq`.
    #[must_use]
    pub fn new(cassette: &Cassette, port: &str, method: &str) -> Self {
        let mut selected: Vec<Interaction> = cassette
            .interactions
            .iter()
            .filter(|i| i.port == port && i.method == method)
            .cloned()
            .collect();
        selected.sort_by_key(|i| i.seq);
        Self {
            port: port.to_string(),
            method: method.to_string(),
            pending: selected.into(),
            served: 0,
        }
    }

    /// Takes the next interaction.
    ///
    /// # Panics
    ///
    /// Panics once every interaction has been served: the run made more calls
    /// than were recorded.
    pub fn next_interaction(&mut self) -> Interaction {
        let Some(interaction) = self.pending.pop_front() else {
            panic!(
                "Cassette exhausted: all {} {}::{} interactions have been served",
                self.served, self.port, self.method
            );
        };
        self.served += 1;
        interaction
    }

    /// Number of interactions not yet served.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}
