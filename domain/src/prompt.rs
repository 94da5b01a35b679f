use crate::turn::Turn;

/// One slot of a prompt: either a fixed turn or the user input still to be filled.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptEntry {
    Fixed(Turn),
    UserInput,
}

/// An ordered chat prompt with exactly one trailing user-input slot.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    entries: Vec<PromptEntry>,
}

impl PromptTemplate {
    pub fn new(fixed: impl IntoIterator<Item = Turn>) -> Self {
        let mut entries: Vec<PromptEntry> = fixed.into_iter().map(PromptEntry::Fixed).collect();
        entries.push(PromptEntry::UserInput);
        Self { entries }
    }

    pub fn entries(&self) -> &[PromptEntry] {
        &self.entries
    }

    pub fn fill(&self, input: &str) -> Vec<Turn> {
        self.entries
            .iter()
            .map(|entry| match entry {
                PromptEntry::Fixed(turn) => turn.clone(),
                PromptEntry::UserInput => Turn::user(input),
            })
            .collect()
    }
}
