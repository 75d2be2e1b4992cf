//! Parsing of producer responses into typed child proposals.
//!
//! This is the only place where trailing tag text is inspected; everything
//! downstream works on [`ChildTag`] and [`FactType`].

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::entities::FactType;

/// Maximum number of tagged lines considered from one response.
pub const PROPOSAL_LINES: usize = 3;

/// Trailing tag of a proposed child line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildTag {
    FactFromStory,
    CommonsenseKnowledge,
    /// Accepted as a synonym for an explicit fact
    ComplexFact,
}

impl ChildTag {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "fact from story" => Some(ChildTag::FactFromStory),
            "commonsense knowledge" => Some(ChildTag::CommonsenseKnowledge),
            "complex fact" => Some(ChildTag::ComplexFact),
            _ => None,
        }
    }

    pub fn fact_type(&self) -> FactType {
        match self {
            ChildTag::FactFromStory | ChildTag::ComplexFact => FactType::Explicit,
            ChildTag::CommonsenseKnowledge => FactType::Commonsense,
        }
    }
}

/// One `text | tag` line of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedLine {
    pub text: String,
    pub tag: ChildTag,
}

impl TaggedLine {
    /// Split on the last `|`; `None` when there is no delimiter or the tag is unknown.
    pub fn parse(line: &str) -> Option<Self> {
        let cleaned = leading_markers().replace(line.trim(), "");
        let (text, tag) = cleaned.rsplit_once('|')?;
        Some(Self {
            text: text.trim().to_string(),
            tag: ChildTag::parse(tag)?,
        })
    }
}

fn leading_markers() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[>\s]+").expect("static regex"))
}

/// Candidate child set for one node, split by fact type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildProposal {
    pub explicit: Vec<String>,
    pub commonsense: Vec<String>,
    /// Response text exactly as received
    pub raw: String,
}

impl ChildProposal {
    /// Parse a raw response.
    ///
    /// Only lines containing `|` count, and only the first three of those.
    /// Classification follows each line's tag, never its position; lines with
    /// an unknown tag are dropped.
    pub fn parse(raw: &str) -> Self {
        let mut proposal = ChildProposal {
            raw: raw.to_string(),
            ..Default::default()
        };
        let tagged = raw
            .lines()
            .filter(|l| l.contains('|'))
            .take(PROPOSAL_LINES)
            .filter_map(TaggedLine::parse);
        for line in tagged {
            match line.tag.fact_type() {
                FactType::Commonsense => proposal.commonsense.push(line.text),
                _ => proposal.explicit.push(line.text),
            }
        }
        proposal
    }

    /// All candidate texts, explicit first.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.explicit
            .iter()
            .chain(self.commonsense.iter())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.explicit.len() + self.commonsense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("> > A contract exists. | Fact From Story", Some(ChildTag::FactFromStory))]
    #[case("A rule applies. | Commonsense Knowledge", Some(ChildTag::CommonsenseKnowledge))]
    #[case("Structure is layered. |Complex Fact", Some(ChildTag::ComplexFact))]
    #[case("No delimiter here", None)]
    #[case("Unknown tag | Opinion", None)]
    fn given_line_when_parsing_then_recognises_tag(
        #[case] line: &str,
        #[case] expected: Option<ChildTag>,
    ) {
        assert_eq!(TaggedLine::parse(line).map(|l| l.tag), expected);
    }

    #[test]
    fn given_pipe_in_text_when_parsing_then_splits_on_last_delimiter() {
        let line = TaggedLine::parse("Clause 4|2 labels royalties | Fact From Story").unwrap();
        assert_eq!(line.text, "Clause 4|2 labels royalties");
    }

    #[test]
    fn given_shuffled_response_when_parsing_then_classifies_by_tag() {
        let raw = "Here you go:\n\
                   > Rule text. | Commonsense Knowledge\n\
                   > First fact. | Fact From Story\n\
                   > Second fact. | Complex Fact\n";
        let proposal = ChildProposal::parse(raw);
        assert_eq!(proposal.explicit, vec!["First fact.", "Second fact."]);
        assert_eq!(proposal.commonsense, vec!["Rule text."]);
        assert_eq!(proposal.raw, raw);
    }

    #[test]
    fn given_more_than_three_tagged_lines_when_parsing_then_keeps_first_three() {
        let raw = "a | Fact From Story\nb | Fact From Story\nc | Fact From Story\nd | Commonsense Knowledge";
        let proposal = ChildProposal::parse(raw);
        assert_eq!(proposal.explicit.len(), 3);
        assert!(proposal.commonsense.is_empty());
    }
}
