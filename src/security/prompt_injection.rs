//! Prompt Injection Protection
//!
//! Matches raw input against the ordered admission rule table.
//! ASCII phrase rules share one Aho-Corasick automaton. Regex rules, and
//! phrases with non-ASCII letters (compiled as escaped regexes so case
//! folding covers Unicode), are checked only when they could still beat
//! the best phrase match.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use regex::{Regex, RegexBuilder};

use super::rules::{InjectionRule, RuleError, RuleKind, RuleTable};

/// Compiled rule table.
#[derive(Debug)]
pub struct PromptInjectionFilter {
    rules: Vec<InjectionRule>,
    /// Phrase automaton, `None` when the table has no phrase rules.
    phrases: Option<AhoCorasick>,
    /// Automaton pattern id -> rule index.
    phrase_rule: Vec<usize>,
    /// (rule index, compiled regex), ascending by rule index.
    regexes: Vec<(usize, Regex)>,
}

/// The rule that blocked an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionMatch {
    /// Position of the rule in the table.
    pub rule_index: usize,
    pub pattern: String,
    pub reason: String,
}

impl PromptInjectionFilter {
    /// Compile a rule table.
    pub fn new(table: &RuleTable) -> Result<Self, RuleError> {
        table.validate()?;

        let mut phrase_patterns = Vec::new();
        let mut phrase_rule = Vec::new();
        let mut regexes = Vec::new();

        for (index, rule) in table.rules.iter().enumerate() {
            match rule.kind {
                RuleKind::Phrase if rule.pattern.is_ascii() => {
                    phrase_patterns.push(rule.pattern.as_str());
                    phrase_rule.push(index);
                }
                RuleKind::Phrase => {
                    regexes.push((index, compile(&regex::escape(&rule.pattern), rule)?));
                }
                RuleKind::Regex => {
                    regexes.push((index, compile(&rule.pattern, rule)?));
                }
            }
        }

        let phrases = if phrase_patterns.is_empty() {
            None
        } else {
            Some(
                AhoCorasickBuilder::new()
                    .ascii_case_insensitive(true)
                    .build(&phrase_patterns)?,
            )
        };

        Ok(Self {
            rules: table.rules.clone(),
            phrases,
            phrase_rule,
            regexes,
        })
    }

    /// First rule (in table order) matching `text`, if any.
    pub fn first_match(&self, text: &str) -> Option<InjectionMatch> {
        let mut best: Option<usize> = None;

        if let Some(phrases) = &self.phrases {
            for m in phrases.find_overlapping_iter(text) {
                let index = self.phrase_rule[m.pattern().as_usize()];
                if best.map_or(true, |b| index < b) {
                    best = Some(index);
                }
                if index == 0 {
                    break;
                }
            }
        }

        for (index, re) in &self.regexes {
            if best.is_some_and(|b| *index > b) {
                break;
            }
            if re.is_match(text) {
                best = Some(*index);
                break;
            }
        }

        best.map(|index| {
            let rule = &self.rules[index];
            InjectionMatch {
                rule_index: index,
                pattern: rule.pattern.clone(),
                reason: rule.reason(),
            }
        })
    }

    /// Whether `text` passes every rule.
    pub fn is_clean(&self, text: &str) -> bool {
        self.first_match(text).is_none()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

fn compile(expr: &str, rule: &InjectionRule) -> Result<Regex, RuleError> {
    RegexBuilder::new(expr)
        .case_insensitive(true)
        .build()
        .map_err(|source| RuleError::InvalidRegex {
            pattern: rule.pattern.clone(),
            source,
        })
}

impl Default for PromptInjectionFilter {
    fn default() -> Self {
        Self::new(&RuleTable::default()).expect("Failed to build built-in rule matcher")
    }
}
