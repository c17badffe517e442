// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Question-indicator phrase table.
//!
//! Each entry is an interrogative opener. An opener only counts as a question
//! when a `?` follows it somewhere later in the text. Extend the table to teach
//! the extractor new phrasings; the extraction algorithm does not change.

/// Script of an opener, which decides how it is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternScript {
    /// Case-insensitive, whole-word match.
    Latin,
    /// Raw substring match (Devanagari words carry no case and attach matras).
    Devanagari,
}

/// One entry in the question-indicator table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionPattern {
    pub opener: &'static str,
    pub script: PatternScript,
}

impl QuestionPattern {
    pub const fn latin(opener: &'static str) -> Self {
        Self { opener, script: PatternScript::Latin }
    }

    pub const fn devanagari(opener: &'static str) -> Self {
        Self { opener, script: PatternScript::Devanagari }
    }

    /// Regex source matching the opener through the first following `?`.
    pub fn regex_source(&self) -> String {
        let opener = regex::escape(self.opener);
        match self.script {
            PatternScript::Latin => format!(r"(?i)\b{}\b[^?]*\?", opener),
            PatternScript::Devanagari => format!(r"{}[^?]*\?", opener),
        }
    }
}

/// Default opener table: English and Hindi.
pub const QUESTION_PATTERNS: &[QuestionPattern] = &[
    // English wh-words
    QuestionPattern::latin("what"),
    QuestionPattern::latin("why"),
    QuestionPattern::latin("how"),
    QuestionPattern::latin("when"),
    QuestionPattern::latin("where"),
    QuestionPattern::latin("which"),
    QuestionPattern::latin("who"),
    QuestionPattern::latin("whom"),
    QuestionPattern::latin("whose"),
    // English auxiliaries that open yes/no questions
    QuestionPattern::latin("can"),
    QuestionPattern::latin("could"),
    QuestionPattern::latin("do"),
    QuestionPattern::latin("does"),
    QuestionPattern::latin("did"),
    QuestionPattern::latin("is"),
    QuestionPattern::latin("are"),
    QuestionPattern::latin("was"),
    QuestionPattern::latin("were"),
    QuestionPattern::latin("will"),
    QuestionPattern::latin("would"),
    QuestionPattern::latin("should"),
    QuestionPattern::latin("have"),
    QuestionPattern::latin("has"),
    // English comprehension checks
    QuestionPattern::latin("right"),
    QuestionPattern::latin("okay"),
    QuestionPattern::latin("ready"),
    // Hindi
    QuestionPattern::devanagari("क्या"),
    QuestionPattern::devanagari("क्यों"),
    QuestionPattern::devanagari("कैसे"),
    QuestionPattern::devanagari("कैसा"),
    QuestionPattern::devanagari("कौन"),
    QuestionPattern::devanagari("कब"),
    QuestionPattern::devanagari("कहाँ"),
    QuestionPattern::devanagari("कहां"),
    QuestionPattern::devanagari("किस"),
    QuestionPattern::devanagari("कितन"),
    QuestionPattern::devanagari("समझ"),
    // Hinglish (Latin-script Hindi)
    QuestionPattern::latin("kya"),
    QuestionPattern::latin("kyun"),
    QuestionPattern::latin("kaise"),
    QuestionPattern::latin("samjhe"),
];
