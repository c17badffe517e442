// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Prompt construction for the generation service.
//!
//! The generation service keeps no state between calls. Everything it needs
//! to continue a lesson (profile, topic, recent transcript and the rules for
//! staying on topic) has to be in the prompt text built here.

use crate::types::SessionContext;

/// Number of history entries included in a continuation prompt.
pub const HISTORY_WINDOW: usize = 10;

/// Label used when the student's name is missing.
pub const DEFAULT_STUDENT_LABEL: &str = "the student";

/// Label used when no additional requirements were given.
pub const DEFAULT_REQUIREMENTS_LABEL: &str = "none";

/// Label used for any other missing text field.
pub const DEFAULT_FIELD_LABEL: &str = "not specified";

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        default
    } else {
        value
    }
}

fn requirements_label(context: &SessionContext) -> &str {
    context
        .additional_requirements
        .as_deref()
        .map(|r| or_default(r, DEFAULT_REQUIREMENTS_LABEL))
        .unwrap_or(DEFAULT_REQUIREMENTS_LABEL)
}

fn profile_block(context: &SessionContext) -> String {
    format!(
        "STUDENT PROFILE:\n\
         - Name: {name}\n\
         - Prior knowledge: {prior}\n\
         - Difficulty: {difficulty}\n\
         - Learning mode: {mode} ({hint})\n\
         - Language: {language}\n\
         - Additional requirements: {requirements}",
        name = or_default(&context.student_name, DEFAULT_STUDENT_LABEL),
        prior = context.prior_knowledge.label(),
        difficulty = context.difficulty.label(),
        mode = context.learning_mode.label(),
        hint = context.learning_mode.style_hint(),
        language = context.language.label(),
        requirements = requirements_label(context),
    )
}

/// Build the prompt that opens a new lesson.
pub fn build_initial_prompt(context: &SessionContext) -> String {
    let subject = or_default(&context.subject, DEFAULT_FIELD_LABEL);
    let chapter = or_default(&context.chapter, DEFAULT_FIELD_LABEL);
    let name = or_default(&context.student_name, DEFAULT_STUDENT_LABEL);

    format!(
        "You are a patient, friendly tutor beginning the chapter \"{chapter}\" in {subject} \
         with {name}. Teach at the {difficulty} level for a student with {prior}.\n\n\
         {profile}\n\n\
         INSTRUCTIONS:\n\
         1. Open with a warm, encouraging greeting addressed to {name}.\n\
         2. Introduce \"{chapter}\" at the {difficulty} level, in the {mode} style.\n\
         3. Keep this opening short: three or four sentences at most.\n\
         4. End by checking understanding with exactly one simple question, \
         written as a real question ending in a question mark.\n\
         5. Do not answer your own question and do not continue past it.\n\
         6. Respond in {language}.",
        chapter = chapter,
        subject = subject,
        name = name,
        difficulty = context.difficulty.label(),
        prior = context.prior_knowledge.label(),
        mode = context.learning_mode.label(),
        language = context.language.label(),
        profile = profile_block(context),
    )
}

/// Build the prompt that continues a lesson from the recent transcript.
///
/// Only the last [`HISTORY_WINDOW`] entries of `history` are included,
/// oldest first.
pub fn build_continuation_prompt(context: &SessionContext, history: &[String]) -> String {
    build_continuation_prompt_with_window(context, history, HISTORY_WINDOW)
}

/// Same as [`build_continuation_prompt`] with an explicit window size.
pub fn build_continuation_prompt_with_window(
    context: &SessionContext,
    history: &[String],
    window: usize,
) -> String {
    let start = history.len().saturating_sub(window);
    let transcript = if history[start..].is_empty() {
        "(no conversation yet)".to_string()
    } else {
        history[start..].join("\n")
    };

    let subject = or_default(&context.subject, DEFAULT_FIELD_LABEL);
    let chapter = or_default(&context.chapter, DEFAULT_FIELD_LABEL);
    let topic = or_default(&context.current_topic, chapter);
    let name = or_default(&context.student_name, DEFAULT_STUDENT_LABEL);

    format!(
        "You are continuing a one-on-one tutoring session in {subject}, chapter \"{chapter}\". \
         The current topic is \"{topic}\". {answered} question(s) answered so far.\n\n\
         {profile}\n\n\
         RECENT CONVERSATION (oldest first):\n\
         {transcript}\n\n\
         INSTRUCTIONS:\n\
         1. Continue naturally from the last message above. \
         Do not greet again or restart the lesson.\n\
         2. Stay on the topic \"{topic}\" until {name} has clearly understood it.\n\
         3. Respond to {name}'s last answer first: \
         acknowledge what is right and gently correct what is not.\n\
         4. If {name} seems confused or unsure, explain the same idea more deeply \
         with a simpler example before moving forward.\n\
         5. Before moving to a new topic, explicitly ask {name} to confirm \
         they understood and are ready.\n\
         6. Only change topic when {name} has explicitly said they are ready.\n\
         7. Keep the reply short and ask exactly one question at the end, \
         unless the topic is fully understood and the lesson is complete, \
         in which case close warmly without a question.\n\
         8. Respond in {language}.",
        subject = subject,
        chapter = chapter,
        topic = topic,
        name = name,
        answered = context.student_responses.len(),
        profile = profile_block(context),
        transcript = transcript,
        language = context.language.label(),
    )
}
