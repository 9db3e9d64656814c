//! Keyword-driven fallback content generator.
//!
//! Pure and total: scans the submitted code for shallow lexical signals and
//! assembles a complete `ContentBundle` from fixed templates. This is the
//! guaranteed path behind every model failure, so it must never fail and must
//! stay deterministic for identical inputs.

use std::collections::BTreeMap;

use serde_json::json;

use crate::domain::{ContentBundle, Difficulty, ExecutionTrace, QuizItem, ReadingLevel, TraceStep};

const LOOP_KEYWORDS: [&str; 3] = ["for", "while", "do"];
const CONDITIONAL_KEYWORDS: [&str; 4] = ["if", "else", "switch", "case"];
const FUNCTION_KEYWORDS: [&str; 3] = ["function", "def", "func"];

const DIAGRAM_LOOP_BRANCH: &str = r#"flowchart TD
    Start([Start]) --> Loop{More items?}
    Loop -->|yes| Check{Condition true?}
    Check -->|yes| Then[Run this branch]
    Check -->|no| Else[Run other branch]
    Then --> Loop
    Else --> Loop
    Loop -->|no| End([End])"#;

const DIAGRAM_LOOP: &str = r#"flowchart TD
    Start([Start]) --> Loop{More items?}
    Loop -->|yes| Body[Run loop body]
    Body --> Loop
    Loop -->|no| End([End])"#;

const DIAGRAM_BRANCH: &str = r#"flowchart TD
    Start([Start]) --> Check{Condition true?}
    Check -->|yes| Then[Run this branch]
    Check -->|no| Else[Run other branch]
    Then --> End([End])
    Else --> End"#;

const DIAGRAM_STRAIGHT: &str = r#"flowchart TD
    Start([Start]) --> Step1[Run first statement]
    Step1 --> Step2[Run next statement]
    Step2 --> End([End])"#;

/// Lexical signals detected in the submitted code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signals {
  pub has_loops: bool,
  pub has_conditionals: bool,
  pub has_functions: bool,
}

/// Case-insensitive substring scan. Shallow on purpose: "format" counts as a
/// loop keyword hit, which is acceptable noise for a fallback explainer.
pub fn detect_signals(code: &str) -> Signals {
  let lower = code.to_lowercase();
  let any = |keys: &[&str]| keys.iter().any(|k| lower.contains(k));
  Signals {
    has_loops: any(&LOOP_KEYWORDS),
    has_conditionals: any(&CONDITIONAL_KEYWORDS),
    has_functions: any(&FUNCTION_KEYWORDS),
  }
}

enum Register {
  Child,
  Teen,
  Technical,
}

fn register(level: ReadingLevel) -> Register {
  match level {
    ReadingLevel::Age12 => Register::Child,
    ReadingLevel::Age15 => Register::Teen,
    ReadingLevel::Cs1 | ReadingLevel::Pro => Register::Technical,
  }
}

/// Base sentence per register, extended with one clause per detected signal.
/// Clause order is fixed: loops, then conditionals, then (technical register
/// only) functions.
fn explanation_for(language: &str, level: ReadingLevel, sig: Signals) -> String {
  let reg = register(level);
  let mut out = match reg {
    Register::Child => {
      "Think of this program like a recipe the computer follows one step at a time.".to_string()
    }
    Register::Teen => {
      "This code is a list of instructions the computer runs from top to bottom.".to_string()
    }
    Register::Technical => format!("This {language} code executes statement by statement."),
  };

  if sig.has_loops {
    out.push_str(match reg {
      Register::Child => " Some steps repeat, like stirring a pot again and again until it is done.",
      Register::Teen => " Part of it repeats in a loop until a condition tells it to stop.",
      Register::Technical => " Iteration constructs repeat a block until their guard condition fails.",
    });
  }
  if sig.has_conditionals {
    out.push_str(match reg {
      Register::Child => " Sometimes it picks between two paths, like choosing what to do next based on what it sees.",
      Register::Teen => " It also checks conditions and picks different branches depending on the result.",
      Register::Technical => " Conditional branches select between alternative paths at runtime.",
    });
  }
  if sig.has_functions {
    if let Register::Technical = reg {
      out.push_str(" Logic is factored into functions that are defined once and invoked where needed.");
    }
  }
  out
}

/// Diagram template keyed only by the (loops, conditionals) pair. The functions
/// signal and the reading level never influence the diagram.
pub fn diagram_for(sig: Signals) -> &'static str {
  match (sig.has_loops, sig.has_conditionals) {
    (true, true) => DIAGRAM_LOOP_BRANCH,
    (true, false) => DIAGRAM_LOOP,
    (false, true) => DIAGRAM_BRANCH,
    (false, false) => DIAGRAM_STRAIGHT,
  }
}

/// Fixed two-step placeholder trace. Not derived from the actual code; the
/// heuristic path does not interpret anything.
fn placeholder_trace() -> ExecutionTrace {
  let mut first = BTreeMap::new();
  first.insert("i".to_string(), json!(0));
  let mut second = BTreeMap::new();
  second.insert("i".to_string(), json!(1));
  ExecutionTrace {
    input: "sample_input".into(),
    steps: vec![
      TraceStep { line: 1, variables: first },
      TraceStep { line: 2, variables: second },
    ],
  }
}

fn quiz(question: &str, choices: [&str; 4], answer: &str, hint: &str, difficulty: Difficulty) -> QuizItem {
  QuizItem {
    question: question.into(),
    choices: choices.iter().map(|c| c.to_string()).collect(),
    answer: answer.into(),
    hint: hint.into(),
    difficulty,
  }
}

/// Three fixed-shape questions. The middle question's choices and answer follow
/// the same signal priority as the explanation clauses: loops, then
/// conditionals, then plain sequencing.
fn quizzes_for(sig: Signals) -> Vec<QuizItem> {
  let control_flow = if sig.has_loops {
    quiz(
      "What mainly controls the flow of this code?",
      ["A loop that repeats steps", "A random number", "The keyboard", "Nothing, it never runs"],
      "A loop that repeats steps",
      "Some lines run more than once.",
      Difficulty::Medium,
    )
  } else if sig.has_conditionals {
    quiz(
      "What mainly controls the flow of this code?",
      ["A condition that picks a branch", "A random number", "The keyboard", "Nothing, it never runs"],
      "A condition that picks a branch",
      "Look for a check that can be true or false.",
      Difficulty::Medium,
    )
  } else {
    quiz(
      "What mainly controls the flow of this code?",
      ["It just runs top to bottom", "A loop that repeats steps", "A condition that picks a branch", "A random number"],
      "It just runs top to bottom",
      "There are no loops or branches here.",
      Difficulty::Medium,
    )
  };

  vec![
    quiz(
      "What does this code do, at a high level?",
      [
        "It runs instructions in order to produce a result",
        "It draws a picture on the screen",
        "It sends an email",
        "It deletes files",
      ],
      "It runs instructions in order to produce a result",
      "Follow the steps from top to bottom.",
      Difficulty::Easy,
    ),
    control_flow,
    quiz(
      "What happens to the program's variables while it runs?",
      [
        "They can change as each line executes",
        "They are fixed forever once created",
        "They disappear after every line",
        "They are shared with every other program",
      ],
      "They can change as each line executes",
      "The same name can hold different values over time.",
      Difficulty::Hard,
    ),
  ]
}

/// Build a full bundle from keyword signals alone. Total function; the output
/// always passes `ContentBundle::validate`.
pub fn generate(code: &str, language: &str, level: ReadingLevel) -> ContentBundle {
  let sig = detect_signals(code);
  ContentBundle {
    explanation: explanation_for(language, level, sig),
    diagram: diagram_for(sig).to_string(),
    trace: placeholder_trace(),
    quizzes: quizzes_for(sig),
  }
}
