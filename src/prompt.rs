use std::io::{self, BufRead, Write};

/// Yes/no question asked of the operator.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, question: &str) -> bool {
        self(question)
    }
}

/// Answers every question with yes. Used for `--yes` and non-interactive runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysYes;

impl Confirm for AlwaysYes {
    fn confirm(&mut self, _question: &str) -> bool {
        true
    }
}

/// Reads answers from stdin. An empty answer counts as yes; EOF counts as no.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> bool {
        print!("\x1b[32m{} (y/n) [default: yes]: \x1b[0m", question);
        let _ = io::stdout().flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => parse_answer(&answer),
        }
    }
}

pub fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "" | "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_yes_answers_confirm() {
        assert!(parse_answer(""));
        assert!(parse_answer("  \n"));
        assert!(parse_answer("Y"));
        assert!(parse_answer("yes\n"));
        assert!(!parse_answer("n"));
        assert!(!parse_answer("nope"));
    }

    #[test]
    fn closures_act_as_confirmers() {
        let mut asked = Vec::new();
        let mut confirm = |q: &str| {
            asked.push(q.to_string());
            q != "skip"
        };
        assert!(confirm.confirm("keep"));
        assert!(!confirm.confirm("skip"));
        assert_eq!(asked, vec!["keep", "skip"]);
    }
}
