use dialoguer::Input;
use std::collections::VecDeque;
use std::io;

/// Line-based operator interaction
pub trait Terminal {
    /// Print a block of text
    fn show(&mut self, text: &str);
    /// Prompt and read one line; an empty answer is allowed
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;
}

/// The process's own terminal
pub struct Console;

impl Terminal for Console {
    fn show(&mut self, text: &str) {
        println!("{}", text);
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        let mut input = Input::<String>::new();
        input.with_prompt(prompt).allow_empty(true);
        input.interact()
    }
}

/// Answers prompts from a fixed list and records what was shown
///
/// Used for `--pick` and in tests.
#[derive(Debug, Default)]
pub struct Scripted {
    replies: VecDeque<String>,
    pub shown: Vec<String>,
    pub prompts: Vec<String>,
}

impl Scripted {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Scripted {
            replies: replies.into_iter().map(Into::into).collect(),
            shown: Vec::new(),
            prompts: Vec::new(),
        }
    }

    /// Nothing was printed and nothing was asked
    pub fn untouched(&self) -> bool {
        self.shown.is_empty() && self.prompts.is_empty()
    }
}

impl Terminal for Scripted {
    fn show(&mut self, text: &str) {
        self.shown.push(text.to_owned());
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_owned());
        self.replies
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more scripted input"))
    }
}
